//! Reorder the statements of every block so that each one executes after
//! the statements it depends on.
//!
//! Nested blocks of control constructs are scheduled on their own, and a
//! construct is then placed in its enclosing block as a single statement.
//! Unless disabled with `#[cluster(false)]`, statements on compatible
//! clocks are brought next to each other.
//!
//! This pass is total: causality has already been checked, so a cycle here
//! is an internal defect. It only emits warnings for local variables that
//! nothing reads.

use girandole_err::{self as err, Acc};

use crate::ast::options::pass::Schedule as This;
use crate::ast::{decl, stmt};
use crate::depends::{Depends, View};
use crate::sp::Sp;
use crate::usage::Usage;

pub mod graph;
pub mod heuristic;

use graph::DepGraph;
use heuristic::{ClockClustering, Refine, Topological};

/// Scheduling of a program fragment.
pub trait Schedule {
    /// Reorder in place.
    fn schedule(&mut self, acc: &mut Acc);
}

impl<T: Schedule> Schedule for Sp<T> {
    fn schedule(&mut self, acc: &mut Acc) {
        self.t.schedule(acc);
    }
}

impl Schedule for decl::Prog {
    fn schedule(&mut self, acc: &mut Acc) {
        for d in &mut self.decls {
            d.schedule(acc);
        }
    }
}

impl Schedule for decl::Decl {
    fn schedule(&mut self, acc: &mut Acc) {
        match self {
            Self::Node(node) => node.schedule(acc),
            Self::ExtNode(_) => {}
        }
    }
}

impl Schedule for decl::Node {
    fn schedule(&mut self, acc: &mut Acc) {
        log::debug!("Scheduling {}", self.name);
        let refine: &dyn Refine = if *self.options.cluster.fetch::<This>() {
            &ClockClustering
        } else {
            &Topological
        };
        self.stmts = block(std::mem::take(&mut self.stmts), refine);
        if let Some(contract) = &mut self.contract {
            contract.t.stmts = block(std::mem::take(&mut contract.t.stmts), refine);
        }
        never_read(acc, self);
        if *self.options.trace.fetch::<This>() {
            log::info!("Scheduled {}:\n{self}", self.name);
        }
    }
}

/// Schedule a block, innermost blocks first.
fn block(mut stmts: Vec<Sp<stmt::Statement>>, refine: &dyn Refine) -> Vec<Sp<stmt::Statement>> {
    for s in &mut stmts {
        nested(&mut s.t, refine);
    }
    let usages: Vec<Usage> = stmts.iter().map(Usage::of).collect();
    let graph = DepGraph::scheduling(&usages);
    let clocks: Vec<_> = usages.into_iter().map(|u| u.clock).collect();
    let order = refine.refine(graph.topological(), &graph, &clocks);
    log::trace!("Scheduled a block of {} statements", graph.len());
    permute(stmts, &order)
}

/// Schedule the blocks of a control construct.
fn nested(s: &mut stmt::Statement, refine: &dyn Refine) {
    let sub = |b: &mut Sp<stmt::Block>| {
        b.t.stmts = block(std::mem::take(&mut b.t.stmts), refine);
    };
    match s {
        stmt::Statement::Let { .. } | stmt::Statement::Assert(_) => {}
        stmt::Statement::Switch { arms, .. } => {
            for arm in arms {
                sub(&mut arm.body);
            }
        }
        stmt::Statement::Present { handlers, default } => {
            for h in handlers {
                sub(&mut h.body);
            }
            sub(default);
        }
        stmt::Statement::Automaton { states } => {
            for st in states {
                sub(&mut st.body);
            }
        }
        stmt::Statement::Reset { body, .. } => sub(body),
    }
}

/// Put `items[order[0]]` first, then `items[order[1]]`, etc.
fn permute<T>(items: Vec<T>, order: &[usize]) -> Vec<T> {
    let len = items.len();
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let permuted: Vec<T> = order
        .iter()
        .filter_map(|&i| slots.get_mut(i).and_then(Option::take))
        .collect();
    err::consistency!(
        permuted.len() == len,
        "Scheduling should produce a permutation of the statements"
    );
    permuted
}

/// Warn about local variables that are defined but never read.
///
/// A variable counts as read if a statement other than its definition
/// reads it, if the construct that defines it also reads it,
/// or if the contract reads it.
fn never_read(acc: &mut Acc, node: &decl::Node) {
    let usages: Vec<Usage> = node.stmts.iter().map(Usage::of).collect();
    let forward = DepGraph::forward(&usages);
    let mut contract_reads = Vec::new();
    if let Some(contract) = &node.contract {
        contract.t.stmts.requires(&mut contract_reads, View::Forward);
        contract.t.assume.requires(&mut contract_reads, View::Forward);
        contract.t.enforce.requires(&mut contract_reads, View::Forward);
    }
    for local in node.locals.t.iter() {
        let x = &local.t.name;
        let Some(i) = usages.iter().position(|u| u.def.iter().any(|d| d.t == x.t)) else {
            continue;
        };
        let by_others = forward
            .vertex(i)
            .succ
            .iter()
            .any(|&j| at!(usages, j).reads(&x.t));
        let by_itself = at!(node.stmts, i).t.is_construct() && at!(usages, i).reads(&x.t);
        let by_contract = contract_reads
            .iter()
            .any(|r| r.as_var().is_some_and(|v| v.t == x.t));
        if !(by_others || by_itself || by_contract) {
            acc.warning(err::NeverRead {
                var: x,
                site: at!(node.stmts, i),
            });
        }
    }
}
