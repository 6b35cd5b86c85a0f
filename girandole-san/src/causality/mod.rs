//! Causality check: verify that every variable can be computed before
//! it is read within a reaction.
//!
//! This happens at two levels:
//! - definitions: every output and local of a node has exactly one
//!   definition and no input is redefined, see `defs`;
//! - instantaneous dependencies: the effects of the node body are
//!   summarized by a `constraint` tree whose alternative-free variants
//!   are checked for cycles on a `micro` graph.
//!
//! Statements that share no defined or linearly consumed variable cannot
//! take part in the same cycle, so they are checked separately and the
//! variants of independent control constructs are never combined.

use std::collections::HashSet;

use girandole_err::{self as err, Acc, Result};

use crate::ast::{decl, var};
use crate::sp::Sp;

pub mod constraint;
pub mod defs;
pub mod micro;

use constraint::{Constraint, Effects};
use micro::Micro;

/// What to do after a node fails its check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Policy {
    /// Stop at the first node in error.
    #[default]
    StopAtFirst,
    /// Check every node so that all errors are reported.
    KeepGoing,
}

/// Check a program fragment for causality.
pub trait Causality: Sized {
    /// Verify, and give back the fragment unchanged.
    ///
    /// # Errors
    /// Fails if a variable depends instantaneously on itself or is not
    /// defined exactly once.
    fn causality(self, acc: &mut Acc, policy: Policy) -> Result<Self>;
}

impl<T: Causality> Causality for Sp<T> {
    fn causality(self, acc: &mut Acc, policy: Policy) -> Result<Self> {
        self.map(|_, t| t.causality(acc, policy)).transpose()
    }
}

impl Causality for decl::Prog {
    fn causality(self, acc: &mut Acc, policy: Policy) -> Result<Self> {
        let mut decls = Vec::with_capacity(self.decls.len());
        let mut failed = false;
        for d in self.decls {
            if let Some(d) = d.causality(acc, policy) {
                decls.push(d);
            } else {
                failed = true;
                if policy == Policy::StopAtFirst {
                    return None;
                }
            }
        }
        if failed {
            None
        } else {
            Some(Self { decls })
        }
    }
}

impl Causality for decl::Decl {
    fn causality(self, acc: &mut Acc, policy: Policy) -> Result<Self> {
        match self {
            Self::Node(node) => Some(Self::Node(node.causality(acc, policy)?)),
            Self::ExtNode(ext) => Some(Self::ExtNode(ext)),
        }
    }
}

impl Causality for decl::Node {
    fn causality(self, acc: &mut Acc, _policy: Policy) -> Result<Self> {
        log::debug!("Checking causality of {}", self.name);
        defs::check(
            acc,
            self.inputs.t.iter(),
            &self.stmts,
            self.outputs.t.iter().chain(self.locals.t.iter()),
        )?;
        instantaneous(
            acc,
            &self.name,
            &Constraint::par(self.stmts.iter().map(Effects::effects)),
        )?;
        if let Some(contract) = &self.contract {
            let c = &contract.t;
            defs::check(
                acc,
                self.inputs
                    .t
                    .iter()
                    .chain(self.outputs.t.iter())
                    .chain(self.locals.t.iter()),
                &c.stmts,
                c.locals.t.iter(),
            )?;
            instantaneous(
                acc,
                &self.name,
                &Constraint::seq(
                    Constraint::par(c.stmts.iter().map(Effects::effects)),
                    Constraint::tuple([c.assume.effects(), c.enforce.effects()]),
                ),
            )?;
        }
        Some(self)
    }
}

/// No variant of `effects` has an instantaneous cycle.
///
/// Members of a parallel composition are split into groups that touch
/// no common key variable (see `Constraint::keys`), and alternatives are
/// checked one branch at a time, so only the members of one group are
/// ever expanded together.
fn instantaneous(acc: &mut Acc, node: &Sp<var::NodeName>, effects: &Constraint) -> Result<()> {
    match effects {
        Constraint::Par(cs) | Constraint::Tuple(cs) => {
            for group in independent(cs) {
                match group.as_slice() {
                    [single] => instantaneous(acc, node, single)?,
                    members => {
                        let par = Constraint::Par(members.iter().map(|&c| c.clone()).collect());
                        variants(acc, node, &par)?;
                    }
                }
            }
            Some(())
        }
        Constraint::Alt(cs) => {
            for c in cs {
                instantaneous(acc, node, c)?;
            }
            Some(())
        }
        _ => variants(acc, node, effects),
    }
}

/// Partition `cs` into groups such that no key variable of the whole
/// composition is touched by members of two different groups.
/// Members keep their relative order.
fn independent(cs: &[Constraint]) -> Vec<Vec<&Constraint>> {
    let keys: HashSet<&var::Local> = cs.iter().flat_map(Constraint::keys).collect();
    let mut groups: Vec<(HashSet<&var::Local>, Vec<usize>)> = Vec::new();
    for (i, c) in cs.iter().enumerate() {
        let mut links: HashSet<&var::Local> = c
            .touched()
            .into_iter()
            .filter(|v| keys.contains(v))
            .collect();
        let mut members = vec![i];
        let mut k = 0;
        while k < groups.len() {
            if at!(groups, k).0.is_disjoint(&links) {
                k += 1;
            } else {
                let (other_links, other_members) = groups.swap_remove(k);
                links.extend(other_links);
                members.extend(other_members);
            }
        }
        groups.push((links, members));
    }
    let mut groups: Vec<Vec<usize>> = groups
        .into_iter()
        .map(|(_, mut members)| {
            members.sort_unstable();
            members
        })
        .collect();
    groups.sort_unstable();
    groups
        .into_iter()
        .map(|members| members.into_iter().filter_map(|i| cs.get(i)).collect())
        .collect()
}

/// Expand `effects` and check each variant on its own graph.
fn variants(acc: &mut Acc, node: &Sp<var::NodeName>, effects: &Constraint) -> Result<()> {
    let variants = effects.normalize();
    log::trace!("{node}: {} variant(s) to check", variants.len());
    for variant in &variants {
        if let Some(cycle) = Micro::build(variant).cycle() {
            let vars: HashSet<var::Local> = cycle.iter().map(|v| v.t.clone()).collect();
            return acc.error(err::CausalityCycle {
                node,
                effects: variant.restrict(&vars),
                items: cycle.iter(),
            });
        }
    }
    Some(())
}

#[cfg(test)]
mod test {
    use super::{Causality, Policy};
    use crate::ast::decl;
    use crate::build::*;
    use crate::sp::Sp;
    use girandole_err::{EAccum, Kind};

    fn check(node: Sp<decl::Node>) -> Result<(), (Kind, Vec<String>)> {
        let mut acc = EAccum::default();
        match node.causality(&mut acc, Policy::StopAtFirst) {
            Some(_) => Ok(()),
            None => {
                let e = &acc.errors()[0];
                Err((e.kind, e.messages().into_iter().map(String::from).collect()))
            }
        }
    }

    #[test]
    fn instantaneous_self_loop() {
        let n = node("n", &["a"], &["x"], &[], vec![eq("x", add(var("x"), int(1)))]);
        assert_eq!(
            check(n),
            Err((
                Kind::Causality,
                vec![
                    String::from("Causality error in n: some variables depend instantaneously on themselves"),
                    String::from("The offending effects are `x; def x`"),
                    String::from("x is part of the cycle"),
                ]
            ))
        );
    }

    #[test]
    fn delayed_self_loop() {
        let n = node(
            "n",
            &[],
            &["x"],
            &[],
            vec![eq("x", fby(1, add(var("x"), int(1))))],
        );
        assert_eq!(check(n), Ok(()));
    }

    #[test]
    fn last_is_not_instantaneous() {
        let n = node("n", &[], &["x"], &[], vec![eq("x", add(last("x"), int(1)))]);
        assert_eq!(check(n), Ok(()));
    }

    #[test]
    fn exclusive_arms() {
        let n = node(
            "n",
            &["c"],
            &["x", "y"],
            &[],
            vec![switch(
                var("c"),
                vec![
                    ("T", vec![eq("x", var("y")), eq("y", int(0))]),
                    ("F", vec![eq("y", var("x")), eq("x", int(1))]),
                ],
            )],
        );
        assert_eq!(check(n), Ok(()));
    }

    #[test]
    fn mutual_dependency() {
        let n = node(
            "n",
            &[],
            &["x"],
            &["y"],
            vec![eq("y", var("x")), eq("x", var("y"))],
        );
        let Err((kind, msgs)) = check(n) else {
            panic!("Cycle should be rejected");
        };
        assert_eq!(kind, Kind::Causality);
        assert_eq!(msgs[1], "The offending effects are `(x; def y) || (y; def x)`");
        assert_eq!(&msgs[2..], ["x is part of the cycle", "y is part of the cycle"]);
    }

    #[test]
    fn linear_reuse() {
        let n = node(
            "n",
            &["x"],
            &["y"],
            &["x2"],
            vec![
                eq("x2", call("f", vec![var("x").linear()])),
                eq("y", ifx(var("x2"), var("x"), int(0))),
            ],
        );
        assert!(matches!(check(n), Err((Kind::Causality, _))));
    }

    #[test]
    fn linear_in_alternatives() {
        let n = node(
            "n",
            &["c", "x"],
            &["y"],
            &[],
            vec![switch(
                var("c"),
                vec![
                    ("T", vec![eq("y", call("f", vec![var("x").linear()]))]),
                    ("F", vec![eq("y", call("g", vec![var("x").linear()]))]),
                ],
            )],
        );
        assert_eq!(check(n), Ok(()));
    }

    #[test]
    fn redefinition() {
        let n = node(
            "n",
            &[],
            &["x"],
            &[],
            vec![eq("x", int(1)), eq("x", int(2))],
        );
        assert_eq!(
            check(n),
            Err((
                Kind::Definition,
                vec![
                    String::from("Variable x is defined twice"),
                    String::from("First defined here"),
                ]
            ))
        );
    }

    #[test]
    fn redefinition_within_an_arm() {
        let n = node(
            "n",
            &["c"],
            &["x"],
            &[],
            vec![switch(
                var("c"),
                vec![
                    ("T", vec![eq("x", int(1)), eq("x", int(2))]),
                    ("F", vec![eq("x", int(3))]),
                ],
            )],
        );
        let Err((kind, msgs)) = check(n) else {
            panic!("Two definitions in one arm");
        };
        assert_eq!(kind, Kind::Definition);
        assert_eq!(msgs[0], "Variable x is defined twice");
    }

    #[test]
    fn input_redefinition() {
        let n = node("n", &["a"], &["x"], &[], vec![eq("x", int(1)), eq("a", int(2))]);
        let Err((kind, msgs)) = check(n) else {
            panic!("Inputs cannot be defined");
        };
        assert_eq!(kind, Kind::Definition);
        assert_eq!(msgs[0], "Variable a is an input and cannot be defined");
    }

    #[test]
    fn undefined_output() {
        let n = node("n", &[], &["x", "y"], &[], vec![eq("x", int(1))]);
        assert_eq!(
            check(n),
            Err((
                Kind::Definition,
                vec![String::from("Variable y is declared but never defined")]
            ))
        );
    }

    #[test]
    fn many_independent_switches() {
        let outs: Vec<String> = (0..40).map(|i| format!("x{i}")).collect();
        let names: Vec<&str> = outs.iter().map(String::as_str).collect();
        let stmts = names
            .iter()
            .map(|x| {
                switch(
                    var("c"),
                    vec![
                        ("T", vec![eq(x, add(var("a"), int(1)))]),
                        ("F", vec![eq(x, var("a"))]),
                    ],
                )
            })
            .collect();
        let n = node("n", &["a", "c"], &names, &[], stmts);
        assert_eq!(check(n), Ok(()));
    }

    #[test]
    fn independent_switches_keep_their_cycles() {
        let sw = |x: &str, y: &str| {
            switch(
                var("c"),
                vec![
                    ("T", vec![eq(x, var("a"))]),
                    ("F", vec![eq(x, var(y))]),
                ],
            )
        };
        let mut stmts: Vec<_> = (0..30)
            .map(|i| {
                let x = format!("x{i}");
                sw(&x, "a")
            })
            .collect();
        stmts.push(sw("p", "q"));
        stmts.push(sw("q", "p"));
        let mut outs: Vec<String> = (0..30).map(|i| format!("x{i}")).collect();
        outs.push(String::from("p"));
        outs.push(String::from("q"));
        let names: Vec<&str> = outs.iter().map(String::as_str).collect();
        let n = node("n", &["a", "c"], &names, &[], stmts);
        let Err((kind, msgs)) = check(n) else {
            panic!("p and q depend on each other when both take F");
        };
        assert_eq!(kind, Kind::Causality);
        assert_eq!(&msgs[2..], ["p is part of the cycle", "q is part of the cycle"]);
    }

    #[test]
    fn contract_is_checked() {
        let mut n = node("n", &["a"], &["x"], &[], vec![eq("x", var("a"))]);
        n.t.contract = Some(contract(
            &["p", "q"],
            vec![eq("p", var("q")), eq("q", var("p"))],
            boolean(true),
            cmp(crate::ast::op::Cmp::Ge, var("x"), var("p")),
        ));
        assert!(matches!(check(n), Err((Kind::Causality, _))));
    }

    #[test]
    fn contract_locals_must_be_defined() {
        let mut n = node("n", &["a"], &["x"], &[], vec![eq("x", var("a"))]);
        n.t.contract = Some(contract(
            &["p"],
            vec![],
            boolean(true),
            cmp(crate::ast::op::Cmp::Ge, var("x"), var("a")),
        ));
        assert!(matches!(check(n), Err((Kind::Definition, _))));
    }

    #[test]
    fn program_order_is_kept() {
        let main = node(
            "main",
            &["a"],
            &["x"],
            &[],
            vec![eq("x", call("incr", vec![var("a")]))],
        );
        let incr = node(
            "incr",
            &["a"],
            &["x"],
            &[],
            vec![eq("x", add(var("a"), int(1)))],
        );
        let mut acc = EAccum::default();
        let p = prog(vec![decl(main), decl(incr)])
            .causality(&mut acc, Policy::StopAtFirst)
            .unwrap();
        let names: Vec<String> = p
            .t
            .decls
            .iter()
            .map(|d| match &d.t {
                decl::Decl::Node(n) => n.t.name.to_string(),
                decl::Decl::ExtNode(n) => n.t.name.to_string(),
            })
            .collect();
        assert_eq!(names, vec!["main", "incr"]);
    }

    #[test]
    fn keep_going_reports_every_node() {
        let bad = |name: &str| node(name, &[], &["x"], &[], vec![eq("x", var("x"))]);
        let p = prog(vec![decl(bad("f")), decl(bad("g"))]);
        let mut acc = EAccum::default();
        assert!(p.clone().causality(&mut acc, Policy::StopAtFirst).is_none());
        assert_eq!(acc.errors().len(), 1);
        let mut acc = EAccum::default();
        assert!(p.causality(&mut acc, Policy::KeepGoing).is_none());
        assert_eq!(acc.errors().len(), 2);
    }
}
