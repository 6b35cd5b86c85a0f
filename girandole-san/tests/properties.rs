// Property-based tests for the middle-end invariants.
//
// Node bodies are generated as acyclic systems of equations in random order:
// equation `i` defines `v{i}` and instantaneously reads only `v{j}` for `j < i`,
// while delays may read any variable. All reads of an equation are sampled
// on the same clock, and some equations go through a node call so that
// normalization has something to do.

use std::ops::Range;

use girandole_err::EAccum;
use girandole_san::ast::{decl, expr, stmt};
use girandole_san::build::*;
use girandole_san::causality::{Causality, Policy};
use girandole_san::normalize::Normalize;
use girandole_san::schedule::Schedule;
use girandole_san::sp::Sp;
use girandole_san::usage::Usage;
use proptest::prelude::*;

// ── Generator ───────────────────────────────────────────────────────────────

/// Shape of one equation.
#[derive(Debug, Clone)]
struct Shape {
    /// 0: plain, 1: delay, 2: call.
    kind: u8,
    /// Raw indices of variables read, reduced modulo the allowed range.
    reads: Vec<usize>,
    /// 0: base, 1: sampled on `T(c)`, 2: sampled on `F(c)`.
    clock: u8,
}

fn arb_shape(clocks: Range<u8>) -> impl Strategy<Value = Shape> {
    (0u8..3, prop::collection::vec(0usize..16, 0..=3), clocks)
        .prop_map(|(kind, reads, clock)| Shape { kind, reads, clock })
}

fn name(i: usize) -> String {
    format!("v{i}")
}

/// A variable read on the clock of the equation.
fn leaf(x: &str, clock: u8) -> Sp<expr::Expr> {
    match clock {
        1 => when(var(x), "T", "c"),
        2 => when(var(x), "F", "c"),
        _ => var(x),
    }
}

fn equation(i: usize, n: usize, shape: &Shape) -> Sp<stmt::Statement> {
    let source = if shape.kind == 1 {
        let j = shape.reads.first().map_or(i, |r| r % n);
        fby(0, leaf(&name(j), shape.clock))
    } else {
        let mut e = leaf("a", shape.clock);
        if i > 0 {
            for r in &shape.reads {
                e = add(e, leaf(&name(r % i), shape.clock));
            }
        }
        if shape.kind == 2 {
            call("f", vec![e])
        } else {
            e
        }
    };
    eq(&name(i), source)
}

/// A node whose outputs are all the generated variables.
fn arb_node(clocks: Range<u8>) -> impl Strategy<Value = Sp<decl::Node>> {
    prop::collection::vec(arb_shape(clocks), 1..=8)
        .prop_flat_map(|shapes| {
            let n = shapes.len();
            let stmts: Vec<_> = shapes
                .iter()
                .enumerate()
                .map(|(i, s)| equation(i, n, s))
                .collect();
            (Just(n), Just(stmts).prop_shuffle())
        })
        .prop_map(|(n, stmts)| {
            let names: Vec<String> = (0..n).map(name).collect();
            let outputs: Vec<&str> = names.iter().map(String::as_str).collect();
            node("gen", &["a", "c"], &outputs, &[], stmts)
        })
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn rendered(stmts: &[Sp<stmt::Statement>]) -> Vec<String> {
    stmts.iter().map(ToString::to_string).collect()
}

/// Every statement comes after the non-delayed definitions of what it reads.
fn respects_dependencies(stmts: &[Sp<stmt::Statement>]) -> bool {
    let usages: Vec<Usage> = stmts.iter().map(Usage::of).collect();
    usages.iter().enumerate().all(|(j, reader)| {
        usages.iter().enumerate().all(|(i, definer)| {
            let needed = definer
                .def
                .iter()
                .any(|x| !definer.delayed.contains(&x.t) && reader.reads_now(&x.t));
            i == j || !needed || i < j
        })
    })
}

// ── Properties ──────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    #[test]
    fn acyclic_bodies_are_accepted_and_scheduled(mut n in arb_node(0..3)) {
        n.normalize();
        let before = rendered(&n.t.stmts);

        let mut acc = EAccum::default();
        let checked = n.causality(&mut acc, Policy::StopAtFirst);
        prop_assert!(!acc.is_fatal(), "{:?}", acc.errors());
        let Some(mut n) = checked else {
            return Err(TestCaseError::fail("causality rejected an acyclic body"));
        };

        n.schedule(&mut acc);
        let after = rendered(&n.t.stmts);

        let mut sorted_before = before.clone();
        sorted_before.sort();
        let mut sorted_after = after.clone();
        sorted_after.sort();
        prop_assert_eq!(sorted_before, sorted_after);
        prop_assert!(respects_dependencies(&n.t.stmts), "{:?}", after);
    }

    #[test]
    fn normalization_is_a_fixed_point(mut n in arb_node(0..3)) {
        n.normalize();
        let once = n.to_string();
        n.normalize();
        prop_assert_eq!(once, n.to_string());
    }

    #[test]
    fn scheduling_is_idempotent(mut n in arb_node(0..3)) {
        let mut acc = EAccum::default();
        n.normalize();
        n.schedule(&mut acc);
        let once = rendered(&n.t.stmts);
        n.schedule(&mut acc);
        prop_assert_eq!(once, rendered(&n.t.stmts));
    }
}
