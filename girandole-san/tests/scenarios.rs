// End-to-end scenarios: normalization, causality and scheduling of
// small nodes, in the order the driver runs them.

use girandole_err::{EAccum, Kind};
use girandole_san::ast::decl;
use girandole_san::build::*;
use girandole_san::causality::{Causality, Policy};
use girandole_san::normalize::Normalize;
use girandole_san::schedule::Schedule;
use girandole_san::sp::Sp;

fn body(n: &Sp<decl::Node>) -> Vec<String> {
    n.t.stmts.iter().map(ToString::to_string).collect()
}

/// Run the three passes on one node.
fn run(mut n: Sp<decl::Node>, acc: &mut EAccum) -> Option<Sp<decl::Node>> {
    n.normalize();
    let mut n = n.causality(acc, Policy::StopAtFirst)?;
    n.schedule(acc);
    Some(n)
}

#[test]
fn instantaneous_increment_is_rejected() {
    let n = node("n", &[], &["x"], &[], vec![eq("x", add(var("x"), int(1)))]);
    let mut acc = EAccum::default();
    assert!(run(n, &mut acc).is_none());
    assert_eq!(acc.errors().len(), 1);
    let e = &acc.errors()[0];
    assert_eq!(e.kind, Kind::Causality);
    assert!(e.messages().contains(&"x is part of the cycle"));
}

#[test]
fn delayed_increment_is_accepted() {
    let n = node(
        "n",
        &[],
        &["x"],
        &[],
        vec![eq("x", fby(1, add(var("x"), int(1))))],
    );
    let mut acc = EAccum::default();
    let n = run(n, &mut acc).unwrap();
    assert!(acc.errors().is_empty());
    assert_eq!(body(&n), vec!["_aux0 = (x + 1);", "x = (1 fby _aux0);"]);
}

#[test]
fn switch_arms_are_exclusive() {
    let n = node(
        "n",
        &["c", "a"],
        &["x", "y"],
        &[],
        vec![switch(
            var("c"),
            vec![
                ("T", vec![eq("x", var("y")), eq("y", var("a"))]),
                ("F", vec![eq("y", var("x")), eq("x", var("a"))]),
            ],
        )],
    );
    let mut acc = EAccum::default();
    let n = run(n, &mut acc).unwrap();
    assert!(!acc.is_fatal());
    assert_eq!(
        body(&n),
        vec!["switch c | T => { y = a; x = y; } | F => { x = a; y = x; } end;"]
    );
}

#[test]
fn automaton_states_are_exclusive() {
    let n = node(
        "n",
        &["c", "a"],
        &["x", "y"],
        &[],
        vec![automaton(vec![
            state(
                "Up",
                vec![],
                vec![eq("x", var("y")), eq("y", var("a"))],
                vec![(var("c"), "Down")],
            ),
            state(
                "Down",
                vec![],
                vec![eq("y", var("x")), eq("x", var("a"))],
                vec![(var("c"), "Up")],
            ),
        ])],
    );
    let mut acc = EAccum::default();
    assert!(run(n, &mut acc).is_some());
    assert!(!acc.is_fatal());
}

#[test]
fn same_arm_cycle_is_rejected() {
    let n = node(
        "n",
        &["c"],
        &["x", "y"],
        &[],
        vec![switch(
            var("c"),
            vec![
                ("T", vec![eq("x", var("y")), eq("y", var("x"))]),
                ("F", vec![eq("x", int(0)), eq("y", int(0))]),
            ],
        )],
    );
    let mut acc = EAccum::default();
    assert!(run(n, &mut acc).is_none());
    assert_eq!(acc.errors()[0].kind, Kind::Causality);
}

#[test]
fn linear_reads_in_alternatives_are_accepted() {
    let n = node(
        "n",
        &["c", "buf"],
        &["y"],
        &[],
        vec![switch(
            var("c"),
            vec![
                ("T", vec![eq("y", call("push", vec![var("buf").linear()]))]),
                ("F", vec![eq("y", call("pop", vec![var("buf").linear()]))]),
            ],
        )],
    );
    let mut acc = EAccum::default();
    assert!(run(n, &mut acc).is_some());
}

#[test]
fn linear_value_read_after_consumption_is_rejected() {
    let n = node(
        "n",
        &["buf"],
        &["y"],
        &["full"],
        vec![
            eq("full", call("push", vec![var("buf").linear()])),
            eq("y", ifx(var("full"), var("buf"), int(0))),
        ],
    );
    let mut acc = EAccum::default();
    assert!(run(n, &mut acc).is_none());
    assert_eq!(acc.errors()[0].kind, Kind::Causality);
}

#[test]
fn statements_on_the_same_clock_are_grouped() {
    let n = node(
        "n",
        &["c"],
        &["b", "d", "e"],
        &[],
        vec![
            eq("b", when(int(0), "T", "c")),
            eq("d", when(var("b"), "F", "c")),
            eq("e", when(int(1), "T", "c")),
        ],
    );
    let mut acc = EAccum::default();
    let n = run(n, &mut acc).unwrap();
    assert_eq!(
        body(&n),
        vec![
            "b = (0 when T(c));",
            "e = (1 when T(c));",
            "d = (b when F(c));"
        ]
    );
}

#[test]
fn statement_without_partner_follows_what_it_reads() {
    let n = node(
        "n",
        &["c"],
        &["a", "d", "e"],
        &[],
        vec![
            eq("a", when(int(0), "T", "c")),
            eq("e", when(int(1), "F", "c")),
            eq("d", when(var("a"), "G", "c")),
        ],
    );
    let mut acc = EAccum::default();
    let n = run(n, &mut acc).unwrap();
    assert_eq!(
        body(&n),
        vec![
            "a = (0 when T(c));",
            "d = (a when G(c));",
            "e = (1 when F(c));"
        ]
    );
}

#[test]
fn scheduling_a_clustered_body_changes_nothing() {
    let n = node(
        "n",
        &["c", "a"],
        &["b", "d", "e", "f"],
        &[],
        vec![
            eq("f", when(add(var("a"), var("e")), "F", "c")),
            eq("b", when(var("a"), "T", "c")),
            eq("d", when(var("a"), "F", "c")),
            eq("e", when(add(var("a"), int(1)), "F", "c")),
        ],
    );
    let mut acc = EAccum::default();
    let mut n = run(n, &mut acc).unwrap();
    let once = body(&n);
    n.schedule(&mut acc);
    assert_eq!(once, body(&n));
}

#[test]
fn normalizing_twice_changes_nothing() {
    let mut n = node(
        "n",
        &["a", "c"],
        &["x", "y"],
        &[],
        vec![
            eq("x", call("f", vec![add(var("a"), int(1)), pre(var("a"))])),
            eq(
                "y",
                merge(
                    "c",
                    vec![
                        ("T", when(add(var("x"), int(2)), "T", "c")),
                        ("F", when(var("a"), "F", "c")),
                    ],
                ),
            ),
        ],
    );
    n.normalize();
    let once = n.to_string();
    n.normalize();
    assert_eq!(once, n.to_string());
}

#[test]
fn duplicate_definition_inside_an_arm_is_rejected() {
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
    let mut acc = EAccum::default();
    assert!(run(n, &mut acc).is_none());
    assert_eq!(acc.errors().len(), 1);
    assert_eq!(acc.errors()[0].kind, Kind::Definition);
}

#[test]
fn many_parallel_switches_are_checked_quickly() {
    let outs: Vec<String> = (0..64).map(|i| format!("x{i}")).collect();
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
    let mut acc = EAccum::default();
    assert!(run(n, &mut acc).is_some());
    assert!(!acc.is_fatal());
}

#[test]
fn unread_local_is_only_a_warning() {
    let n = node(
        "n",
        &["a"],
        &["x"],
        &["t"],
        vec![eq("t", add(var("a"), int(1))), eq("x", var("a"))],
    );
    let mut acc = EAccum::default();
    assert!(run(n, &mut acc).is_some());
    assert!(acc.errors().is_empty());
    assert_eq!(acc.warnings().len(), 1);
    assert_eq!(acc.warnings()[0].kind, Kind::Unused);
}
