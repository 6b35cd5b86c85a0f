//! Per-statement usage records: what a statement defines, what it reads,
//! and under which clock it is active.
//!
//! These are derived data, recomputed from the statements whenever they
//! change, and are the only input of the dependency graph builder.

use std::collections::HashSet;

use crate::ast::{clock, expr, stmt, var};
use crate::depends::{Depends, Reference, View};
use crate::sp::Sp;

/// What one statement does with the variables of its node.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    /// Variables defined.
    pub def: Vec<Sp<var::Local>>,
    /// All variables read, including through delays.
    pub read: Vec<Sp<var::Local>>,
    /// Variables read in the current step.
    /// Differs from `read` only for delays and `last`.
    pub left: Vec<Sp<var::Local>>,
    /// Whether the statement is an equation `x = v fby e` or `x = pre e`.
    pub delay: bool,
    /// Variables that every defining equation of the statement defines
    /// through a delay. For a plain equation this is either all of `def`
    /// or nothing; a control construct may mix both.
    pub delayed: HashSet<var::Local>,
    /// Clock path under which the statement is active.
    pub clock: clock::Clock,
}

impl Usage {
    /// Analyze one statement.
    #[must_use]
    pub fn of(s: &Sp<stmt::Statement>) -> Self {
        let mut provided = Vec::new();
        s.provides(&mut provided);
        let mut forward = Vec::new();
        s.requires(&mut forward, View::Forward);
        let mut scheduling = Vec::new();
        s.requires(&mut scheduling, View::Scheduling);

        let mut defs = Vec::new();
        collect_defs(&s.t, &mut defs);
        let delayed = defs
            .iter()
            .filter(|(_, delay)| *delay)
            .map(|(v, _)| v.clone())
            .filter(|v| !defs.iter().any(|(w, delay)| w == v && !*delay))
            .collect();

        Self {
            def: vars(provided),
            read: vars(forward),
            left: vars(scheduling),
            delay: is_delay(&s.t),
            delayed,
            clock: clock_path(&s.t),
        }
    }

    /// Whether `x` is in the read-set.
    #[must_use]
    pub fn reads(&self, x: &var::Local) -> bool {
        self.read.iter().any(|r| &r.t == x)
    }

    /// Whether `x` is in the left-read-set.
    #[must_use]
    pub fn reads_now(&self, x: &var::Local) -> bool {
        self.left.iter().any(|r| &r.t == x)
    }
}

/// Keep only variables, without duplicates, in order of first occurrence.
fn vars(refs: Vec<Reference>) -> Vec<Sp<var::Local>> {
    let mut seen = HashSet::new();
    refs.into_iter()
        .filter_map(|r| match r {
            Reference::Var(v) => Some(v),
            Reference::Node(_) => None,
        })
        .filter(|v| seen.insert(v.t.clone()))
        .collect()
}

/// A delay equation has a delay at the root of its right-hand side.
fn is_delay(s: &stmt::Statement) -> bool {
    matches!(
        s,
        stmt::Statement::Let {
            source: Sp {
                t: expr::Expr {
                    kind: expr::Kind::Fby { .. },
                    ..
                },
                ..
            },
            ..
        }
    )
}

/// Every variable defined by an equation nested in `s`, with whether
/// that equation is a delay.
fn collect_defs(s: &stmt::Statement, acc: &mut Vec<(var::Local, bool)>) {
    use stmt::Statement;
    let block = |b: &Sp<stmt::Block>, acc: &mut Vec<(var::Local, bool)>| {
        for s in &b.t.stmts {
            collect_defs(&s.t, acc);
        }
    };
    match s {
        Statement::Let { target, .. } => {
            let delay = is_delay(s);
            for v in target.t.vars() {
                acc.push((v.t.clone(), delay));
            }
        }
        Statement::Assert(_) => {}
        Statement::Switch { arms, .. } => {
            for arm in arms {
                block(&arm.body, acc);
            }
        }
        Statement::Present { handlers, default } => {
            for h in handlers {
                block(&h.body, acc);
            }
            block(default, acc);
        }
        Statement::Automaton { states } => {
            for st in states {
                block(&st.body, acc);
            }
        }
        Statement::Reset { body, .. } => block(body, acc),
    }
}

/// The clock path of an equation is the clock of its right-hand side,
/// except for a merge whose clock is taken from one of its branches.
/// Control constructs are considered to be on the base clock.
fn clock_path(s: &stmt::Statement) -> clock::Clock {
    match s {
        stmt::Statement::Let { source, .. } => match &source.t.kind {
            expr::Kind::Merge { arms, .. } => arms
                .first()
                .map_or_else(|| source.t.clk.clone(), |arm| arm.body.t.clk.clone()),
            _ => source.t.clk.clone(),
        },
        stmt::Statement::Assert(e) => e.t.clk.clone(),
        _ => clock::Clock::base(),
    }
}

#[cfg(test)]
mod test {
    use super::Usage;
    use crate::build::*;

    fn names<T: std::fmt::Display>(v: &[T]) -> Vec<String> {
        v.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn plain_equation() {
        let u = Usage::of(&eq("x", add(var("a"), var("b"))));
        assert_eq!(names(&u.def), vec!["x"]);
        assert_eq!(names(&u.read), vec!["a", "b"]);
        assert_eq!(names(&u.left), vec!["a", "b"]);
        assert!(!u.delay);
        assert!(u.delayed.is_empty());
        assert!(u.clock.is_base());
    }

    #[test]
    fn delay_equation() {
        let u = Usage::of(&eq("x", fby(0, add(var("x"), int(1)))));
        assert_eq!(names(&u.read), vec!["x"]);
        assert!(u.left.is_empty());
        assert!(u.delay);
        assert!(u.delayed.contains(&local("x").t));
    }

    #[test]
    fn merge_clock_comes_from_branch() {
        let ck = clock_on("T", "c");
        let m = merge(
            "c",
            vec![
                ("T", var_on("a", ck)),
                ("F", var_on("b", clock_on("F", "c"))),
            ],
        );
        let u = Usage::of(&eq("x", m));
        assert_eq!(names(&u.read), vec!["c", "a", "b"]);
        assert_eq!(u.clock, clock_on("T", "c"));
    }

    #[test]
    fn mixed_construct_is_not_delayed() {
        let s = switch(
            var("c"),
            vec![
                ("T", vec![eq("x", fby(0, var("y")))]),
                ("F", vec![eq("x", var("y")), eq("z", pre(var("y")))]),
            ],
        );
        let u = Usage::of(&s);
        assert_eq!(names(&u.def), vec!["x", "z"]);
        assert!(!u.delay);
        assert!(!u.delayed.contains(&local("x").t));
        assert!(u.delayed.contains(&local("z").t));
        assert_eq!(names(&u.left), vec!["c", "y"]);
        assert!(u.clock.is_base());
    }
}
