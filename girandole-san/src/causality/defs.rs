//! Single-assignment check: every output and local of a body is defined by
//! exactly one statement, and no input is.
//!
//! The arms of a control construct are checked on their own. Two arms may
//! define the same variable since they are never active together, but a
//! variable defined twice within one arm is as wrong as in the node body.
//! Seen from the enclosing block, a construct is a single statement that
//! defines everything its arms define.

use std::collections::HashMap;

use girandole_err::{self as err, Acc, Result};

use crate::ast::{decl, stmt, var};
use crate::sp::{Sp, Span};

/// First definition of each variable of a block.
type Defined<'a> = HashMap<&'a var::Local, (&'a Sp<var::Local>, Span)>;

/// Check the definitions of `stmts`: every variable of `required` is defined
/// exactly once and none of `given` is defined at all.
pub fn check<'a>(
    acc: &mut Acc,
    given: impl IntoIterator<Item = &'a Sp<decl::TyVar>>,
    stmts: &'a [Sp<stmt::Statement>],
    required: impl IntoIterator<Item = &'a Sp<decl::TyVar>>,
) -> Result<()> {
    let defined = block(acc, stmts)?;
    for v in given {
        if let Some((site, _)) = defined.get(&v.t.name.t) {
            return acc.error(err::InputDefined {
                var: &v.t.name,
                site: *site,
            });
        }
    }
    for v in required {
        if !defined.contains_key(&v.t.name.t) {
            return acc.error(err::Undefined { var: &v.t.name });
        }
    }
    Some(())
}

/// Variables defined by the statements of one block, each at most once.
fn block<'a>(acc: &mut Acc, stmts: &'a [Sp<stmt::Statement>]) -> Result<Defined<'a>> {
    let mut defined = Defined::new();
    for s in stmts {
        for (x, site) in statement(acc, s)? {
            if let Some((_, prior)) = defined.get(&x.t) {
                return acc.error(err::DefinedTwice {
                    var: x,
                    site,
                    prior: *prior,
                });
            }
            defined.insert(&x.t, (x, site));
        }
    }
    Some(defined)
}

/// Variables defined by one statement, with the location of the equation
/// that defines them.
fn statement<'a>(
    acc: &mut Acc,
    s: &'a Sp<stmt::Statement>,
) -> Result<Vec<(&'a Sp<var::Local>, Span)>> {
    use stmt::Statement;
    let arms: Vec<&'a Sp<stmt::Block>> = match &s.t {
        Statement::Let { target, .. } => {
            return Some(target.t.vars().into_iter().map(|x| (x, s.span)).collect());
        }
        Statement::Assert(_) => return Some(Vec::new()),
        Statement::Switch { arms, .. } => arms.iter().map(|a| &a.body).collect(),
        Statement::Present { handlers, default } => handlers
            .iter()
            .map(|h| &h.body)
            .chain(std::iter::once(default))
            .collect(),
        Statement::Automaton { states } => states.iter().map(|st| &st.body).collect(),
        Statement::Reset { body, .. } => vec![body],
    };
    let mut union: Defined<'a> = Defined::new();
    for arm in arms {
        for (x, def) in block(acc, &arm.t.stmts)? {
            union.entry(x).or_insert(def);
        }
    }
    let mut defs: Vec<_> = union.into_values().collect();
    defs.sort_by(|(a, _), (b, _)| a.t.repr.cmp(&b.t.repr));
    Some(defs)
}

#[cfg(test)]
mod test {
    use super::check;
    use crate::ast::decl;
    use crate::build::*;
    use crate::sp::Sp;
    use girandole_err::{EAccum, Kind};

    fn messages(n: &Sp<decl::Node>) -> Option<(Kind, Vec<String>)> {
        let mut acc = EAccum::default();
        let ok = check(
            &mut acc,
            n.t.inputs.t.iter(),
            &n.t.stmts,
            n.t.outputs.t.iter().chain(n.t.locals.t.iter()),
        );
        match ok {
            Some(()) => None,
            None => {
                let e = &acc.errors()[0];
                Some((e.kind, e.messages().into_iter().map(String::from).collect()))
            }
        }
    }

    #[test]
    fn arms_may_share_definitions() {
        let n = node(
            "n",
            &["c"],
            &["x"],
            &[],
            vec![switch(
                var("c"),
                vec![("T", vec![eq("x", int(1))]), ("F", vec![eq("x", int(2))])],
            )],
        );
        assert_eq!(messages(&n), None);
    }

    #[test]
    fn twice_in_one_arm() {
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
        assert_eq!(
            messages(&n),
            Some((
                Kind::Definition,
                vec![
                    String::from("Variable x is defined twice"),
                    String::from("First defined here"),
                ]
            ))
        );
    }

    #[test]
    fn construct_and_equation_collide() {
        let n = node(
            "n",
            &["c"],
            &["x"],
            &[],
            vec![
                eq("x", int(0)),
                reset(vec![eq("x", int(1))], var("c")),
            ],
        );
        assert!(matches!(messages(&n), Some((Kind::Definition, _))));
    }

    #[test]
    fn nested_duplicate_in_present_default() {
        let n = node(
            "n",
            &["c"],
            &["x"],
            &[],
            vec![present(
                vec![(var("c"), vec![eq("x", int(1))])],
                vec![eq("x", int(2)), eq("x", int(3))],
            )],
        );
        assert!(matches!(messages(&n), Some((Kind::Definition, _))));
    }

    #[test]
    fn input_defined() {
        let n = node("n", &["a"], &["x"], &[], vec![eq("x", int(1)), eq("a", int(2))]);
        assert_eq!(
            messages(&n),
            Some((
                Kind::Definition,
                vec![String::from("Variable a is an input and cannot be defined")]
            ))
        );
    }

    #[test]
    fn output_never_defined() {
        let n = node("n", &[], &["x", "y"], &[], vec![eq("x", int(1))]);
        assert_eq!(
            messages(&n),
            Some((
                Kind::Definition,
                vec![String::from("Variable y is declared but never defined")]
            ))
        );
    }
}
