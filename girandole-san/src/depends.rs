//! What each piece of a node body defines and reads.
//!
//! The statements of a body execute in whatever order their data needs,
//! not in the order they are written. `usage` and `schedule` derive that
//! order from the variables listed here.
//!
//! Reads come in two flavors selected by a [View]:
//! - the forward view records every variable mentioned,
//! - the scheduling view omits values that are only visible through a
//!   delay, since they are already available at the beginning of the step.

#![expect(
    clippy::redundant_closure_call,
    reason = "Macros invoke closures given as arguments"
)]

use std::fmt;

use crate::ast::{expr, stmt, var, Tuple};
use crate::sp::Sp;

/// Which reads are relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Every read, including through delays and `last`.
    Forward,
    /// Only reads that constrain the order of evaluation within one step.
    Scheduling,
}

/// Definitions and reads of a fragment.
///
/// Names (`Sp<Local>`, `Sp<NodeName>`) report themselves on both sides,
/// and whoever contains them decides which side applies: an equation
/// `x = e` defines what its pattern lists and reads what `e` lists, while
/// an expression defines nothing. Wrappers pass both sides through.
pub trait Depends {
    /// Elementary item, here always a `Reference`.
    type Output;
    /// Push the items this fragment defines.
    fn provides(&self, v: &mut Vec<Self::Output>);
    /// Push the items this fragment reads, as seen from `view`.
    fn requires(&self, v: &mut Vec<Self::Output>, view: View);
}

/// A name that a fragment defines or reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    /// A node.
    Node(Sp<var::NodeName>),
    /// A variable.
    Var(Sp<var::Local>),
}

impl Reference {
    /// Project to variables.
    #[must_use]
    pub fn as_var(&self) -> Option<&Sp<var::Local>> {
        match self {
            Self::Var(v) => Some(v),
            Self::Node(_) => None,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => write!(f, "Node `{node}`"),
            Self::Var(var) => write!(f, "Variable `{var}`"),
        }
    }
}

/// `provides` that dispatches on the variant and visits the bound fields.
macro_rules! provide_by_match {
    ( $( $pat:pat => $($y:ident),* ; )* ) => {
        fn provides(&self, v: &mut Vec<Self::Output>) {
            match self {
                $( $pat => { $( $y.provides(v); )* } )*
            }
        }
    }
}

/// `requires` that dispatches on the variant and visits the bound fields.
macro_rules! require_by_match {
    ( $( $pat:pat => $($y:ident),* ; )* ) => {
        fn requires(&self, v: &mut Vec<Self::Output>, view: View) {
            match self {
                $( $pat => { $( $y.requires(v, view); )* } )*
            }
        }
    }
}

/// `provides` that visits the listed fields.
macro_rules! provide_in_fields {
    ( $( $field:ident ),* ) => {
        fn provides(&self, v: &mut Vec<Self::Output>) {
            $( self.$field.provides(v); )*
        }
    }
}

/// `requires` that visits the listed fields.
macro_rules! require_in_fields {
    ( $( $field:ident ),* ) => {
        fn requires(&self, v: &mut Vec<Self::Output>, view: View) {
            $( self.$field.requires(v, view); )*
        }
    }
}

/// `provides` for fragments that define nothing.
macro_rules! provide_nothing {
    () => {
        fn provides(&self, _v: &mut Vec<Self::Output>) {}
    };
}

/// `provides` for a name: the name itself.
macro_rules! provide_this {
    ( $fun:expr ) => {
        fn provides(&self, v: &mut Vec<Self::Output>) {
            v.push(($fun)(self));
        }
    };
}

/// `requires` for a name: the name itself.
macro_rules! require_this {
    ( $fun:expr ) => {
        fn requires(&self, v: &mut Vec<Self::Output>, _view: View) {
            v.push(($fun)(self));
        }
    };
}

/// `Sp<Local>` is a leaf.
impl Depends for Sp<var::Local> {
    type Output = Reference;
    provide_this!(|this: &Self| Reference::Var(this.clone()));
    require_this!(|this: &Self| Reference::Var(this.clone()));
}

/// `Sp<NodeName>` is a leaf.
impl Depends for Sp<var::NodeName> {
    type Output = Reference;
    provide_this!(|this: &Self| Reference::Node(this.clone()));
    require_this!(|this: &Self| Reference::Node(this.clone()));
}

/// Sp is a wrapper and recurses into everything.
impl<T: Depends> Depends for Sp<Box<T>> {
    type Output = T::Output;
    fn provides(&self, v: &mut Vec<Self::Output>) {
        self.t.provides(v);
    }
    fn requires(&self, v: &mut Vec<Self::Output>, view: View) {
        self.t.requires(v, view);
    }
}

/// Implement `Depends` for `Sp<T>` by projection, for types whose
/// spanned version is not a leaf.
macro_rules! sp_projection {
    ( $($ty:ty),* ) => {
        $(
            #[doc = "`Sp` is a wrapper and recurses into everything."]
            impl Depends for Sp<$ty> {
                type Output = Reference;
                provide_in_fields!(t);
                require_in_fields!(t);
            }
        )*
    };
}
sp_projection!(
    expr::Expr,
    stmt::VarTuple,
    stmt::Block,
    stmt::Statement,
    Tuple<Sp<expr::Expr>>,
    Tuple<Sp<stmt::VarTuple>>
);

/// Vec is a wrapper and recurses into everything.
impl<T: Depends> Depends for Vec<T> {
    type Output = T::Output;
    fn provides(&self, v: &mut Vec<Self::Output>) {
        for i in self {
            i.provides(v);
        }
    }
    fn requires(&self, v: &mut Vec<Self::Output>, view: View) {
        for i in self {
            i.requires(v, view);
        }
    }
}

/// Option is a wrapper and recurses into everything.
impl<T: Depends> Depends for Option<T> {
    type Output = T::Output;
    fn provides(&self, v: &mut Vec<Self::Output>) {
        if let Some(i) = self {
            i.provides(v);
        }
    }
    fn requires(&self, v: &mut Vec<Self::Output>, view: View) {
        if let Some(i) = self {
            i.requires(v, view);
        }
    }
}

/// `Tuple` is a transparent wrapper, `Depends` recurses into all fieds.
impl<T: Depends> Depends for Tuple<T> {
    type Output = T::Output;
    fn provides(&self, v: &mut Vec<Self::Output>) {
        for i in self {
            i.provides(v);
        }
    }
    fn requires(&self, v: &mut Vec<Self::Output>, view: View) {
        for i in self {
            i.requires(v, view);
        }
    }
}

/// A block provides and requires everything its statements do.
impl Depends for stmt::Block {
    type Output = Reference;
    provide_in_fields!(stmts);
    require_in_fields!(stmts);
}

/// Statement recurses differently in both methods.
///
/// A control construct provides every variable defined in at least one
/// of its arms, exactly once.
impl Depends for stmt::Statement {
    type Output = Reference;
    fn provides(&self, v: &mut Vec<Reference>) {
        match self {
            // `target = ...` provides target
            Self::Let { target, .. } => target.provides(v),
            // Pure, provides nothing.
            Self::Assert(_) => {}
            Self::Switch { arms, .. } => {
                let mut defs = Vec::new();
                for arm in arms {
                    arm.body.provides(&mut defs);
                }
                push_unique(v, defs);
            }
            Self::Present { handlers, default } => {
                let mut defs = Vec::new();
                for h in handlers {
                    h.body.provides(&mut defs);
                }
                default.provides(&mut defs);
                push_unique(v, defs);
            }
            Self::Automaton { states } => {
                let mut defs = Vec::new();
                for s in states {
                    s.body.provides(&mut defs);
                }
                push_unique(v, defs);
            }
            Self::Reset { body, .. } => body.provides(v),
        }
    }
    fn requires(&self, v: &mut Vec<Reference>, view: View) {
        match self {
            // `_ = source` requires the value to be assigned.
            Self::Let { source, .. } => source.requires(v, view),
            // Assertion is a wrapper.
            Self::Assert(e) => e.requires(v, view),
            Self::Switch { selector, arms } => {
                selector.requires(v, view);
                for arm in arms {
                    arm.body.requires(v, view);
                }
            }
            Self::Present { handlers, default } => {
                for h in handlers {
                    h.cond.requires(v, view);
                    h.body.requires(v, view);
                }
                default.requires(v, view);
            }
            Self::Automaton { states } => {
                for s in states {
                    for esc in s.unless.iter().chain(s.until.iter()) {
                        esc.cond.requires(v, view);
                    }
                    s.body.requires(v, view);
                }
            }
            Self::Reset { body, cond } => {
                cond.requires(v, view);
                body.requires(v, view);
            }
        }
    }
}

/// Append the elements of `new` that are not already present.
fn push_unique(v: &mut Vec<Reference>, new: Vec<Reference>) {
    for r in new {
        if !v.contains(&r) {
            v.push(r);
        }
    }
}

/// `VarTuple` is a wrapper.
impl Depends for stmt::VarTuple {
    type Output = Reference;
    provide_by_match! {
        Self::Single(s) => s;
        Self::Multiple(m) => m;
    }
    require_by_match! {
        Self::Single(s) => s;
        Self::Multiple(m) => m;
    }
}

/// `Expr` provides nothing (all expressions are pure),
/// and recurses into all fields for `require`.
///
/// Two shapes depend on the view:
/// - `last x` is a read of a memory, invisible to scheduling,
/// - the operand of a delay contributes its own reads in the forward view,
///   but in the scheduling view only the variables that control its clock
///   (the delay must still know whether it is active).
impl Depends for expr::Expr {
    type Output = Reference;
    provide_nothing!();
    fn requires(&self, v: &mut Vec<Reference>, view: View) {
        use expr::Kind;
        match &self.kind {
            Kind::Lit(_) => {}
            Kind::Var(x) => x.requires(v, view),
            Kind::Last(x) => {
                if view == View::Forward {
                    x.requires(v, view);
                }
            }
            Kind::Tuple(t) | Kind::Array(t) => t.requires(v, view),
            Kind::Bin { lhs, rhs, .. } | Kind::Cmp { lhs, rhs, .. } => {
                lhs.requires(v, view);
                rhs.requires(v, view);
            }
            Kind::Un { inner, .. } | Kind::Field { inner, .. } => inner.requires(v, view),
            Kind::Fby { next, .. } => match view {
                View::Forward => next.requires(v, view),
                View::Scheduling => {
                    for ck in next.t.clk.vars() {
                        v.push(Reference::Var(Sp::new(ck.clone(), next.span)));
                    }
                }
            },
            Kind::When { inner, var, .. } => {
                var.requires(v, view);
                inner.requires(v, view);
            }
            Kind::Merge { switch, arms } => {
                switch.requires(v, view);
                for arm in arms {
                    arm.body.requires(v, view);
                }
            }
            Kind::Ifx { cond, yes, no } => {
                cond.requires(v, view);
                yes.requires(v, view);
                no.requires(v, view);
            }
            Kind::Call { node, args, reset } => {
                node.requires(v, view);
                args.requires(v, view);
                reset.requires(v, view);
            }
            Kind::Index { array, index } => {
                array.requires(v, view);
                index.requires(v, view);
            }
            Kind::Record(fields) => {
                for fi in fields {
                    fi.value.requires(v, view);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Depends, Reference, View};
    use crate::ast::stmt;
    use crate::build::*;
    use crate::sp::Sp;

    fn names(refs: &[Reference]) -> Vec<String> {
        refs.iter().map(ToString::to_string).collect()
    }

    fn reads(s: &Sp<stmt::Statement>, view: View) -> Vec<String> {
        let mut v = Vec::new();
        s.requires(&mut v, view);
        names(&v)
    }

    #[test]
    fn delay_is_cut_in_scheduling_view() {
        let ck = clock_on("T", "c");
        let s = eq("x", fby(0, add(var_on("y", ck.clone()), var_on("z", ck))));
        assert_eq!(
            reads(&s, View::Forward),
            vec!["Variable `y`", "Variable `z`"]
        );
        assert_eq!(reads(&s, View::Scheduling), vec!["Variable `c`"]);
    }

    #[test]
    fn last_is_invisible_to_scheduling() {
        let s = eq("x", add(last("x"), var("y")));
        assert_eq!(
            reads(&s, View::Forward),
            vec!["Variable `x`", "Variable `y`"]
        );
        assert_eq!(reads(&s, View::Scheduling), vec!["Variable `y`"]);
    }

    #[test]
    fn switch_provides_once() {
        let s = switch(
            var("c"),
            vec![
                ("T", vec![eq("x", int(1)), eq("y", int(1))]),
                ("F", vec![eq("x", int(2))]),
            ],
        );
        let mut v = Vec::new();
        s.provides(&mut v);
        assert_eq!(names(&v), vec!["Variable `x`", "Variable `y`"]);
        assert_eq!(reads(&s, View::Forward), vec!["Variable `c`"]);
    }

    #[test]
    fn call_requires_node_and_reset() {
        let s = eq("x", call_every("f", vec![var("a")], "r"));
        assert_eq!(
            reads(&s, View::Scheduling),
            vec!["Node `f`", "Variable `a`", "Variable `r`"]
        );
    }
}
