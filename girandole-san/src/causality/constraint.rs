//! Effects of statements on the variables of their node.
//!
//! Every statement is summarized as a tree of elementary reads and writes
//! combined by sequence, parallel composition, exclusive alternative,
//! or the unordered grouping of the components of a tuple.
//! Mutually exclusive branches never coexist in one reaction, so before
//! building a dependency graph the tree is expanded into the list of its
//! alternative-free variants, each of which is checked separately.

use std::collections::HashSet;
use std::fmt;

use crate::ast::{expr, stmt, var, Tuple};
use crate::sp::Sp;

/// A tree of effects.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Definition of a variable.
    Write(Sp<var::Local>),
    /// Ordinary read of the current value.
    Read(Sp<var::Local>),
    /// Read that consumes a linear value.
    LinRead(Sp<var::Local>),
    /// Read of the previous value, which is already available.
    LastRead(Sp<var::Local>),
    /// The left side happens before the right side.
    Seq(Box<Constraint>, Box<Constraint>),
    /// Simultaneous effects.
    Par(Vec<Constraint>),
    /// Mutually exclusive effects, exactly one of which happens.
    Alt(Vec<Constraint>),
    /// Components evaluated in no particular order.
    Tuple(Vec<Constraint>),
}

impl Default for Constraint {
    fn default() -> Self {
        Self::nothing()
    }
}

impl Constraint {
    /// No effect.
    #[must_use]
    pub fn nothing() -> Self {
        Self::Par(Vec::new())
    }

    /// Whether this has no effect at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Par(cs) | Self::Tuple(cs) => cs.iter().all(Self::is_empty),
            Self::Seq(a, b) => a.is_empty() && b.is_empty(),
            _ => false,
        }
    }

    /// `a` then `b`, dropping empty sides.
    #[must_use]
    pub fn seq(a: Self, b: Self) -> Self {
        if a.is_empty() {
            b
        } else if b.is_empty() {
            a
        } else {
            Self::Seq(Box::new(a), Box::new(b))
        }
    }

    /// Parallel composition, without empty members.
    #[must_use]
    pub fn par(cs: impl IntoIterator<Item = Self>) -> Self {
        let mut cs: Vec<_> = cs.into_iter().filter(|c| !c.is_empty()).collect();
        if cs.len() == 1 {
            cs.pop().unwrap_or_default()
        } else {
            Self::Par(cs)
        }
    }

    /// Unordered components, without empty members.
    #[must_use]
    pub fn tuple(cs: impl IntoIterator<Item = Self>) -> Self {
        let mut cs: Vec<_> = cs.into_iter().filter(|c| !c.is_empty()).collect();
        if cs.len() == 1 {
            cs.pop().unwrap_or_default()
        } else {
            Self::Tuple(cs)
        }
    }

    /// Exclusive alternatives.
    /// Empty branches are kept since doing nothing is one of the choices.
    #[must_use]
    pub fn alt(cs: impl IntoIterator<Item = Self>) -> Self {
        let mut cs: Vec<_> = cs.into_iter().collect();
        match cs.len() {
            0 => Self::nothing(),
            1 => cs.pop().unwrap_or_default(),
            _ => Self::Alt(cs),
        }
    }

    /// Expand into the list of alternative-free variants.
    ///
    /// An alternative contributes each of its branches, every other
    /// combinator combines the variants of its members in all possible ways.
    #[must_use]
    pub fn normalize(&self) -> Vec<Self> {
        match self {
            Self::Write(_) | Self::Read(_) | Self::LinRead(_) | Self::LastRead(_) => {
                vec![self.clone()]
            }
            Self::Alt(cs) => {
                let variants: Vec<Self> = cs.iter().flat_map(Self::normalize).collect();
                if variants.is_empty() {
                    vec![Self::nothing()]
                } else {
                    variants
                }
            }
            Self::Seq(a, b) => {
                let bs = b.normalize();
                a.normalize()
                    .into_iter()
                    .flat_map(|na| bs.iter().map(move |nb| Self::seq(na.clone(), nb.clone())))
                    .collect()
            }
            Self::Par(cs) => product(cs).into_iter().map(Self::par).collect(),
            Self::Tuple(cs) => product(cs).into_iter().map(Self::tuple).collect(),
        }
    }

    /// Variables that are defined or linearly consumed somewhere in the tree.
    ///
    /// Only these can close a cycle: the definition of a variable that is
    /// merely read has no predecessor, and its consumption no successor.
    #[must_use]
    pub fn keys(&self) -> HashSet<&var::Local> {
        let mut out = HashSet::new();
        self.collect(false, &mut out);
        out
    }

    /// Variables whose current value is involved, that is all of them
    /// except those only read through `last`.
    #[must_use]
    pub fn touched(&self) -> HashSet<&var::Local> {
        let mut out = HashSet::new();
        self.collect(true, &mut out);
        out
    }

    /// Variables of the leaves, including plain reads if `reads` is set.
    fn collect<'a>(&'a self, reads: bool, out: &mut HashSet<&'a var::Local>) {
        match self {
            Self::Write(v) | Self::LinRead(v) => {
                out.insert(&v.t);
            }
            Self::Read(v) => {
                if reads {
                    out.insert(&v.t);
                }
            }
            Self::LastRead(_) => {}
            Self::Seq(a, b) => {
                a.collect(reads, out);
                b.collect(reads, out);
            }
            Self::Par(cs) | Self::Alt(cs) | Self::Tuple(cs) => {
                for c in cs {
                    c.collect(reads, out);
                }
            }
        }
    }

    /// Keep only the effects on the given variables.
    #[must_use]
    pub fn restrict(&self, vars: &HashSet<var::Local>) -> Self {
        match self {
            Self::Write(v) | Self::Read(v) | Self::LinRead(v) | Self::LastRead(v) => {
                if vars.contains(&v.t) {
                    self.clone()
                } else {
                    Self::nothing()
                }
            }
            Self::Seq(a, b) => Self::seq(a.restrict(vars), b.restrict(vars)),
            Self::Par(cs) => Self::par(cs.iter().map(|c| c.restrict(vars))),
            Self::Alt(cs) => Self::alt(cs.iter().map(|c| c.restrict(vars))),
            Self::Tuple(cs) => Self::tuple(cs.iter().map(|c| c.restrict(vars))),
        }
    }
}

/// All ways of picking one variant of each member.
fn product(cs: &[Constraint]) -> Vec<Vec<Constraint>> {
    let mut acc = vec![Vec::new()];
    for c in cs {
        let variants = c.normalize();
        acc = acc
            .into_iter()
            .flat_map(|prefix| {
                variants.iter().map(move |v| {
                    let mut prefix = prefix.clone();
                    prefix.push(v.clone());
                    prefix
                })
            })
            .collect();
    }
    acc
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        /// Print a member of a combinator, parenthesized unless it is
        /// a leaf or of the same combinator as the parent.
        fn member(
            f: &mut fmt::Formatter<'_>,
            parent: &Constraint,
            c: &Constraint,
        ) -> fmt::Result {
            let same = std::mem::discriminant(parent) == std::mem::discriminant(c);
            match c {
                Constraint::Seq(..) | Constraint::Par(_) | Constraint::Alt(_) if !same => {
                    write!(f, "({c})")
                }
                _ => write!(f, "{c}"),
            }
        }
        /// Print the members separated by `sep`.
        fn members(
            f: &mut fmt::Formatter<'_>,
            parent: &Constraint,
            cs: &[Constraint],
            sep: &str,
        ) -> fmt::Result {
            let mut first = true;
            for c in cs {
                if !first {
                    write!(f, "{sep}")?;
                }
                first = false;
                member(f, parent, c)?;
            }
            Ok(())
        }
        match self {
            Self::Write(v) => write!(f, "def {v}"),
            Self::Read(v) => write!(f, "{v}"),
            Self::LinRead(v) => write!(f, "lin {v}"),
            Self::LastRead(v) => write!(f, "last {v}"),
            Self::Seq(a, b) => {
                member(f, self, a)?;
                write!(f, "; ")?;
                member(f, self, b)
            }
            Self::Par(cs) => members(f, self, cs, " || "),
            Self::Alt(cs) => members(f, self, cs, " | "),
            Self::Tuple(cs) => {
                write!(f, "(")?;
                let mut first = true;
                for c in cs {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{c}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Compute the tree of effects of a program fragment.
pub trait Effects {
    /// Reads and writes performed, and how they are ordered.
    fn effects(&self) -> Constraint;
}

impl<T: Effects> Effects for Sp<T> {
    fn effects(&self) -> Constraint {
        self.t.effects()
    }
}

impl<T: Effects> Effects for Box<T> {
    fn effects(&self) -> Constraint {
        self.as_ref().effects()
    }
}

impl<T: Effects> Effects for Tuple<T> {
    fn effects(&self) -> Constraint {
        Constraint::tuple(self.iter().map(Effects::effects))
    }
}

impl Effects for expr::Expr {
    fn effects(&self) -> Constraint {
        use expr::Kind;
        match &self.kind {
            Kind::Lit(_) | Kind::Fby { .. } => Constraint::nothing(),
            Kind::Var(v) => {
                if self.is_linear() {
                    Constraint::LinRead(v.clone())
                } else {
                    Constraint::Read(v.clone())
                }
            }
            Kind::Last(v) => Constraint::LastRead(v.clone()),
            Kind::Tuple(items) | Kind::Array(items) => items.effects(),
            Kind::Bin { lhs, rhs, .. } | Kind::Cmp { lhs, rhs, .. } => {
                Constraint::tuple([lhs.effects(), rhs.effects()])
            }
            Kind::Un { inner, .. } | Kind::Field { inner, .. } => inner.effects(),
            Kind::Index { array, index } => Constraint::tuple([array.effects(), index.effects()]),
            Kind::Record(fields) => Constraint::tuple(fields.iter().map(|f| f.value.effects())),
            Kind::When { inner, var, .. } => {
                Constraint::seq(Constraint::Read(var.clone()), inner.effects())
            }
            Kind::Merge { switch, arms } => Constraint::seq(
                Constraint::Read(switch.clone()),
                Constraint::tuple(arms.iter().map(|arm| arm.body.effects())),
            ),
            Kind::Ifx { cond, yes, no } => Constraint::seq(
                cond.effects(),
                Constraint::par([yes.effects(), no.effects()]),
            ),
            Kind::Call { args, reset, .. } => Constraint::tuple(
                args.t
                    .iter()
                    .map(Effects::effects)
                    .chain(reset.iter().map(|r| Constraint::Read(r.clone()))),
            ),
        }
    }
}

impl Effects for stmt::Block {
    fn effects(&self) -> Constraint {
        Constraint::par(self.stmts.iter().map(Effects::effects))
    }
}

impl Effects for stmt::Statement {
    fn effects(&self) -> Constraint {
        use stmt::Statement;
        let conds = |escapes: &[stmt::Escape]| {
            Constraint::par(escapes.iter().map(|esc| esc.cond.effects()))
        };
        match self {
            Statement::Let { target, source } => Constraint::seq(
                source.effects(),
                Constraint::par(
                    target
                        .t
                        .vars()
                        .into_iter()
                        .map(|v| Constraint::Write(v.clone())),
                ),
            ),
            Statement::Assert(e) => e.effects(),
            Statement::Switch { selector, arms } => Constraint::seq(
                selector.effects(),
                Constraint::alt(arms.iter().map(|arm| arm.body.effects())),
            ),
            Statement::Present { handlers, default } => Constraint::alt(
                handlers
                    .iter()
                    .map(|h| Constraint::seq(h.cond.effects(), h.body.effects()))
                    .chain(std::iter::once(default.effects())),
            ),
            Statement::Automaton { states } => Constraint::alt(states.iter().map(|st| {
                Constraint::seq(
                    conds(&st.unless),
                    Constraint::seq(st.body.effects(), conds(&st.until)),
                )
            })),
            Statement::Reset { body, cond } => Constraint::seq(cond.effects(), body.effects()),
        }
    }
}
