//! Normalization: fix the granularity of equations.
//!
//! After this pass
//! - calls only take named arguments (variables, literals, `last`,
//!   and samplings or tuples of those),
//! - delays, calls and merges only occur at the root of an equation,
//! - the operand of a delay is a literal, a variable, or a sampling of one,
//! - merges and conditionals of tuples are distributed into tuples of
//!   merges and conditionals, and the arms of a merge are conditional
//!   named references,
//! - tuples of expressions assigned to tuples of variables are split into
//!   one equation per component.
//!
//! Every expression moved out of its context is bound to a fresh local
//! variable that carries its type, clock, and linearity. The pass is total,
//! and normalizing a normalized node changes nothing.

use std::collections::HashSet;

use crate::ast::options::pass::Normalize as This;
use crate::ast::{clock, decl, expr, stmt, ty, var, Tuple};
use crate::sp::{Sp, Span};

/// Rewrite `Self` into normal form.
pub trait Normalize {
    /// Normalize in place.
    fn normalize(&mut self);
}

impl<T: Normalize> Normalize for Sp<T> {
    fn normalize(&mut self) {
        self.t.normalize();
    }
}

impl Normalize for decl::Prog {
    fn normalize(&mut self) {
        for decl in &mut self.decls {
            decl.normalize();
        }
    }
}

impl Normalize for decl::Decl {
    fn normalize(&mut self) {
        match self {
            Self::Node(node) => node.normalize(),
            Self::ExtNode(_) => {}
        }
    }
}

impl Normalize for decl::Node {
    /// Normalize the body, then the contract.
    /// Fresh variables of the body become locals of the node,
    /// fresh variables of the contract become locals of the contract.
    fn normalize(&mut self) {
        log::debug!("Normalizing node {}", self.name);
        let mut fresh = Fresh::avoiding(self.all_vars().map(|v| v.t.name.t.repr.clone()));

        let mut ctx = Ctx::new(&mut fresh);
        self.stmts = ctx.stmts(std::mem::take(&mut self.stmts));
        for v in ctx.decls {
            self.locals.t.push(v);
        }

        if let Some(contract) = &mut self.contract {
            let c = &mut contract.t;
            let mut ctx = Ctx::new(&mut fresh);
            let mut stmts = ctx.stmts(std::mem::take(&mut c.stmts));
            c.assume = ctx.expr(c.assume.clone(), Want::Exp, &mut stmts);
            c.enforce = ctx.expr(c.enforce.clone(), Want::Exp, &mut stmts);
            c.stmts = stmts;
            for v in ctx.decls {
                c.locals.t.push(v);
            }
        }

        if *self.options.trace.fetch::<This>() {
            log::info!("Normalized {}:\n{self}", self.name);
        }
    }
}

/// Generator of variable names that do not collide with existing ones.
struct Fresh {
    /// Every name declared or generated so far.
    taken: HashSet<String>,
    /// Suffix of the next candidate.
    counter: usize,
}

impl Fresh {
    /// Start a generator that will avoid all of `names`.
    fn avoiding(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            taken: names.into_iter().collect(),
            counter: 0,
        }
    }

    /// A new name.
    fn local(&mut self) -> var::Local {
        loop {
            let repr = format!("_aux{}", self.counter);
            self.counter += 1;
            if self.taken.insert(repr.clone()) {
                return var::Local { repr };
            }
        }
    }
}

/// What is acceptable at the current position of an expression.
///
/// Tuples are always normalized componentwise with the same requirement,
/// which is what lets merges and conditionals be distributed over them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Want {
    /// Anything goes: the right-hand side of an equation.
    Any,
    /// A simple expression: delays, calls and merges are moved out.
    Exp,
    /// A named reference: a literal, a variable, `last x`,
    /// or a sampling of one.
    Named,
    /// A named reference that is additionally not linear,
    /// unless it is a plain variable.
    CondNamed,
}

/// Normalization state of one body.
struct Ctx<'a> {
    /// Shared by the body and the contract so that names are unique
    /// across the whole node.
    fresh: &'a mut Fresh,
    /// Declarations of the variables introduced so far.
    decls: Vec<Sp<decl::TyVar>>,
}

/// Annotations of an expression, used when rebuilding one.
#[derive(Clone)]
struct Meta {
    /// Type.
    ty: ty::Ty,
    /// Clock.
    clk: clock::Clock,
    /// Linearity.
    lin: ty::Linearity,
}

impl Meta {
    /// Attach the annotations to a shape.
    fn with(self, kind: expr::Kind, span: Span) -> Sp<expr::Expr> {
        Sp::new(
            expr::Expr {
                kind,
                ty: self.ty,
                clk: self.clk,
                lin: self.lin,
            },
            span,
        )
    }
}

impl<'a> Ctx<'a> {
    /// Empty context.
    fn new(fresh: &'a mut Fresh) -> Self {
        Self {
            fresh,
            decls: Vec::new(),
        }
    }

    /// Normalize a list of statements, including the equations that
    /// it is necessary to add.
    fn stmts(&mut self, stmts: Vec<Sp<stmt::Statement>>) -> Vec<Sp<stmt::Statement>> {
        let mut out = Vec::new();
        for s in stmts {
            self.statement(s, &mut out);
        }
        out
    }

    /// Normalize the contents of a block.
    fn block(&mut self, b: Sp<stmt::Block>) -> Sp<stmt::Block> {
        b.map(|_, b| stmt::Block {
            stmts: self.stmts(b.stmts),
        })
    }

    /// Normalize one statement and push the result to `out`.
    ///
    /// Equations needed by the conditions of a construct are placed next to
    /// the construct, except for the weak transitions of an automaton
    /// that are evaluated inside their state.
    fn statement(&mut self, s: Sp<stmt::Statement>, out: &mut Vec<Sp<stmt::Statement>>) {
        use stmt::Statement;
        let span = s.span;
        let s = match s.t {
            Statement::Let { target, source } => {
                let source = self.expr(source, Want::Any, out);
                Self::assign(target, source, span, out);
                return;
            }
            Statement::Assert(e) => Statement::Assert(self.expr(e, Want::Exp, out)),
            Statement::Switch { selector, arms } => {
                let selector = self.expr(selector, Want::Exp, out);
                let mut new_arms = Vec::new();
                for arm in arms {
                    new_arms.push(stmt::Arm {
                        tag: arm.tag,
                        body: self.block(arm.body),
                    });
                }
                Statement::Switch {
                    selector,
                    arms: new_arms,
                }
            }
            Statement::Present { handlers, default } => {
                let mut new_handlers = Vec::new();
                for h in handlers {
                    let cond = self.expr(h.cond, Want::Exp, out);
                    new_handlers.push(stmt::Handler {
                        cond,
                        body: self.block(h.body),
                    });
                }
                Statement::Present {
                    handlers: new_handlers,
                    default: self.block(default),
                }
            }
            Statement::Automaton { states } => {
                let mut new_states = Vec::new();
                for st in states {
                    let mut unless = Vec::new();
                    for esc in st.unless {
                        unless.push(stmt::Escape {
                            cond: self.expr(esc.cond, Want::Exp, out),
                            target: esc.target,
                        });
                    }
                    let body_span = st.body.span;
                    let mut stmts = self.stmts(st.body.t.stmts);
                    let mut until = Vec::new();
                    for esc in st.until {
                        until.push(stmt::Escape {
                            cond: self.expr(esc.cond, Want::Exp, &mut stmts),
                            target: esc.target,
                        });
                    }
                    new_states.push(stmt::State {
                        name: st.name,
                        body: Sp::new(stmt::Block { stmts }, body_span),
                        until,
                        unless,
                    });
                }
                Statement::Automaton { states: new_states }
            }
            Statement::Reset { body, cond } => {
                let cond = self.expr(cond, Want::Exp, out);
                Statement::Reset {
                    body: self.block(body),
                    cond,
                }
            }
        };
        out.push(Sp::new(s, span));
    }

    /// Emit `target = source`, split into components if both sides are
    /// tuples of the same size.
    fn assign(
        target: Sp<stmt::VarTuple>,
        source: Sp<expr::Expr>,
        span: Span,
        out: &mut Vec<Sp<stmt::Statement>>,
    ) {
        if let (stmt::VarTuple::Multiple(targets), expr::Kind::Tuple(sources)) =
            (&target.t, &source.t.kind)
        {
            if targets.t.len() == sources.t.len() {
                for (t, s) in targets.t.iter().zip(sources.t.iter()) {
                    Self::assign(t.clone(), s.clone(), span, out);
                }
                return;
            }
        }
        out.push(Sp::new(stmt::Statement::Let { target, source }, span));
    }

    /// Normalize an expression so that it fits `want`.
    /// Auxiliary equations are pushed to `pending`.
    fn expr(
        &mut self,
        e: Sp<expr::Expr>,
        want: Want,
        pending: &mut Vec<Sp<stmt::Statement>>,
    ) -> Sp<expr::Expr> {
        let e = self.shape(e, want, pending);
        self.finish(e, want, pending)
    }

    /// Operand of an operator or accessor.
    fn operand(
        &mut self,
        e: Sp<Box<expr::Expr>>,
        pending: &mut Vec<Sp<stmt::Statement>>,
    ) -> Sp<Box<expr::Expr>> {
        self.expr(e.unboxed(), Want::Exp, pending).boxed()
    }

    /// Normalize the subexpressions according to the requirements of
    /// the root, and distribute merges and conditionals over tuples.
    fn shape(
        &mut self,
        e: Sp<expr::Expr>,
        want: Want,
        pending: &mut Vec<Sp<stmt::Statement>>,
    ) -> Sp<expr::Expr> {
        use expr::Kind;
        let span = e.span;
        let expr::Expr { kind, ty, clk, lin } = e.t;
        let meta = Meta { ty, clk, lin };
        let kind = match kind {
            k @ (Kind::Lit(_) | Kind::Var(_) | Kind::Last(_)) => k,
            Kind::Tuple(items) => {
                Kind::Tuple(items.map(|_, t| t.map(|c| self.expr(c, want, pending))))
            }
            Kind::Array(items) => {
                Kind::Array(items.map(|_, t| t.map(|c| self.expr(c, Want::Exp, pending))))
            }
            Kind::Bin { op, lhs, rhs } => Kind::Bin {
                op,
                lhs: self.operand(lhs, pending),
                rhs: self.operand(rhs, pending),
            },
            Kind::Cmp { op, lhs, rhs } => Kind::Cmp {
                op,
                lhs: self.operand(lhs, pending),
                rhs: self.operand(rhs, pending),
            },
            Kind::Un { op, inner } => Kind::Un {
                op,
                inner: self.operand(inner, pending),
            },
            Kind::Field { inner, name } => Kind::Field {
                inner: self.operand(inner, pending),
                name,
            },
            Kind::Index { array, index } => Kind::Index {
                array: self.operand(array, pending),
                index: self.operand(index, pending),
            },
            Kind::Record(fields) => Kind::Record(
                fields
                    .into_iter()
                    .map(|fi| expr::FieldInit {
                        name: fi.name,
                        value: self.expr(fi.value, Want::Exp, pending),
                    })
                    .collect(),
            ),
            Kind::When { inner, tag, var } => Kind::When {
                inner: self.operand(inner, pending),
                tag,
                var,
            },
            Kind::Fby { init, next } => {
                let next = if is_chain(&next.t) {
                    next
                } else {
                    self.expr(next.unboxed(), Want::Named, pending).boxed()
                };
                Kind::Fby { init, next }
            }
            Kind::Call { node, args, reset } => Kind::Call {
                node,
                args: args.map(|_, t| t.map(|a| self.expr(a, Want::Named, pending))),
                reset,
            },
            Kind::Merge { switch, arms } => {
                let arms = arms
                    .into_iter()
                    .map(|arm| expr::Branch {
                        tag: arm.tag,
                        body: self.expr(arm.body, Want::CondNamed, pending),
                    })
                    .collect();
                return merge(switch, arms, meta, span);
            }
            Kind::Ifx { cond, yes, no } => {
                let cond = self.expr(cond.unboxed(), Want::Exp, pending);
                let yes = self.expr(yes.unboxed(), Want::Exp, pending);
                let no = self.expr(no.unboxed(), Want::Exp, pending);
                // The condition is duplicated by the distribution.
                let cond = if same_width(&yes, &no) {
                    self.expr(cond, Want::Named, pending)
                } else {
                    cond
                };
                return conditional(&cond, yes, no, meta, span);
            }
        };
        meta.with(kind, span)
    }

    /// Move `e` out of its context if it does not fit `want`.
    /// Its subexpressions must already be normalized.
    fn finish(
        &mut self,
        e: Sp<expr::Expr>,
        want: Want,
        pending: &mut Vec<Sp<stmt::Statement>>,
    ) -> Sp<expr::Expr> {
        use expr::Kind;
        let fits = match want {
            Want::Any => true,
            Want::Exp => !matches!(
                e.t.kind,
                Kind::Fby { .. } | Kind::Call { .. } | Kind::Merge { .. }
            ),
            Want::Named => is_named(&e.t),
            Want::CondNamed => is_cond_named(&e.t),
        };
        if fits {
            return e;
        }
        let span = e.span;
        let meta = Meta {
            ty: e.t.ty,
            clk: e.t.clk,
            lin: e.t.lin,
        };
        match e.t.kind {
            // Only obtained by distribution, the components have not been
            // checked yet.
            Kind::Tuple(items) => {
                let items = items.map(|_, t| t.map(|c| self.finish(c, want, pending)));
                meta.with(Kind::Tuple(items), span)
            }
            kind => self.bind(meta.with(kind, span), pending),
        }
    }

    /// Declare a new variable.
    fn declare(&mut self, ty: ty::Ty, clk: clock::Clock, span: Span) -> Sp<var::Local> {
        let name = Sp::new(self.fresh.local(), span);
        log::trace!("Introducing {name}: {ty} :: {clk}");
        self.decls.push(Sp::new(
            decl::TyVar {
                name: name.clone(),
                ty: Sp::new(ty, span),
                clk: Sp::new(clk, span),
            },
            span,
        ));
        name
    }

    /// Bind `e` to fresh variables and return a reference to them.
    /// An expression of a tuple type gets one variable per component.
    fn bind(
        &mut self,
        e: Sp<expr::Expr>,
        pending: &mut Vec<Sp<stmt::Statement>>,
    ) -> Sp<expr::Expr> {
        let span = e.span;
        let (target, reference) = if let Some(tys) = e.t.ty.components().cloned() {
            let mut targets = Tuple::default();
            let mut items = Tuple::default();
            for ty in tys {
                let v = self.declare(ty.clone(), e.t.clk.clone(), span);
                targets.push(Sp::new(stmt::VarTuple::Single(v.clone()), span));
                items.push(Sp::new(
                    expr::Expr {
                        kind: expr::Kind::Var(v),
                        ty,
                        clk: e.t.clk.clone(),
                        lin: e.t.lin,
                    },
                    span,
                ));
            }
            let reference = expr::Expr {
                kind: expr::Kind::Tuple(Sp::new(items, span)),
                ty: e.t.ty.clone(),
                clk: e.t.clk.clone(),
                lin: e.t.lin,
            };
            (
                stmt::VarTuple::Multiple(Sp::new(targets, span)),
                reference,
            )
        } else {
            let v = self.declare(e.t.ty.clone(), e.t.clk.clone(), span);
            let reference = e.t.as_var(v.clone());
            (stmt::VarTuple::Single(v), reference)
        };
        log::trace!("Binding {e} to {target}");
        pending.push(Sp::new(
            stmt::Statement::Let {
                target: Sp::new(target, span),
                source: e,
            },
            span,
        ));
        Sp::new(reference, span)
    }
}

/// Whether both expressions are tuples of the same size.
fn same_width(e1: &Sp<expr::Expr>, e2: &Sp<expr::Expr>) -> bool {
    match (&e1.t.kind, &e2.t.kind) {
        (expr::Kind::Tuple(t1), expr::Kind::Tuple(t2)) => t1.t.len() == t2.t.len(),
        _ => false,
    }
}

/// If all expressions are tuples of the same size, get their components
/// grouped by position.
fn transpose(
    bodies: Vec<Sp<expr::Expr>>,
) -> Result<Vec<Vec<Sp<expr::Expr>>>, Vec<Sp<expr::Expr>>> {
    let width = match bodies.first().map(|b| &b.t.kind) {
        Some(expr::Kind::Tuple(items)) => Some(items.t.len()),
        _ => None,
    };
    let Some(width) = width else {
        return Err(bodies);
    };
    let uniform = bodies
        .iter()
        .all(|b| matches!(&b.t.kind, expr::Kind::Tuple(items) if items.t.len() == width));
    if !uniform {
        return Err(bodies);
    }
    let mut columns: Vec<Vec<_>> = (0..width)
        .map(|_| Vec::with_capacity(bodies.len()))
        .collect();
    for b in bodies {
        if let expr::Kind::Tuple(items) = b.t.kind {
            for (col, item) in columns.iter_mut().zip(items.t) {
                col.push(item);
            }
        }
    }
    Ok(columns)
}

/// Build a merge, distributed over its arms if they are all tuples.
fn merge(
    switch: Sp<var::Local>,
    arms: Vec<expr::Branch>,
    meta: Meta,
    span: Span,
) -> Sp<expr::Expr> {
    let (tags, bodies): (Vec<_>, Vec<_>) = arms.into_iter().map(|a| (a.tag, a.body)).unzip();
    match transpose(bodies) {
        Err(bodies) => {
            let arms = tags
                .into_iter()
                .zip(bodies)
                .map(|(tag, body)| expr::Branch { tag, body })
                .collect();
            meta.with(expr::Kind::Merge { switch, arms }, span)
        }
        Ok(columns) => {
            let items = columns
                .into_iter()
                .map(|col| {
                    let component = Meta {
                        ty: col.first().map_or_else(|| meta.ty.clone(), |b| b.t.ty.clone()),
                        clk: meta.clk.clone(),
                        lin: linearity(col.iter()),
                    };
                    let arms = tags
                        .iter()
                        .cloned()
                        .zip(col)
                        .map(|(tag, body)| expr::Branch { tag, body })
                        .collect();
                    merge(switch.clone(), arms, component, span)
                })
                .collect();
            meta.with(expr::Kind::Tuple(Sp::new(items, span)), span)
        }
    }
}

/// Build a conditional, distributed over its branches if they are
/// tuples of the same size.
fn conditional(
    cond: &Sp<expr::Expr>,
    yes: Sp<expr::Expr>,
    no: Sp<expr::Expr>,
    meta: Meta,
    span: Span,
) -> Sp<expr::Expr> {
    if let (expr::Kind::Tuple(ys), expr::Kind::Tuple(ns)) = (&yes.t.kind, &no.t.kind) {
        if ys.t.len() == ns.t.len() {
            let items = ys
                .t
                .iter()
                .zip(ns.t.iter())
                .map(|(y, n)| {
                    let component = Meta {
                        ty: y.t.ty.clone(),
                        clk: meta.clk.clone(),
                        lin: linearity([y, n].into_iter()),
                    };
                    conditional(cond, y.clone(), n.clone(), component, span)
                })
                .collect();
            return meta.with(expr::Kind::Tuple(Sp::new(items, ys.span)), span);
        }
    }
    meta.with(
        expr::Kind::Ifx {
            cond: cond.clone().boxed(),
            yes: yes.boxed(),
            no: no.boxed(),
        },
        span,
    )
}

/// A combination is linear if any of its parts is.
fn linearity<'a>(mut es: impl Iterator<Item = &'a Sp<expr::Expr>>) -> ty::Linearity {
    if es.any(|e| e.t.is_linear()) {
        ty::Linearity::Linear
    } else {
        ty::Linearity::Shared
    }
}

/// Literals and variables, possibly sampled.
fn is_chain(e: &expr::Expr) -> bool {
    match &e.kind {
        expr::Kind::Lit(_) | expr::Kind::Var(_) => true,
        expr::Kind::When { inner, .. } => is_chain(&inner.t),
        _ => false,
    }
}

/// Expressions that can be passed around without computation.
fn is_named(e: &expr::Expr) -> bool {
    match &e.kind {
        expr::Kind::Lit(_) | expr::Kind::Var(_) | expr::Kind::Last(_) => true,
        expr::Kind::When { inner, .. } => is_named(&inner.t),
        expr::Kind::Tuple(items) => items.t.iter().all(|i| is_named(&i.t)),
        _ => false,
    }
}

/// Named expressions that can be duplicated.
/// A plain variable is always accepted so that it is not bound again.
fn is_cond_named(e: &expr::Expr) -> bool {
    match &e.kind {
        expr::Kind::Var(_) => true,
        expr::Kind::Tuple(items) => items.t.iter().all(|i| is_cond_named(&i.t)),
        _ => is_named(e) && !e.is_linear(),
    }
}
