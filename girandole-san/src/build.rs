//! Terse constructors for annotated trees.
//!
//! Upstream passes are responsible for producing real trees, these helpers
//! exist so that tests (here and in dependent crates) can describe node
//! bodies without spelling out every span and annotation.
//!
//! Unless stated otherwise, every value built here is an `int` on the base
//! clock and is shared. Use [Annotate] to change that, and note that all
//! spans are forged: they compare equal to everything and carry no
//! location.

use girandole_err::{here, Transparent};

use crate::ast::{clock, decl, expr, op, options, stmt, ty, var, Tuple};
use crate::sp::{Sp, Span};

/// A dummy span.
#[must_use]
pub fn span() -> Span {
    Transparent::forge(here!())
}

/// Attach a dummy span.
fn sp<T>(t: T) -> Sp<T> {
    Sp::new(t, span())
}

/// The type `int`.
#[must_use]
pub fn int_ty() -> ty::Ty {
    ty::Ty::Base(ty::Base::Int)
}

/// The type `bool`.
#[must_use]
pub fn bool_ty() -> ty::Ty {
    ty::Ty::Base(ty::Base::Bool)
}

/// A variable name.
#[must_use]
pub fn local(name: &str) -> Sp<var::Local> {
    sp(var::Local {
        repr: name.to_owned(),
    })
}

/// A constructor used as a sampling condition.
#[must_use]
pub fn tag(name: &str) -> Sp<clock::Tag> {
    sp(clock::Tag {
        repr: name.to_owned(),
    })
}

/// The clock `base on tag(var)`.
#[must_use]
pub fn clock_on(tag: &str, var: &str) -> clock::Clock {
    clock::Clock::base().on(self::tag(tag).t, local(var).t)
}

/// Assemble an expression.
fn mk(kind: expr::Kind, ty: ty::Ty, clk: clock::Clock) -> Sp<expr::Expr> {
    sp(expr::Expr {
        kind,
        ty,
        clk,
        lin: ty::Linearity::Shared,
    })
}

/// Change the annotations of an expression after the fact.
pub trait Annotate {
    /// Mark as linear.
    #[must_use]
    fn linear(self) -> Self;
    /// Replace the type.
    #[must_use]
    fn typed(self, ty: ty::Ty) -> Self;
    /// Replace the clock.
    #[must_use]
    fn clocked(self, clk: clock::Clock) -> Self;
}

impl Annotate for Sp<expr::Expr> {
    fn linear(mut self) -> Self {
        self.t.lin = ty::Linearity::Linear;
        self
    }

    fn typed(mut self, ty: ty::Ty) -> Self {
        self.t.ty = ty;
        self
    }

    fn clocked(mut self, clk: clock::Clock) -> Self {
        self.t.clk = clk;
        self
    }
}

/// Integer literal.
#[must_use]
pub fn int(i: i64) -> Sp<expr::Expr> {
    mk(
        expr::Kind::Lit(sp(expr::Lit::Int(i))),
        int_ty(),
        clock::Clock::base(),
    )
}

/// Boolean literal.
#[must_use]
pub fn boolean(b: bool) -> Sp<expr::Expr> {
    mk(
        expr::Kind::Lit(sp(expr::Lit::Bool(b))),
        bool_ty(),
        clock::Clock::base(),
    )
}

/// Variable on the base clock.
#[must_use]
pub fn var(name: &str) -> Sp<expr::Expr> {
    var_on(name, clock::Clock::base())
}

/// Variable on some clock.
#[must_use]
pub fn var_on(name: &str, clk: clock::Clock) -> Sp<expr::Expr> {
    mk(expr::Kind::Var(local(name)), int_ty(), clk)
}

/// `last name`
#[must_use]
pub fn last(name: &str) -> Sp<expr::Expr> {
    mk(expr::Kind::Last(local(name)), int_ty(), clock::Clock::base())
}

/// `(a, b, ...)`, on the clock of its first element.
#[must_use]
pub fn tuple(items: Vec<Sp<expr::Expr>>) -> Sp<expr::Expr> {
    let ty = ty::Ty::Tuple(items.iter().map(|e| e.t.ty.clone()).collect());
    let clk = items
        .first()
        .map_or_else(clock::Clock::base, |e| e.t.clk.clone());
    mk(expr::Kind::Tuple(sp(items.into())), ty, clk)
}

/// `lhs op rhs`
#[must_use]
pub fn bin(op: op::Bin, lhs: Sp<expr::Expr>, rhs: Sp<expr::Expr>) -> Sp<expr::Expr> {
    let ty = lhs.t.ty.clone();
    let clk = lhs.t.clk.clone();
    mk(
        expr::Kind::Bin {
            op,
            lhs: lhs.boxed(),
            rhs: rhs.boxed(),
        },
        ty,
        clk,
    )
}

/// `lhs + rhs`
#[must_use]
pub fn add(lhs: Sp<expr::Expr>, rhs: Sp<expr::Expr>) -> Sp<expr::Expr> {
    bin(op::Bin::Add, lhs, rhs)
}

/// `lhs op rhs` for a comparison.
#[must_use]
pub fn cmp(op: op::Cmp, lhs: Sp<expr::Expr>, rhs: Sp<expr::Expr>) -> Sp<expr::Expr> {
    let clk = lhs.t.clk.clone();
    mk(
        expr::Kind::Cmp {
            op,
            lhs: lhs.boxed(),
            rhs: rhs.boxed(),
        },
        bool_ty(),
        clk,
    )
}

/// `not inner`
#[must_use]
pub fn not(inner: Sp<expr::Expr>) -> Sp<expr::Expr> {
    let clk = inner.t.clk.clone();
    mk(
        expr::Kind::Un {
            op: op::Un::Not,
            inner: inner.boxed(),
        },
        bool_ty(),
        clk,
    )
}

/// `init fby next`
#[must_use]
pub fn fby(init: i64, next: Sp<expr::Expr>) -> Sp<expr::Expr> {
    let ty = next.t.ty.clone();
    let clk = next.t.clk.clone();
    mk(
        expr::Kind::Fby {
            init: Some(sp(expr::Lit::Int(init))),
            next: next.boxed(),
        },
        ty,
        clk,
    )
}

/// `pre next`
#[must_use]
pub fn pre(next: Sp<expr::Expr>) -> Sp<expr::Expr> {
    let ty = next.t.ty.clone();
    let clk = next.t.clk.clone();
    mk(
        expr::Kind::Fby {
            init: None,
            next: next.boxed(),
        },
        ty,
        clk,
    )
}

/// `inner when tag(ck)`
#[must_use]
pub fn when(inner: Sp<expr::Expr>, tag: &str, ck: &str) -> Sp<expr::Expr> {
    let ty = inner.t.ty.clone();
    let lin = inner.t.lin;
    let clk = inner.t.clk.clone().on(self::tag(tag).t, local(ck).t);
    let mut e = mk(
        expr::Kind::When {
            inner: inner.boxed(),
            tag: self::tag(tag),
            var: local(ck),
        },
        ty,
        clk,
    );
    e.t.lin = lin;
    e
}

/// `merge ck (T1 -> e1) (T2 -> e2) ...`
///
/// The clock is the parent of the clock of the first arm.
#[must_use]
pub fn merge(ck: &str, arms: Vec<(&str, Sp<expr::Expr>)>) -> Sp<expr::Expr> {
    let (ty, clk) = arms.first().map_or_else(
        || (int_ty(), clock::Clock::base()),
        |(_, e)| (e.t.ty.clone(), e.t.clk.clone().parent()),
    );
    let arms = arms
        .into_iter()
        .map(|(t, body)| expr::Branch { tag: tag(t), body })
        .collect();
    mk(
        expr::Kind::Merge {
            switch: local(ck),
            arms,
        },
        ty,
        clk,
    )
}

/// `if cond then yes else no`
#[must_use]
pub fn ifx(cond: Sp<expr::Expr>, yes: Sp<expr::Expr>, no: Sp<expr::Expr>) -> Sp<expr::Expr> {
    let ty = yes.t.ty.clone();
    let clk = cond.t.clk.clone();
    mk(
        expr::Kind::Ifx {
            cond: cond.boxed(),
            yes: yes.boxed(),
            no: no.boxed(),
        },
        ty,
        clk,
    )
}

/// Assemble a call.
fn mk_call(
    node: &str,
    args: Vec<Sp<expr::Expr>>,
    reset: Option<&str>,
    ty: ty::Ty,
) -> Sp<expr::Expr> {
    let clk = args
        .first()
        .map_or_else(clock::Clock::base, |e| e.t.clk.clone());
    mk(
        expr::Kind::Call {
            node: sp(var::NodeName {
                repr: node.to_owned(),
            }),
            args: sp(args.into()),
            reset: reset.map(local),
        },
        ty,
        clk,
    )
}

/// `node(args)` with one output.
#[must_use]
pub fn call(node: &str, args: Vec<Sp<expr::Expr>>) -> Sp<expr::Expr> {
    mk_call(node, args, None, int_ty())
}

/// `node(args)` with `n` outputs.
#[must_use]
pub fn call_n(node: &str, args: Vec<Sp<expr::Expr>>, n: usize) -> Sp<expr::Expr> {
    let ty = ty::Ty::Tuple((0..n).map(|_| int_ty()).collect());
    mk_call(node, args, None, ty)
}

/// `node(args) every reset`
#[must_use]
pub fn call_every(node: &str, args: Vec<Sp<expr::Expr>>, reset: &str) -> Sp<expr::Expr> {
    mk_call(node, args, Some(reset), int_ty())
}

/// `[a, b, ...]`
#[must_use]
pub fn array(items: Vec<Sp<expr::Expr>>) -> Sp<expr::Expr> {
    let elem = items.first().map_or_else(int_ty, |e| e.t.ty.clone());
    let clk = items
        .first()
        .map_or_else(clock::Clock::base, |e| e.t.clk.clone());
    let ty = ty::Ty::Array {
        elem: Box::new(elem),
        len: items.len(),
    };
    mk(expr::Kind::Array(sp(items.into())), ty, clk)
}

/// `array[index]`
#[must_use]
pub fn index(array: Sp<expr::Expr>, index: Sp<expr::Expr>) -> Sp<expr::Expr> {
    let ty = match &array.t.ty {
        ty::Ty::Array { elem, .. } => (**elem).clone(),
        _ => int_ty(),
    };
    let clk = array.t.clk.clone();
    mk(
        expr::Kind::Index {
            array: array.boxed(),
            index: index.boxed(),
        },
        ty,
        clk,
    )
}

/// `{ f1 = e1; f2 = e2 }` of a record type named `name`.
#[must_use]
pub fn record(name: &str, fields: Vec<(&str, Sp<expr::Expr>)>) -> Sp<expr::Expr> {
    let clk = fields
        .first()
        .map_or_else(clock::Clock::base, |(_, e)| e.t.clk.clone());
    let fields = fields
        .into_iter()
        .map(|(f, value)| expr::FieldInit {
            name: sp(f.to_owned()),
            value,
        })
        .collect();
    mk(
        expr::Kind::Record(fields),
        ty::Ty::Record(name.to_owned()),
        clk,
    )
}

/// `inner.name`
#[must_use]
pub fn field(inner: Sp<expr::Expr>, name: &str) -> Sp<expr::Expr> {
    let clk = inner.t.clk.clone();
    mk(
        expr::Kind::Field {
            inner: inner.boxed(),
            name: sp(name.to_owned()),
        },
        int_ty(),
        clk,
    )
}

/// `name = source;`
#[must_use]
pub fn eq(name: &str, source: Sp<expr::Expr>) -> Sp<stmt::Statement> {
    sp(stmt::Statement::Let {
        target: sp(stmt::VarTuple::Single(local(name))),
        source,
    })
}

/// `(n1, n2, ...) = source;`
#[must_use]
pub fn eqs(names: &[&str], source: Sp<expr::Expr>) -> Sp<stmt::Statement> {
    let targets = names
        .iter()
        .map(|n| sp(stmt::VarTuple::Single(local(n))))
        .collect();
    sp(stmt::Statement::Let {
        target: sp(stmt::VarTuple::Multiple(sp(targets))),
        source,
    })
}

/// `assert e;`
#[must_use]
pub fn assert(e: Sp<expr::Expr>) -> Sp<stmt::Statement> {
    sp(stmt::Statement::Assert(e))
}

/// A block of statements.
#[must_use]
pub fn block(stmts: Vec<Sp<stmt::Statement>>) -> Sp<stmt::Block> {
    sp(stmt::Block { stmts })
}

/// `switch selector | T1 => { .. } | T2 => { .. } end;`
#[must_use]
pub fn switch(
    selector: Sp<expr::Expr>,
    arms: Vec<(&str, Vec<Sp<stmt::Statement>>)>,
) -> Sp<stmt::Statement> {
    let arms = arms
        .into_iter()
        .map(|(t, stmts)| stmt::Arm {
            tag: tag(t),
            body: block(stmts),
        })
        .collect();
    sp(stmt::Statement::Switch { selector, arms })
}

/// `present | c1 => { .. } | c2 => { .. } default => { .. } end;`
#[must_use]
pub fn present(
    handlers: Vec<(Sp<expr::Expr>, Vec<Sp<stmt::Statement>>)>,
    default: Vec<Sp<stmt::Statement>>,
) -> Sp<stmt::Statement> {
    let handlers = handlers
        .into_iter()
        .map(|(cond, stmts)| stmt::Handler {
            cond,
            body: block(stmts),
        })
        .collect();
    sp(stmt::Statement::Present {
        handlers,
        default: block(default),
    })
}

/// One state of an automaton, with its strong (`unless`) and
/// weak (`until`) transitions given as pairs of a condition and a target.
#[must_use]
pub fn state(
    name: &str,
    unless: Vec<(Sp<expr::Expr>, &str)>,
    stmts: Vec<Sp<stmt::Statement>>,
    until: Vec<(Sp<expr::Expr>, &str)>,
) -> stmt::State {
    stmt::State {
        name: tag(name),
        body: block(stmts),
        until: escapes(until),
        unless: escapes(unless),
    }
}

/// Transitions of a state.
fn escapes(v: Vec<(Sp<expr::Expr>, &str)>) -> Vec<stmt::Escape> {
    v.into_iter()
        .map(|(cond, target)| stmt::Escape {
            cond,
            target: tag(target),
        })
        .collect()
}

/// `automaton | S1 -> .. | S2 -> .. end;`
#[must_use]
pub fn automaton(states: Vec<stmt::State>) -> Sp<stmt::Statement> {
    sp(stmt::Statement::Automaton { states })
}

/// `reset { .. } every cond;`
#[must_use]
pub fn reset(stmts: Vec<Sp<stmt::Statement>>, cond: Sp<expr::Expr>) -> Sp<stmt::Statement> {
    sp(stmt::Statement::Reset {
        body: block(stmts),
        cond,
    })
}

/// `name: int` on the base clock.
#[must_use]
pub fn ty_var(name: &str) -> Sp<decl::TyVar> {
    ty_var_on(name, clock::Clock::base())
}

/// `name: int :: clk`
#[must_use]
pub fn ty_var_on(name: &str, clk: clock::Clock) -> Sp<decl::TyVar> {
    sp(decl::TyVar {
        name: local(name),
        ty: sp(int_ty()),
        clk: sp(clk),
    })
}

/// Declarations of `int`s on the base clock.
#[must_use]
pub fn vars(names: &[&str]) -> Sp<Tuple<Sp<decl::TyVar>>> {
    sp(names.iter().map(|n| ty_var(n)).collect())
}

/// A node with default options and no contract.
#[must_use]
pub fn node(
    name: &str,
    inputs: &[&str],
    outputs: &[&str],
    locals: &[&str],
    stmts: Vec<Sp<stmt::Statement>>,
) -> Sp<decl::Node> {
    sp(decl::Node {
        name: sp(var::NodeName {
            repr: name.to_owned(),
        }),
        options: options::Node::default(),
        inputs: vars(inputs),
        outputs: vars(outputs),
        locals: vars(locals),
        contract: None,
        stmts,
    })
}

/// A contract.
#[must_use]
pub fn contract(
    locals: &[&str],
    stmts: Vec<Sp<stmt::Statement>>,
    assume: Sp<expr::Expr>,
    enforce: Sp<expr::Expr>,
) -> Sp<decl::Contract> {
    sp(decl::Contract {
        locals: vars(locals),
        stmts,
        assume,
        enforce,
    })
}

/// `extern node name(inputs) returns (outputs);`
#[must_use]
pub fn ext_node(name: &str, inputs: &[&str], outputs: &[&str]) -> Sp<decl::ExtNode> {
    sp(decl::ExtNode {
        name: sp(var::NodeName {
            repr: name.to_owned(),
        }),
        inputs: vars(inputs),
        outputs: vars(outputs),
    })
}

/// Wrap a node as a declaration.
#[must_use]
pub fn decl(node: Sp<decl::Node>) -> Sp<decl::Decl> {
    sp(decl::Decl::Node(node))
}

/// Wrap an extern node as a declaration.
#[must_use]
pub fn ext_decl(node: Sp<decl::ExtNode>) -> Sp<decl::Decl> {
    sp(decl::Decl::ExtNode(node))
}

/// A whole program.
#[must_use]
pub fn prog(decls: Vec<Sp<decl::Decl>>) -> Sp<decl::Prog> {
    sp(decl::Prog { decls })
}
