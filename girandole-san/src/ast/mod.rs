//! Internal representation of a typed and clocked program.
//!
//! Every expression carries the annotations computed upstream by typing
//! and clock inference (its type, its clock, and whether it is linear),
//! and every piece of the tree carries a `Span` for diagnostics.
//!
//! Nothing here is specific to one pass: the same tree is normalized,
//! checked, and reordered in place by the passes of this crate.

use std::fmt;

pub mod options;

/// Comma-separated sequences, used for declarations, arguments, patterns,
/// and tuple types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tuple<T> {
    /// Internals, intended to be interpreted as comma-separated.
    elems: Vec<T>,
}

impl<T> Default for Tuple<T> {
    fn default() -> Self {
        Self {
            elems: Vec::default(),
        }
    }
}

impl<T> From<Vec<T>> for Tuple<T> {
    fn from(elems: Vec<T>) -> Self {
        Self { elems }
    }
}

impl<T> FromIterator<T> for Tuple<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            elems: iter.into_iter().collect(),
        }
    }
}

impl<T> Tuple<T> {
    /// Map a function by reference to a tuple.
    pub fn map_ref<F, U>(&self, f: F) -> Tuple<U>
    where
        F: FnMut(&T) -> U,
    {
        Tuple {
            elems: self.elems.iter().map(f).collect(),
        }
    }

    /// Map a function by value to a tuple.
    pub fn map<F, U>(self, f: F) -> Tuple<U>
    where
        F: FnMut(T) -> U,
    {
        Tuple {
            elems: self.elems.into_iter().map(f).collect(),
        }
    }

    /// Iterate over elements of the tuple.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elems.iter()
    }

    /// Iterate over elements of the tuple.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.elems.iter_mut()
    }

    /// Number of elements in the tuple.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    /// Whether this tuple is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Append to the tuple.
    pub fn push(&mut self, e: T) {
        self.elems.push(e);
    }

    /// Get one element.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.elems.get(idx)
    }
}

impl<T> IntoIterator for Tuple<T> {
    type Item = T;
    type IntoIter = <Vec<T> as IntoIterator>::IntoIter;
    fn into_iter(self) -> Self::IntoIter {
        self.elems.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Tuple<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.elems.iter()
    }
}

impl<T> fmt::Display for Tuple<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        let mut es = self.elems.iter();
        if let Some(e) = es.next() {
            write!(f, "{e}")?;
        }
        for e in es {
            write!(f, ", {e}")?;
        }
        write!(f, ")")
    }
}

/// Variables and node names.
pub mod var {
    use std::fmt;

    /// A local variable of a node (input, output, local, or fresh).
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Local {
        /// Variable name.
        pub repr: String,
    }

    impl fmt::Display for Local {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.repr)
        }
    }

    /// A node name (either for a declaration or for an invocation).
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct NodeName {
        /// Name of the node.
        pub repr: String,
    }

    impl fmt::Display for NodeName {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.repr)
        }
    }
}

/// Clocks: chains of sampling conditions rooted at the base clock.
pub mod clock {
    use std::fmt;

    use super::var;

    /// A constructor of an enumerated type, used as a sampling condition
    /// (`True`, `False`, `Red`, ...).
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct Tag {
        /// Constructor name.
        pub repr: String,
    }

    impl fmt::Display for Tag {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.repr)
        }
    }

    /// One sampling condition `on Tag(var)`.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct Sample {
        /// Value that `var` must have for the clock to be active.
        pub tag: Tag,
        /// Controlling variable.
        pub var: var::Local,
    }

    impl fmt::Display for Sample {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}({})", self.tag, self.var)
        }
    }

    /// A clock path, outermost sampling first.
    /// The empty path is the base clock of the node.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct Clock {
        /// Sampling conditions, the first one being the closest to the base clock.
        samples: Vec<Sample>,
    }

    impl Clock {
        /// The base clock.
        #[must_use]
        pub fn base() -> Self {
            Self::default()
        }

        /// Sample this clock further: `self on tag(var)`.
        #[must_use]
        pub fn on(mut self, tag: Tag, var: var::Local) -> Self {
            self.samples.push(Sample { tag, var });
            self
        }

        /// Remove the innermost sampling, e.g. to get the clock of a `merge`
        /// from the clock of one of its branches.
        #[must_use]
        pub fn parent(mut self) -> Self {
            self.samples.pop();
            self
        }

        /// Whether this is the base clock.
        #[must_use]
        pub fn is_base(&self) -> bool {
            self.samples.is_empty()
        }

        /// The sampling closest to the base clock.
        #[must_use]
        pub fn outermost(&self) -> Option<&Sample> {
            self.samples.first()
        }

        /// All controlling variables, outermost first.
        pub fn vars(&self) -> impl Iterator<Item = &var::Local> {
            self.samples.iter().map(|s| &s.var)
        }

        /// Two clock paths are joinable if one of them is the base clock
        /// or if their outermost samplings agree.
        /// Equations on joinable clocks can share the same control structure
        /// in generated code.
        #[must_use]
        pub fn joinable(&self, other: &Self) -> bool {
            match (self.outermost(), other.outermost()) {
                (Some(s1), Some(s2)) => s1 == s2,
                _ => true,
            }
        }
    }

    impl fmt::Display for Clock {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "base")?;
            for s in &self.samples {
                write!(f, " on {s}")?;
            }
            Ok(())
        }
    }
}

/// Types as computed upstream.
pub mod ty {
    use std::fmt;

    use super::Tuple;

    /// A scalar type.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub enum Base {
        /// `int`
        Int,
        /// `float`
        Float,
        /// `bool`
        Bool,
        /// A named enumerated type.
        Enum(String),
    }

    impl fmt::Display for Base {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Int => write!(f, "int"),
                Self::Float => write!(f, "float"),
                Self::Bool => write!(f, "bool"),
                Self::Enum(e) => write!(f, "{e}"),
            }
        }
    }

    /// Any type.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub enum Ty {
        /// A scalar.
        Base(Base),
        /// Product of types, e.g. the outputs of a node.
        Tuple(Tuple<Ty>),
        /// Fixed-size array.
        Array {
            /// Type of the elements.
            elem: Box<Ty>,
            /// Number of elements.
            len: usize,
        },
        /// A named record type.
        Record(String),
    }

    impl Ty {
        /// Components of a tuple type, or `None` for anything else.
        #[must_use]
        pub fn components(&self) -> Option<&Tuple<Ty>> {
            match self {
                Self::Tuple(tys) => Some(tys),
                _ => None,
            }
        }
    }

    impl fmt::Display for Ty {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Base(b) => write!(f, "{b}"),
                Self::Tuple(t) => write!(f, "{t}"),
                Self::Array { elem, len } => write!(f, "{elem}^{len}"),
                Self::Record(r) => write!(f, "{r}"),
            }
        }
    }

    /// Whether a value may be used several times.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub enum Linearity {
        /// Ordinary value.
        #[default]
        Shared,
        /// Value consumed at most once.
        Linear,
    }
}

/// Operators.
pub mod op {
    use std::fmt;

    /// A binary operator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Bin {
        /// `+`
        Add,
        /// `*`
        Mul,
        /// `-` (binary)
        Sub,
        /// `/`
        Div,
        /// `mod`
        Rem,
        /// `and`
        And,
        /// `or`
        Or,
    }

    impl fmt::Display for Bin {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Add => write!(f, "+"),
                Self::Mul => write!(f, "*"),
                Self::Sub => write!(f, "-"),
                Self::Div => write!(f, "/"),
                Self::Rem => write!(f, "mod"),
                Self::And => write!(f, "and"),
                Self::Or => write!(f, "or"),
            }
        }
    }

    /// A unary operator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Un {
        /// `-` (unary)
        Neg,
        /// `not`
        Not,
    }

    impl fmt::Display for Un {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Neg => write!(f, "-"),
                Self::Not => write!(f, "not"),
            }
        }
    }

    /// A comparison operator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Cmp {
        /// `<=`
        Le,
        /// `>=`
        Ge,
        /// `<`
        Lt,
        /// `>`
        Gt,
        /// `=`
        Eq,
        /// `<>`
        Ne,
    }

    impl fmt::Display for Cmp {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Le => write!(f, "<="),
                Self::Ge => write!(f, ">="),
                Self::Lt => write!(f, "<"),
                Self::Gt => write!(f, ">"),
                Self::Eq => write!(f, "="),
                Self::Ne => write!(f, "<>"),
            }
        }
    }
}

/// Definitions of expressions.
pub mod expr {
    use std::fmt;

    use crate::ast::{clock, op, ty, var, Tuple};
    use crate::sp::Sp;

    /// A literal.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Lit {
        /// Integer literal `42`.
        Int(i64),
        /// Float literal `4.2`.
        Float(f64),
        /// Boolean literal `true`.
        Bool(bool),
        /// Constructor of an enumerated type `Red`.
        Tag(clock::Tag),
    }

    impl fmt::Display for Lit {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Int(i) => write!(f, "{i}"),
                Self::Float(x) if x.fract() == 0.0 => write!(f, "{x}.0"),
                Self::Float(x) => write!(f, "{x}"),
                Self::Bool(b) => write!(f, "{b}"),
                Self::Tag(t) => write!(f, "{t}"),
            }
        }
    }

    /// One arm `(Tag -> e)` of a `merge`.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Branch {
        /// Value of the selector for which this arm is active.
        pub tag: Sp<clock::Tag>,
        /// Contents, clocked on `tag`.
        pub body: Sp<Expr>,
    }

    /// One field `name = value` of a record construction.
    #[derive(Debug, Clone, PartialEq)]
    pub struct FieldInit {
        /// Field name.
        pub name: Sp<String>,
        /// Field value.
        pub value: Sp<Expr>,
    }

    /// The shape of an expression.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Kind {
        /// Literals `1.0`, `42`, `true`, ...
        Lit(Sp<Lit>),
        /// Current value of a variable `x`.
        Var(Sp<var::Local>),
        /// Value of a state variable at the end of the previous step `last x`.
        Last(Sp<var::Local>),
        /// Tuples `(1, 2.0, x)`.
        Tuple(Sp<Tuple<Sp<Expr>>>),
        /// Application of a binary operator `a + b`.
        Bin {
            /// Binary operator (e.g. `+`).
            op: op::Bin,
            /// Left-hand-side (e.g. `a`).
            lhs: Sp<Box<Expr>>,
            /// Right-hand-side (e.g. `b`).
            rhs: Sp<Box<Expr>>,
        },
        /// Application of a unary operator `not b`.
        Un {
            /// Unary operator (e.g. `not`).
            op: op::Un,
            /// Contents (e.g. `b`).
            inner: Sp<Box<Expr>>,
        },
        /// Application of a comparison function `a <> b`.
        Cmp {
            /// Comparison operator (e.g. `<>`).
            op: op::Cmp,
            /// Left-hand-side (e.g. `a`).
            lhs: Sp<Box<Expr>>,
            /// Right-hand-side (e.g. `b`).
            rhs: Sp<Box<Expr>>,
        },
        /// Delay: `init fby next`, or `pre next` when there is no `init`.
        Fby {
            /// Value of the first instant.
            init: Option<Sp<Lit>>,
            /// Expression whose previous value is produced.
            next: Sp<Box<Expr>>,
        },
        /// Sampling `e when Tag(x)`.
        When {
            /// Expression being sampled.
            inner: Sp<Box<Expr>>,
            /// Tag that `var` must have.
            tag: Sp<clock::Tag>,
            /// Controlling variable.
            var: Sp<var::Local>,
        },
        /// Combination of complementary streams `merge x (T -> a) (F -> b)`.
        Merge {
            /// Selector variable.
            switch: Sp<var::Local>,
            /// One arm per tag.
            arms: Vec<Branch>,
        },
        /// A conditional expression `if b then x else y`, both branches being
        /// evaluated.
        Ifx {
            /// Boolean condition.
            cond: Sp<Box<Expr>>,
            /// Evaluate if the condition holds.
            yes: Sp<Box<Expr>>,
            /// Evaluate if the condition does not hold.
            no: Sp<Box<Expr>>,
        },
        /// Instantiation of a node `f(a, b) every r`.
        Call {
            /// Node being called.
            node: Sp<var::NodeName>,
            /// Arguments.
            args: Sp<Tuple<Sp<Expr>>>,
            /// Variable that resets the state of the instance when true.
            reset: Option<Sp<var::Local>>,
        },
        /// Array construction `[a, b, c]`.
        Array(Sp<Tuple<Sp<Expr>>>),
        /// Array access `a[i]`.
        Index {
            /// Array.
            array: Sp<Box<Expr>>,
            /// Index.
            index: Sp<Box<Expr>>,
        },
        /// Record construction `{ x = a; y = b }`.
        Record(Vec<FieldInit>),
        /// Record access `r.x`.
        Field {
            /// Record.
            inner: Sp<Box<Expr>>,
            /// Field.
            name: Sp<String>,
        },
    }

    /// An annotated expression.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Expr {
        /// Shape and subexpressions.
        pub kind: Kind,
        /// Type computed upstream.
        pub ty: ty::Ty,
        /// Clock computed upstream.
        pub clk: clock::Clock,
        /// Whether the value is linear.
        pub lin: ty::Linearity,
    }

    impl Expr {
        /// Reference to a variable with the same annotations as `self`.
        #[must_use]
        pub fn as_var(&self, var: Sp<var::Local>) -> Self {
            Self {
                kind: Kind::Var(var),
                ty: self.ty.clone(),
                clk: self.clk.clone(),
                lin: self.lin,
            }
        }

        /// Whether the value may be consumed at most once.
        #[must_use]
        pub fn is_linear(&self) -> bool {
            self.lin == ty::Linearity::Linear
        }
    }

    impl fmt::Display for Branch {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "({} -> {})", self.tag, self.body)
        }
    }

    impl fmt::Display for Expr {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match &self.kind {
                Kind::Lit(l) => write!(f, "{l}"),
                Kind::Var(v) => write!(f, "{v}"),
                Kind::Last(v) => write!(f, "last {v}"),
                Kind::Tuple(t) => write!(f, "{t}"),
                Kind::Bin { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
                Kind::Un { op, inner } => write!(f, "({op} {inner})"),
                Kind::Cmp { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
                Kind::Fby {
                    init: Some(init),
                    next,
                } => write!(f, "({init} fby {next})"),
                Kind::Fby { init: None, next } => write!(f, "(pre {next})"),
                Kind::When { inner, tag, var } => write!(f, "({inner} when {tag}({var}))"),
                Kind::Merge { switch, arms } => {
                    write!(f, "(merge {switch}")?;
                    for arm in arms {
                        write!(f, " {arm}")?;
                    }
                    write!(f, ")")
                }
                Kind::Ifx { cond, yes, no } => write!(f, "(if {cond} then {yes} else {no})"),
                Kind::Call {
                    node,
                    args,
                    reset: None,
                } => write!(f, "{node}{args}"),
                Kind::Call {
                    node,
                    args,
                    reset: Some(r),
                } => write!(f, "({node}{args} every {r})"),
                Kind::Array(items) => {
                    write!(f, "[")?;
                    for (i, e) in items.t.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{e}")?;
                    }
                    write!(f, "]")
                }
                Kind::Index { array, index } => write!(f, "{array}[{index}]"),
                Kind::Record(fields) => {
                    write!(f, "{{")?;
                    for (i, fi) in fields.iter().enumerate() {
                        if i > 0 {
                            write!(f, ";")?;
                        }
                        write!(f, " {} = {}", fi.name, fi.value)?;
                    }
                    write!(f, " }}")
                }
                Kind::Field { inner, name } => write!(f, "{inner}.{name}"),
            }
        }
    }
}

/// Statements and control constructs.
pub mod stmt {
    use std::fmt;

    use crate::ast::{clock, expr, var, Tuple};
    use crate::sp::Sp;

    /// The target of an assignment `(x, y, z) = ...`.
    /// May be abritrarily nested.
    #[derive(Debug, Clone, PartialEq)]
    pub enum VarTuple {
        /// End of the recursion through a single variable.
        Single(Sp<var::Local>),
        /// Comma-separated tuple.
        Multiple(Sp<Tuple<Sp<VarTuple>>>),
    }

    impl VarTuple {
        /// All variables of the pattern, left to right.
        pub fn vars(&self) -> Vec<&Sp<var::Local>> {
            let mut acc = Vec::new();
            self.collect_vars(&mut acc);
            acc
        }

        /// Helper for `vars`.
        fn collect_vars<'a>(&'a self, acc: &mut Vec<&'a Sp<var::Local>>) {
            match self {
                Self::Single(v) => acc.push(v),
                Self::Multiple(vs) => {
                    for v in vs.t.iter() {
                        v.t.collect_vars(acc);
                    }
                }
            }
        }
    }

    impl fmt::Display for VarTuple {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Single(v) => write!(f, "{v}"),
                Self::Multiple(vs) => write!(f, "{vs}"),
            }
        }
    }

    /// A sequence of statements that execute in parallel.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Block {
        /// Statements, in no particular order until scheduled.
        pub stmts: Vec<Sp<Statement>>,
    }

    /// One arm `| Tag => block` of a `switch`.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Arm {
        /// Value of the selector for which this arm is active.
        pub tag: Sp<clock::Tag>,
        /// Contents.
        pub body: Sp<Block>,
    }

    /// One handler `| cond => block` of a `present`.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Handler {
        /// Boolean condition, the first one that holds is selected.
        pub cond: Sp<expr::Expr>,
        /// Contents.
        pub body: Sp<Block>,
    }

    /// A transition `if cond then State` of an automaton.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Escape {
        /// Boolean condition.
        pub cond: Sp<expr::Expr>,
        /// State to go to.
        pub target: Sp<clock::Tag>,
    }

    /// A state of an automaton.
    #[derive(Debug, Clone, PartialEq)]
    pub struct State {
        /// State name.
        pub name: Sp<clock::Tag>,
        /// Contents, active while in this state.
        pub body: Sp<Block>,
        /// Weak transitions, evaluated after `body` and effective at the
        /// next step.
        pub until: Vec<Escape>,
        /// Strong transitions, evaluated at the beginning of the step
        /// before choosing which `body` to execute.
        pub unless: Vec<Escape>,
    }

    /// A statement.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Statement {
        /// Equation `x = ...`
        Let {
            /// Variable tuple for destructuring the assignment.
            target: Sp<VarTuple>,
            /// Expression to compute.
            source: Sp<expr::Expr>,
        },
        /// Perform an assertion.
        Assert(Sp<expr::Expr>),
        /// Case analysis on the value of an expression.
        Switch {
            /// Expression that selects the active arm.
            selector: Sp<expr::Expr>,
            /// Mutually exclusive arms.
            arms: Vec<Arm>,
        },
        /// Case analysis on a sequence of conditions.
        Present {
            /// Handlers, tried in order.
            handlers: Vec<Handler>,
            /// Active if no condition holds.
            default: Sp<Block>,
        },
        /// Hierarchical state machine.
        Automaton {
            /// States, the first one being the initial state.
            states: Vec<State>,
        },
        /// Reinitialize the state of a block.
        Reset {
            /// Contents.
            body: Sp<Block>,
            /// Reset when this holds.
            cond: Sp<expr::Expr>,
        },
    }

    impl Statement {
        /// Whether this statement is a control construct with nested blocks.
        #[must_use]
        pub fn is_construct(&self) -> bool {
            !matches!(self, Self::Let { .. } | Self::Assert(_))
        }
    }

    impl fmt::Display for Block {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{{")?;
            for s in &self.stmts {
                write!(f, " {s}")?;
            }
            write!(f, " }}")
        }
    }

    impl fmt::Display for Escape {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "if {} then {}", self.cond, self.target)
        }
    }

    impl fmt::Display for Statement {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Let { target, source } => write!(f, "{target} = {source};"),
                Self::Assert(e) => write!(f, "assert {e};"),
                Self::Switch { selector, arms } => {
                    write!(f, "switch {selector}")?;
                    for arm in arms {
                        write!(f, " | {} => {}", arm.tag, arm.body)?;
                    }
                    write!(f, " end;")
                }
                Self::Present { handlers, default } => {
                    write!(f, "present")?;
                    for h in handlers {
                        write!(f, " | {} => {}", h.cond, h.body)?;
                    }
                    write!(f, " default => {default} end;")
                }
                Self::Automaton { states } => {
                    write!(f, "automaton")?;
                    for s in states {
                        write!(f, " | {} ->", s.name)?;
                        for esc in &s.unless {
                            write!(f, " unless {esc}")?;
                        }
                        write!(f, " {}", s.body)?;
                        for esc in &s.until {
                            write!(f, " until {esc}")?;
                        }
                    }
                    write!(f, " end;")
                }
                Self::Reset { body, cond } => write!(f, "reset {body} every {cond};"),
            }
        }
    }
}

/// Toplevel declarations.
pub mod decl {
    use std::fmt;

    use crate::ast::{clock, expr, options, stmt, ty, var, Tuple};
    use crate::sp::Sp;

    /// A typed and clocked variable declaration.
    #[derive(Debug, Clone, PartialEq)]
    pub struct TyVar {
        /// Name of the variable.
        pub name: Sp<var::Local>,
        /// Type of the variable.
        pub ty: Sp<ty::Ty>,
        /// Clock of the variable.
        pub clk: Sp<clock::Clock>,
    }

    impl fmt::Display for TyVar {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}: {}", self.name, self.ty)?;
            if !self.clk.t.is_base() {
                write!(f, " :: {}", self.clk)?;
            }
            Ok(())
        }
    }

    /// Specification attached to a node: `assume` constrains the inputs,
    /// `enforce` is guaranteed on the outputs. Both may be computed
    /// with auxiliary equations.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Contract {
        /// Variables private to the contract.
        pub locals: Sp<Tuple<Sp<TyVar>>>,
        /// Auxiliary equations.
        pub stmts: Vec<Sp<stmt::Statement>>,
        /// Hypothesis on the inputs.
        pub assume: Sp<expr::Expr>,
        /// Guarantee on the outputs.
        pub enforce: Sp<expr::Expr>,
    }

    /// A node declaration `node foo(x) returns (y); var z; let <body> tel`.
    #[derive(Debug, Clone)]
    pub struct Node {
        /// Public name of the node (`foo`).
        pub name: Sp<var::NodeName>,
        /// Options attached (in the form `#[...]`).
        pub options: options::Node,
        /// Input variables and types (`x`).
        pub inputs: Sp<Tuple<Sp<TyVar>>>,
        /// Output variables and types (`y`).
        pub outputs: Sp<Tuple<Sp<TyVar>>>,
        /// Local variables and types (`z`).
        pub locals: Sp<Tuple<Sp<TyVar>>>,
        /// Optional specification.
        pub contract: Option<Sp<Contract>>,
        /// Body of the node declaration (`<body>`).
        pub stmts: Vec<Sp<stmt::Statement>>,
    }

    impl Node {
        /// Every variable declared by the node or its contract.
        pub fn all_vars(&self) -> impl Iterator<Item = &Sp<TyVar>> {
            self.inputs
                .t
                .iter()
                .chain(self.outputs.t.iter())
                .chain(self.locals.t.iter())
                .chain(self.contract.iter().flat_map(|c| c.t.locals.t.iter()))
        }
    }

    impl fmt::Display for Node {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(
                f,
                "node {}{} returns {};",
                self.name, self.inputs, self.outputs
            )?;
            if let Some(contract) = &self.contract {
                let c = &contract.t;
                writeln!(f, "contract")?;
                if !c.locals.t.is_empty() {
                    writeln!(f, "  var {};", c.locals)?;
                }
                for s in &c.stmts {
                    writeln!(f, "  {s}")?;
                }
                writeln!(f, "  assume {};", c.assume)?;
                writeln!(f, "  enforce {};", c.enforce)?;
            }
            if !self.locals.t.is_empty() {
                writeln!(f, "var {};", self.locals)?;
            }
            writeln!(f, "let")?;
            for s in &self.stmts {
                writeln!(f, "  {s}")?;
            }
            write!(f, "tel")
        }
    }

    /// A trusted node declaration `extern node foo(x) returns (y);`.
    /// It does not have a body, and the rest of the program will
    /// assume that it is well-defined.
    #[derive(Debug, Clone)]
    pub struct ExtNode {
        /// Public name of the node (`foo`).
        pub name: Sp<var::NodeName>,
        /// Input variables and types (`x`).
        pub inputs: Sp<Tuple<Sp<TyVar>>>,
        /// Output variables and types (`y`).
        pub outputs: Sp<Tuple<Sp<TyVar>>>,
    }

    /// A toplevel declaration.
    #[derive(Debug, Clone)]
    pub enum Decl {
        /// `node foo() returns (); let tel`
        Node(Sp<Node>),
        /// `extern node foo() returns ();`
        ExtNode(Sp<ExtNode>),
    }

    /// A program is a sequence of declarations.
    #[derive(Debug, Clone)]
    pub struct Prog {
        /// Sequence of declarations.
        pub decls: Vec<Sp<Decl>>,
    }
}
