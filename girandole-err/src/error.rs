//! Prebuilt diagnostics.
//!
//! Each diagnostic is a `struct` whose fields fill in the blanks of its
//! messages, and whose `IntoError` implementation lays out the lines in
//! display order with the locations that go with them.

use std::fmt::Display;

use crate::{Kind, Span};

/// Lines of a diagnostic, each with an optional location.
pub type Error = Vec<(String, Option<Span>)>;

/// Turn a diagnostic into its lines.
#[expect(
    clippy::module_name_repetitions,
    reason = "The trait produces an `Error`"
)]
pub trait IntoError {
    /// Lines in display order.
    fn into_err(self) -> Error;
    /// Category of the diagnostic.
    fn kind(&self) -> Kind {
        Kind::Other
    }
}

/// Things that may point to a location in the source.
pub trait TrySpan {
    /// Location, if known. Defaults to none.
    fn try_span(&self) -> Option<Span> {
        None
    }
}

impl TrySpan for Span {
    fn try_span(&self) -> Option<Span> {
        Some(*self)
    }
}

impl<T: TrySpan + ?Sized> TrySpan for &T {
    fn try_span(&self) -> Option<Span> {
        (*self).try_span()
    }
}

impl<T: TrySpan> TrySpan for Option<T> {
    fn try_span(&self) -> Option<Span> {
        self.as_ref().and_then(TrySpan::try_span)
    }
}

impl TrySpan for str {}
impl TrySpan for String {}

/// Builder for the lines of an `Error`.
#[derive(Default)]
struct Lines(Error);

impl Lines {
    /// A line pointing at `site`, or at nothing if it has no location.
    fn at(mut self, msg: impl Display, site: &impl TrySpan) -> Self {
        self.0.push((msg.to_string(), site.try_span()));
        self
    }

    /// A line that is only worth showing if `site` has a location.
    fn at_known(mut self, msg: impl Display, site: &impl TrySpan) -> Self {
        if let Some(span) = site.try_span() {
            self.0.push((msg.to_string(), Some(span)));
        }
        self
    }

    /// A line without location.
    fn plain(mut self, msg: impl Display) -> Self {
        self.0.push((msg.to_string(), None));
        self
    }

    /// Finished diagnostic.
    fn done(self) -> Error {
        self.0
    }
}

/// An explicit message at a location, for `EAccum::report`.
pub struct Basic {
    /// Category.
    pub kind: Kind,
    /// Message.
    pub msg: String,
    /// Location.
    pub span: Span,
}

impl IntoError for Basic {
    fn into_err(self) -> Error {
        Lines::default().at(self.msg, &self.span).done()
    }
    fn kind(&self) -> Kind {
        self.kind
    }
}

/// Some variables of a node are needed to compute themselves within
/// one reaction.
pub struct CausalityCycle<N, E, Its> {
    /// Node whose body has the cycle.
    pub node: N,
    /// The effects that form the cycle, in source-like syntax.
    pub effects: E,
    /// Variables on the cycle.
    pub items: Its,
}

impl<N, E, Its, It> IntoError for CausalityCycle<N, E, Its>
where
    N: Display + TrySpan,
    E: Display,
    Its: IntoIterator<Item = It>,
    It: Display + TrySpan,
{
    fn into_err(self) -> Error {
        let node = &self.node;
        let mut lines = Lines::default()
            .at(
                format!("Causality error in {node}: some variables depend instantaneously on themselves"),
                node,
            )
            .plain(format!("The offending effects are `{}`", self.effects));
        for v in self.items {
            lines = lines.at(format!("{v} is part of the cycle"), &v);
        }
        lines.done()
    }
    fn kind(&self) -> Kind {
        Kind::Causality
    }
}

/// A local variable is computed but nothing reads it.
pub struct NeverRead<V, S> {
    /// The variable, where it is declared.
    pub var: V,
    /// The statement that computes it.
    pub site: S,
}

impl<V: Display + TrySpan, S: TrySpan> IntoError for NeverRead<V, S> {
    fn into_err(self) -> Error {
        Lines::default()
            .at(format!("Variable {} is never read", self.var), &self.var)
            .at_known("It is computed here", &self.site)
            .done()
    }
    fn kind(&self) -> Kind {
        Kind::Unused
    }
}

/// Two statements of the same block define one variable.
pub struct DefinedTwice<V, S, P> {
    /// The variable, in the second definition.
    pub var: V,
    /// The second defining statement.
    pub site: S,
    /// The first defining statement.
    pub prior: P,
}

impl<V: Display, S: TrySpan, P: TrySpan> IntoError for DefinedTwice<V, S, P> {
    fn into_err(self) -> Error {
        Lines::default()
            .at(format!("Variable {} is defined twice", self.var), &self.site)
            .at_known("First defined here", &self.prior)
            .done()
    }
    fn kind(&self) -> Kind {
        Kind::Definition
    }
}

/// A statement defines a variable that is given by the context.
pub struct InputDefined<V, S> {
    /// The input.
    pub var: V,
    /// The variable, in the statement that defines it.
    pub site: S,
}

impl<V: Display, S: TrySpan> IntoError for InputDefined<V, S> {
    fn into_err(self) -> Error {
        Lines::default()
            .at(
                format!("Variable {} is an input and cannot be defined", self.var),
                &self.site,
            )
            .done()
    }
    fn kind(&self) -> Kind {
        Kind::Definition
    }
}

/// An output or local has no defining statement.
pub struct Undefined<V> {
    /// The variable, where it is declared.
    pub var: V,
}

impl<V: Display + TrySpan> IntoError for Undefined<V> {
    fn into_err(self) -> Error {
        Lines::default()
            .at(
                format!("Variable {} is declared but never defined", self.var),
                &self.var,
            )
            .done()
    }
    fn kind(&self) -> Kind {
        Kind::Definition
    }
}

#[cfg(test)]
mod test {
    use super::{DefinedTwice, IntoError, Undefined};
    use crate::{here, Kind, Span, Transparent};

    #[test]
    fn unknown_locations_are_skipped() {
        let site: Span = Transparent::forge(here!());
        let e = DefinedTwice {
            var: "x",
            site,
            prior: None::<Span>,
        };
        assert_eq!(e.kind(), Kind::Definition);
        let lines = e.into_err();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, "Variable x is defined twice");
        assert!(lines[0].1.is_some());
    }

    #[test]
    fn strings_have_no_location() {
        let lines = Undefined {
            var: String::from("y"),
        }
        .into_err();
        assert_eq!(
            lines,
            vec![(String::from("Variable y is declared but never defined"), None)]
        );
    }
}
