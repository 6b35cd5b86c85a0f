//! Located values.
//!
//! Every node of the AST carries the location it was written at, so that
//! a diagnostic raised by any pass can point back to the source even after
//! normalization has moved things around. Locations are `Transparent`,
//! so `Sp<T>` compares and hashes exactly like `T`.

use std::fmt;

use girandole_err as err;
pub use err::Span;

/// A `T` together with where it comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sp<T> {
    /// The value.
    pub t: T,
    /// Its location.
    pub span: Span,
}

impl<T> err::TrySpan for Sp<T> {
    fn try_span(&self) -> Option<Span> {
        Some(self.span)
    }
}

impl<T> Sp<T> {
    /// Attach a location.
    pub fn new(t: T, span: Span) -> Self {
        Self { t, span }
    }

    /// Rewrite the value in place of the old one.
    /// The closure also receives the location, for building located children.
    pub fn map<U, F>(self, f: F) -> Sp<U>
    where
        F: FnOnce(Span, T) -> U,
    {
        let span = self.span;
        Sp::new(f(span, self.t), span)
    }

    /// Box the value, for recursive AST nodes.
    pub fn boxed(self) -> Sp<Box<T>> {
        self.map(|_, t| Box::new(t))
    }
}

impl<T> Sp<Box<T>> {
    /// Inverse of `boxed`.
    pub fn unboxed(self) -> Sp<T> {
        self.map(|_, t| *t)
    }
}

impl<T> Sp<Option<T>> {
    /// Lift a fallible rewrite out of the location.
    pub fn transpose(self) -> Option<Sp<T>> {
        let span = self.span;
        self.t.map(|t| Sp::new(t, span))
    }
}

impl<T: fmt::Display> fmt::Display for Sp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.t.fmt(f)
    }
}
