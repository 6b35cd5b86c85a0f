//! Error accumulator and prebuilt diagnostics of the Girandole suite.
//!
//! Every pass takes an `&mut EAccum` and returns an `Option<T>`:
//! a `None` always means that at least one fatal error was recorded
//! in the accumulator, and the caller should propagate it with `?`.
//! Warnings never interrupt a pass.
//!
//! Internal defects (broken invariants of the compiler itself, as opposed
//! to errors in the program being compiled) are not recorded here:
//! they panic through `abort!`, `consistency!`, or `malformed!`.

#![warn(
    missing_docs,
    unused_crate_dependencies,
    unused_macro_rules,
    variant_size_differences,
    clippy::allow_attributes_without_reason,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_docs_in_private_items,
    clippy::multiple_inherent_impl,
    clippy::pedantic,
    clippy::str_to_string,
    clippy::unreachable,
    clippy::unwrap_used,
    clippy::use_debug
)]

use std::fmt;

mod error;
mod transparent;

pub use error::*;
pub use transparent::Transparent;

/// Location in the source code.
///
/// Spans are only ever relevant for diagnostics, so they are wrapped in
/// a `Transparent` that makes them invisible to comparisons and hashing.
pub type Span = Transparent<proc_macro2::Span>;

/// Error accumulator.
pub type Acc = EAccum;

/// Result of a pass: `None` means that a fatal error was recorded.
pub type Result<T> = Option<T>;

/// Generate a string that contains the location of the invocation.
/// Mostly useful in combination with `Transparent::forge`.
#[macro_export]
macro_rules! here {
    () => {
        concat!(file!(), ":", line!(), ":", column!())
    };
}

/// Abort the compiler because of an internal defect.
/// This is never the fault of the program being compiled.
#[macro_export]
macro_rules! abort {
    ($($err:tt)*) => {{
        std::panic!(
            "\n    Girandole panicked: \x1b[1;31m{}\x1b[0m\n    at {}\n    This is an internal defect of the compiler, please report it.",
            format!($($err)*),
            $crate::here!(),
        )
    }};
}

/// Abort if the condition does not hold.
#[macro_export]
macro_rules! consistency {
    ($cond:expr, $($err:tt)*) => {{
        if !$cond {
            $crate::abort!($($err)*);
        }
    }};
}

/// Abort because some construct that should have been eliminated
/// earlier was encountered.
#[macro_export]
macro_rules! malformed {
    () => {{
        $crate::abort!("Entered unreachable code");
    }};
}

/// Broad category of a diagnostic, so that drivers can decide
/// how to react without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A variable depends on itself within one reactive step.
    Causality,
    /// A variable is defined twice, redefines an input, or is never defined.
    Definition,
    /// A suspicious construct that is still accepted.
    Unused,
    /// Anything else.
    Other,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Causality => write!(f, "causality cycle"),
            Self::Definition => write!(f, "definition error"),
            Self::Unused => write!(f, "unused item"),
            Self::Other => write!(f, "error"),
        }
    }
}

/// One fully constructed diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// What went wrong, broadly.
    pub kind: Kind,
    /// Messages and their optional locations, in display order.
    pub elements: Error,
}

impl Diagnostic {
    /// The messages without their locations.
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.elements.iter().map(|(msg, _)| msg.as_str()).collect()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for (msg, _) in &self.elements {
            write!(f, "\n  {msg}")?;
        }
        Ok(())
    }
}

/// Collect errors and warnings produced by all passes.
#[derive(Debug, Default)]
pub struct EAccum {
    /// Fatal errors.
    errs: Vec<Diagnostic>,
    /// Nonfatal warnings.
    warns: Vec<Diagnostic>,
}

impl EAccum {
    /// Record a fatal error.
    ///
    /// Always returns `None` so that `eaccum.error(...)?` is the idiomatic
    /// way of aborting a pass.
    pub fn error<T>(&mut self, e: impl IntoError) -> Option<T> {
        let kind = e.kind();
        self.errs.push(Diagnostic {
            kind,
            elements: e.into_err(),
        });
        None
    }

    /// Record a nonfatal warning.
    pub fn warning(&mut self, e: impl IntoError) {
        let kind = e.kind();
        self.warns.push(Diagnostic {
            kind,
            elements: e.into_err(),
        });
    }

    /// Record an ad-hoc fatal error of a given kind at a location.
    pub fn report<T>(&mut self, site: Span, what: impl fmt::Display, kind: Kind) -> Option<T> {
        self.error(Basic {
            kind,
            msg: what.to_string(),
            span: site,
        })
    }

    /// Whether at least one fatal error was recorded.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.errs.is_empty()
    }

    /// Errors recorded so far.
    #[must_use]
    pub fn errors(&self) -> &[Diagnostic] {
        &self.errs
    }

    /// Warnings recorded so far.
    #[must_use]
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warns
    }

    /// Consume the accumulator and get all errors and warnings.
    #[must_use]
    pub fn fetch(self) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
        (self.errs, self.warns)
    }
}
