//! Middle-end of Girandole: from a typed and clocked program to one whose
//! node bodies are normalized, causal, and scheduled.
//!
//! The entry point for this entire crate is an `ast::decl::Prog` produced
//! upstream with every expression annotated by its type, clock and
//! linearity. You should then do the following in exactly that order
//! (each step assumes that the previous one completed without errors)
//!
//! 1. Normalization
//!     by `normalize::Normalize`
//!
//!     (introduces fresh local variables so that calls, delays and merges
//!     only appear at the root of equations with simple operands)
//!
//! 2. Causality
//!     by `causality::Causality`
//!
//!     (rejects instantaneous dependency cycles and variables that are not
//!     defined exactly once)
//!
//! 3. Scheduling
//!     by `schedule::Schedule`
//!
//!     (reorders the statements of every block, grouping statements by
//!     clock where possible)
//!
//! Normalization and scheduling take `&mut` and transform in place, while
//! causality consumes the program and gives it back once it is verified.
//! The `usage` and `depends` modules provide the analyses that these
//! passes share, and `build` has terse constructors for tests.

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

/// Bounds-checked indexing that aborts with the offending index.
/// `at!(v, i)` borrows `v[i]` and `at!(mut v, i)` borrows it mutably.
macro_rules! at {
    ( $arr:expr, $idx:expr ) => {{
        let arr = &$arr;
        let idx: usize = $idx;
        match arr.get(idx) {
            Some(val) => val,
            None => {
                girandole_err::abort!("Index {} out of bounds for length {}", idx, arr.len())
            }
        }
    }};
    ( mut $arr:expr, $idx:expr ) => {{
        let arr = &mut $arr;
        let idx: usize = $idx;
        let len = arr.len();
        match arr.get_mut(idx) {
            Some(val) => val,
            None => {
                girandole_err::abort!("Index {} out of bounds for length {}", idx, len)
            }
        }
    }};
}

pub mod ast;
pub mod build;
pub mod causality;
pub mod depends;
pub mod normalize;
pub mod schedule;
pub mod sp;
pub mod usage;

#[cfg(test)]
use proptest as _;
