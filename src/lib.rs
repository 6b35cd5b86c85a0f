//! Middle-end driver of the Girandole suite.
//!
//! Takes a typed and clocked program and runs, in order, normalization,
//! the causality check and scheduling on every node.
//! Errors and warnings are collected in an `EAccum`; the program is only
//! handed back if no fatal error was found.
//!
//! ```
//! use girandole::{compile, Config};
//! use girandole_err::EAccum;
//! use girandole_san::build::*;
//!
//! let count = node(
//!     "count",
//!     &[],
//!     &["n"],
//!     &[],
//!     vec![eq("n", fby(0, add(var("n"), int(1))))],
//! );
//! let mut eaccum = EAccum::default();
//! let prog = compile(&mut eaccum, &Config::default(), prog(vec![decl(count)]));
//! assert!(prog.is_some());
//! assert!(!eaccum.is_fatal());
//! ```

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

mod pipeline;

use girandole_err::EAccum;
use girandole_san::ast::decl;
use girandole_san::causality::Policy;
use girandole_san::sp::Sp;

/// Settings of a compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Keep checking the causality of the remaining nodes after one of them
    /// fails, so that all errors are reported at once.
    pub keep_going: bool,
}

impl Config {
    /// What the causality check does after a failure.
    #[must_use]
    pub fn policy(&self) -> Policy {
        if self.keep_going {
            Policy::KeepGoing
        } else {
            Policy::StopAtFirst
        }
    }
}

/// Apply all compiler passes.
///
/// # Errors
/// Returns `None` if a fatal error was recorded in `eaccum`,
/// which then contains the diagnostics.
pub fn compile(
    eaccum: &mut EAccum,
    config: &Config,
    prog: Sp<decl::Prog>,
) -> Option<Sp<decl::Prog>> {
    // Just let the trait impls from [pipeline] guide you...
    let prog = pipeline::CompilerPass::new(prog)
        .finish()
        .apply(eaccum, config)?
        .finish()
        .apply(eaccum, config)?
        .finish()
        .apply(eaccum, config)?
        .finish()
        .done();
    log::debug!("Middle-end done with {} warning(s)", eaccum.warnings().len());
    Some(prog)
}

#[cfg(test)]
mod test {
    use super::{compile, Config};
    use girandole_err::{EAccum, Kind};
    use girandole_san::ast::decl;
    use girandole_san::build::*;

    fn names(p: &decl::Prog) -> Vec<String> {
        p.decls
            .iter()
            .map(|d| match &d.t {
                decl::Decl::Node(n) => n.t.name.to_string(),
                decl::Decl::ExtNode(n) => n.t.name.to_string(),
            })
            .collect()
    }

    fn body(p: &decl::Prog, idx: usize) -> Vec<String> {
        match &p.decls[idx].t {
            decl::Decl::Node(n) => n.t.stmts.iter().map(ToString::to_string).collect(),
            decl::Decl::ExtNode(_) => vec![],
        }
    }

    #[test]
    fn whole_pipeline() {
        let main = node(
            "main",
            &["a"],
            &["y"],
            &["x"],
            vec![
                eq("y", call("incr", vec![add(var("x"), int(1))])),
                eq("x", fby(0, var("a"))),
            ],
        );
        let incr = ext_node("incr", &["i"], &["o"]);
        let mut eaccum = EAccum::default();
        let p = compile(
            &mut eaccum,
            &Config::default(),
            prog(vec![decl(main), ext_decl(incr)]),
        )
        .unwrap();
        assert_eq!(names(&p.t), vec!["main", "incr"]);
        assert_eq!(
            body(&p.t, 0),
            vec!["_aux0 = (x + 1);", "y = incr(_aux0);", "x = (0 fby a);"]
        );
        assert!(eaccum.warnings().is_empty());
    }

    #[test]
    fn causality_error_stops_compilation() {
        let bad = |name: &str| {
            node(
                name,
                &["a"],
                &["x"],
                &[],
                vec![eq("x", add(var("x"), var("a")))],
            )
        };
        let p = prog(vec![decl(bad("f")), decl(bad("g"))]);

        let mut eaccum = EAccum::default();
        assert!(compile(&mut eaccum, &Config::default(), p.clone()).is_none());
        assert_eq!(eaccum.errors().len(), 1);
        assert_eq!(eaccum.errors()[0].kind, Kind::Causality);

        let mut eaccum = EAccum::default();
        assert!(compile(&mut eaccum, &Config { keep_going: true }, p).is_none());
        assert_eq!(eaccum.errors().len(), 2);
    }
}
