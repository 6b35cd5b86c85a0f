//! Typed sequencing of the middle-end.
//!
//! The program is held by a `CompilerPass<Stage>`, and the only methods
//! available at each stage are the ones that lead to the next, so the
//! passes of `girandole_san` can only run as
//! `Typed -> Normalize -> Causality -> Schedule -> Done`.
//!
//! - `new` wraps a program coming from upstream into `Post<Typed>`.
//! - `Pre<S> -> Post<S>` runs `S::apply`.
//! - `Post<S> -> Pre<S::Next>` is `finish`.
//! - `done` consumes `Pre<Done>` and hands the program back.

use std::marker::PhantomData;

use girandole_err::EAccum;
use girandole_san::ast::decl;
use girandole_san::sp::Sp;

use crate::Config;

/// The stages, in order.
mod stage {
    use std::marker::PhantomData;

    /// Compiler pass: typed and clocked AST, as produced upstream.
    /// Gives access to normalization.
    pub struct Typed {}
    /// Compiler pass: introduce fresh variables so that every equation
    /// has a simple shape.
    /// Gives access to the causality check.
    pub struct Normalize {}
    /// Compiler pass: reject instantaneous cycles and bad definitions.
    /// Gives access to scheduling.
    pub struct Causality {}
    /// Compiler pass: reorder the statements of every block.
    /// Last step before the result is handed back.
    pub struct Schedule {}
    /// End of the middle-end.
    pub struct Done {}

    /// `T` is about to run.
    pub struct Pre<T> {
        /// Marker.
        stage: PhantomData<T>,
    }
    /// `T` has run.
    pub struct Post<T> {
        /// Marker.
        stage: PhantomData<T>,
    }
}
use stage::{Post, Pre};

/// A program together with how far it went through the middle-end.
pub struct CompilerPass<Stage> {
    /// `Pre<S>` or `Post<S>` for some stage `S`.
    stage: PhantomData<Stage>,
    /// The program as the last stage left it.
    prog: Sp<decl::Prog>,
}

impl CompilerPass<Post<stage::Typed>> {
    /// Take a typed program from upstream.
    pub fn new(prog: Sp<decl::Prog>) -> Self {
        log::debug!("Entering the middle-end with {} declarations", prog.t.decls.len());
        CompilerPass::auto(prog)
    }
}

impl<T> CompilerPass<T> {
    /// Change stage without running anything. Private: it would let
    /// callers skip passes.
    fn auto(prog: Sp<decl::Prog>) -> Self {
        Self {
            stage: PhantomData {},
            prog,
        }
    }
}

impl CompilerPass<Pre<stage::Done>> {
    /// Final phase of the program transformation: verify that every
    /// option was consumed by the passes that announced it, and hand back
    /// the program.
    pub fn done(self) -> Sp<decl::Prog> {
        for d in &self.prog.t.decls {
            if let decl::Decl::Node(node) = &d.t {
                node.t.options.assert_used();
            }
        }
        self.prog
    }
}

/// A stage that has work to do on the program.
pub trait Apply: Sized {
    /// Run the stage. `None` means errors were reported to `eaccum`.
    fn apply(
        eaccum: &mut EAccum,
        config: &Config,
        prog: Sp<decl::Prog>,
    ) -> Option<Sp<decl::Prog>>;
}

impl Apply for stage::Normalize {
    fn apply(
        _eaccum: &mut EAccum,
        _config: &Config,
        mut prog: Sp<decl::Prog>,
    ) -> Option<Sp<decl::Prog>> {
        use girandole_san::normalize::Normalize;
        prog.normalize();
        Some(prog)
    }
}

impl Apply for stage::Causality {
    fn apply(
        eaccum: &mut EAccum,
        config: &Config,
        prog: Sp<decl::Prog>,
    ) -> Option<Sp<decl::Prog>> {
        use girandole_san::causality::Causality;
        prog.causality(eaccum, config.policy())
    }
}

impl Apply for stage::Schedule {
    fn apply(
        eaccum: &mut EAccum,
        _config: &Config,
        mut prog: Sp<decl::Prog>,
    ) -> Option<Sp<decl::Prog>> {
        use girandole_san::schedule::Schedule;
        prog.schedule(eaccum);
        Some(prog)
    }
}

/// Successor of a stage.
pub trait Finish {
    /// The pass that comes next.
    type Next;
}

impl Finish for stage::Typed {
    type Next = stage::Normalize;
}
impl Finish for stage::Normalize {
    type Next = stage::Causality;
}
impl Finish for stage::Causality {
    type Next = stage::Schedule;
}
impl Finish for stage::Schedule {
    type Next = stage::Done;
}

impl<T, U> CompilerPass<Post<T>>
where
    T: Finish<Next = U>,
{
    /// Move on to the successor stage.
    pub fn finish(self) -> CompilerPass<Pre<U>> {
        CompilerPass::auto(self.prog)
    }
}

impl<T> CompilerPass<Pre<T>>
where
    T: Apply,
{
    /// Run this stage, reporting errors to `eaccum`.
    pub fn apply(self, eaccum: &mut EAccum, config: &Config) -> Option<CompilerPass<Post<T>>> {
        Some(CompilerPass::auto(T::apply(eaccum, config, self.prog)?))
    }
}
