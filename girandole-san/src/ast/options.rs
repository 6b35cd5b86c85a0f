//! Per-node options.
//!
//! The type of an option lists the passes that read it:
//! `UseOpt<bool, Both>` is read by normalization and scheduling, while
//! `UseOpt<bool, OnlySchedule>` is read by scheduling alone.
//! Fetching an option from a pass that is not listed does not compile,
//! and at the end of the pipeline `assert_used` panics if a listed pass
//! never fetched it, which means that the option is silently ignored.

use std::cell::Cell;
use std::marker::PhantomData;

/// Passes that read options.
pub mod pass {
    /// A pass, seen as an element of a set of passes.
    pub trait Pass {
        /// Bit of this pass.
        const BIT: u8;
        /// Human-readable name.
        const NAME: &'static str;
    }

    /// Normalization.
    #[derive(Debug, Clone, Copy)]
    pub struct Normalize;

    impl Pass for Normalize {
        const BIT: u8 = 1;
        const NAME: &'static str = "normalization";
    }

    /// Scheduling.
    #[derive(Debug, Clone, Copy)]
    pub struct Schedule;

    impl Pass for Schedule {
        const BIT: u8 = 2;
        const NAME: &'static str = "scheduling";
    }
}
use pass::{Normalize, Pass, Schedule};

/// A set of passes known at compile time.
pub trait Passes {
    /// Bits of all the passes of the set.
    const ALL: u8;
}

/// The set contains `P`.
pub trait Declares<P: Pass>: Passes {}

/// Normalization and scheduling.
#[derive(Debug, Clone, Copy)]
pub struct Both;

impl Passes for Both {
    const ALL: u8 = Normalize::BIT | Schedule::BIT;
}
impl Declares<Normalize> for Both {}
impl Declares<Schedule> for Both {}

/// Scheduling alone.
#[derive(Debug, Clone, Copy)]
pub struct OnlySchedule;

impl Passes for OnlySchedule {
    const ALL: u8 = Schedule::BIT;
}
impl Declares<Schedule> for OnlySchedule {}

/// Names of the passes in `bits`.
fn names(bits: u8) -> String {
    [
        (Normalize::BIT, Normalize::NAME),
        (Schedule::BIT, Schedule::NAME),
    ]
    .into_iter()
    .filter(|(bit, _)| bits & bit != 0)
    .map(|(_, name)| name)
    .collect::<Vec<_>>()
    .join(" and ")
}

/// An option value that remembers which passes fetched it.
#[derive(Debug, Clone)]
pub struct UseOpt<T, L> {
    /// The value.
    value: T,
    /// Bits of the passes that fetched it so far.
    seen: Cell<u8>,
    /// Passes that must fetch it.
    passes: PhantomData<L>,
}

impl<T, L: Passes> UseOpt<T, L> {
    /// A value that no pass has fetched yet.
    pub fn new(value: T) -> Self {
        Self {
            value,
            seen: Cell::new(0),
            passes: PhantomData,
        }
    }

    /// Read the value on behalf of pass `P`.
    pub fn fetch<P: Pass>(&self) -> &T
    where
        L: Declares<P>,
    {
        self.seen.set(self.seen.get() | P::BIT);
        &self.value
    }

    /// Panic unless every pass of `L` fetched the value.
    pub fn assert_used(&self, name: &str) {
        let missing = L::ALL & !self.seen.get();
        girandole_err::consistency!(
            missing == 0,
            "Option `{}` was never read during {}",
            name,
            names(missing)
        );
    }
}

/// Options of a node.
#[derive(Debug, Clone)]
pub struct Node {
    /// `#[trace]`: log the body after normalization and after scheduling.
    pub trace: UseOpt<bool, Both>,
    /// `#[cluster(false)]`: keep the plain topological order instead of
    /// grouping statements by clock.
    pub cluster: UseOpt<bool, OnlySchedule>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            trace: UseOpt::new(false),
            cluster: UseOpt::new(true),
        }
    }
}

impl Node {
    /// Panic if some pass forgot to read one of the options.
    pub fn assert_used(&self) {
        self.trace.assert_used("trace");
        self.cluster.assert_used("cluster");
    }
}
