//! Refinements of a valid execution order.
//!
//! Statements on the same clock are best executed next to each other so
//! that a single test of the clock guards them all. The clustering pass
//! moves statements towards others with a compatible clock without ever
//! breaking a dependency.

use crate::ast::clock::Clock;
use crate::schedule::graph::DepGraph;

/// A transformation of an order in which every statement comes after
/// the statements it depends on into another such order.
pub trait Refine {
    /// Reorder. `clocks[i]` is the clock of statement `i`.
    fn refine(&self, order: Vec<usize>, graph: &DepGraph, clocks: &[Clock]) -> Vec<usize>;
}

/// Keep the topological order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Topological;

impl Refine for Topological {
    fn refine(&self, order: Vec<usize>, _graph: &DepGraph, _clocks: &[Clock]) -> Vec<usize> {
        order
    }
}

/// Group statements that have joinable clocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockClustering;

impl Refine for ClockClustering {
    fn refine(&self, order: Vec<usize>, graph: &DepGraph, clocks: &[Clock]) -> Vec<usize> {
        let once = cluster(&order, graph, clocks);
        cluster(&once, graph, clocks)
    }
}

/// One pass of clustering.
///
/// Statements are placed one at a time into a list kept in reverse
/// execution order, so that the most recently placed statement is the
/// head. A new statement may be placed anywhere between the head and
/// the first statement it depends on, the blocker. It goes right before
/// the first one in that range whose clock is joinable with its own.
/// If there is none it is placed right after the blocker in execution
/// order, unless that would split a run of joinable statements, in which
/// case it moves towards the head until it is past the run.
/// A statement with neither a joinable partner nor a blocker goes
/// at the head.
fn cluster(order: &[usize], graph: &DepGraph, clocks: &[Clock]) -> Vec<usize> {
    let mut placed: Vec<usize> = Vec::with_capacity(order.len());
    for &eq in order {
        let clk = at!(clocks, eq);
        let mut joinable = None;
        let mut blocker = None;
        for (idx, &other) in placed.iter().enumerate() {
            if joinable.is_none() && clk.joinable(at!(clocks, other)) {
                joinable = Some(idx);
            }
            if graph.depends(eq, other) {
                blocker = Some(idx);
                break;
            }
        }
        let pos = match (joinable, blocker) {
            (Some(pos), _) => pos,
            (None, Some(mut pos)) => {
                while pos > 0
                    && at!(clocks, *at!(placed, pos - 1)).joinable(at!(clocks, *at!(placed, pos)))
                {
                    pos -= 1;
                }
                pos
            }
            (None, None) => 0,
        };
        log::trace!("Statement {eq} goes at depth {pos}");
        placed.insert(pos, eq);
    }
    placed.reverse();
    placed
}

#[cfg(test)]
mod test {
    use super::{ClockClustering, Refine, Topological};
    use crate::ast::clock::Clock;
    use crate::build::*;
    use crate::schedule::graph::DepGraph;
    use crate::sp::Sp;
    use crate::ast::stmt::Statement;
    use crate::usage::Usage;

    fn refine(r: &dyn Refine, stmts: &[Sp<Statement>]) -> Vec<usize> {
        let usages: Vec<Usage> = stmts.iter().map(Usage::of).collect();
        let graph = DepGraph::scheduling(&usages);
        let clocks: Vec<Clock> = usages.iter().map(|u| u.clock.clone()).collect();
        r.refine(graph.topological(), &graph, &clocks)
    }

    fn on(tag: &str, name: &str, value: i64) -> Sp<Statement> {
        eq(name, when(int(value), tag, "c"))
    }

    #[test]
    fn same_clock_is_stable() {
        let stmts = [on("T", "a", 0), on("T", "b", 1), on("T", "c2", 2)];
        assert_eq!(refine(&ClockClustering, &stmts), vec![0, 1, 2]);
    }

    #[test]
    fn groups_around_dependency() {
        // b :: T(c); d :: F(c) reads b; a :: T(c)
        let stmts = [
            on("T", "b", 0),
            eq("d", when(var("b"), "F", "c")),
            on("T", "a", 1),
        ];
        assert_eq!(refine(&Topological, &stmts), vec![0, 1, 2]);
        assert_eq!(refine(&ClockClustering, &stmts), vec![0, 2, 1]);
    }

    #[test]
    fn groups_independent_statements() {
        let stmts = [on("T", "a", 0), on("F", "d", 1), on("T", "b", 2)];
        assert_eq!(refine(&ClockClustering, &stmts), vec![0, 2, 1]);
    }

    #[test]
    fn never_breaks_dependencies() {
        let stmts = [
            on("T", "a", 0),
            eq("b", when(add(var("a"), int(1)), "F", "c")),
            eq("e", when(var("b"), "T", "c")),
        ];
        assert_eq!(refine(&ClockClustering, &stmts), vec![0, 1, 2]);
    }

    #[test]
    fn unrelated_clock_stays_next_to_its_dependency() {
        // a :: T(c); e :: F(c); d :: G(c) reads a
        let stmts = [
            on("T", "a", 0),
            on("F", "e", 1),
            eq("d", when(var("a"), "G", "c")),
        ];
        assert_eq!(refine(&ClockClustering, &stmts), vec![0, 2, 1]);
    }

    #[test]
    fn unrelated_clock_does_not_split_a_group() {
        // a :: T(c); b :: T(c); e :: F(c); d :: G(c) reads a
        let stmts = [
            on("T", "a", 0),
            on("T", "b", 1),
            on("F", "e", 2),
            eq("d", when(var("a"), "G", "c")),
        ];
        assert_eq!(refine(&ClockClustering, &stmts), vec![0, 1, 3, 2]);
    }
}
