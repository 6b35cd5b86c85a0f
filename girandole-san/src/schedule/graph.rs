//! Dependency graph between the statements of one block.
//!
//! Vertex `i` stands for the `i`-th statement. An edge `i -> j` means that
//! `j` reads a variable that `i` defines, so `i` must execute first.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::usage::Usage;

/// One statement and its neighbors.
#[derive(Debug, Clone, Default)]
pub struct Vertex {
    /// Index of the statement in its block.
    pub stmt: usize,
    /// Statements that must execute after this one.
    pub succ: Vec<usize>,
    /// Statements that must execute before this one.
    pub pred: Vec<usize>,
}

/// Statements of a block and their dependencies.
#[derive(Debug, Clone, Default)]
pub struct DepGraph {
    /// Indexed by statement.
    vertices: Vec<Vertex>,
}

impl DepGraph {
    /// Graph without edges.
    fn with_size(n: usize) -> Self {
        Self {
            vertices: (0..n)
                .map(|stmt| Vertex {
                    stmt,
                    ..Vertex::default()
                })
                .collect(),
        }
    }

    /// Record that `from` executes before `to`.
    /// Self edges and duplicates are ignored.
    fn edge(&mut self, from: usize, to: usize) {
        if from == to || at!(self.vertices, from).succ.contains(&to) {
            return;
        }
        at!(mut self.vertices, from).succ.push(to);
        at!(mut self.vertices, to).pred.push(from);
    }

    /// Ordering constraints within one step.
    ///
    /// A statement depends on the definer of every variable that it reads
    /// in the current step, except if that definer computes the variable
    /// through a delay.
    #[must_use]
    pub fn scheduling(usages: &[Usage]) -> Self {
        let mut g = Self::with_size(usages.len());
        for (i, definer) in usages.iter().enumerate() {
            for x in &definer.def {
                if definer.delayed.contains(&x.t) {
                    continue;
                }
                for (j, reader) in usages.iter().enumerate() {
                    if reader.reads_now(&x.t) {
                        g.edge(i, j);
                    }
                }
            }
        }
        g
    }

    /// Data flow, including through delays.
    #[must_use]
    pub fn forward(usages: &[Usage]) -> Self {
        let mut g = Self::with_size(usages.len());
        for (i, definer) in usages.iter().enumerate() {
            for x in &definer.def {
                for (j, reader) in usages.iter().enumerate() {
                    if reader.reads(&x.t) {
                        g.edge(i, j);
                    }
                }
            }
        }
        g
    }

    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the block is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex of the `i`-th statement.
    #[must_use]
    pub fn vertex(&self, i: usize) -> &Vertex {
        at!(self.vertices, i)
    }

    /// Whether `a` must execute after `b`.
    #[must_use]
    pub fn depends(&self, a: usize, b: usize) -> bool {
        at!(self.vertices, a).pred.contains(&b)
    }

    /// A topological order, choosing the earliest statement whenever
    /// several are ready.
    /// A block that is already in a valid order is left unchanged.
    ///
    /// # Panics
    /// If the graph has a cycle, which the causality check excludes.
    #[must_use]
    pub fn topological(&self) -> Vec<usize> {
        let mut indegree: Vec<usize> = self.vertices.iter().map(|v| v.pred.len()).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();
        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse(i)) = ready.pop() {
            order.push(i);
            for &j in &at!(self.vertices, i).succ {
                let d = at!(mut indegree, j);
                *d -= 1;
                if *d == 0 {
                    ready.push(Reverse(j));
                }
            }
        }
        if order.len() < self.len() {
            girandole_err::abort!("Scheduling graph is cyclic even though causality was checked");
        }
        order
    }
}

#[cfg(test)]
mod test {
    use super::DepGraph;
    use crate::build::*;
    use crate::usage::Usage;

    fn usages(stmts: &[crate::sp::Sp<crate::ast::stmt::Statement>]) -> Vec<Usage> {
        stmts.iter().map(Usage::of).collect()
    }

    #[test]
    fn reader_follows_definer() {
        let u = usages(&[eq("y", add(var("x"), int(1))), eq("x", var("a"))]);
        let g = DepGraph::scheduling(&u);
        assert!(g.depends(0, 1));
        assert!(!g.depends(1, 0));
        assert_eq!(g.topological(), vec![1, 0]);
    }

    #[test]
    fn delays_cut_edges() {
        let u = usages(&[
            eq("y", add(var("x"), int(1))),
            eq("x", fby(0, var("y"))),
        ]);
        let g = DepGraph::scheduling(&u);
        assert!(!g.depends(0, 1));
        assert!(!g.depends(1, 0));
        assert_eq!(g.topological(), vec![0, 1]);

        let g = DepGraph::forward(&u);
        assert!(g.depends(0, 1));
        assert!(g.depends(1, 0));
    }

    #[test]
    fn sorted_input_is_unchanged() {
        let u = usages(&[
            eq("a", int(0)),
            eq("b", var("a")),
            eq("c", int(1)),
            eq("d", add(var("b"), var("c"))),
        ]);
        assert_eq!(DepGraph::scheduling(&u).topological(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn no_self_edges() {
        let u = usages(&[eq("x", fby(0, add(var("x"), int(1))))]);
        let g = DepGraph::forward(&u);
        assert!(g.vertex(0).succ.is_empty());
        assert_eq!(g.vertex(0).stmt, 0);
    }
}
