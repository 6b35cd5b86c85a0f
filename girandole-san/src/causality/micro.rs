//! Fine-grained dependency graph of one alternative-free variant of the
//! effects of a node.
//!
//! Vertices stand for single effects: each variable has one vertex for
//! its definition and one for its linear consumption, and every ordinary
//! read gets its own vertex. An edge `a -> b` means that `a` must happen
//! before `b` within the reaction.
//!
//! An ordinary read comes after the definition of its variable and before
//! its linear consumption, so that a linear value is never observed once
//! it has been consumed.

use std::collections::{BTreeMap, HashMap};

use crate::ast::var;
use crate::causality::constraint::Constraint;
use crate::sp::Sp;

/// Entry and exit points of a subgraph.
#[derive(Debug, Default)]
struct Ends {
    /// Vertices without predecessors in the subgraph.
    tops: Vec<usize>,
    /// Vertices without successors in the subgraph.
    bots: Vec<usize>,
}

/// Graph of elementary effects.
#[derive(Debug, Default)]
pub struct Micro {
    /// Adjacency lists.
    succ: Vec<Vec<usize>>,
    /// Variable that each vertex is about.
    var: Vec<Sp<var::Local>>,
    /// Definition vertex of each variable.
    writer: HashMap<var::Local, usize>,
    /// Linear consumption vertex of each variable.
    lin: HashMap<var::Local, usize>,
}

impl Micro {
    /// Graph of an alternative-free tree of effects.
    #[must_use]
    pub fn build(c: &Constraint) -> Self {
        let mut g = Self::default();
        g.add(c);
        g
    }

    /// Fresh vertex.
    fn vertex(&mut self, v: &Sp<var::Local>) -> usize {
        self.succ.push(Vec::new());
        self.var.push(v.clone());
        self.succ.len() - 1
    }

    /// Definition vertex of `v`, created on first use.
    fn writer(&mut self, v: &Sp<var::Local>) -> usize {
        if let Some(&id) = self.writer.get(&v.t) {
            return id;
        }
        let id = self.vertex(v);
        self.writer.insert(v.t.clone(), id);
        id
    }

    /// Linear consumption vertex of `v`, created on first use.
    fn lin(&mut self, v: &Sp<var::Local>) -> usize {
        if let Some(&id) = self.lin.get(&v.t) {
            return id;
        }
        let id = self.vertex(v);
        self.lin.insert(v.t.clone(), id);
        id
    }

    /// `from` before `to`.
    fn edge(&mut self, from: usize, to: usize) {
        let out = at!(mut self.succ, from);
        if !out.contains(&to) {
            out.push(to);
        }
    }

    /// Insert the effects and return where they start and end.
    fn add(&mut self, c: &Constraint) -> Ends {
        match c {
            Constraint::Write(v) => {
                let w = self.writer(v);
                Ends {
                    tops: vec![w],
                    bots: vec![w],
                }
            }
            Constraint::Read(v) => {
                let r = self.vertex(v);
                let w = self.writer(v);
                let l = self.lin(v);
                self.edge(w, r);
                self.edge(r, l);
                Ends {
                    tops: vec![r],
                    bots: vec![r],
                }
            }
            Constraint::LinRead(v) => {
                let w = self.writer(v);
                let l = self.lin(v);
                self.edge(w, l);
                Ends {
                    tops: vec![l],
                    bots: vec![l],
                }
            }
            Constraint::LastRead(_) => Ends::default(),
            Constraint::Seq(a, b) => {
                let a = self.add(a);
                let b = self.add(b);
                for &bot in &a.bots {
                    for &top in &b.tops {
                        self.edge(bot, top);
                    }
                }
                Ends {
                    tops: if a.tops.is_empty() { b.tops } else { a.tops },
                    bots: if b.bots.is_empty() { a.bots } else { b.bots },
                }
            }
            // Alternatives do not survive normalization, and if one did
            // treating it as parallel can only report more cycles.
            Constraint::Par(cs) | Constraint::Tuple(cs) | Constraint::Alt(cs) => {
                let mut ends = Ends::default();
                for c in cs {
                    let Ends { tops, bots } = self.add(c);
                    ends.tops.extend(tops);
                    ends.bots.extend(bots);
                }
                ends
            }
        }
    }

    /// Variables of the first cycle found, sorted by name.
    /// A cycle is a strongly connected component with more than one vertex
    /// or a vertex with an edge to itself.
    #[must_use]
    pub fn cycle(&self) -> Option<Vec<Sp<var::Local>>> {
        let looping = components(&self.succ)
            .into_iter().find(|c| match c.as_slice() {
            [v] => at!(self.succ, *v).contains(v),
            _ => true,
        })?;
        let vars: BTreeMap<&var::Local, &Sp<var::Local>> = looping
            .iter()
            .map(|v| {
                let var = at!(self.var, *v);
                (&var.t, var)
            })
            .collect();
        Some(vars.into_values().cloned().collect())
    }
}

/// Bookkeeping of Tarjan's algorithm.
struct Tarjan {
    /// Visit number of each vertex, `None` until it is reached.
    order: Vec<Option<usize>>,
    /// Smallest visit number reachable from each vertex among those
    /// whose component is still open.
    low: Vec<usize>,
    /// Whether each vertex is on `stack`.
    stacked: Vec<bool>,
    /// Vertices whose component is still open.
    stack: Vec<usize>,
    /// Next visit number.
    counter: usize,
}

impl Tarjan {
    /// First arrival on `v`.
    fn visit(&mut self, v: usize) {
        *at!(mut self.order, v) = Some(self.counter);
        *at!(mut self.low, v) = self.counter;
        *at!(mut self.stacked, v) = true;
        self.stack.push(v);
        self.counter += 1;
    }

    /// `v` can reach a vertex visited `seen`-th.
    fn lower(&mut self, v: usize, seen: usize) {
        let low = at!(mut self.low, v);
        *low = (*low).min(seen);
    }

    /// Close the component rooted at `v`.
    fn pop(&mut self, v: usize) -> Vec<usize> {
        let mut comp = Vec::new();
        while let Some(w) = self.stack.pop() {
            *at!(mut self.stacked, w) = false;
            comp.push(w);
            if w == v {
                break;
            }
        }
        comp
    }
}

/// Strongly connected components of a graph given by its adjacency lists.
/// The depth-first search keeps an explicit stack of `(vertex, next edge)`.
fn components(succ: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = succ.len();
    let mut t = Tarjan {
        order: vec![None; n],
        low: vec![0; n],
        stacked: vec![false; n],
        stack: Vec::new(),
        counter: 0,
    };
    let mut found = Vec::new();
    for root in 0..n {
        if at!(t.order, root).is_some() {
            continue;
        }
        t.visit(root);
        let mut frames = vec![(root, 0)];
        while let Some(&(v, edge)) = frames.last() {
            if let Some(&w) = at!(succ, v).get(edge) {
                if let Some(frame) = frames.last_mut() {
                    frame.1 += 1;
                }
                match *at!(t.order, w) {
                    None => {
                        t.visit(w);
                        frames.push((w, 0));
                    }
                    Some(seen) if *at!(t.stacked, w) => t.lower(v, seen),
                    Some(_) => {}
                }
                continue;
            }
            frames.pop();
            let low = *at!(t.low, v);
            if let Some(&(parent, _)) = frames.last() {
                t.lower(parent, low);
            }
            if Some(low) == *at!(t.order, v) {
                found.push(t.pop(v));
            }
        }
    }
    found
}

#[cfg(test)]
mod test {
    use super::{components, Micro};
    use crate::build::*;
    use crate::causality::constraint::{Constraint, Effects};

    fn cycle(c: &Constraint) -> Option<Vec<String>> {
        Micro::build(c)
            .cycle()
            .map(|vs| vs.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn self_reference_loops() {
        let c = eq("x", add(var("x"), int(1))).effects();
        assert_eq!(cycle(&c), Some(vec![String::from("x")]));
    }

    #[test]
    fn chain_is_acyclic() {
        let c = block(vec![
            eq("y", var("x")),
            eq("z", add(var("y"), var("x"))),
        ])
        .effects();
        assert_eq!(cycle(&c), None);
    }

    #[test]
    fn mutual_recursion_loops() {
        let c = block(vec![eq("y", var("x")), eq("x", var("y"))]).effects();
        assert_eq!(cycle(&c), Some(vec![String::from("x"), String::from("y")]));
    }

    #[test]
    fn read_after_consumption_loops() {
        let c = block(vec![
            eq("x2", call("f", vec![var("x").linear()])),
            eq("y", ifx(var("x2"), var("x"), int(0))),
        ])
        .effects();
        assert_eq!(
            cycle(&c),
            Some(vec![String::from("x"), String::from("x2")])
        );
    }

    #[test]
    fn read_before_consumption_is_fine() {
        let c = block(vec![
            eq("y", add(var("x"), int(1))),
            eq("z", call("f", vec![var("y"), var("x").linear()])),
        ])
        .effects();
        assert_eq!(cycle(&c), None);
    }

    #[test]
    fn components_of_a_small_graph() {
        let succ = vec![vec![1], vec![2], vec![0, 3], vec![], vec![4]];
        let mut comps: Vec<Vec<usize>> = components(&succ)
            .into_iter()
            .map(|mut c| {
                c.sort_unstable();
                c
            })
            .collect();
        comps.sort();
        assert_eq!(comps, vec![vec![0, 1, 2], vec![3], vec![4]]);
    }

    #[test]
    fn long_chain_does_not_recurse() {
        let n = 100_000;
        let succ: Vec<Vec<usize>> = (0..n).map(|i| vec![(i + 1) % n]).collect();
        let comps = components(&succ);
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].len(), n);
    }
}
