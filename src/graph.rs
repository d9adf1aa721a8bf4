//! Sampled graphs.
//!
//! Vertices are identified by `1..=n`.  For DOAGs the identifier is the
//! construction index: a vertex only points at vertices with smaller
//! identifiers, and its out-edges are kept in their semantic order.  For
//! labelled DAGs the identifier is the label and out-edges are sorted.

use std::io::Write;

use roaring::RoaringBitmap;

use crate::error::{Error, Result};
use crate::family::Family;

pub type Vertex = u32;

/// A directed acyclic graph with ordered out-edge lists.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Graph {
    family: Family,
    out_edges: Vec<Vec<Vertex>>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Graph::from_out_edges(Family::{:?}, vec!{:?})",
            self.family, self.out_edges
        )
    }
}

/// One vertex of the arena a sampler writes into.  Samplers shuffle slots
/// around freely; the identifier tells where the vertex ends up.
#[derive(Clone, Debug, Default)]
pub(crate) struct Slot {
    pub(crate) id: Vertex,
    pub(crate) out_edges: Vec<Vertex>,
}

pub(crate) fn allocate_arena(vertex_count: usize) -> Result<Vec<Slot>> {
    let mut arena = Vec::new();
    arena
        .try_reserve_exact(vertex_count)
        .map_err(|source| Error::Allocation {
            what: "graph arena",
            source,
        })?;
    arena.resize_with(vertex_count, Slot::default);
    Ok(arena)
}

impl Graph {
    /// `out_edges[i]` lists the out-neighbours of vertex `i + 1`.
    ///
    /// Requires every target to be a vertex other than its source, and for
    /// DOAGs a vertex smaller than its source.  Panics otherwise.
    pub fn from_out_edges(family: Family, out_edges: Vec<Vec<Vertex>>) -> Self {
        let vertex_count = out_edges.len();
        for (index, targets) in out_edges.iter().enumerate() {
            let u = Vertex::try_from(index + 1).expect("vertex count fits in a Vertex");
            for v in targets {
                assert!(1 <= *v && usize::try_from(*v).map_or(false, |v| v <= vertex_count));
                assert!(*v != u);
                if family == Family::Doag {
                    assert!(*v < u);
                }
            }
        }
        Self { family, out_edges }
    }

    /// Requires the slots to carry the identifiers `1..=n` exactly once.
    /// Panics otherwise.
    pub(crate) fn from_arena(family: Family, arena: Vec<Slot>) -> Self {
        let mut out_edges: Vec<Option<Vec<Vertex>>> = vec![None; arena.len()];
        for slot in arena {
            let index = usize::try_from(slot.id).expect("vertex id fits in usize");
            assert!(1 <= index && index <= out_edges.len(), "slot id {} out of range", slot.id);
            assert!(out_edges[index - 1].is_none(), "slot id {} used twice", slot.id);
            out_edges[index - 1] = Some(slot.out_edges);
        }
        Self {
            family,
            out_edges: out_edges.into_iter().flatten().collect(),
        }
    }

    #[inline]
    pub fn family(&self) -> Family {
        self.family
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.out_edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.out_edges.iter().map(Vec::len).sum()
    }

    pub fn iter_vertices(&self) -> impl Iterator<Item = Vertex> {
        1..=self.out_edges.len() as Vertex
    }

    /// Requires `1 <= u <= vertex_count`.  Panics otherwise.
    pub fn out_edges(&self, u: Vertex) -> &[Vertex] {
        assert!(u >= 1);
        &self.out_edges[(u - 1) as usize]
    }

    pub fn out_degree(&self, u: Vertex) -> usize {
        self.out_edges(u).len()
    }

    pub fn max_out_degree(&self) -> usize {
        self.out_edges.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Edges `(u, v)` grouped by `u` ascending, each group in out-edge order.
    pub fn iter_edges(&self) -> impl Iterator<Item = (Vertex, Vertex)> + '_ {
        self.iter_vertices()
            .zip(&self.out_edges)
            .flat_map(|(u, targets)| targets.iter().map(move |v| (u, *v)))
    }

    /// Vertices without incoming edges.
    pub fn sources(&self) -> RoaringBitmap {
        let mut sources = RoaringBitmap::new();
        sources.insert_range(1..=self.out_edges.len() as u32);
        for (_, v) in self.iter_edges() {
            sources.remove(v);
        }
        sources
    }

    /// Vertices without outgoing edges.
    pub fn sinks(&self) -> RoaringBitmap {
        self.iter_vertices()
            .filter(|u| self.out_edges(*u).is_empty())
            .collect()
    }

    /// A topological order starting from the sources, or `None` if the
    /// graph has a cycle.
    pub fn topological_order(&self) -> Option<Vec<Vertex>> {
        let mut in_degree = vec![0usize; self.vertex_count()];
        for (_, v) in self.iter_edges() {
            in_degree[(v - 1) as usize] += 1;
        }
        let mut ready: Vec<Vertex> = self.sources().iter().collect();
        let mut order = Vec::with_capacity(self.vertex_count());
        while let Some(u) = ready.pop() {
            order.push(u);
            for v in self.out_edges(u) {
                let degree = &mut in_degree[(*v - 1) as usize];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(*v);
                }
            }
        }
        if order.len() == self.vertex_count() {
            Some(order)
        } else {
            None
        }
    }

    /// Outputs the graph in the [Graphviz DOT](https://graphviz.org/) format.
    /// DOAGs are drawn with anonymous points and `ordering = "out"` so the
    /// out-edge order is preserved; labelled DAGs show their labels.
    pub fn to_dot<W: Write>(&self, output: &mut W) -> std::result::Result<(), std::io::Error> {
        writeln!(output, "digraph G {{")?;
        writeln!(output, "  rankdir = \"TB\"")?;
        match self.family {
            Family::Doag => {
                writeln!(output, "  ordering = \"out\"")?;
                writeln!(output, "  node [shape=point, label=\"\"]")?;
                writeln!(output, "  edge [arrowhead=none]")?;
            }
            Family::Ldag => writeln!(output, "  node [shape=circle]")?,
        }

        for u in self.iter_vertices() {
            match self.family {
                Family::Doag => writeln!(output, "  n{}", u)?,
                Family::Ldag => writeln!(output, "  n{} [label=\"{}\"]", u, u)?,
            }
            for v in self.out_edges(u) {
                writeln!(output, "  n{} -> n{}", u, v)?;
            }
        }

        writeln!(output, "}}")?;
        Ok(())
    }

    pub fn to_dot_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> std::result::Result<(), std::io::Error> {
        let mut file = std::fs::File::create(path)?;
        self.to_dot(&mut file)?;
        Ok(())
    }
}
