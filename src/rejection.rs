//! Uniform sampling of DOAGs with a fixed number of vertices and no bound
//! on edges or out-degrees, by rejection.  No counting is involved.
//!
//! Vertices are built in order `1..=n`.  Vertex `i` may point at any of the
//! `i - 1` earlier vertices: a Poisson(1) number of them, truncated to
//! `i - 1`, are left out ("zeros") and the others are its out-edges, in
//! some order.
//!
//! The simulation phase keeps the queue of vertices no edge points at yet,
//! oldest first.  Row `i` must leave out a suffix of that queue, so the
//! vertices it hits form a prefix; otherwise the merge path is not monotone
//! and the whole attempt is restarted.  The `r` queue vertices it hits
//! form a run whose internal order is fixed, which is accepted with
//! probability `1 / r!`.  Accepted runs are "pinned" to the row.
//!
//! The population phase orders each row: pinned vertices in queue order,
//! interleaved uniformly with a uniform permutation of the remaining
//! columns.

use std::collections::VecDeque;

use rand::seq::index;
use rand::Rng;
use roaring::RoaringBitmap;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::family::Family;
use crate::graph::{Graph, Vertex};
use crate::random::{bernoulli_inverse_factorial, interleave_pinned, truncated_poisson};

/// Work spent on one accepted sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RejectionStats {
    /// Simulation attempts, the accepted one included.
    pub attempts: usize,
    /// Rows simulated over all attempts.
    pub simulated_rows: usize,
}

/// Outcome of simulating row `i`.
#[derive(Clone, Debug, Default)]
struct Row {
    /// Earlier vertices `i` does not point at.
    zeros: Vec<Vertex>,
    /// Queue vertices `i` points at, oldest first.
    pinned: Vec<Vertex>,
}

/// Samples uniformly among DOAGs with `n` vertices.
pub fn sample_unbounded_n<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Result<Graph> {
    sample_unbounded_n_with_stats(rng, n).map(|(graph, _)| graph)
}

/// Like [`sample_unbounded_n`], also reporting how much work was rejected.
pub fn sample_unbounded_n_with_stats<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
) -> Result<(Graph, RejectionStats)> {
    let mut rows: Vec<Row> = Vec::new();
    rows.try_reserve_exact(n.saturating_sub(1))
        .map_err(|source| Error::Allocation {
            what: "rejection rows",
            source,
        })?;

    let mut stats = RejectionStats::default();
    loop {
        stats.attempts += 1;
        if simulate(rng, n, &mut rows, &mut stats.simulated_rows) {
            break;
        }
        trace!(n, attempt = stats.attempts, "restarting simulation");
    }
    debug!(
        n,
        attempts = stats.attempts,
        simulated_rows = stats.simulated_rows,
        "merge path accepted"
    );

    let graph = populate(rng, n, &rows)?;
    Ok((graph, stats))
}

/// Runs one attempt of the simulation phase, filling `rows` with rows
/// `2..=n`.  Returns `false` when the attempt is rejected.
fn simulate<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    rows: &mut Vec<Row>,
    simulated_rows: &mut usize,
) -> bool {
    rows.clear();
    if n == 0 {
        return true;
    }

    let mut queue: VecDeque<Vertex> = VecDeque::from([1]);
    let mut queued = RoaringBitmap::new();
    queued.insert(1);

    for i in 2..=n as Vertex {
        *simulated_rows += 1;
        let width = (i - 1) as usize;
        let z = truncated_poisson(rng, width);
        let zeros: Vec<Vertex> = index::sample(rng, width, z)
            .into_iter()
            .map(|column| column as Vertex + 1)
            .collect();

        let queued_zeros = zeros.iter().filter(|c| queued.contains(**c));
        let t = queued_zeros.clone().count();
        let r = queue.len() - t;
        if t > 0 {
            let first_queued_zero = queued_zeros.min().copied().unwrap_or(Vertex::MAX);
            if first_queued_zero < queue[r] {
                cov_mark::hit!(merge_path_not_monotone);
                return false;
            }
        }
        if !bernoulli_inverse_factorial(rng, r) {
            cov_mark::hit!(run_rejected);
            return false;
        }

        let pinned: Vec<Vertex> = queue.drain(..r).collect();
        for vertex in &pinned {
            queued.remove(*vertex);
        }
        queue.push_back(i);
        queued.insert(i);
        rows.push(Row { zeros, pinned });
    }

    assert_eq!(rows.len(), n - 1, "merge path does not cover every row");
    true
}

/// Turns accepted rows into ordered out-edge lists.
fn populate<R: Rng + ?Sized>(rng: &mut R, n: usize, rows: &[Row]) -> Result<Graph> {
    let mut out_edges: Vec<Vec<Vertex>> = Vec::new();
    out_edges
        .try_reserve_exact(n)
        .map_err(|source| Error::Allocation {
            what: "graph arena",
            source,
        })?;
    if n > 0 {
        out_edges.push(Vec::new());
    }

    let mut excluded = RoaringBitmap::new();
    for (row, i) in rows.iter().zip(2..) {
        let width: Vertex = i - 1;
        excluded.clear();
        excluded.extend(row.zeros.iter().copied());
        excluded.extend(row.pinned.iter().copied());

        let degree = width as usize - row.zeros.len();
        let mut targets: Vec<Vertex> = Vec::with_capacity(degree);
        targets.extend(&row.pinned);
        targets.extend((1..=width).filter(|c| !excluded.contains(*c)));
        assert_eq!(
            targets.len(),
            degree,
            "row {} overran its width: pinned and zero columns overlap",
            i
        );

        interleave_pinned(rng, &mut targets, row.pinned.len());
        out_edges.push(targets);
    }

    Ok(Graph::from_out_edges(Family::Doag, out_edges))
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::family::Bound;
    use crate::memo::MemoTable;
    use crate::sampling::{assert_uniform, sample_by_n};

    #[test]
    fn tiny_graphs() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(sample_unbounded_n(&mut rng, 0).unwrap().vertex_count(), 0);
        let (single, stats) = sample_unbounded_n_with_stats(&mut rng, 1).unwrap();
        assert_eq!(single.vertex_count(), 1);
        assert_eq!(single.edge_count(), 0);
        assert_eq!(stats.attempts, 1);
        assert_eq!(stats.simulated_rows, 0);
    }

    #[test]
    fn two_vertices_are_equally_likely_joined_or_not() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut samples = HashMap::new();
        for _ in 0..10_000 {
            *samples.entry(sample_unbounded_n(&mut rng, 2).unwrap()).or_default() += 1;
        }
        assert_uniform(&samples, 2);
    }

    #[test]
    fn four_vertices_are_uniform_and_match_rank_sampling() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut samples = HashMap::new();
        for _ in 0..40_000 {
            *samples.entry(sample_unbounded_n(&mut rng, 4).unwrap()).or_default() += 1;
        }
        assert_uniform(&samples, 95);

        let mut memo = MemoTable::new(Family::Doag, 4, 6, Bound::Unbounded).unwrap();
        let mut ranked = HashSet::new();
        for _ in 0..20_000 {
            ranked.insert(sample_by_n(&mut rng, &mut memo, 4).unwrap());
        }
        let rejected: HashSet<Graph> = samples.into_keys().collect();
        assert_eq!(rejected, ranked);
    }

    #[test]
    fn non_monotone_paths_are_rejected() {
        cov_mark::check!(merge_path_not_monotone);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            sample_unbounded_n(&mut rng, 30).unwrap();
        }
    }

    #[test]
    fn long_runs_are_rejected() {
        cov_mark::check!(run_rejected);
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..20 {
            sample_unbounded_n(&mut rng, 30).unwrap();
        }
    }

    #[test]
    fn simulation_work_is_linear() {
        let mut rng = StdRng::seed_from_u64(5);
        let n = 1000;
        let runs = 10;
        let mut rows = 0;
        for _ in 0..runs {
            let (graph, stats) = sample_unbounded_n_with_stats(&mut rng, n).unwrap();
            assert_eq!(graph.vertex_count(), n);
            rows += stats.simulated_rows;
        }
        let rows_per_vertex = rows as f64 / (runs * n) as f64;
        assert!(rows_per_vertex < 5.0, "{} simulated rows per vertex", rows_per_vertex);
    }

    proptest! {
        #[test]
        fn samples_are_well_formed(n in 0usize..40, seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let graph = sample_unbounded_n(&mut rng, n).unwrap();
            prop_assert_eq!(graph.vertex_count(), n);
            prop_assert!(graph.topological_order().is_some());
            for u in graph.iter_vertices() {
                let targets: HashSet<Vertex> = graph.out_edges(u).iter().copied().collect();
                prop_assert_eq!(targets.len(), graph.out_degree(u));
                prop_assert!(targets.iter().all(|v| *v < u));
            }
        }
    }
}
