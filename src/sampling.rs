//! Uniform sampling by unranking ("recursive method").
//!
//! A rank drawn uniformly below the count is walked through the same
//! decomposition [`crate::counting`] sums over.  The term it lands in fixes
//! the out-degree `p` of the newest vertex and its split into `q` edges
//! towards sources of the subgraph and `s` towards non-sources.  The
//! subgraph is sampled recursively, then the targets of the newest vertex
//! are chosen uniformly among the arrangements the term's factor counts.
//!
//! The arena is handed down as a slice: the newest vertex takes the head
//! and the subgraph is built in the tail.  After a window of `n` slots with
//! `k` sources is built, `window[..k]` holds the sources, newest first, and
//! `window[k..]` the other vertices in no particular order.

use num_bigint::{BigUint, RandBigInt};
use num_traits::Zero;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::counting::{count, count_by_n, ensure, max_edges_any_sources, Decomposition, Term};
use crate::error::{Error, Result};
use crate::family::Family;
use crate::graph::{allocate_arena, Graph, Slot, Vertex};
use crate::memo::MemoTable;
use crate::strategy::Params;

/// Samples uniformly among the graphs of `memo`'s family with `n` vertices,
/// `m` edges and `k` sources.
pub fn sample_by_nmk<R: Rng + ?Sized>(
    rng: &mut R,
    memo: &mut MemoTable,
    n: usize,
    m: usize,
    k: usize,
) -> Result<Graph> {
    if count(memo, n, m, k)?.is_zero() {
        return Err(Error::InvalidParameters {
            family: memo.family(),
            n,
            m,
            k,
            bound: memo.bound(),
        });
    }
    debug!(family = %memo.family(), n, m, k, "sampling by rank");
    build(rng, memo, n, m, k)
}

/// Samples uniformly among the graphs with `n` vertices and `m` edges,
/// whatever their number of sources.
pub fn sample_by_nm<R: Rng + ?Sized>(
    rng: &mut R,
    memo: &mut MemoTable,
    n: usize,
    m: usize,
) -> Result<Graph> {
    let mut candidates = Vec::new();
    for k in 0..=n {
        candidates.push((Params { n, m, k }, count(memo, n, m, k)?));
    }
    let params = pick(rng, memo, candidates, || format!("n={}, m={}", n, m))?;
    debug!(family = %memo.family(), n, m, k = params.k, "sampling by vertices and edges");
    build(rng, memo, params.n, params.m, params.k)
}

/// Samples uniformly among all graphs with `n` vertices.  The table must
/// cover every edge count reachable with `n` vertices.
pub fn sample_by_n<R: Rng + ?Sized>(rng: &mut R, memo: &mut MemoTable, n: usize) -> Result<Graph> {
    count_by_n(memo, n)?;
    let mut candidates = Vec::new();
    for m in 0..=max_edges_any_sources(n, memo.bound()) {
        for k in 0..=n {
            candidates.push((Params { n, m, k }, count(memo, n, m, k)?));
        }
    }
    let params = pick(rng, memo, candidates, || format!("n={}", n))?;
    debug!(family = %memo.family(), n, m = params.m, k = params.k, "sampling by vertices");
    build(rng, memo, params.n, params.m, params.k)
}

/// Samples uniformly among the single-source graphs with `m` edges, whatever
/// their number of vertices.
pub fn sample_by_m<R: Rng + ?Sized>(rng: &mut R, memo: &mut MemoTable, m: usize) -> Result<Graph> {
    let mut candidates = Vec::new();
    for n in 1..=m + 1 {
        candidates.push((Params { n, m, k: 1 }, count(memo, n, m, 1)?));
    }
    let params = pick(rng, memo, candidates, || format!("m={}, k=1", m))?;
    debug!(family = %memo.family(), n = params.n, m, "sampling by edges");
    build(rng, memo, params.n, params.m, params.k)
}

/// Draws one of `candidates` with probability proportional to its count.
fn pick<R: Rng + ?Sized>(
    rng: &mut R,
    memo: &MemoTable,
    candidates: Vec<(Params, BigUint)>,
    constraint: impl FnOnce() -> String,
) -> Result<Params> {
    let total: BigUint = candidates.iter().map(|(_, weight)| weight).sum();
    if total.is_zero() {
        return Err(Error::EmptyFamily {
            family: memo.family(),
            constraint: constraint(),
            bound: memo.bound(),
        });
    }
    let mut rank = rng.gen_biguint_below(&total);
    for (params, weight) in candidates {
        if rank < weight {
            return Ok(params);
        }
        rank -= weight;
    }
    panic!("rank exceeded the total weight of its candidates");
}

/// Requires `(n, m, k)` to have a non-zero count covered by `memo`.
fn build<R: Rng + ?Sized>(
    rng: &mut R,
    memo: &mut MemoTable,
    n: usize,
    m: usize,
    k: usize,
) -> Result<Graph> {
    ensure(memo, n, m, k);
    let mut arena = allocate_arena(n)?;
    unrank(rng, memo, &mut arena, m, k);
    if memo.family() == Family::Ldag {
        relabel(rng, &mut arena);
    }
    Ok(Graph::from_arena(memo.family(), arena))
}

fn unrank<R: Rng + ?Sized>(rng: &mut R, memo: &MemoTable, window: &mut [Slot], m: usize, k: usize) {
    let n = window.len();
    if k == n {
        for (slot, id) in window.iter_mut().zip((1..=n as Vertex).rev()) {
            slot.id = id;
            slot.out_edges.clear();
        }
        return;
    }

    let term = pick_term(rng, memo, n, m, k);
    let (head, rest) = match window.split_first_mut() {
        Some(split) => split,
        None => unreachable!("a graph with sources has at least one vertex"),
    };
    unrank(rng, memo, rest, term.sub_edges, term.sub_sources);
    head.id = n as Vertex;
    head.out_edges = match memo.family() {
        Family::Doag => attach_ordered(rng, rest, &term),
        Family::Ldag => attach_unordered(rng, rest, &term),
    };
}

/// Draws a rank below the sum of the decomposition of `(n, m, k)` and
/// returns the term it falls into.  Every cell the walk reads must already
/// be filled.
fn pick_term<R: Rng + ?Sized>(rng: &mut R, memo: &MemoTable, n: usize, m: usize, k: usize) -> Term {
    let family = memo.family();
    let total = match family {
        Family::Doag => memo.get(n, m, k).clone(),
        Family::Ldag => memo.get(n, m, k) * k / n,
    };
    assert!(!total.is_zero(), "cell (n={}, m={}, k={}) was not filled", n, m, k);
    let mut rank = rng.gen_biguint_below(&total);

    for term in Decomposition::new(family, n, m, k, memo.bound()) {
        let weight = &term.factor * memo.get(n - 1, term.sub_edges, term.sub_sources);
        if rank < weight {
            return term;
        }
        rank -= weight;
    }
    panic!(
        "unranking walk of the {} triple (n={}, m={}, k={}) ran out of terms",
        family, n, m, k
    );
}

/// Out-edges of the newest DOAG vertex: the `q` oldest sources of the
/// subgraph, oldest first, interleaved uniformly with an ordered uniform
/// selection of `s` non-sources.
fn attach_ordered<R: Rng + ?Sized>(rng: &mut R, rest: &mut [Slot], term: &Term) -> Vec<Vertex> {
    let mut out_edges = Vec::with_capacity(term.p);
    let mut next_source = term.sub_sources;
    let mut next_other = term.sub_sources;
    let (mut q, mut s) = (term.q, term.s);
    while q + s > 0 {
        if rng.gen_range(0..q + s) < q {
            next_source -= 1;
            out_edges.push(rest[next_source].id);
            q -= 1;
        } else {
            let j = rng.gen_range(next_other..rest.len());
            rest.swap(next_other, j);
            out_edges.push(rest[next_other].id);
            next_other += 1;
            s -= 1;
        }
    }
    out_edges
}

/// Out-edges of the newest labelled vertex: a uniform `q`-subset of the
/// sources of the subgraph, moved to the end of the source block, and a
/// uniform `s`-subset of the non-sources.
fn attach_unordered<R: Rng + ?Sized>(rng: &mut R, rest: &mut [Slot], term: &Term) -> Vec<Vertex> {
    let sources = term.sub_sources;
    let mut out_edges = Vec::with_capacity(term.p);

    for t in 0..term.q {
        let last = sources - 1 - t;
        let j = rng.gen_range(0..=last);
        rest.swap(j, last);
        out_edges.push(rest[last].id);
    }

    let mut needed = term.s;
    let mut candidates = rest.len() - sources;
    for slot in &rest[sources..] {
        if needed == 0 {
            break;
        }
        if rng.gen_range(0..candidates) < needed {
            out_edges.push(slot.id);
            needed -= 1;
        }
        candidates -= 1;
    }
    assert_eq!(needed, 0, "selection pass ended before picking every non-source");
    out_edges
}

/// Applies a uniform permutation of `1..=n` to identifiers and out-edges.
fn relabel<R: Rng + ?Sized>(rng: &mut R, arena: &mut [Slot]) {
    let mut labels: Vec<Vertex> = (1..=arena.len() as Vertex).collect();
    labels.shuffle(rng);
    for slot in arena.iter_mut() {
        slot.id = labels[(slot.id - 1) as usize];
        for target in slot.out_edges.iter_mut() {
            *target = labels[(*target - 1) as usize];
        }
        slot.out_edges.sort_unstable();
    }
}

/// Pearson's statistic against the uniform distribution over `support`
/// outcomes, checked against `df + 6 sqrt(2 df)`.
#[cfg(test)]
pub(crate) fn assert_uniform(samples: &std::collections::HashMap<Graph, usize>, support: usize) {
    assert_eq!(samples.len(), support, "not every graph was drawn");
    let trials: usize = samples.values().sum();
    let expected = trials as f64 / support as f64;
    let statistic: f64 = samples
        .values()
        .map(|observed| {
            let delta = *observed as f64 - expected;
            delta * delta / expected
        })
        .sum();
    let df = (support - 1) as f64;
    assert!(
        statistic < df + 6.0 * (2.0 * df).sqrt(),
        "chi-square {} with {} degrees of freedom",
        statistic,
        df
    );
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use num_traits::ToPrimitive;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::family::Bound;
    use crate::strategy::arb_params;

    fn table(family: Family, max_vertices: usize, max_edges: usize, bound: Bound) -> MemoTable {
        MemoTable::new(family, max_vertices, max_edges, bound).unwrap()
    }

    fn histogram_nmk(
        family: Family,
        bound: Bound,
        n: usize,
        m: usize,
        k: usize,
        seed: u64,
    ) -> (HashMap<Graph, usize>, usize) {
        let mut memo = table(family, n, m, bound);
        let support = count(&mut memo, n, m, k).unwrap().to_usize().unwrap();
        let trials = (30 * support).max(10_000);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut samples = HashMap::new();
        for _ in 0..trials {
            let graph = sample_by_nmk(&mut rng, &mut memo, n, m, k).unwrap();
            *samples.entry(graph).or_default() += 1;
        }
        (samples, support)
    }

    #[test]
    fn doag_single_source_is_uniform() {
        let (samples, support) = histogram_nmk(Family::Doag, Bound::Unbounded, 4, 4, 1, 1);
        assert_eq!(support, 17);
        assert_uniform(&samples, support);
    }

    #[test]
    fn bounded_doag_is_uniform() {
        let (samples, support) = histogram_nmk(Family::Doag, Bound::AtMost(2), 5, 5, 2, 2);
        assert_eq!(support, 120);
        assert_uniform(&samples, support);
        assert!(samples.keys().all(|graph| graph.max_out_degree() <= 2));
    }

    #[test]
    fn ldag_single_source_is_uniform() {
        let (samples, support) = histogram_nmk(Family::Ldag, Bound::Unbounded, 4, 4, 1, 3);
        assert_eq!(support, 132);
        assert_uniform(&samples, support);
    }

    #[test]
    fn bounded_ldag_is_uniform() {
        let (samples, support) = histogram_nmk(Family::Ldag, Bound::AtMost(2), 4, 3, 2, 4);
        assert_eq!(support, 84);
        assert_uniform(&samples, support);
    }

    #[test]
    fn small_ldag_is_uniform() {
        let (samples, support) = histogram_nmk(Family::Ldag, Bound::Unbounded, 3, 2, 1, 5);
        assert_eq!(support, 9);
        assert_uniform(&samples, support);
    }

    #[test]
    fn all_doags_of_four_vertices() {
        let mut memo = table(Family::Doag, 4, 6, Bound::Unbounded);
        let mut rng = StdRng::seed_from_u64(6);
        let mut samples = HashMap::new();
        for _ in 0..20_000 {
            let graph = sample_by_n(&mut rng, &mut memo, 4).unwrap();
            *samples.entry(graph).or_default() += 1;
        }
        assert_uniform(&samples, 95);
    }

    #[test]
    fn marginal_over_sources_is_uniform() {
        // 17 graphs with four vertices and three edges.
        let mut memo = table(Family::Doag, 4, 3, Bound::Unbounded);
        let mut rng = StdRng::seed_from_u64(8);
        let mut samples = HashMap::new();
        for _ in 0..10_000 {
            let graph = sample_by_nm(&mut rng, &mut memo, 4, 3).unwrap();
            assert_eq!(graph.edge_count(), 3);
            *samples.entry(graph).or_default() += 1;
        }
        assert_uniform(&samples, 17);
    }

    #[test]
    fn marginal_over_vertices_is_uniform() {
        for (family, support) in [(Family::Doag, 2 + 5), (Family::Ldag, 6 + 64)] {
            let mut memo = table(family, 4, 3, Bound::Unbounded);
            let mut rng = StdRng::seed_from_u64(10);
            let mut samples = HashMap::new();
            for _ in 0..10_000 {
                let graph = sample_by_m(&mut rng, &mut memo, 3).unwrap();
                assert_eq!(graph.edge_count(), 3);
                assert_eq!(graph.sources().len(), 1);
                *samples.entry(graph).or_default() += 1;
            }
            assert_uniform(&samples, support);
        }
    }

    #[test]
    fn empty_families_are_rejected() {
        let mut memo = table(Family::Doag, 5, 5, Bound::AtMost(1));
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            sample_by_nmk(&mut rng, &mut memo, 4, 5, 1),
            Err(Error::InvalidParameters { .. })
        ));
        assert!(matches!(
            sample_by_nm(&mut rng, &mut memo, 3, 3),
            Err(Error::EmptyFamily { .. })
        ));
        assert!(matches!(
            sample_by_nmk(&mut rng, &mut memo, 6, 5, 1),
            Err(Error::OutsideMemo { .. })
        ));
    }

    #[test]
    fn trivial_graphs() {
        let mut memo = table(Family::Ldag, 3, 3, Bound::Unbounded);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(sample_by_nmk(&mut rng, &mut memo, 0, 0, 0).unwrap().vertex_count(), 0);
        let edgeless = sample_by_nmk(&mut rng, &mut memo, 3, 0, 3).unwrap();
        assert_eq!(edgeless.edge_count(), 0);
        assert_eq!(edgeless.sources().len(), 3);
    }

    #[test]
    fn same_seed_same_graph() {
        let mut memo = table(Family::Doag, 30, 60, Bound::AtMost(3));
        let first = sample_by_nmk(&mut StdRng::seed_from_u64(42), &mut memo, 30, 60, 4).unwrap();
        let second = sample_by_nmk(&mut StdRng::seed_from_u64(42), &mut memo, 30, 60, 4).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn large_graphs_have_requested_shape() {
        let mut memo = table(Family::Ldag, 20, 40, Bound::Unbounded);
        let mut rng = StdRng::seed_from_u64(12);
        let graph = sample_by_nmk(&mut rng, &mut memo, 20, 40, 4).unwrap();
        assert_eq!(graph.edge_count(), 40);
        assert_eq!(graph.sources().len(), 4);
        assert!(graph.topological_order().is_some());
    }

    fn assert_well_formed(graph: &Graph, n: usize, m: usize, k: usize, bound: Bound) {
        assert_eq!(graph.vertex_count(), n);
        assert_eq!(graph.edge_count(), m);
        assert_eq!(graph.sources().len(), k as u64);
        assert!(graph.max_out_degree() <= bound.cap(n));
        assert!(graph.topological_order().is_some());
        for u in graph.iter_vertices() {
            let targets: HashSet<Vertex> = graph.out_edges(u).iter().copied().collect();
            assert_eq!(targets.len(), graph.out_degree(u), "parallel edges at {}", u);
            if graph.family() == Family::Doag {
                assert!(graph.out_edges(u).iter().all(|v| *v < u));
            } else {
                assert!(graph.out_edges(u).windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    proptest! {
        #[test]
        fn sampled_doags_are_well_formed(params in arb_params(0..14, Bound::Unbounded), seed in any::<u64>()) {
            let mut memo = table(Family::Doag, params.n, params.m, Bound::Unbounded);
            let mut rng = StdRng::seed_from_u64(seed);
            let graph = sample_by_nmk(&mut rng, &mut memo, params.n, params.m, params.k).unwrap();
            assert_well_formed(&graph, params.n, params.m, params.k, Bound::Unbounded);
        }

        #[test]
        fn sampled_bounded_graphs_are_well_formed(params in arb_params(0..14, Bound::AtMost(2)), seed in any::<u64>()) {
            for family in [Family::Doag, Family::Ldag] {
                let mut memo = table(family, params.n, params.m, Bound::AtMost(2));
                let mut rng = StdRng::seed_from_u64(seed);
                let graph = sample_by_nmk(&mut rng, &mut memo, params.n, params.m, params.k).unwrap();
                assert_well_formed(&graph, params.n, params.m, params.k, Bound::AtMost(2));
            }
        }

        #[test]
        fn sampled_ldags_are_well_formed(params in arb_params(0..14, Bound::Unbounded), seed in any::<u64>()) {
            let mut memo = table(Family::Ldag, params.n, params.m, Bound::Unbounded);
            let mut rng = StdRng::seed_from_u64(seed);
            let graph = sample_by_nmk(&mut rng, &mut memo, params.n, params.m, params.k).unwrap();
            assert_well_formed(&graph, params.n, params.m, params.k, Bound::Unbounded);
        }
    }
}
