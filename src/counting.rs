//! Exact counting of DOAGs and labelled DAGs by number of vertices `n`,
//! edges `m` and sources `k`.
//!
//! Both families obey the same decomposition: remove the most recently
//! added vertex `v`, which is always a source.  If `v` has out-degree `p`,
//! `q` of its out-edges point at vertices that are sources of the remaining
//! graph and only lose that status because of `v`, while the other `s = p - q`
//! edges point at vertices that already had an incoming edge.  The remaining
//! graph therefore has `n - 1` vertices, `m - p` edges and `k - 1 + q`
//! sources:
//!
//! ```text
//! count(n, m, k) = Σ_p Σ_s factor(n, k, p, s) · count(n - 1, m - p, k - 1 + q)
//! ```
//!
//! For labelled DAGs the right-hand side is additionally scaled by `n / k`
//! because any of the `k` sources may play the role of `v`.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use tracing::trace;

use crate::error::{Error, Result};
use crate::family::{Bound, Family};
use crate::memo::MemoTable;

/// The largest number of edges a graph with `n` vertices, `k` of them
/// sources, can have when no out-degree exceeds `bound`.
///
/// Requires `k <= n`.  Panics otherwise.
pub fn max_edges(n: usize, k: usize, bound: Bound) -> usize {
    assert!(k <= n);
    let bound = bound.cap(n);
    let c = bound.min(n - k);
    k * c + c * c.saturating_sub(1) / 2 + bound * (n - k - c)
}

/// Whether at least one graph with `n` vertices, `m` edges and `k` sources
/// exists.  Both families share the same existence region, and every
/// triple inside it has a strictly positive count.
pub fn is_feasible(n: usize, m: usize, k: usize, bound: Bound) -> bool {
    if n == 0 {
        return k == 0 && m == 0;
    }
    1 <= k && k <= n && n - k <= m && m <= max_edges(n, k, bound)
}

/// One summand of the decomposition of `(n, m, k)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Term {
    /// Out-degree of the removed vertex.
    pub p: usize,
    /// Out-edges pointing at vertices that are not sources of the subgraph.
    pub s: usize,
    /// Out-edges pointing at sources of the subgraph.
    pub q: usize,
    pub factor: BigUint,
    pub sub_edges: usize,
    pub sub_sources: usize,
}

/// Iterates over the non-vanishing terms of the decomposition of
/// `(n, m, k)` in the order counting and unranking both rely on: `p`
/// ascending, then `s` ascending.
///
/// The multiplicity factors are maintained incrementally.  For DOAGs the
/// factor of `(p, s)` is `C(p, s) · (n - k - q)^(s falling)`: the positions of
/// the `s` edges among the `p` ordered slots times an ordered choice of
/// their targets, the `q` reused sources being taken oldest first.  For
/// labelled DAGs it is `C(k - 1 + q, q) · C(n - k - q, s)`.
#[derive(Debug)]
pub struct Decomposition {
    family: Family,
    n: usize,
    m: usize,
    k: usize,
    bound: Bound,
    max_p: usize,
    p: usize,
    s: usize,
    /// `C(k - 1 + p, p)`, the factor at `s = 0` for labelled DAGs.
    row_factor: BigUint,
    factor: BigUint,
}

impl Decomposition {
    /// Requires `n >= 2` and `1 <= k <= n`.  Panics otherwise.
    pub fn new(family: Family, n: usize, m: usize, k: usize, bound: Bound) -> Self {
        assert!(n >= 2);
        assert!(1 <= k && k <= n);
        Self {
            family,
            n,
            m,
            k,
            bound,
            max_p: bound.cap(n).min(n - k),
            p: 0,
            s: 0,
            row_factor: BigUint::one(),
            factor: BigUint::one(),
        }
    }

    /// One past the largest `s` of the current row.  A single-source graph
    /// must keep a source after removing `v`, hence `q >= 1`.
    #[inline]
    fn s_end(&self) -> usize {
        if self.k == 1 {
            self.p
        } else {
            self.p + 1
        }
    }

    fn start_next_row(&mut self) {
        self.p += 1;
        self.s = 0;
        match self.family {
            Family::Doag => self.factor = BigUint::one(),
            Family::Ldag => {
                self.row_factor = &self.row_factor * (self.k - 1 + self.p) / self.p;
                self.factor = self.row_factor.clone();
            }
        }
    }

    /// The factor of `(p, s + 1)` given the factor of `(p, s)`.
    fn step(&self, s: usize, q: usize) -> BigUint {
        if q == 0 {
            return BigUint::zero();
        }
        let free = self.n - self.k - q + 1;
        match self.family {
            Family::Doag => &self.factor * free * q / (s + 1),
            Family::Ldag => &self.factor * free * q / ((s + 1) * (self.k - 1 + q)),
        }
    }
}

impl Iterator for Decomposition {
    type Item = Term;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.s >= self.s_end() {
                if self.p >= self.max_p {
                    return None;
                }
                self.start_next_row();
                continue;
            }

            let (p, s) = (self.p, self.s);
            let q = p - s;
            let next = self.step(s, q);
            let factor = std::mem::replace(&mut self.factor, next);
            self.s += 1;

            if p > self.m {
                continue;
            }
            let sub_edges = self.m - p;
            let sub_sources = self.k - 1 + q;
            if !is_feasible(self.n - 1, sub_edges, sub_sources, self.bound) {
                continue;
            }
            return Some(Term {
                p,
                s,
                q,
                factor,
                sub_edges,
                sub_sources,
            });
        }
    }
}

/// Makes sure the count of a feasible `(n, m, k)` is stored in `memo`, or
/// is one of the base values [`MemoTable::get`] answers directly.
///
/// Requires the triple to be feasible and covered by `memo`.
pub(crate) fn ensure(memo: &mut MemoTable, n: usize, m: usize, k: usize) {
    if n <= 1 || k == n || !memo.get(n, m, k).is_zero() {
        return;
    }

    let family = memo.family();
    let mut total = BigUint::zero();
    for term in Decomposition::new(family, n, m, k, memo.bound()) {
        ensure(memo, n - 1, term.sub_edges, term.sub_sources);
        total += term.factor * memo.get(n - 1, term.sub_edges, term.sub_sources);
    }
    assert!(
        !total.is_zero(),
        "no term contributes to the feasible {} triple (n={}, m={}, k={})",
        family,
        n,
        m,
        k
    );
    if family == Family::Ldag {
        total = total * n / k;
    }
    trace!(n, m, k, "filled memo cell");
    memo.set(n, m, k, total);
}

fn check_covered(memo: &MemoTable, n: usize, m: usize) -> Result<()> {
    if memo.covers(n, m) {
        Ok(())
    } else {
        Err(Error::OutsideMemo {
            n,
            m,
            max_vertices: memo.max_vertices(),
            max_edges: memo.max_edges(),
        })
    }
}

/// The number of graphs of `memo`'s family with `n` vertices, `m` edges,
/// `k` sources and out-degrees bounded by `memo`'s bound.
///
/// Infeasible parameters yield zero without touching the table.  Feasible
/// parameters beyond the table's ceilings yield [`Error::OutsideMemo`].
pub fn count(memo: &mut MemoTable, n: usize, m: usize, k: usize) -> Result<BigUint> {
    if !is_feasible(n, m, k, memo.bound()) {
        return Ok(BigUint::zero());
    }
    check_covered(memo, n, m)?;
    ensure(memo, n, m, k);
    Ok(memo.get(n, m, k).clone())
}

/// Sum of [`count`] over every number of sources.
pub fn count_by_nm(memo: &mut MemoTable, n: usize, m: usize) -> Result<BigUint> {
    let mut total = BigUint::zero();
    for k in 0..=n {
        total += count(memo, n, m, k)?;
    }
    Ok(total)
}

/// The largest edge count of any graph with `n` vertices under `bound`.
pub fn max_edges_any_sources(n: usize, bound: Bound) -> usize {
    (1..=n).map(|k| max_edges(n, k, bound)).max().unwrap_or(0)
}

/// Sum of [`count`] over every number of edges and sources.  The table must
/// cover every edge count reachable with `n` vertices.
pub fn count_by_n(memo: &mut MemoTable, n: usize) -> Result<BigUint> {
    check_covered(memo, n, max_edges_any_sources(n, memo.bound()))?;
    let mut total = BigUint::zero();
    for m in 0..=max_edges_any_sources(n, memo.bound()) {
        total += count_by_nm(memo, n, m)?;
    }
    Ok(total)
}

/// Sum of [`count`] over every number of vertices for single-source graphs
/// with `m` edges.  Such graphs have at most `m + 1` vertices.
pub fn count_by_m(memo: &mut MemoTable, m: usize) -> Result<BigUint> {
    let mut total = BigUint::zero();
    for n in 1..=m + 1 {
        total += count(memo, n, m, 1)?;
    }
    Ok(total)
}
