//! [proptest](https://docs.rs/proptest) strategies over parameter triples
//! `(n, m, k)` for which at least one graph exists.

use std::ops::Range;

use proptest::prelude::*;
use proptest::strategy::{NewTree, ValueTree};
use proptest::test_runner::TestRunner;

use crate::counting::{is_feasible, max_edges};
use crate::family::Bound;

/// Number of vertices, edges and sources of a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Params {
    pub n: usize,
    pub m: usize,
    pub k: usize,
}

impl Params {
    /// Brings `(n, m, k)` back into the existence region after `n` shrank.
    fn clamped(n: usize, m: usize, k: usize, bound: Bound) -> Self {
        if n == 0 {
            return Params { n: 0, m: 0, k: 0 };
        }
        let k = k.clamp(1, n);
        let m = m.clamp(n - k, max_edges(n, k, bound).max(n - k));
        if is_feasible(n, m, k, bound) {
            Params { n, m, k }
        } else {
            Params { n, m: 0, k: n }
        }
    }
}

/// Feasible triples with a vertex count drawn from `vertex_count` and
/// out-degrees bounded by `bound`.  Shrinks towards fewer edges first, then
/// towards fewer vertices.
pub fn arb_params(vertex_count: Range<usize>, bound: Bound) -> ParamsStrategy {
    ParamsStrategy {
        vertex_count,
        bound,
    }
}

#[derive(Debug)]
pub struct ParamsStrategy {
    vertex_count: Range<usize>,
    bound: Bound,
}

#[derive(Debug)]
pub struct ParamsValueTree {
    bound: Bound,
    min_vertices: usize,
    current: Params,
    previous: Option<Params>,
    exhausted: bool,
}

impl Strategy for ParamsStrategy {
    type Tree = ParamsValueTree;

    type Value = Params;

    fn new_tree(&self, runner: &mut TestRunner) -> NewTree<Self> {
        if self.vertex_count.is_empty() {
            panic!(
                "Invalid use of empty vertex count range {}..{}",
                self.vertex_count.start, self.vertex_count.end
            );
        }
        let rng = runner.rng();
        let n = rng.gen_range(self.vertex_count.clone());
        let current = if n == 0 {
            Params { n: 0, m: 0, k: 0 }
        } else {
            let k = rng.gen_range(1..=n);
            let max_m = max_edges(n, k, self.bound);
            if max_m < n - k {
                Params { n, m: 0, k: n }
            } else {
                Params {
                    n,
                    m: rng.gen_range(n - k..=max_m),
                    k,
                }
            }
        };

        Ok(ParamsValueTree {
            bound: self.bound,
            min_vertices: self.vertex_count.start,
            current,
            previous: None,
            exhausted: false,
        })
    }
}

impl ParamsValueTree {
    fn simpler(&self) -> Option<Params> {
        let Params { n, m, k } = self.current;
        if n > 0 && m > n - k {
            let lo = n - k;
            return Some(Params {
                n,
                m: lo + (m - lo) / 2,
                k,
            });
        }
        if n > self.min_vertices {
            return Some(Params::clamped(n - 1, m, k, self.bound));
        }
        None
    }
}

impl ValueTree for ParamsValueTree {
    type Value = Params;

    fn current(&self) -> Self::Value {
        self.current
    }

    fn simplify(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        match self.simpler() {
            Some(simpler) => {
                self.previous = Some(self.current);
                self.current = simpler;
                true
            }
            None => false,
        }
    }

    fn complicate(&mut self) -> bool {
        match self.previous.take() {
            Some(previous) => {
                self.current = previous;
                self.exhausted = true;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::test_runner::{TestCaseError, TestError};

    use super::*;

    proptest! {
        #[test]
        fn generated_params_are_feasible(params in arb_params(0..12, Bound::Unbounded)) {
            prop_assert!(is_feasible(params.n, params.m, params.k, Bound::Unbounded));
        }

        #[test]
        fn bounded_params_are_feasible(params in arb_params(0..12, Bound::AtMost(1))) {
            prop_assert!(is_feasible(params.n, params.m, params.k, Bound::AtMost(1)));
        }

        #[test]
        fn zero_bound_yields_edgeless(params in arb_params(1..6, Bound::AtMost(0))) {
            prop_assert_eq!(params.m, 0);
            prop_assert_eq!(params.k, params.n);
        }
    }

    #[test]
    fn shrinking_stays_feasible() {
        let mut tree = ParamsValueTree {
            bound: Bound::AtMost(2),
            min_vertices: 0,
            current: Params { n: 9, m: 14, k: 2 },
            previous: None,
            exhausted: false,
        };
        while tree.simplify() {
            let Params { n, m, k } = tree.current();
            assert!(is_feasible(n, m, k, Bound::AtMost(2)), "{:?}", tree.current());
        }
        assert_eq!(tree.current(), Params { n: 0, m: 0, k: 0 });
    }

    #[test]
    fn shrinks_to_smallest_failing_triple() {
        let mut runner = TestRunner::new(ProptestConfig {
            failure_persistence: None,
            ..ProptestConfig::default()
        });
        let result = runner.run(&arb_params(0..10, Bound::Unbounded), |params| {
            if params.n >= 3 {
                Err(TestCaseError::Fail("too many vertices".into()))
            } else {
                Ok(())
            }
        });
        match result {
            Err(TestError::Fail(_, params)) => {
                assert_eq!(params.n, 3);
                assert_eq!(params.m, 3 - params.k);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
