//! Exact counting and uniform random generation of directed acyclic graphs.
//!
//! Two families are supported, each optionally with a bound on out-degrees:
//!
//! * **DOAGs** (directed ordered acyclic graphs): the out-edges of every
//!   vertex, as well as the sources, are ordered, and graphs are considered
//!   up to isomorphism.
//! * **Labelled DAGs** on the vertex set `[1, n]`, out-edges unordered.
//!
//! # Entry points
//!
//! Counts are memoized in a [`MemoTable`] sized for the largest query; see
//! [`count`].  Uniform samples are drawn either by unranking against the
//! same table ([`sample_by_nmk`] and its marginal variants), or, for DOAGs of
//! a given size without any bound, by rejection without any table
//! ([`sample_unbounded_n`]).
//!
//! ```
//! use rand::SeedableRng;
//! use randdag::{count, sample_by_nmk, Bound, Family, MemoTable};
//!
//! let mut memo = MemoTable::new(Family::Doag, 10, 20, Bound::Unbounded).unwrap();
//! assert_eq!(count(&mut memo, 4, 3, 1).unwrap(), 5u32.into());
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let graph = sample_by_nmk(&mut rng, &mut memo, 10, 20, 3).unwrap();
//! assert_eq!(graph.edge_count(), 20);
//! ```

pub mod counting;
pub mod error;
pub mod family;
pub mod graph;
pub mod memo;
pub mod random;
pub mod rejection;
pub mod sampling;
pub mod strategy;

pub use counting::{count, count_by_m, count_by_n, count_by_nm, is_feasible, max_edges};
pub use error::{Error, Result};
pub use family::{Bound, Family};
pub use graph::{Graph, Vertex};
pub use memo::MemoTable;
pub use rejection::{sample_unbounded_n, sample_unbounded_n_with_stats, RejectionStats};
pub use sampling::{sample_by_m, sample_by_n, sample_by_nm, sample_by_nmk};
pub use strategy::{arb_params, Params};
