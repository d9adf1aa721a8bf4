use thiserror::Error;

use crate::family::{Bound, Family};

/// Errors surfaced by the counting and sampling entry points.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested family is empty, so there is nothing to sample.
    #[error("no {family} exists with n={n}, m={m}, k={k} and out-degree bound {bound}")]
    InvalidParameters {
        family: Family,
        n: usize,
        m: usize,
        k: usize,
        bound: Bound,
    },
    /// No graph satisfies a constraint that leaves some parameters free.
    #[error("no {family} exists with {constraint} and out-degree bound {bound}")]
    EmptyFamily {
        family: Family,
        constraint: String,
        bound: Bound,
    },
    /// The parameters are feasible but exceed the memo table's dimensions.
    #[error("(n={n}, m={m}) lies outside a memo table allocated for N={max_vertices}, M={max_edges}")]
    OutsideMemo {
        n: usize,
        m: usize,
        max_vertices: usize,
        max_edges: usize,
    },
    #[error("failed to allocate {what}: {source}")]
    Allocation {
        what: &'static str,
        #[source]
        source: std::collections::TryReserveError,
    },
    #[error("memo dump was written for bound {found}, table expects {expected}")]
    BoundMismatch { expected: Bound, found: Bound },
    #[error("malformed memo dump at line {line}: {reason}")]
    MalformedDump { line: usize, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
