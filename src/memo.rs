//! Sparse cache of exact counts indexed by `(n, m, k)`.
//!
//! Only the triples reachable under a given vertex ceiling `N`, edge ceiling
//! `M` and out-degree bound are stored.  Rows are keyed by `(n, k)` with
//! `2 <= n <= N` and `1 <= k < n`; the row for `(n, k)` covers the edge
//! counts `n - k ..= min(max_edges(n, k, bound), M)`.  All rows live
//! back-to-back in a single vector and are addressed through a table of row
//! offsets.
//!
//! A cell holding zero has not been computed yet: every feasible triple has
//! a strictly positive count.

use std::io::{BufRead, Write};
use std::ops::Range;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use tracing::debug;

use crate::counting::max_edges;
use crate::error::{Error, Result};
use crate::family::{Bound, Family};

pub struct MemoTable {
    family: Family,
    max_vertices: usize,
    max_edges: usize,
    bound: Bound,
    /// `row_offsets[r]..row_offsets[r + 1]` are the cells of row `r`.
    row_offsets: Vec<usize>,
    cells: Vec<BigUint>,
    zero: BigUint,
    one: BigUint,
}

impl std::fmt::Debug for MemoTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoTable")
            .field("family", &self.family)
            .field("max_vertices", &self.max_vertices)
            .field("max_edges", &self.max_edges)
            .field("bound", &self.bound)
            .field("cells", &self.cells.len())
            .field("filled", &self.filled_cell_count())
            .finish()
    }
}

#[inline]
fn row_index(n: usize, k: usize) -> usize {
    (n - 2) * (n - 1) / 2 + (k - 1)
}

/// Edge counts stored for the row `(n, k)`.  Empty when the row holds no
/// feasible triple below the edge ceiling.
fn row_edges(n: usize, k: usize, bound: Bound, edge_ceiling: usize) -> Range<usize> {
    let lo = n - k;
    let hi = max_edges(n, k, bound).min(edge_ceiling);
    if hi < lo {
        lo..lo
    } else {
        lo..hi + 1
    }
}

impl MemoTable {
    /// Allocates a table able to hold every count with at most
    /// `max_vertices` vertices and `max_edges` edges.  Every cell starts out
    /// as zero.
    pub fn new(family: Family, max_vertices: usize, max_edges: usize, bound: Bound) -> Result<Self> {
        let row_count = if max_vertices >= 2 {
            row_index(max_vertices, max_vertices - 1) + 1
        } else {
            0
        };

        let mut row_offsets: Vec<usize> = Vec::new();
        row_offsets
            .try_reserve_exact(row_count + 1)
            .map_err(|source| Error::Allocation {
                what: "memo row offsets",
                source,
            })?;
        row_offsets.push(0);
        let mut total = 0usize;
        for n in 2..=max_vertices {
            for k in 1..n {
                total += row_edges(n, k, bound, max_edges).len();
                row_offsets.push(total);
            }
        }

        let mut cells: Vec<BigUint> = Vec::new();
        cells
            .try_reserve_exact(total)
            .map_err(|source| Error::Allocation {
                what: "memo cells",
                source,
            })?;
        cells.resize(total, BigUint::zero());

        debug!(%family, max_vertices, max_edges, %bound, cells = total, "allocated memo table");

        Ok(Self {
            family,
            max_vertices,
            max_edges,
            bound,
            row_offsets,
            cells,
            zero: BigUint::zero(),
            one: BigUint::one(),
        })
    }

    /// Allocates a table sized by the header of a dump produced by
    /// [`MemoTable::dump`] and fills it with the dumped cells.
    pub fn from_dump<R: BufRead>(family: Family, mut reader: R) -> Result<Self> {
        let mut header = String::new();
        reader.read_line(&mut header)?;
        let (max_vertices, max_edges, bound) = parse_header(&header)?;
        let mut memo = Self::new(family, max_vertices, max_edges, bound)?;
        memo.load_cells(reader, 2)?;
        Ok(memo)
    }

    #[inline]
    pub fn family(&self) -> Family {
        self.family
    }

    #[inline]
    pub fn bound(&self) -> Bound {
        self.bound
    }

    #[inline]
    pub fn max_vertices(&self) -> usize {
        self.max_vertices
    }

    #[inline]
    pub fn max_edges(&self) -> usize {
        self.max_edges
    }

    /// Number of cells allocated, computed or not.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn filled_cell_count(&self) -> usize {
        self.cells.iter().filter(|value| !value.is_zero()).count()
    }

    /// Whether a feasible triple with `n` vertices and `m` edges can be
    /// stored.  Graphs with at most one vertex or without edges are never
    /// stored and always fit.
    pub fn covers(&self, n: usize, m: usize) -> bool {
        n <= 1 || m == 0 || (n <= self.max_vertices && m <= self.max_edges)
    }

    fn offset(&self, n: usize, m: usize, k: usize) -> Option<usize> {
        if n < 2 || n > self.max_vertices || k == 0 || k >= n {
            return None;
        }
        let edges = row_edges(n, k, self.bound, self.max_edges);
        if !edges.contains(&m) {
            return None;
        }
        let row = row_index(n, k);
        Some(self.row_offsets[row] + (m - edges.start))
    }

    /// The stored count of `(n, m, k)`, or zero when it has not been
    /// computed or lies outside the table.  The one-vertex graph, the empty
    /// graph and edgeless graphs are answered without a lookup.
    pub fn get(&self, n: usize, m: usize, k: usize) -> &BigUint {
        if m == 0 && k == n {
            return &self.one;
        }
        match self.offset(n, m, k) {
            Some(offset) => &self.cells[offset],
            None => &self.zero,
        }
    }

    /// Requires `(n, m, k)` to lie inside the table.  Panics otherwise.
    pub fn set(&mut self, n: usize, m: usize, k: usize, value: BigUint) {
        let offset = self.offset(n, m, k).unwrap_or_else(|| {
            panic!(
                "(n={}, m={}, k={}) is outside the memo table (N={}, M={}, bound={})",
                n, m, k, self.max_vertices, self.max_edges, self.bound
            )
        });
        self.cells[offset] = value;
    }

    /// Writes the header `N M bound` followed by one `n m k value` line per
    /// computed cell.
    pub fn dump<W: Write>(&self, output: &mut W) -> Result<()> {
        writeln!(output, "{} {} {}", self.max_vertices, self.max_edges, self.bound)?;
        let mut written = 0usize;
        for n in 2..=self.max_vertices {
            for k in 1..n {
                let start = self.row_offsets[row_index(n, k)];
                let edges = row_edges(n, k, self.bound, self.max_edges);
                for (m, value) in edges.clone().zip(&self.cells[start..start + edges.len()]) {
                    if !value.is_zero() {
                        writeln!(output, "{} {} {} {}", n, m, k, value)?;
                        written += 1;
                    }
                }
            }
        }
        debug!(cells = written, "dumped memo table");
        Ok(())
    }

    /// Reads a dump produced by [`MemoTable::dump`] into this table.  The
    /// dump must have been produced with the same bound and with dimensions
    /// not exceeding this table's.
    pub fn load<R: BufRead>(&mut self, mut reader: R) -> Result<()> {
        let mut header = String::new();
        reader.read_line(&mut header)?;
        let (max_vertices, max_edges, bound) = parse_header(&header)?;
        if bound != self.bound {
            return Err(Error::BoundMismatch {
                expected: self.bound,
                found: bound,
            });
        }
        if max_vertices > self.max_vertices || max_edges > self.max_edges {
            return Err(Error::OutsideMemo {
                n: max_vertices,
                m: max_edges,
                max_vertices: self.max_vertices,
                max_edges: self.max_edges,
            });
        }
        self.load_cells(reader, 2)
    }

    fn load_cells<R: BufRead>(&mut self, reader: R, first_line: usize) -> Result<()> {
        let mut loaded = 0usize;
        for (line_number, line) in (first_line..).zip(reader.lines()) {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let malformed = |reason: &str| Error::MalformedDump {
                line: line_number,
                reason: reason.to_string(),
            };
            let mut fields = line.split_whitespace();
            let mut next_usize = |name: &str| -> Result<usize> {
                fields
                    .next()
                    .ok_or_else(|| malformed(&format!("missing {}", name)))?
                    .parse::<usize>()
                    .map_err(|e| malformed(&format!("bad {}: {}", name, e)))
            };
            let n = next_usize("n")?;
            let m = next_usize("m")?;
            let k = next_usize("k")?;
            let value: BigUint = fields
                .next()
                .ok_or_else(|| malformed("missing value"))?
                .parse()
                .map_err(|e| malformed(&format!("bad value: {}", e)))?;
            if fields.next().is_some() {
                return Err(malformed("trailing fields"));
            }
            if !self.covers(n, m) {
                return Err(Error::OutsideMemo {
                    n,
                    m,
                    max_vertices: self.max_vertices,
                    max_edges: self.max_edges,
                });
            }
            let offset = self
                .offset(n, m, k)
                .ok_or_else(|| malformed("not a cell of the table"))?;
            self.cells[offset] = value;
            loaded += 1;
        }
        debug!(cells = loaded, "loaded memo table");
        Ok(())
    }
}

fn parse_header(header: &str) -> Result<(usize, usize, Bound)> {
    let malformed = |reason: String| Error::MalformedDump { line: 1, reason };
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() != 3 {
        return Err(malformed(format!(
            "expected `N M bound`, found {} fields",
            fields.len()
        )));
    }
    let max_vertices = fields[0]
        .parse::<usize>()
        .map_err(|e| malformed(format!("bad N: {}", e)))?;
    let max_edges = fields[1]
        .parse::<usize>()
        .map_err(|e| malformed(format!("bad M: {}", e)))?;
    let bound = fields[2]
        .parse::<i64>()
        .ok()
        .and_then(Bound::from_dump_value)
        .ok_or_else(|| malformed(format!("bad bound: {}", fields[2])))?;
    Ok((max_vertices, max_edges, bound))
}
