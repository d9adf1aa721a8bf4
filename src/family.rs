//! The two graph families and the out-degree bound shared by every counting
//! and sampling entry point.

use std::fmt;

/// Which recurrence a [`crate::MemoTable`] holds counts for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    /// Directed ordered acyclic graphs: out-edges of every vertex and the
    /// sources are ordered, graphs are counted up to isomorphism.
    Doag,
    /// Labelled DAGs on the vertex set `[1, n]`, out-edges unordered.
    Ldag,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Doag => f.write_str("DOAG"),
            Family::Ldag => f.write_str("LDAG"),
        }
    }
}

/// Maximum out-degree permitted at any vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Bound {
    #[default]
    Unbounded,
    AtMost(usize),
}

impl Bound {
    /// The effective cap on a graph with `n` vertices.  No vertex can have
    /// more than `n - 1` out-edges, so `n` stands in for "unbounded".
    #[inline]
    pub fn cap(self, n: usize) -> usize {
        match self {
            Bound::Unbounded => n,
            Bound::AtMost(d) => d.min(n),
        }
    }

    pub fn is_unbounded(self) -> bool {
        matches!(self, Bound::Unbounded)
    }

    /// Parses the integer used by the memo dump header, where `-1` means
    /// unbounded.
    pub fn from_dump_value(value: i64) -> Option<Bound> {
        match value {
            -1 => Some(Bound::Unbounded),
            v if v >= 0 => usize::try_from(v).ok().map(Bound::AtMost),
            _ => None,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Unbounded => f.write_str("-1"),
            Bound::AtMost(d) => write!(f, "{}", d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_caps_at_vertex_count() {
        assert_eq!(Bound::Unbounded.cap(7), 7);
        assert_eq!(Bound::AtMost(3).cap(7), 3);
        assert_eq!(Bound::AtMost(30).cap(7), 7);
    }

    #[test]
    fn dump_value_round_trips_through_display() {
        for bound in [Bound::Unbounded, Bound::AtMost(0), Bound::AtMost(4)] {
            let value: i64 = bound.to_string().parse().unwrap();
            assert_eq!(Bound::from_dump_value(value), Some(bound));
        }
        assert_eq!(Bound::from_dump_value(-2), None);
    }
}
