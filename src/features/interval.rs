//! Static interval index for IP → country lookup.
//!
//! Ranges may arrive unsorted and may overlap. A lookup must answer as if the
//! table were scanned in its original order and the first containing range
//! won. The index sorts entries by lower bound for binary search, keeps each
//! entry's original position for the tie-break, and stores a running maximum
//! of upper bounds so the backward scan can stop as soon as no earlier entry
//! can reach the point. Built once, then shared read-only.

use crate::error::EnrichError;
use crate::records::IpRange;

/// Label returned when no range contains the point.
pub const UNKNOWN_COUNTRY: &str = "Other";

#[derive(Debug, Clone)]
struct Entry {
    lower: u32,
    upper: u32,
    /// Position in the input table
    order: usize,
    label: String,
}

#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    /// Sorted by (lower, order)
    entries: Vec<Entry>,
    /// max_upper[i] = max(entries[..=i].upper)
    max_upper: Vec<u32>,
}

impl IntervalIndex {
    /// Build from ranges in any order. Fails if any range has lower > upper.
    pub fn build(ranges: Vec<IpRange>) -> Result<Self, EnrichError> {
        let mut entries = Vec::with_capacity(ranges.len());
        for (order, r) in ranges.into_iter().enumerate() {
            if r.lower > r.upper {
                return Err(EnrichError::InvalidRangeTable {
                    position: order,
                    lower: r.lower,
                    upper: r.upper,
                });
            }
            entries.push(Entry {
                lower: r.lower,
                upper: r.upper,
                order,
                label: r.label,
            });
        }
        entries.sort_by_key(|e| (e.lower, e.order));

        let mut max_upper = Vec::with_capacity(entries.len());
        let mut running = 0u32;
        for e in &entries {
            running = running.max(e.upper);
            max_upper.push(running);
        }

        tracing::debug!(ranges = entries.len(), "interval index built");
        Ok(Self { entries, max_upper })
    }

    /// Label of the first range (in input order) containing `point`, or "Other".
    pub fn lookup(&self, point: u32) -> &str {
        // Candidates are entries[..end], all with lower <= point.
        let end = self.entries.partition_point(|e| e.lower <= point);
        let mut best: Option<&Entry> = None;
        for i in (0..end).rev() {
            if self.max_upper[i] < point {
                break;
            }
            let e = &self.entries[i];
            if e.upper >= point && best.map_or(true, |b| e.order < b.order) {
                best = Some(e);
            }
        }
        best.map_or(UNKNOWN_COUNTRY, |e| e.label.as_str())
    }

    /// Lookup for an integer address that may fall outside the u32 domain.
    pub fn lookup_address(&self, ip: i64) -> &str {
        match u32::try_from(ip) {
            Ok(point) => self.lookup(point),
            Err(_) => UNKNOWN_COUNTRY,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// First-match scan over the table in its given order. O(n) per query.
pub fn linear_lookup(ranges: &[IpRange], point: u32) -> &str {
    ranges
        .iter()
        .find(|r| r.contains(point))
        .map_or(UNKNOWN_COUNTRY, |r| r.label.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlapping() -> Vec<IpRange> {
        vec![IpRange::new(0, 9, "A"), IpRange::new(5, 14, "B")]
    }

    #[test]
    fn first_match_wins_on_overlap() {
        let idx = IntervalIndex::build(overlapping()).unwrap();
        assert_eq!(idx.lookup(7), "A");
        assert_eq!(idx.lookup(12), "B");
        assert_eq!(idx.lookup(20), UNKNOWN_COUNTRY);
    }

    #[test]
    fn original_order_beats_sort_order() {
        // Wider range listed first but starting later than the narrow one.
        let ranges = vec![
            IpRange::new(50, 200, "wide"),
            IpRange::new(10, 100, "narrow"),
            IpRange::new(60, 70, "inner"),
        ];
        let idx = IntervalIndex::build(ranges).unwrap();
        assert_eq!(idx.lookup(65), "wide");
        assert_eq!(idx.lookup(20), "narrow");
        assert_eq!(idx.lookup(150), "wide");
    }

    #[test]
    fn long_range_seen_past_short_neighbours() {
        let ranges = vec![
            IpRange::new(0, 1000, "outer"),
            IpRange::new(10, 20, "x"),
            IpRange::new(30, 40, "y"),
        ];
        let idx = IntervalIndex::build(ranges).unwrap();
        assert_eq!(idx.lookup(35), "outer");
        assert_eq!(idx.lookup(500), "outer");
        assert_eq!(idx.lookup(1001), UNKNOWN_COUNTRY);
    }

    #[test]
    fn bounds_are_inclusive() {
        let idx = IntervalIndex::build(vec![IpRange::new(100, 200, "X")]).unwrap();
        assert_eq!(idx.lookup(100), "X");
        assert_eq!(idx.lookup(200), "X");
        assert_eq!(idx.lookup(99), UNKNOWN_COUNTRY);
        assert_eq!(idx.lookup(201), UNKNOWN_COUNTRY);
    }

    #[test]
    fn extreme_points() {
        let idx = IntervalIndex::build(vec![IpRange::new(u32::MAX, u32::MAX, "top")]).unwrap();
        assert_eq!(idx.lookup(u32::MAX), "top");
        assert_eq!(idx.lookup(0), UNKNOWN_COUNTRY);
    }

    #[test]
    fn empty_table_returns_other() {
        let idx = IntervalIndex::build(Vec::new()).unwrap();
        assert!(idx.is_empty());
        assert_eq!(idx.lookup(0), UNKNOWN_COUNTRY);
        assert_eq!(idx.lookup(u32::MAX), UNKNOWN_COUNTRY);
    }

    #[test]
    fn out_of_domain_addresses_return_other() {
        let idx = IntervalIndex::build(vec![IpRange::new(0, u32::MAX, "all")]).unwrap();
        assert_eq!(idx.lookup_address(-1), UNKNOWN_COUNTRY);
        assert_eq!(idx.lookup_address(u32::MAX as i64 + 1), UNKNOWN_COUNTRY);
        assert_eq!(idx.lookup_address(42), "all");
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = IntervalIndex::build(vec![IpRange::new(1, 2, "ok"), IpRange::new(9, 3, "bad")])
            .unwrap_err();
        assert!(matches!(
            err,
            EnrichError::InvalidRangeTable { position: 1, lower: 9, upper: 3 }
        ));
    }

    #[test]
    fn agrees_with_linear_scan() {
        // Deterministic pseudo-random overlapping table.
        let mut state = 0x2545_f491_u64;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 1000) as u32
        };
        let ranges: Vec<IpRange> = (0..200)
            .map(|i| {
                let a = next();
                let b = next();
                IpRange::new(a.min(b), a.max(b), format!("L{i}"))
            })
            .collect();
        let idx = IntervalIndex::build(ranges.clone()).unwrap();
        for p in 0..1100 {
            assert_eq!(idx.lookup(p), linear_lookup(&ranges, p), "point {p}");
        }
    }
}
