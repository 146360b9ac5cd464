use std::ops::Range;

use crate::error::{Result, SchwarzError};

/// Overlapping partition of a 1D cell grid into subdomains.
///
/// Immutable once built. The controller only needs [`Tiling::count`]; the
/// range and neighbor queries are used when subdomains are constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Tiling {
    ranges: Vec<Range<usize>>,
    neighbors: Vec<Vec<usize>>,
}

impl Tiling {
    /// Builds a tiling from ordered global cell ranges.
    ///
    /// Requirements:
    /// - at least two ranges, none empty,
    /// - the first range starts at cell 0,
    /// - starts and ends strictly increase,
    /// - each range overlaps its successor by at least one cell.
    pub fn new(ranges: Vec<Range<usize>>) -> Result<Self> {
        if ranges.len() < 2 {
            return Err(SchwarzError::config(
                "tiling",
                format!("need at least 2 subdomains, got {}", ranges.len()),
            ));
        }
        if ranges[0].start != 0 {
            return Err(SchwarzError::config(
                "tiling",
                "first subdomain must start at cell 0",
            ));
        }
        for (i, r) in ranges.iter().enumerate() {
            if r.is_empty() {
                return Err(SchwarzError::config(
                    "tiling",
                    format!("subdomain {i} has an empty cell range {r:?}"),
                ));
            }
        }
        for (i, pair) in ranges.windows(2).enumerate() {
            let (a, b) = (&pair[0], &pair[1]);
            if b.start <= a.start || b.end <= a.end {
                return Err(SchwarzError::config(
                    "tiling",
                    format!("subdomains {i} and {} are not ordered left to right", i + 1),
                ));
            }
            if b.start >= a.end {
                return Err(SchwarzError::config(
                    "tiling",
                    format!("subdomains {i} and {} do not overlap", i + 1),
                ));
            }
        }

        let neighbors = (0..ranges.len())
            .map(|i| {
                (0..ranges.len())
                    .filter(|&j| j != i)
                    .filter(|&j| ranges[j].start < ranges[i].end && ranges[i].start < ranges[j].end)
                    .collect()
            })
            .collect();

        Ok(Self { ranges, neighbors })
    }

    /// Splits `cells` into `count` near-equal chunks and widens each by `overlap`
    /// cells on every interior side.
    pub fn line(cells: usize, count: usize, overlap: usize) -> Result<Self> {
        if overlap == 0 {
            return Err(SchwarzError::config(
                "overlap",
                "overlapping Schwarz needs an overlap of at least one cell",
            ));
        }
        if count == 0 || cells < count {
            return Err(SchwarzError::config(
                "tiling",
                format!("cannot split {cells} cells into {count} subdomains"),
            ));
        }
        let base = cells / count;
        let extra = cells % count;
        let mut start: usize = 0;
        let mut ranges = Vec::with_capacity(count);
        for i in 0..count {
            let len = base + usize::from(i < extra);
            let lo = start.saturating_sub(overlap);
            let hi = (start + len + overlap).min(cells);
            ranges.push(lo..hi);
            start += len;
        }
        Self::new(ranges)
    }

    pub fn count(&self) -> usize {
        self.ranges.len()
    }

    /// Global cell range owned (with overlap) by subdomain `domain`.
    pub fn range(&self, domain: usize) -> Range<usize> {
        self.ranges[domain].clone()
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Total number of global cells covered.
    pub fn cells(&self) -> usize {
        self.ranges.iter().map(|r| r.end).max().unwrap_or(0)
    }

    /// Subdomains whose ranges overlap `domain`.
    pub fn neighbors(&self, domain: usize) -> &[usize] {
        &self.neighbors[domain]
    }

    /// Finds the neighbor of `domain` holding global cell `cell`, preferring the
    /// nearest subdomain index. Returns the neighbor and the local index.
    pub fn locate_in_neighbor(&self, domain: usize, cell: usize) -> Option<(usize, usize)> {
        let mut candidates: Vec<usize> = self.neighbors[domain]
            .iter()
            .copied()
            .filter(|&j| self.ranges[j].contains(&cell))
            .collect();
        candidates.sort_by_key(|&j| j.abs_diff(domain));
        candidates
            .first()
            .map(|&j| (j, cell - self.ranges[j].start))
    }
}
