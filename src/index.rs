//! Interval index mapping genomic positions to sets of feature ids.
//!
//! The index stores, per chromosome and (optionally) per strand, a step
//! vector: a sorted map from boundary position to the set of feature ids
//! covering every position from that boundary up to the next one. A query
//! decomposes an interval into maximal runs of constant feature-id set
//! ("steps"), which is the single primitive all overlap policies are
//! built on.
//!
//! Feature ids are interned `u32` handles; the count table owns the
//! mapping back to identifier strings.

use ahash::{AHashMap, AHashSet};
use std::collections::BTreeMap;
use std::ops::Bound;

use crate::types::{GenomicInterval, Strand};

/// A set of interned feature ids.
pub type IdSet = AHashSet<u32>;

/// One query step: a sub-interval over which the covering set is constant.
pub type Step<'a> = (i64, i64, &'a IdSet);

/// Step vector for a single chromosome strand.
#[derive(Debug)]
struct StepMap {
    /// Boundary position -> set covering [position, next boundary).
    /// A sentinel entry at `i64::MIN` guarantees every position has a
    /// governing step.
    steps: BTreeMap<i64, IdSet>,
}

impl StepMap {
    fn new() -> Self {
        let mut steps = BTreeMap::new();
        steps.insert(i64::MIN, IdSet::new());
        StepMap { steps }
    }

    /// Split the step containing `pos` so that a boundary exists at `pos`.
    fn ensure_boundary(&mut self, pos: i64) {
        if !self.steps.contains_key(&pos) {
            let below = self
                .steps
                .range(..pos)
                .next_back()
                .map(|(_, set)| set.clone())
                .unwrap_or_default();
            self.steps.insert(pos, below);
        }
    }

    fn insert(&mut self, start: i64, end: i64, id: u32) {
        if end <= start {
            return;
        }
        self.ensure_boundary(start);
        self.ensure_boundary(end);
        for (_, set) in self.steps.range_mut(start..end) {
            set.insert(id);
        }
    }

    /// Decompose `[start, end)` into steps, clipped to the query bounds
    /// and returned in positional order.
    fn steps(&self, start: i64, end: i64) -> Vec<Step<'_>> {
        let mut out = Vec::new();
        if end <= start {
            return out;
        }
        let mut run_start = start;
        let mut run_set = self.steps.range(..=start).next_back().map(|(_, set)| set);
        for (&boundary, set) in self
            .steps
            .range((Bound::Excluded(start), Bound::Excluded(end)))
        {
            if let Some(s) = run_set {
                out.push((run_start, boundary, s));
            }
            run_start = boundary;
            run_set = Some(set);
        }
        if let Some(s) = run_set {
            out.push((run_start, end, s));
        }
        out
    }
}

/// Per-chromosome step vectors, one per strand when strand-aware.
#[derive(Debug)]
struct ChromSteps {
    forward: StepMap,
    reverse: StepMap,
}

impl ChromSteps {
    fn new() -> Self {
        ChromSteps {
            forward: StepMap::new(),
            reverse: StepMap::new(),
        }
    }
}

/// Strand-aware (or strand-agnostic) index of feature intervals.
#[derive(Debug)]
pub struct FeatureIndex {
    stranded: bool,
    chroms: AHashMap<String, ChromSteps>,
}

impl FeatureIndex {
    /// Create an empty index. When `stranded` is false all intervals are
    /// stored and queried on a single strand-agnostic vector.
    pub fn new(stranded: bool) -> Self {
        FeatureIndex {
            stranded,
            chroms: AHashMap::new(),
        }
    }

    /// True when the index keeps separate step vectors per strand.
    pub fn is_stranded(&self) -> bool {
        self.stranded
    }

    /// True if at least one feature was inserted on this chromosome.
    pub fn contains_chrom(&self, name: &str) -> bool {
        self.chroms.contains_key(name)
    }

    /// Insert a feature interval tagged with an interned id. Intervals
    /// sharing an id accumulate; nothing is overwritten.
    pub fn insert(&mut self, iv: &GenomicInterval, id: u32) {
        let chrom = self
            .chroms
            .entry(iv.chrom.clone())
            .or_insert_with(ChromSteps::new);
        let map = if self.stranded && iv.strand == Strand::Reverse {
            &mut chrom.reverse
        } else {
            &mut chrom.forward
        };
        map.insert(iv.start, iv.end, id);
    }

    /// Query the steps covering an interval, in positional order.
    ///
    /// Returns `None` when the chromosome was never seen during catalog
    /// construction; callers absorb that as a no-feature condition.
    pub fn steps(&self, iv: &GenomicInterval) -> Option<Vec<Step<'_>>> {
        let chrom = self.chroms.get(&iv.chrom)?;
        let map = if self.stranded && iv.strand == Strand::Reverse {
            &chrom.reverse
        } else {
            &chrom.forward
        };
        Some(map.steps(iv.start, iv.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(chrom: &str, start: i64, end: i64, strand: Strand) -> GenomicInterval {
        GenomicInterval::new(chrom, start, end, strand)
    }

    fn ids(step: &Step<'_>) -> Vec<u32> {
        let mut v: Vec<u32> = step.2.iter().copied().collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn test_single_feature_steps() {
        let mut index = FeatureIndex::new(true);
        index.insert(&iv("chr1", 100, 300, Strand::Forward), 0);

        let steps = index
            .steps(&iv("chr1", 50, 350, Strand::Forward))
            .unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!((steps[0].0, steps[0].1), (50, 100));
        assert!(steps[0].2.is_empty());
        assert_eq!((steps[1].0, steps[1].1), (100, 300));
        assert_eq!(ids(&steps[1]), vec![0]);
        assert_eq!((steps[2].0, steps[2].1), (300, 350));
        assert!(steps[2].2.is_empty());
    }

    #[test]
    fn test_overlapping_features_decompose() {
        // geneA covers 100-300, geneB covers 150-180.
        let mut index = FeatureIndex::new(true);
        index.insert(&iv("chr1", 100, 300, Strand::Forward), 0);
        index.insert(&iv("chr1", 150, 180, Strand::Forward), 1);

        let steps = index
            .steps(&iv("chr1", 100, 200, Strand::Forward))
            .unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!((steps[0].0, steps[0].1), (100, 150));
        assert_eq!(ids(&steps[0]), vec![0]);
        assert_eq!((steps[1].0, steps[1].1), (150, 180));
        assert_eq!(ids(&steps[1]), vec![0, 1]);
        assert_eq!((steps[2].0, steps[2].1), (180, 200));
        assert_eq!(ids(&steps[2]), vec![0]);
    }

    #[test]
    fn test_query_clipped_to_bounds() {
        let mut index = FeatureIndex::new(true);
        index.insert(&iv("chr1", 100, 300, Strand::Forward), 0);

        let steps = index
            .steps(&iv("chr1", 150, 250, Strand::Forward))
            .unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!((steps[0].0, steps[0].1), (150, 250));
        assert_eq!(ids(&steps[0]), vec![0]);
    }

    #[test]
    fn test_unknown_chromosome() {
        let index = FeatureIndex::new(true);
        assert!(!index.contains_chrom("chrUn"));
        assert!(index
            .steps(&iv("chrUn", 0, 100, Strand::Forward))
            .is_none());
    }

    #[test]
    fn test_strands_kept_separate() {
        let mut index = FeatureIndex::new(true);
        index.insert(&iv("chr1", 100, 200, Strand::Forward), 0);

        let fwd = index
            .steps(&iv("chr1", 100, 200, Strand::Forward))
            .unwrap();
        assert_eq!(ids(&fwd[0]), vec![0]);

        let rev = index
            .steps(&iv("chr1", 100, 200, Strand::Reverse))
            .unwrap();
        assert!(rev.iter().all(|s| s.2.is_empty()));
    }

    #[test]
    fn test_strand_agnostic_index() {
        let mut index = FeatureIndex::new(false);
        index.insert(&iv("chr1", 100, 200, Strand::Forward), 0);

        let rev = index
            .steps(&iv("chr1", 100, 200, Strand::Reverse))
            .unwrap();
        assert_eq!(ids(&rev[0]), vec![0]);
    }

    #[test]
    fn test_shared_id_accumulates() {
        // Two exons of the same gene insert the same id twice.
        let mut index = FeatureIndex::new(true);
        index.insert(&iv("chr1", 100, 200, Strand::Forward), 0);
        index.insert(&iv("chr1", 400, 500, Strand::Forward), 0);

        let steps = index
            .steps(&iv("chr1", 100, 500, Strand::Forward))
            .unwrap();
        let covered: Vec<_> = steps.iter().filter(|s| !s.2.is_empty()).collect();
        assert_eq!(covered.len(), 2);
        assert_eq!(ids(covered[0]), vec![0]);
        assert_eq!(ids(covered[1]), vec![0]);
    }

    #[test]
    fn test_empty_query() {
        let mut index = FeatureIndex::new(true);
        index.insert(&iv("chr1", 100, 200, Strand::Forward), 0);
        let steps = index
            .steps(&iv("chr1", 150, 150, Strand::Forward))
            .unwrap();
        assert!(steps.is_empty());
    }
}
