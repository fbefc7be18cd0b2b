//! Count accumulation and multimap distribution.
//!
//! The count table is the only mutable state of the counting phase. It is
//! owned by the caller and passed by reference through the pipeline; the
//! distributor is its single writer.

use indexmap::IndexMap;

use crate::config::MultimapMode;

/// Per-feature accumulated counts plus the five diagnostic buckets.
///
/// Counts are stored as `f64` because the `fraction` multimap mode adds
/// fractional increments. Feature identifiers are interned to `u32`
/// handles (their insertion index) so the interval index can store small
/// ids instead of strings.
#[derive(Debug)]
pub struct CountTable {
    counts: IndexMap<String, f64>,
    /// Reads resolving to no feature.
    pub no_feature: u64,
    /// Reads resolving to more than one feature.
    pub ambiguous: u64,
    /// Reads below the MAPQ threshold.
    pub too_low_qual: u64,
    /// Reads (or pairs) with no aligned segment.
    pub not_aligned: u64,
    /// Reads flagged as multi-alignments via the NH annotation.
    pub not_unique: u64,
}

impl CountTable {
    pub fn new() -> Self {
        CountTable {
            counts: IndexMap::new(),
            no_feature: 0,
            ambiguous: 0,
            too_low_qual: 0,
            not_aligned: 0,
            not_unique: 0,
        }
    }

    /// Number of distinct feature identifiers.
    pub fn num_features(&self) -> usize {
        self.counts.len()
    }

    /// True when no feature was ever registered.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Register a feature identifier with a zero count and return its
    /// interned handle. Idempotent for repeated identifiers.
    pub fn intern(&mut self, id: &str) -> u32 {
        if let Some(index) = self.counts.get_index_of(id) {
            index as u32
        } else {
            let (index, _) = self.counts.insert_full(id.to_string(), 0.0);
            index as u32
        }
    }

    /// Identifier string for an interned handle.
    pub fn name(&self, id: u32) -> &str {
        self.counts
            .get_index(id as usize)
            .map(|(name, _)| name.as_str())
            .expect("interned feature id out of range")
    }

    /// Current count for an identifier, if registered.
    pub fn get(&self, id: &str) -> Option<f64> {
        self.counts.get(id).copied()
    }

    fn add(&mut self, id: u32, weight: f64) {
        if let Some((_, count)) = self.counts.get_index_mut(id as usize) {
            *count += weight;
        }
    }

    /// Distribute count credit for a non-empty resolved set.
    ///
    /// - `none`: a full count, but only when the set has exactly one
    ///   member; larger sets receive nothing.
    /// - `all`: a full count per member (total mass added = k).
    /// - `fraction`: 1/k per member (total mass added = 1).
    pub fn distribute(&mut self, resolved: &[u32], mode: MultimapMode) {
        match mode {
            MultimapMode::None => {
                if let [single] = resolved {
                    self.add(*single, 1.0);
                }
            }
            MultimapMode::All => {
                for &id in resolved {
                    self.add(id, 1.0);
                }
            }
            MultimapMode::Fraction => {
                let weight = 1.0 / resolved.len() as f64;
                for &id in resolved {
                    self.add(id, weight);
                }
            }
        }
    }

    /// Feature identifiers with their counts, sorted by identifier.
    pub fn sorted_counts(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<(&str, f64)> = self
            .counts
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Total feature mass accumulated so far.
    pub fn total_mass(&self) -> f64 {
        self.counts.values().sum()
    }
}

impl Default for CountTable {
    fn default() -> Self {
        Self::new()
    }
}
