//! Overlap resolution: turning a read footprint into a feature-id set.
//!
//! All three policies are expressed over the step decomposition returned
//! by the interval index. An interval on a chromosome the index has never
//! seen is absorbed as a single empty-set step covering the whole
//! interval: union is unaffected, intersection-strict is forced toward
//! empty, intersection-nonempty ignores it. The read is never discarded
//! for touching an unknown chromosome.

use crate::config::OverlapMode;
use crate::index::{FeatureIndex, IdSet};
use crate::types::GenomicInterval;

/// Resolve the feature-id set for a footprint under the given policy.
pub fn resolve(footprint: &[GenomicInterval], index: &FeatureIndex, mode: OverlapMode) -> IdSet {
    match mode {
        OverlapMode::Union => resolve_union(footprint, index),
        OverlapMode::IntersectionStrict => resolve_intersection(footprint, index, true),
        OverlapMode::IntersectionNonempty => resolve_intersection(footprint, index, false),
    }
}

/// Union of every step's set over every interval of the footprint.
fn resolve_union(footprint: &[GenomicInterval], index: &FeatureIndex) -> IdSet {
    let mut out = IdSet::new();
    for iv in footprint {
        if let Some(steps) = index.steps(iv) {
            for (_, _, set) in steps {
                out.extend(set.iter().copied());
            }
        }
    }
    out
}

/// Running intersection over steps.
///
/// In strict mode every step participates, so an empty step drives the
/// result to empty. In nonempty mode empty steps are skipped entirely;
/// if no non-empty step is ever seen the result is empty.
fn resolve_intersection(
    footprint: &[GenomicInterval],
    index: &FeatureIndex,
    strict: bool,
) -> IdSet {
    let mut running: Option<IdSet> = None;
    for iv in footprint {
        match index.steps(iv) {
            Some(steps) => {
                for (_, _, set) in steps {
                    if strict || !set.is_empty() {
                        running = Some(match running.take() {
                            None => set.clone(),
                            Some(acc) => acc.intersection(set).copied().collect(),
                        });
                    }
                }
            }
            None => {
                if strict && !iv.is_empty() {
                    running = Some(IdSet::new());
                }
            }
        }
    }
    running.unwrap_or_default()
}
