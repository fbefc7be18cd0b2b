//! Read footprint extraction.
//!
//! A footprint is the ordered sequence of reference intervals a read's
//! alignment actually matches, with strand inversion applied per the
//! configured protocol:
//!
//! - mode `reverse` inverts mate 1 (or a single-end read);
//! - mate 2 is always treated as the opposite strand of mate 1's
//!   effective orientation, so it is inverted in `yes`/`no` mode and
//!   left alone in `reverse` mode;
//! - mode `no` keeps the same interval sequence but the index is queried
//!   strand-agnostically, so the strands carried here are ignored.
//!
//! Unaligned or absent mates contribute nothing. The pair footprint is
//! mate 1's intervals followed by mate 2's.

use crate::config::StrandMode;
use crate::types::{AlignedSegment, GenomicInterval, InvalidStrandError, ReadRecord};

/// Extract the footprint of a read or mate pair.
pub fn read_footprint(
    read: &ReadRecord,
    mode: StrandMode,
) -> Result<Vec<GenomicInterval>, InvalidStrandError> {
    match read {
        ReadRecord::Single(seg) => {
            segment_intervals(Some(seg), matches!(mode, StrandMode::Reverse))
        }
        ReadRecord::Paired(mate1, mate2) => {
            let invert_first = matches!(mode, StrandMode::Reverse);
            let mut footprint = segment_intervals(mate1.as_ref(), invert_first)?;
            footprint.extend(segment_intervals(mate2.as_ref(), !invert_first)?);
            Ok(footprint)
        }
    }
}

fn segment_intervals(
    seg: Option<&AlignedSegment>,
    invert: bool,
) -> Result<Vec<GenomicInterval>, InvalidStrandError> {
    let seg = match seg {
        Some(seg) if seg.aligned => seg,
        _ => return Ok(Vec::new()),
    };
    if invert {
        seg.intervals.iter().map(|iv| iv.invert()).collect()
    } else {
        Ok(seg.intervals.clone())
    }
}
