//! Core data structures for featurecount.
//!
//! This module contains the fundamental types used throughout the
//! read-to-feature assignment process.

use std::fmt;
use std::str::FromStr;

/// Strand orientation for genomic intervals and features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
    /// Strand unspecified ("." in GTF).
    Unstranded,
}

/// Error type for inverting an unstranded interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStrandError;

impl fmt::Display for InvalidStrandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot invert an interval without strand information")
    }
}

impl std::error::Error for InvalidStrandError {}

impl FromStr for Strand {
    type Err = InvalidStrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            "." => Ok(Strand::Unstranded),
            _ => Err(InvalidStrandError),
        }
    }
}

impl Strand {
    /// Convert strand to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
            Strand::Unstranded => ".",
        }
    }

    /// Swap forward and reverse. Fails on [`Strand::Unstranded`].
    pub fn inverted(&self) -> Result<Strand, InvalidStrandError> {
        match self {
            Strand::Forward => Ok(Strand::Reverse),
            Strand::Reverse => Ok(Strand::Forward),
            Strand::Unstranded => Err(InvalidStrandError),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A half-open, 0-based interval on a reference sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenomicInterval {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
}

impl GenomicInterval {
    /// Create a new interval.
    pub fn new(chrom: impl Into<String>, start: i64, end: i64, strand: Strand) -> Self {
        GenomicInterval {
            chrom: chrom.into(),
            start,
            end,
            strand,
        }
    }

    /// Interval length (end - start).
    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    /// True if the interval covers no positions.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Return a copy with forward and reverse strand swapped.
    ///
    /// Fails with [`InvalidStrandError`] when the interval is unstranded.
    pub fn invert(&self) -> Result<GenomicInterval, InvalidStrandError> {
        Ok(GenomicInterval {
            chrom: self.chrom.clone(),
            start: self.start,
            end: self.end,
            strand: self.strand.inverted()?,
        })
    }
}

impl fmt::Display for GenomicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.chrom, self.start, self.end, self.strand
        )
    }
}

/// One mate's alignment state, decoupled from the underlying SAM/BAM record.
#[derive(Debug, Clone)]
pub struct AlignedSegment {
    /// Whether this segment is aligned to the reference at all.
    pub aligned: bool,
    /// Mapping quality (MAPQ).
    pub mapq: u8,
    /// Reference intervals covered by CIGAR match operations, in order.
    pub intervals: Vec<GenomicInterval>,
    /// Number of reported equally-good alignments (NH tag), if present.
    pub alignment_count: Option<i64>,
}

impl AlignedSegment {
    /// An unaligned placeholder segment.
    pub fn unaligned() -> Self {
        AlignedSegment {
            aligned: false,
            mapq: 0,
            intervals: Vec::new(),
            alignment_count: None,
        }
    }

    /// True if the NH annotation reports more than one alignment.
    pub fn is_multimapped(&self) -> bool {
        matches!(self.alignment_count, Some(n) if n > 1)
    }
}

/// One unit of counting work: a single-end read or a mate pair.
///
/// For pairs, either mate may be missing (mate never observed) or present
/// but unaligned.
#[derive(Debug, Clone)]
pub enum ReadRecord {
    Single(AlignedSegment),
    Paired(Option<AlignedSegment>, Option<AlignedSegment>),
}

impl ReadRecord {
    /// True if at least one segment is aligned.
    pub fn any_aligned(&self) -> bool {
        match self {
            ReadRecord::Single(seg) => seg.aligned,
            ReadRecord::Paired(a, b) => {
                a.as_ref().map_or(false, |s| s.aligned) || b.as_ref().map_or(false, |s| s.aligned)
            }
        }
    }

    /// True if any present mate reports more than one alignment.
    pub fn is_multimapped(&self) -> bool {
        match self {
            ReadRecord::Single(seg) => seg.is_multimapped(),
            ReadRecord::Paired(a, b) => {
                a.as_ref().map_or(false, |s| s.is_multimapped())
                    || b.as_ref().map_or(false, |s| s.is_multimapped())
            }
        }
    }

    /// True if any present mate falls below the quality threshold.
    ///
    /// Absent mates do not contribute to the check.
    pub fn below_quality(&self, min_qual: u8) -> bool {
        match self {
            ReadRecord::Single(seg) => seg.mapq < min_qual,
            ReadRecord::Paired(a, b) => {
                a.as_ref().map_or(false, |s| s.mapq < min_qual)
                    || b.as_ref().map_or(false, |s| s.mapq < min_qual)
            }
        }
    }
}

/// The mutually exclusive classification of one read or pair.
///
/// Rendered as the assignment tag appended to annotated SAM output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// Resolved to exactly one feature.
    Feature(String),
    /// Resolved to no feature at all.
    NoFeature,
    /// Resolved to more than one feature; ids sorted lexicographically.
    Ambiguous(Vec<String>),
    NotAligned,
    TooLowQuality,
    NotUnique,
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assignment::Feature(id) => write!(f, "{}", id),
            Assignment::NoFeature => write!(f, "__no_feature"),
            Assignment::Ambiguous(ids) => write!(f, "__ambiguous[{}]", ids.join("+")),
            Assignment::NotAligned => write!(f, "__not_aligned"),
            Assignment::TooLowQuality => write!(f, "__too_low_aQual"),
            Assignment::NotUnique => write!(f, "__alignment_not_unique"),
        }
    }
}
