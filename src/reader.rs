//! Alignment-record source: SAM/BAM input via the `bam` crate.
//!
//! Wraps `BamReader`/`SamReader` behind one dispatch enum and converts raw
//! records into [`AlignedSegment`]s: the aligned flag, MAPQ, the reference
//! intervals covered by CIGAR match operations, and the NH multi-alignment
//! annotation. Name-grouped records are paired into mate tuples here.

use ahash::AHashMap;
use anyhow::{Context, Result};
use bam::record::cigar::Operation;
use bam::record::tags::TagValue;
use bam::{BamReader, RecordReader, SamReader};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use crate::types::{AlignedSegment, GenomicInterval, Strand};

/// SAM flag bits used by the counting pipeline.
pub const FLAG_PAIRED: u16 = 0x1;
pub const FLAG_UNMAPPED: u16 = 0x4;
pub const FLAG_MATE_UNMAPPED: u16 = 0x8;
pub const FLAG_SECOND_IN_PAIR: u16 = 0x80;

/// Input alignment format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Sam,
    Bam,
}

/// Error type for parsing an input format from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseInputFormatError;

impl fmt::Display for ParseInputFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid input format: expected 'sam' or 'bam'")
    }
}

impl std::error::Error for ParseInputFormatError {}

impl FromStr for InputFormat {
    type Err = ParseInputFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sam" => Ok(InputFormat::Sam),
            "bam" => Ok(InputFormat::Bam),
            _ => Err(ParseInputFormatError),
        }
    }
}

impl InputFormat {
    /// Guess the format from the file suffix; anything but `.bam` is SAM.
    pub fn from_path(path: &Path) -> InputFormat {
        if path.to_string_lossy().ends_with(".bam") {
            InputFormat::Bam
        } else {
            InputFormat::Sam
        }
    }
}

/// Reader over SAM or BAM alignment records.
pub enum AlignmentReader {
    Bam(BamReader<File>),
    Sam(SamReader<BufReader<File>>),
}

impl AlignmentReader {
    pub fn from_path(path: &Path, format: InputFormat) -> Result<Self> {
        match format {
            InputFormat::Bam => {
                let reader = BamReader::from_path(path, 0).with_context(|| {
                    format!("Failed to open BAM file {}", path.display())
                })?;
                Ok(AlignmentReader::Bam(reader))
            }
            InputFormat::Sam => {
                let reader = SamReader::from_path(path).with_context(|| {
                    format!("Failed to open SAM file {}", path.display())
                })?;
                Ok(AlignmentReader::Sam(reader))
            }
        }
    }

    pub fn header(&self) -> &bam::Header {
        match self {
            AlignmentReader::Bam(reader) => reader.header(),
            AlignmentReader::Sam(reader) => reader.header(),
        }
    }

    /// Read the next record into `record`; `Ok(false)` at end of stream.
    pub fn read_into(&mut self, record: &mut bam::Record) -> std::io::Result<bool> {
        match self {
            AlignmentReader::Bam(reader) => reader.read_into(record),
            AlignmentReader::Sam(reader) => reader.read_into(record),
        }
    }
}

/// Convert one raw record into its alignment state.
///
/// Reference names come from the file header; a reference id missing from
/// the header yields an empty chromosome name, which can never match the
/// catalog and so resolves to no feature.
pub fn segment_from_record(record: &bam::Record, ref_names: &[String]) -> AlignedSegment {
    let aligned = !record.flag().all_bits(FLAG_UNMAPPED) && record.ref_id() >= 0;
    let alignment_count = match record.tags().get(b"NH") {
        Some(TagValue::Int(n, _)) => Some(n),
        _ => None,
    };
    if !aligned {
        return AlignedSegment {
            aligned: false,
            mapq: record.mapq(),
            intervals: Vec::new(),
            alignment_count,
        };
    }

    let chrom = ref_names
        .get(record.ref_id() as usize)
        .cloned()
        .unwrap_or_default();
    let strand = if record.flag().is_reverse_strand() {
        Strand::Reverse
    } else {
        Strand::Forward
    };

    let mut intervals = Vec::new();
    let mut pos = record.start() as i64;
    for (len, op) in record.cigar().iter() {
        let len = len as i64;
        match op {
            Operation::AlnMatch | Operation::SeqMatch | Operation::SeqMismatch => {
                // Zero-length match operations are skipped.
                if len > 0 {
                    intervals.push(GenomicInterval::new(chrom.clone(), pos, pos + len, strand));
                }
                pos += len;
            }
            Operation::Deletion | Operation::Skip => pos += len,
            // Insertions and clips do not consume reference positions.
            _ => {}
        }
    }

    AlignedSegment {
        aligned: true,
        mapq: record.mapq(),
        intervals,
        alignment_count,
    }
}

/// Pair the records of one name group into mate tuples.
///
/// Records flagged second-in-pair are matched against the rest in order;
/// leftovers become half-pairs with a missing mate.
pub fn pair_mates<T>(records: Vec<T>, is_second: impl Fn(&T) -> bool) -> Vec<(Option<T>, Option<T>)> {
    let mut firsts = Vec::new();
    let mut seconds = Vec::new();
    for record in records {
        if is_second(&record) {
            seconds.push(record);
        } else {
            firsts.push(record);
        }
    }
    let n = firsts.len().max(seconds.len());
    let mut firsts = firsts.into_iter();
    let mut seconds = seconds.into_iter();
    let mut pairs = Vec::with_capacity(n);
    for _ in 0..n {
        pairs.push((firsts.next(), seconds.next()));
    }
    pairs
}

/// Identity of one mate for position-sorted pairing: the read name, which
/// mate it is, and the (reference, position) of itself and of its mate.
/// Unaligned sides carry `(-1, -1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MateInfo {
    pub name: Vec<u8>,
    pub second: bool,
    pub pos: (i32, i32),
    pub mate_pos: (i32, i32),
}

/// Extract the pairing identity of a record.
pub fn mate_info(record: &bam::Record) -> MateInfo {
    let aligned = !record.flag().all_bits(FLAG_UNMAPPED) && record.ref_id() >= 0;
    let mate_aligned = !record.flag().all_bits(FLAG_MATE_UNMAPPED) && record.mate_ref_id() >= 0;
    MateInfo {
        name: record.name().to_vec(),
        second: record.flag().all_bits(FLAG_SECOND_IN_PAIR),
        pos: if aligned {
            (record.ref_id(), record.start())
        } else {
            (-1, -1)
        },
        mate_pos: if mate_aligned {
            (record.mate_ref_id(), record.mate_start())
        } else {
            (-1, -1)
        },
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct PairKey {
    name: Vec<u8>,
    second: bool,
    a: (i32, i32),
    b: (i32, i32),
}

/// Mate matcher for position-sorted input.
///
/// Each record is held until the record that claims it as a mate arrives:
/// a buffered record is keyed on (name, which mate, mate position, own
/// position) and looked up with the two positions swapped and the mate
/// side flipped, so multi-alignments of one pair at different positions
/// never cross-match.
pub struct PairBuffer<T> {
    pending: AHashMap<PairKey, Vec<T>>,
}

impl<T> PairBuffer<T> {
    pub fn new() -> Self {
        PairBuffer {
            pending: AHashMap::new(),
        }
    }

    /// Offer one record; returns the completed (first, second) pair when
    /// its buffered mate was already seen.
    pub fn push(&mut self, info: MateInfo, item: T) -> Option<(T, T)> {
        let matekey = PairKey {
            name: info.name.clone(),
            second: !info.second,
            a: info.pos,
            b: info.mate_pos,
        };
        if let Some(bucket) = self.pending.get_mut(&matekey) {
            let mate = bucket.remove(0);
            if bucket.is_empty() {
                self.pending.remove(&matekey);
            }
            return Some(if info.second {
                (mate, item)
            } else {
                (item, mate)
            });
        }
        let key = PairKey {
            name: info.name,
            second: info.second,
            a: info.mate_pos,
            b: info.pos,
        };
        self.pending.entry(key).or_default().push(item);
        None
    }

    /// Records whose claimed mate never arrived, as half-pairs.
    pub fn drain(&mut self) -> Vec<(Option<T>, Option<T>)> {
        let mut out = Vec::new();
        for (key, bucket) in self.pending.drain() {
            for item in bucket {
                out.push(if key.second {
                    (None, Some(item))
                } else {
                    (Some(item), None)
                });
            }
        }
        out
    }
}

impl<T> Default for PairBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
