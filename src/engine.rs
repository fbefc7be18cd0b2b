//! Counting driver: one sequential pass over the alignment stream.
//!
//! Per read (or pair), in fixed precedence order:
//!
//! 1. no usable footprint -> not-aligned;
//! 2. NH annotation > 1 -> alignment-not-unique; stop here when the
//!    multimap mode is `none`, otherwise fall through to resolution;
//! 3. MAPQ below minimum -> too-low-quality;
//! 4. resolve the footprint and classify by resolved-set size, then let
//!    the distributor add count credit for non-empty sets.
//!
//! Each step short-circuits, so every read lands in exactly one bucket or
//! contributes to feature counts; the one documented exception is a
//! non-unique read that still receives feature credit when the multimap
//! mode is not `none`.

use anyhow::{Context, Result};
use crossbeam_channel::Sender;

use crate::catalog::FeatureCatalog;
use crate::config::{Config, MultimapMode, PairOrder};
use crate::footprint::read_footprint;
use crate::reader::{
    mate_info, pair_mates, segment_from_record, AlignmentReader, PairBuffer, FLAG_MATE_UNMAPPED,
    FLAG_PAIRED, FLAG_SECOND_IN_PAIR,
};
use crate::resolve::resolve;
use crate::types::{Assignment, ReadRecord};

/// One annotated-output unit: the raw record(s) of a read or pair plus
/// the rendered assignment tag.
pub struct SamAnnotation {
    pub records: Vec<bam::Record>,
    pub assignment: String,
}

/// Run the counting pass. Returns the number of reads (single-end) or
/// pairs (paired-end) processed.
///
/// Paired-end mode is detected from the first record's paired flag. With
/// name-sorted input mates are taken from adjacent same-name records;
/// with position-sorted input (`--order pos`) each record is buffered
/// until the record claiming it as a mate arrives.
pub fn count_reads(
    reader: &mut AlignmentReader,
    catalog: &mut FeatureCatalog,
    config: &Config,
    samout: Option<&Sender<SamAnnotation>>,
) -> Result<u64> {
    let ref_names: Vec<String> = reader.header().reference_names().to_owned();

    let mut record = bam::Record::new();
    let mut processed: u64 = 0;
    let mut pe_mode: Option<bool> = None;
    let mut group: Vec<bam::Record> = Vec::new();
    let mut buffer: PairBuffer<bam::Record> = PairBuffer::new();

    loop {
        match reader.read_into(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read alignment record {}", processed + 1)
                })
            }
        }

        let paired = *pe_mode.get_or_insert_with(|| record.flag().all_bits(FLAG_PAIRED));
        if !paired {
            processed += 1;
            progress(processed, false, config);
            let segment = segment_from_record(&record, &ref_names);
            process_read(
                std::slice::from_ref(&record),
                ReadRecord::Single(segment),
                catalog,
                config,
                samout,
            )?;
        } else if config.order == PairOrder::Pos {
            if let Some((first, second)) = buffer.push(mate_info(&record), record.clone()) {
                processed += 1;
                progress(processed, true, config);
                process_pair(Some(first), Some(second), &ref_names, catalog, config, samout)?;
            }
        } else if group.last().map_or(true, |g| g.name() == record.name()) {
            group.push(record.clone());
        } else {
            process_group(&mut group, &ref_names, catalog, config, samout, &mut processed)?;
            group.push(record.clone());
        }
    }
    if !group.is_empty() {
        process_group(&mut group, &ref_names, catalog, config, samout, &mut processed)?;
    }

    let leftovers = buffer.drain();
    if !leftovers.is_empty() {
        eprintln!(
            "Warning: {} reads with missing mates encountered.",
            leftovers.len()
        );
    }
    for (first, second) in leftovers {
        processed += 1;
        progress(processed, true, config);
        process_pair(first, second, &ref_names, catalog, config, samout)?;
    }

    if !config.quiet {
        if pe_mode == Some(true) {
            eprintln!("{} SAM alignment pairs processed.", processed);
        } else {
            eprintln!("{} SAM alignments processed.", processed);
        }
    }
    Ok(processed)
}

fn progress(processed: u64, paired: bool, config: &Config) {
    if processed % 100_000 == 0 && !config.quiet {
        if paired {
            eprintln!("{} SAM alignment pairs processed.", processed);
        } else {
            eprintln!("{} SAM alignment records processed.", processed);
        }
    }
}

/// Pair up one name group and process each mate pair.
fn process_group(
    group: &mut Vec<bam::Record>,
    ref_names: &[String],
    catalog: &mut FeatureCatalog,
    config: &Config,
    samout: Option<&Sender<SamAnnotation>>,
    processed: &mut u64,
) -> Result<()> {
    let records = std::mem::take(group);
    for (first, second) in pair_mates(records, |r| r.flag().all_bits(FLAG_SECOND_IN_PAIR)) {
        *processed += 1;
        progress(*processed, true, config);

        // A half-pair whose record claims an aligned mate means the mate
        // was not on an adjacent line, which name-ordered pairing cannot
        // handle.
        if let (Some(r), None) | (None, Some(r)) = (&first, &second) {
            if !r.flag().all_bits(FLAG_MATE_UNMAPPED) && r.mate_ref_id() >= 0 {
                eprintln!(
                    "Warning: read {} claims to have an aligned mate which could not be \
                     found in an adjacent line; for position-sorted input use '--order pos'.",
                    String::from_utf8_lossy(r.name())
                );
            }
        }
        process_pair(first, second, ref_names, catalog, config, samout)?;
    }
    Ok(())
}

/// Process one mate pair (either side may be missing).
fn process_pair(
    first: Option<bam::Record>,
    second: Option<bam::Record>,
    ref_names: &[String],
    catalog: &mut FeatureCatalog,
    config: &Config,
    samout: Option<&Sender<SamAnnotation>>,
) -> Result<()> {
    let mate1 = first.as_ref().map(|r| segment_from_record(r, ref_names));
    let mate2 = second.as_ref().map(|r| segment_from_record(r, ref_names));
    let mut raw = Vec::with_capacity(2);
    raw.extend(first);
    raw.extend(second);
    process_read(
        &raw,
        ReadRecord::Paired(mate1, mate2),
        catalog,
        config,
        samout,
    )
}

/// Apply the per-read decision sequence to one read or pair.
fn process_read(
    raw: &[bam::Record],
    read: ReadRecord,
    catalog: &mut FeatureCatalog,
    config: &Config,
    samout: Option<&Sender<SamAnnotation>>,
) -> Result<()> {
    if !read.any_aligned() {
        catalog.counts.not_aligned += 1;
        emit(samout, raw, &Assignment::NotAligned);
        return Ok(());
    }

    if read.is_multimapped() {
        catalog.counts.not_unique += 1;
        emit(samout, raw, &Assignment::NotUnique);
        if config.multimap_mode == MultimapMode::None {
            return Ok(());
        }
    }

    if read.below_quality(config.min_qual) {
        catalog.counts.too_low_qual += 1;
        emit(samout, raw, &Assignment::TooLowQuality);
        return Ok(());
    }

    let footprint = read_footprint(&read, config.strand_mode)?;
    let resolved = resolve(&footprint, &catalog.index, config.overlap_mode);
    let ids: Vec<u32> = resolved.iter().copied().collect();

    match ids.as_slice() {
        [] => {
            catalog.counts.no_feature += 1;
            emit(samout, raw, &Assignment::NoFeature);
        }
        [single] => {
            let name = catalog.counts.name(*single).to_string();
            emit(samout, raw, &Assignment::Feature(name));
        }
        _ => {
            catalog.counts.ambiguous += 1;
            let mut names: Vec<String> = ids
                .iter()
                .map(|&id| catalog.counts.name(id).to_string())
                .collect();
            names.sort();
            emit(samout, raw, &Assignment::Ambiguous(names));
        }
    }

    if !ids.is_empty() {
        catalog.counts.distribute(&ids, config.multimap_mode);
    }
    Ok(())
}

fn emit(samout: Option<&Sender<SamAnnotation>>, records: &[bam::Record], assignment: &Assignment) {
    if let Some(tx) = samout {
        // A closed channel means the writer already failed; its error is
        // surfaced when the thread is joined.
        let _ = tx.send(SamAnnotation {
            records: records.to_vec(),
            assignment: assignment.to_string(),
        });
    }
}
