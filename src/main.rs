//! CLI entry point for featurecount.
//!
//! Validates all configuration up front, builds the feature catalog, runs
//! the counting pass and writes the report. The optional annotated SAM
//! output is written by a dedicated thread fed through a bounded channel,
//! and is flushed even when the counting pass fails.

use anyhow::{anyhow, bail, Context, Result};
use bam::{RecordWriter, SamWriter};
use clap::Parser;
use crossbeam_channel::{bounded, Receiver};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;

use featurecount::catalog::build_catalog;
use featurecount::config::{Config, MultimapMode, OverlapMode, PairOrder, StrandMode};
use featurecount::engine::{count_reads, SamAnnotation};
use featurecount::gtf::GtfReader;
use featurecount::output::write_report;
use featurecount::reader::{AlignmentReader, InputFormat};

/// Count reads mapping to genomic features.
///
/// Takes an alignment file in SAM/BAM format and a feature file in
/// GTF/GFF format and calculates for each feature the number of reads
/// mapping to it.
#[derive(Parser, Debug)]
#[command(name = "featurecount")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Alignment file in SAM or BAM format
    alignment_file: PathBuf,

    /// Feature file in GTF/GFF format (gzip supported)
    gtf_file: PathBuf,

    /// Type of alignment data: sam or bam (default: guessed from the
    /// file suffix)
    #[arg(short = 'f', long = "format")]
    format: Option<String>,

    /// Mode to handle reads overlapping more than one feature: union,
    /// intersection-strict or intersection-nonempty
    #[arg(short = 'm', long = "mode", default_value = "union")]
    mode: String,

    /// Whether the data is from a strand-specific assay: yes, no or
    /// reverse ('reverse' means 'yes' with reversed strand interpretation)
    #[arg(short = 's', long = "stranded", default_value = "yes")]
    stranded: String,

    /// Sorting order of the alignment file: name or pos. Paired-end data
    /// must be sorted either by read name or by position
    #[arg(short = 'r', long = "order", default_value = "name")]
    order: String,

    /// Skip all reads with MAPQ alignment quality lower than this value
    #[arg(short = 'a', long = "minaqual", default_value = "10")]
    minaqual: u8,

    /// Feature type (3rd column in the GTF file) to be used; all features
    /// of other type are ignored
    #[arg(short = 't', long = "type", default_value = "exon")]
    feature_type: String,

    /// GTF attribute to be used as feature ID
    #[arg(short = 'i', long = "idattr", default_value = "gene_id")]
    idattr: String,

    /// Whether to score reads that are not uniquely aligned or
    /// ambiguously assigned to features: none, all or fraction
    #[arg(long = "nonunique", default_value = "none")]
    nonunique: String,

    /// Write all alignment records to this SAM file, each annotated with
    /// its feature assignment in an XF tag
    #[arg(short = 'o', long = "samout")]
    samout: Option<PathBuf>,

    /// Write the counts to this file instead of stdout
    #[arg(short = 'c', long = "counts-output")]
    counts_output: Option<PathBuf>,

    /// Suppress progress report
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Validate inputs
    if !args.alignment_file.exists() {
        bail!("Alignment file not found: {}", args.alignment_file.display());
    }
    if !args.gtf_file.exists() {
        bail!("GTF file not found: {}", args.gtf_file.display());
    }

    // All mode strings are rejected here, before any processing begins.
    let overlap_mode = args.mode.parse::<OverlapMode>().context(
        "Mode can only be one of the following: union, intersection-strict or intersection-nonempty",
    )?;
    let strand_mode = args
        .stranded
        .parse::<StrandMode>()
        .context("Strandedness can only be one of the following: yes, no or reverse")?;
    let multimap_mode = args
        .nonunique
        .parse::<MultimapMode>()
        .context("Nonunique mode can only be one of the following: none, all or fraction")?;
    let order = args
        .order
        .parse::<PairOrder>()
        .context("Order can only be one of the following: name or pos")?;
    let format = match &args.format {
        Some(s) => s
            .parse::<InputFormat>()
            .context("Format can only be one of the following: sam or bam")?,
        None => InputFormat::from_path(&args.alignment_file),
    };

    let config = Config {
        overlap_mode,
        strand_mode,
        multimap_mode,
        order,
        min_qual: args.minaqual,
        feature_type: args.feature_type.clone(),
        id_attribute: args.idattr.clone(),
        quiet: args.quiet,
    };

    // Fail on an unwritable counts file now instead of after the full pass.
    if let Some(path) = &args.counts_output {
        File::create(path)
            .with_context(|| format!("Failed to create counts output file {}", path.display()))?;
    }

    if !config.quiet {
        eprintln!("Parsing GTF file: {}", args.gtf_file.display());
    }
    let gtf = GtfReader::from_path(&args.gtf_file)?;
    let mut catalog = build_catalog(gtf, &config)?;

    let mut reader = AlignmentReader::from_path(&args.alignment_file, format)?;

    if let Some(samout_path) = args.samout.clone() {
        let header = reader.header().clone();
        let (tx, rx) = bounded::<SamAnnotation>(1024);
        let writer_handle =
            thread::spawn(move || -> Result<()> { write_annotated_sam(&samout_path, header, rx) });

        let count_result = count_reads(&mut reader, &mut catalog, &config, Some(&tx));
        // Close the channel so the writer drains and flushes even when
        // the counting pass failed.
        drop(tx);
        writer_handle
            .join()
            .map_err(|_| anyhow!("SAM writer thread panicked"))??;
        count_result?;
    } else {
        count_reads(&mut reader, &mut catalog, &config, None)?;
    }

    match &args.counts_output {
        Some(path) => {
            let file = File::create(path).with_context(|| {
                format!("Failed to create counts output file {}", path.display())
            })?;
            let mut writer = BufWriter::new(file);
            write_report(&mut writer, &catalog.counts)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            write_report(&mut stdout.lock(), &catalog.counts)?;
        }
    }

    Ok(())
}

/// Drain the annotation channel into a SAM file, appending the assignment
/// tag to every record.
fn write_annotated_sam(
    path: &Path,
    header: bam::Header,
    rx: Receiver<SamAnnotation>,
) -> Result<()> {
    let mut writer = SamWriter::from_path(path, header)
        .with_context(|| format!("Failed to create SAM output file {}", path.display()))?;
    for annotation in rx {
        for mut record in annotation.records {
            record
                .tags_mut()
                .push_string(b"XF", annotation.assignment.as_bytes());
            writer
                .write(&record)
                .context("Failed to write annotated SAM record")?;
        }
    }
    writer.finish().context("Failed to flush SAM output")?;
    Ok(())
}
