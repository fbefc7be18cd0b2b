//! featurecount - read-to-feature assignment and counting.
//!
//! This library assigns sequencing alignment records (SAM/BAM) to genomic
//! features (GTF/GFF) and accumulates per-feature read counts, in the
//! manner of htseq-count.
//!
//! # Pipeline
//!
//! - Parse feature records and build the [`catalog::FeatureCatalog`]: a
//!   strand-aware interval index of feature-id sets plus a
//!   zero-initialized count table.
//! - For each read (or name-paired mate pair), extract its footprint
//!   (reference intervals from CIGAR match operations, strand-adjusted
//!   per protocol), resolve it against the index under one of three
//!   overlap policies, and distribute count credit under one of three
//!   multimapping policies.
//! - Emit a report of per-feature counts plus five diagnostic buckets,
//!   and optionally an annotated copy of the input alignments.
//!
//! # Example
//!
//! ```ignore
//! use featurecount::config::Config;
//! use featurecount::catalog::build_catalog;
//! use featurecount::engine::count_reads;
//! use featurecount::gtf::GtfReader;
//! use featurecount::output::write_report;
//! use featurecount::reader::{AlignmentReader, InputFormat};
//! use std::path::Path;
//!
//! let config = Config::default();
//! let gtf = GtfReader::from_path(Path::new("annotations.gtf"))?;
//! let mut catalog = build_catalog(gtf, &config)?;
//! let mut reader = AlignmentReader::from_path(Path::new("reads.bam"), InputFormat::Bam)?;
//! count_reads(&mut reader, &mut catalog, &config, None)?;
//! write_report(&mut std::io::stdout().lock(), &catalog.counts)?;
//! ```

pub mod catalog;
pub mod config;
pub mod counts;
pub mod engine;
pub mod footprint;
pub mod gtf;
pub mod index;
pub mod output;
pub mod reader;
pub mod resolve;
pub mod types;

pub use catalog::{build_catalog, FeatureCatalog};
pub use config::{Config, MultimapMode, OverlapMode, PairOrder, StrandMode};
pub use counts::CountTable;
pub use index::FeatureIndex;
pub use types::{AlignedSegment, Assignment, GenomicInterval, ReadRecord, Strand};
