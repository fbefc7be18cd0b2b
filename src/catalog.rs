//! Feature catalog construction.
//!
//! Consumes a lazy sequence of feature records, validates each against the
//! configured type/attribute/strand rules, inserts the matching intervals
//! into the interval index and initializes the zero-count table. A
//! malformed feature set aborts the whole run; zero matching features is
//! only a warning.

use anyhow::Result;
use std::fmt;

use crate::config::Config;
use crate::counts::CountTable;
use crate::gtf::{extract_attribute, GtfRecord};
use crate::index::FeatureIndex;
use crate::types::Strand;

/// Fatal feature-definition errors.
#[derive(Debug)]
pub enum CatalogError {
    /// The configured id attribute is absent from a matching record.
    MissingAttribute {
        attribute: String,
        at: String,
        line: u64,
    },
    /// Strand-sensitive mode is enabled but a feature has no strand.
    StrandRequired { id: String, at: String, line: u64 },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::MissingAttribute {
                attribute,
                at,
                line,
            } => write!(
                f,
                "feature at {} (line {}) does not contain a '{}' attribute",
                at, line, attribute
            ),
            CatalogError::StrandRequired { id, at, line } => write!(
                f,
                "feature {} at {} (line {}) does not have strand information \
                 but strand-sensitive counting was requested; use --stranded=no",
                id, at, line
            ),
        }
    }
}

impl std::error::Error for CatalogError {}

/// The interval index plus the zero-initialized count table.
///
/// Built once before counting; read-only afterwards except for count
/// accumulation. Every id the index can return is interned in the table.
#[derive(Debug)]
pub struct FeatureCatalog {
    pub index: FeatureIndex,
    pub counts: CountTable,
}

/// Build the catalog from a stream of feature records.
///
/// Records whose type differs from the configured feature type are
/// skipped without error. Duplicate identifiers accumulate in the index
/// and share one count-table entry.
pub fn build_catalog(
    records: impl Iterator<Item = Result<GtfRecord>>,
    config: &Config,
) -> Result<FeatureCatalog> {
    let stranded = config.strand_mode.is_stranded();
    let mut index = FeatureIndex::new(stranded);
    let mut counts = CountTable::new();
    let mut processed = 0u64;

    for record in records {
        let record = record?;
        processed += 1;
        if processed % 100_000 == 0 && !config.quiet {
            eprintln!("{} GFF lines processed.", processed);
        }
        if record.kind != config.feature_type {
            continue;
        }
        let id = extract_attribute(&record.attributes, &config.id_attribute).ok_or_else(|| {
            CatalogError::MissingAttribute {
                attribute: config.id_attribute.clone(),
                at: record.interval.to_string(),
                line: record.line,
            }
        })?;
        if stranded && record.interval.strand == Strand::Unstranded {
            return Err(CatalogError::StrandRequired {
                id,
                at: record.interval.to_string(),
                line: record.line,
            }
            .into());
        }
        let handle = counts.intern(&id);
        index.insert(&record.interval, handle);
    }

    if !config.quiet {
        eprintln!("{} GFF lines processed.", processed);
    }
    if counts.is_empty() {
        eprintln!(
            "Warning: No features of type '{}' found.",
            config.feature_type
        );
    }

    Ok(FeatureCatalog { index, counts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrandMode;
    use crate::gtf::GtfReader;
    use crate::types::GenomicInterval;
    use std::io::Cursor;

    fn records(content: &str) -> GtfReader {
        GtfReader::from_reader(Cursor::new(content.to_string()), "test.gtf")
    }

    fn quiet_config() -> Config {
        Config {
            quiet: true,
            ..Config::default()
        }
    }

    #[test]
    fn test_builds_index_and_zero_counts() {
        let gtf = "chr1\tTEST\texon\t101\t300\t.\t+\t.\tgene_id \"geneA\";\n\
                   chr1\tTEST\texon\t151\t180\t.\t+\t.\tgene_id \"geneB\";\n\
                   chr1\tTEST\tgene\t101\t300\t.\t+\t.\tgene_id \"geneA\";\n";
        let catalog = build_catalog(records(gtf), &quiet_config()).unwrap();

        // The "gene" record is skipped; two exon features remain.
        assert_eq!(catalog.counts.num_features(), 2);
        assert_eq!(catalog.counts.get("geneA"), Some(0.0));
        assert_eq!(catalog.counts.get("geneB"), Some(0.0));
        assert!(catalog.index.contains_chrom("chr1"));
        assert!(!catalog.index.contains_chrom("chr2"));
    }

    #[test]
    fn test_shared_identifier_single_entry() {
        let gtf = "chr1\tTEST\texon\t101\t200\t.\t+\t.\tgene_id \"geneA\";\n\
                   chr1\tTEST\texon\t401\t500\t.\t+\t.\tgene_id \"geneA\";\n";
        let catalog = build_catalog(records(gtf), &quiet_config()).unwrap();
        assert_eq!(catalog.counts.num_features(), 1);

        // Both exon intervals are present in the index.
        let probe = GenomicInterval::new("chr1", 400, 500, Strand::Forward);
        let steps = catalog.index.steps(&probe).unwrap();
        assert!(steps.iter().any(|s| !s.2.is_empty()));
    }

    #[test]
    fn test_missing_attribute_is_fatal() {
        let gtf = "chr1\tTEST\texon\t101\t200\t.\t+\t.\ttranscript_id \"T1\";\n";
        let err = build_catalog(records(gtf), &quiet_config()).unwrap_err();
        let message = format!("{}", err);
        assert!(message.contains("gene_id"), "{}", message);
        assert!(message.contains("line 1"), "{}", message);
    }

    #[test]
    fn test_strand_required_when_stranded() {
        let gtf = "chr1\tTEST\texon\t101\t200\t.\t.\t.\tgene_id \"geneA\";\n";
        let err = build_catalog(records(gtf), &quiet_config()).unwrap_err();
        assert!(format!("{}", err).contains("strand"));
    }

    #[test]
    fn test_unstranded_feature_allowed_when_not_stranded() {
        let gtf = "chr1\tTEST\texon\t101\t200\t.\t.\t.\tgene_id \"geneA\";\n";
        let config = Config {
            strand_mode: StrandMode::No,
            quiet: true,
            ..Config::default()
        };
        let catalog = build_catalog(records(gtf), &config).unwrap();
        assert_eq!(catalog.counts.num_features(), 1);
    }

    #[test]
    fn test_zero_features_is_not_an_error() {
        let gtf = "chr1\tTEST\tgene\t101\t200\t.\t+\t.\tgene_id \"geneA\";\n";
        let catalog = build_catalog(records(gtf), &quiet_config()).unwrap();
        assert!(catalog.counts.is_empty());
    }

    #[test]
    fn test_parse_error_propagates() {
        let gtf = "chr1\tTEST\texon\t101\n";
        assert!(build_catalog(records(gtf), &quiet_config()).is_err());
    }
}
