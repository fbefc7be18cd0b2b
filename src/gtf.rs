//! Streaming GTF/GFF feature-record source.
//!
//! Produces a lazy, forward-only sequence of feature records. Malformed
//! records are fatal and reported with the file name and line number.
//! Gzip-compressed files are detected by the `.gz` suffix.

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::types::{GenomicInterval, Strand};

/// One raw feature record as read from the annotation file.
#[derive(Debug, Clone)]
pub struct GtfRecord {
    /// Feature type (3rd column, e.g. "exon").
    pub kind: String,
    /// 0-based half-open interval (converted from GTF 1-based inclusive).
    pub interval: GenomicInterval,
    /// Raw attribute column, parsed lazily with [`extract_attribute`].
    pub attributes: String,
    /// 1-based line number in the source file.
    pub line: u64,
}

/// Streaming reader over GTF records.
pub struct GtfReader {
    reader: Box<dyn BufRead + Send>,
    source: String,
    line: u64,
}

impl GtfReader {
    /// Open a plain or gzip-compressed GTF file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open GTF file {}", path.display()))?;
        let reader: Box<dyn BufRead + Send> = if path.to_string_lossy().ends_with(".gz") {
            Box::new(BufReader::new(GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(GtfReader {
            reader,
            source: path.display().to_string(),
            line: 0,
        })
    }

    /// Reader over in-memory GTF text, for tests and stdin-like sources.
    pub fn from_reader(reader: impl BufRead + Send + 'static, source: impl Into<String>) -> Self {
        GtfReader {
            reader: Box::new(reader),
            source: source.into(),
            line: 0,
        }
    }

    fn parse_line(&self, line: &str) -> Result<GtfRecord> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 9 {
            bail!(
                "{} line {}: expected 9 tab-separated fields, found {}",
                self.source,
                self.line,
                fields.len()
            );
        }
        let start: i64 = fields[3].parse().with_context(|| {
            format!("{} line {}: invalid start coordinate", self.source, self.line)
        })?;
        let end: i64 = fields[4].parse().with_context(|| {
            format!("{} line {}: invalid end coordinate", self.source, self.line)
        })?;
        // "+"/"-" are the only meaningful strands; "." and "?" both mean
        // unspecified.
        let strand = match fields[6] {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            _ => Strand::Unstranded,
        };
        Ok(GtfRecord {
            kind: fields[2].to_string(),
            interval: GenomicInterval::new(fields[0], start - 1, end, strand),
            attributes: fields[8].to_string(),
            line: self.line,
        })
    }
}

impl Iterator for GtfReader {
    type Item = Result<GtfRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    let line_no = self.line + 1;
                    return Some(Err(e).with_context(|| {
                        format!("{} line {}: read failed", self.source, line_no)
                    }));
                }
            }
            self.line += 1;
            let trimmed = line.trim_end();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return Some(self.parse_line(trimmed));
        }
    }
}

/// Extract an attribute value from a GTF/GFF attribute column.
///
/// Accepts both GTF style (`key "value";`) and GFF3 style (`key=value;`).
pub fn extract_attribute(attributes: &str, key: &str) -> Option<String> {
    for field in attributes.split(';') {
        let field = field.trim();
        if let Some(rest) = field.strip_prefix(key) {
            if !(rest.starts_with(' ') || rest.starts_with('=')) {
                continue;
            }
            let value = rest
                .trim_start_matches(|c| c == ' ' || c == '=')
                .trim()
                .trim_matches('"');
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
