//! Report formatting.
//!
//! One line per feature identifier in lexicographic order, then the five
//! diagnostic lines in fixed order. Counts are stored as floats but whole
//! values are printed without a decimal point.

use anyhow::Result;
use std::io::Write;

use crate::counts::CountTable;

/// Format one count value: integer when whole, one decimal otherwise.
pub fn format_count(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

/// Write the final report.
pub fn write_report<W: Write>(writer: &mut W, counts: &CountTable) -> Result<()> {
    for (name, value) in counts.sorted_counts() {
        writeln!(writer, "{}\t{}", name, format_count(value))?;
    }
    writeln!(writer, "__no_feature\t{}", counts.no_feature)?;
    writeln!(writer, "__ambiguous\t{}", counts.ambiguous)?;
    writeln!(writer, "__too_low_aQual\t{}", counts.too_low_qual)?;
    writeln!(writer, "__not_aligned\t{}", counts.not_aligned)?;
    writeln!(writer, "__alignment_not_unique\t{}", counts.not_unique)?;
    Ok(())
}
