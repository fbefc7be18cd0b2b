//! Configuration and defaults for featurecount.
//!
//! Mode strings are parsed into enums up front so that unknown modes are
//! rejected before any input is processed.

use std::fmt;
use std::str::FromStr;

/// How a read footprint is turned into a set of candidate features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapMode {
    Union,
    IntersectionStrict,
    IntersectionNonempty,
}

/// Error type for parsing an overlap mode from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOverlapModeError;

impl fmt::Display for ParseOverlapModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid overlap mode: expected 'union', 'intersection-strict' or 'intersection-nonempty'"
        )
    }
}

impl std::error::Error for ParseOverlapModeError {}

impl FromStr for OverlapMode {
    type Err = ParseOverlapModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "union" => Ok(OverlapMode::Union),
            "intersection-strict" => Ok(OverlapMode::IntersectionStrict),
            "intersection-nonempty" => Ok(OverlapMode::IntersectionNonempty),
            _ => Err(ParseOverlapModeError),
        }
    }
}

impl OverlapMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlapMode::Union => "union",
            OverlapMode::IntersectionStrict => "intersection-strict",
            OverlapMode::IntersectionNonempty => "intersection-nonempty",
        }
    }
}

impl fmt::Display for OverlapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strand interpretation of the sequencing protocol.
///
/// `Reverse` means stranded with reversed strand interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrandMode {
    Yes,
    No,
    Reverse,
}

/// Error type for parsing a strand mode from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStrandModeError;

impl fmt::Display for ParseStrandModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid strandedness: expected 'yes', 'no' or 'reverse'")
    }
}

impl std::error::Error for ParseStrandModeError {}

impl FromStr for StrandMode {
    type Err = ParseStrandModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(StrandMode::Yes),
            "no" => Ok(StrandMode::No),
            "reverse" => Ok(StrandMode::Reverse),
            _ => Err(ParseStrandModeError),
        }
    }
}

impl StrandMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrandMode::Yes => "yes",
            StrandMode::No => "no",
            StrandMode::Reverse => "reverse",
        }
    }

    /// True when the feature index must be built strand-aware.
    pub fn is_stranded(&self) -> bool {
        !matches!(self, StrandMode::No)
    }
}

impl fmt::Display for StrandMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sorting order of the alignment input, which selects the pairing
/// strategy for paired-end data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOrder {
    /// Name-sorted input; mates are adjacent records.
    Name,
    /// Position-sorted input; mates are matched through a buffer.
    Pos,
}

/// Error type for parsing a pair order from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePairOrderError;

impl fmt::Display for ParsePairOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid order: expected 'name' or 'pos'")
    }
}

impl std::error::Error for ParsePairOrderError {}

impl FromStr for PairOrder {
    type Err = ParsePairOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(PairOrder::Name),
            "pos" => Ok(PairOrder::Pos),
            _ => Err(ParsePairOrderError),
        }
    }
}

impl PairOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairOrder::Name => "name",
            PairOrder::Pos => "pos",
        }
    }
}

impl fmt::Display for PairOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How count credit is distributed when a read resolves to several
/// features or aligns in several places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultimapMode {
    /// Count only reads resolving to exactly one feature.
    None,
    /// Give every resolved feature a full count.
    All,
    /// Split one count evenly across the resolved features.
    Fraction,
}

/// Error type for parsing a multimap mode from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMultimapModeError;

impl fmt::Display for ParseMultimapModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid multimap mode: expected 'none', 'all' or 'fraction'"
        )
    }
}

impl std::error::Error for ParseMultimapModeError {}

impl FromStr for MultimapMode {
    type Err = ParseMultimapModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(MultimapMode::None),
            "all" => Ok(MultimapMode::All),
            "fraction" => Ok(MultimapMode::Fraction),
            _ => Err(ParseMultimapModeError),
        }
    }
}

impl MultimapMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MultimapMode::None => "none",
            MultimapMode::All => "all",
            MultimapMode::Fraction => "fraction",
        }
    }
}

impl fmt::Display for MultimapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for one counting run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Overlap resolution policy.
    pub overlap_mode: OverlapMode,
    /// Strand interpretation of the protocol.
    pub strand_mode: StrandMode,
    /// Multimapping accounting policy.
    pub multimap_mode: MultimapMode,
    /// Sorting order of the alignment input.
    pub order: PairOrder,
    /// Minimum MAPQ; reads below it are bucketed as too-low-quality.
    pub min_qual: u8,
    /// GTF feature type (3rd column) used as counting target.
    pub feature_type: String,
    /// GTF attribute used as feature identifier.
    pub id_attribute: String,
    /// Suppress progress reporting.
    pub quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            overlap_mode: OverlapMode::Union,
            strand_mode: StrandMode::Yes,
            multimap_mode: MultimapMode::None,
            order: PairOrder::Name,
            min_qual: 10,
            feature_type: "exon".to_string(),
            id_attribute: "gene_id".to_string(),
            quiet: false,
        }
    }
}

impl Config {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.overlap_mode, OverlapMode::Union);
        assert_eq!(config.strand_mode, StrandMode::Yes);
        assert_eq!(config.multimap_mode, MultimapMode::None);
        assert_eq!(config.order, PairOrder::Name);
        assert_eq!(config.min_qual, 10);
        assert_eq!(config.feature_type, "exon");
        assert_eq!(config.id_attribute, "gene_id");
    }

    #[test]
    fn test_parse_overlap_mode() {
        assert_eq!("union".parse::<OverlapMode>(), Ok(OverlapMode::Union));
        assert_eq!(
            "intersection-strict".parse::<OverlapMode>(),
            Ok(OverlapMode::IntersectionStrict)
        );
        assert_eq!(
            "intersection-nonempty".parse::<OverlapMode>(),
            Ok(OverlapMode::IntersectionNonempty)
        );
        assert!("intersection".parse::<OverlapMode>().is_err());
    }

    #[test]
    fn test_parse_strand_mode() {
        assert_eq!("yes".parse::<StrandMode>(), Ok(StrandMode::Yes));
        assert_eq!("no".parse::<StrandMode>(), Ok(StrandMode::No));
        assert_eq!("reverse".parse::<StrandMode>(), Ok(StrandMode::Reverse));
        assert!("forward".parse::<StrandMode>().is_err());
        assert!(StrandMode::Yes.is_stranded());
        assert!(StrandMode::Reverse.is_stranded());
        assert!(!StrandMode::No.is_stranded());
    }

    #[test]
    fn test_parse_pair_order() {
        assert_eq!("name".parse::<PairOrder>(), Ok(PairOrder::Name));
        assert_eq!("pos".parse::<PairOrder>(), Ok(PairOrder::Pos));
        assert!("position".parse::<PairOrder>().is_err());
    }

    #[test]
    fn test_parse_multimap_mode() {
        assert_eq!("none".parse::<MultimapMode>(), Ok(MultimapMode::None));
        assert_eq!("all".parse::<MultimapMode>(), Ok(MultimapMode::All));
        assert_eq!(
            "fraction".parse::<MultimapMode>(),
            Ok(MultimapMode::Fraction)
        );
        assert!("random".parse::<MultimapMode>().is_err());
    }
}
