//! Strand labels.
//!
//! Senior high school strands are the three classes every question and every
//! respondent is tagged with. Uploaded sheets use either the short code or the
//! full programme name, so parsing accepts both.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the three recognized classification labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Strand {
    /// Science, Technology, Engineering and Mathematics.
    Stem,
    /// Accountancy and Business Management.
    Abm,
    /// Humanities and Social Sciences.
    Humss,
}

/// Error returned when a label is none of the recognized strands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized strand label '{0}'")]
pub struct ParseStrandError(pub String);

impl Strand {
    /// All strands in display order.
    pub const ALL: [Strand; 3] = [Self::Stem, Self::Abm, Self::Humss];

    /// Short code used on the wire and in sheets.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Stem => "STEM",
            Self::Abm => "ABM",
            Self::Humss => "HUMSS",
        }
    }

    /// Full programme name, lowercase.
    pub fn long_name(&self) -> &'static str {
        match self {
            Self::Stem => "science, technology, engineering and mathematics",
            Self::Abm => "accountancy and business management",
            Self::Humss => "humanities and social sciences",
        }
    }

    /// Parses a raw cell value into a strand.
    ///
    /// Accepts the short code in any case, or any text containing the full
    /// programme name (`&` is read as `and`). Returns `None` for empty or
    /// unrecognized labels.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(strand) = Self::ALL
            .into_iter()
            .find(|s| s.code().eq_ignore_ascii_case(trimmed))
        {
            return Some(strand);
        }
        let folded = fold_long_form(trimmed);
        Self::ALL
            .into_iter()
            .find(|s| folded.contains(s.long_name()))
    }
}

fn fold_long_form(value: &str) -> String {
    value
        .to_lowercase()
        .replace('&', "and")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Strand {
    type Err = ParseStrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseStrandError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_codes_any_case() {
        assert_eq!(Strand::parse("STEM"), Some(Strand::Stem));
        assert_eq!(Strand::parse(" abm "), Some(Strand::Abm));
        assert_eq!(Strand::parse("Humss"), Some(Strand::Humss));
    }

    #[test]
    fn test_parse_long_forms() {
        assert_eq!(
            Strand::parse("Science, Technology, Engineering and Mathematics (STEM)"),
            Some(Strand::Stem)
        );
        assert_eq!(
            Strand::parse("Accountancy & Business  Management"),
            Some(Strand::Abm)
        );
        assert_eq!(
            Strand::parse("Yes - Humanities and Social Sciences"),
            Some(Strand::Humss)
        );
    }

    #[test]
    fn test_parse_rejects_unknown_and_empty() {
        assert_eq!(Strand::parse(""), None);
        assert_eq!(Strand::parse("   "), None);
        assert_eq!(Strand::parse("GAS"), None);
        assert!("TVL".parse::<Strand>().is_err());
    }

    #[test]
    fn test_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Strand::Humss).unwrap(), "\"HUMSS\"");
        let strand: Strand = serde_json::from_str("\"ABM\"").unwrap();
        assert_eq!(strand, Strand::Abm);
    }
}
