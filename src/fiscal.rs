// 📅 Fiscal year and column label parsing
// "2012-13" → 2012, "2012-13_REx" → (2012, Revenue)

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{4})(?:\D|$)").expect("valid year regex"));

static TYPE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[^a-z])(rex|cex)(?:[^a-z]|$)").expect("valid type regex"));

// ============================================================================
// EXPENDITURE TYPE
// ============================================================================

/// Measurement type carried by paired (revenue/capital) tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExpenditureType {
    #[serde(rename = "REx")]
    Revenue,
    #[serde(rename = "CEx")]
    Capital,
}

impl ExpenditureType {
    /// Short code used in column labels and exports
    pub fn code(&self) -> &'static str {
        match self {
            ExpenditureType::Revenue => "REx",
            ExpenditureType::Capital => "CEx",
        }
    }

    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            ExpenditureType::Revenue => "Revenue Expenditure",
            ExpenditureType::Capital => "Capital Expenditure",
        }
    }

    /// Parse a code ("REx"/"CEx", any case)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "rex" => Some(ExpenditureType::Revenue),
            "cex" => Some(ExpenditureType::Capital),
            _ => None,
        }
    }
}

impl fmt::Display for ExpenditureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// FISCAL YEAR
// ============================================================================

/// Fiscal year identified by its starting calendar year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FiscalYear(pub i32);

impl FiscalYear {
    pub fn start(&self) -> i32 {
        self.0
    }

    /// Conventional label, e.g. 2012 → "2012-13"
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.0, (self.0 + 1).rem_euclid(100))
    }

    /// Extract the first standalone 4-digit token from a label
    pub fn from_label(label: &str) -> Option<Self> {
        YEAR_TOKEN
            .captures(label)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .map(FiscalYear)
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Find a type tag anywhere in a label ("2012-13_CEx", "REx")
pub fn parse_type_tag(label: &str) -> Option<ExpenditureType> {
    TYPE_TAG
        .captures(label)
        .and_then(|c| c.get(1))
        .and_then(|m| ExpenditureType::from_code(m.as_str()))
}

/// A parsed year column header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLabel {
    pub year: FiscalYear,
    pub kind: Option<ExpenditureType>,
}

impl ColumnLabel {
    /// `None` when the label has no 4-digit year token
    pub fn parse(label: &str) -> Option<Self> {
        let year = FiscalYear::from_label(label)?;
        Some(ColumnLabel {
            year,
            kind: parse_type_tag(label),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_from_label() {
        assert_eq!(FiscalYear::from_label("2012-13"), Some(FiscalYear(2012)));
        assert_eq!(FiscalYear::from_label(" 2022-23 (BE)"), Some(FiscalYear(2022)));
        assert_eq!(FiscalYear::from_label("FY2019"), Some(FiscalYear(2019)));
        assert_eq!(FiscalYear::from_label("States"), None);
        assert_eq!(FiscalYear::from_label("Unnamed: 2"), None);
        assert_eq!(FiscalYear::from_label("123456"), None);
    }

    #[test]
    fn test_label_roundtrip() {
        assert_eq!(FiscalYear(2012).label(), "2012-13");
        assert_eq!(FiscalYear(1999).label(), "1999-00");
        assert_eq!(FiscalYear(2012).to_string(), "2012-13");
    }

    #[test]
    fn test_column_label_with_type() {
        let label = ColumnLabel::parse("2012-13_REx").unwrap();
        assert_eq!(label.year, FiscalYear(2012));
        assert_eq!(label.kind, Some(ExpenditureType::Revenue));

        let label = ColumnLabel::parse("2013-14_CEx").unwrap();
        assert_eq!(label.kind, Some(ExpenditureType::Capital));

        let label = ColumnLabel::parse("2013-14").unwrap();
        assert_eq!(label.kind, None);
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(ExpenditureType::from_code("rex"), Some(ExpenditureType::Revenue));
        assert_eq!(ExpenditureType::from_code(" CEx "), Some(ExpenditureType::Capital));
        assert_eq!(ExpenditureType::from_code("Total"), None);
        assert_eq!(parse_type_tag("Complex"), None);
        assert_eq!(ExpenditureType::Capital.to_string(), "CEx");
    }
}
