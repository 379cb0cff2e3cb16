// 🏗️ Parser Framework
// One parser per table layout, chosen by configuration or by sniffing

use crate::error::{PipelineError, Result};
use crate::fiscal::{parse_type_tag, FiscalYear};
use crate::hierarchy::{classify_row, parse_hierarchical, RowKind};
use crate::model::{FactRecord, ParseReport};
use crate::reshape::{is_type_subheader, melt_paired, melt_simple};
use crate::table::RawTable;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Layout - how a source table arranges its numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// States | 2012-13 | 2013-14 | ...
    Simple,
    /// States | 2012-13 (REx) | 2012-13 (CEx) | ...
    Paired,
    /// Total marker rows followed by component rows
    Hierarchical,
}

impl Layout {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            Layout::Simple => "Simple wide table",
            Layout::Paired => "Paired wide table",
            Layout::Hierarchical => "Hierarchical table",
        }
    }

    /// Short code, as written in configuration
    pub fn code(&self) -> &str {
        match self {
            Layout::Simple => "simple",
            Layout::Paired => "paired",
            Layout::Hierarchical => "hierarchical",
        }
    }

    /// Whether records of this layout carry a component
    pub fn has_component(&self) -> bool {
        matches!(self, Layout::Hierarchical)
    }

    /// Whether records of this layout carry a REx/CEx type
    pub fn has_kind(&self) -> bool {
        matches!(self, Layout::Paired)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Parsed - output of parser.parse()
#[derive(Debug, Clone)]
pub struct Parsed {
    pub records: Vec<FactRecord>,
    pub report: ParseReport,
}

// ============================================================================
// TABLE PARSER TRAIT
// ============================================================================

/// TableParser - turns a raw grid into fact records
///
/// Cell-level problems are recovered inside `parse` and show up in the
/// report. `Err` is reserved for layout violations and for the empty-result
/// signal.
pub trait TableParser: Send + Sync {
    /// Parse a raw table; `source` names it in errors and logs
    fn parse(&self, table: &RawTable, source: &str) -> Result<Parsed>;

    /// Get the layout this parser handles
    fn layout(&self) -> Layout;

    /// Get parser version (for provenance tracking)
    fn version(&self) -> &str {
        "1.0.0"
    }
}

/// An all-missing parse is as useless to a chart as no parse at all
fn non_empty(records: Vec<FactRecord>, report: ParseReport, source: &str) -> Result<Parsed> {
    if records.iter().all(|r| r.value.is_none()) {
        return Err(PipelineError::EmptyResult {
            dataset: source.to_string(),
        });
    }
    Ok(Parsed { records, report })
}

// ============================================================================
// PARSERS
// ============================================================================

/// Simple wide table parser
#[derive(Debug, Default)]
pub struct SimpleTableParser;

impl SimpleTableParser {
    pub fn new() -> Self {
        SimpleTableParser
    }
}

impl TableParser for SimpleTableParser {
    fn parse(&self, table: &RawTable, source: &str) -> Result<Parsed> {
        let (records, report) = melt_simple(table);
        non_empty(records, report, source)
    }

    fn layout(&self) -> Layout {
        Layout::Simple
    }
}

/// Revenue/capital paired table parser
#[derive(Debug, Default)]
pub struct PairedTableParser;

impl PairedTableParser {
    pub fn new() -> Self {
        PairedTableParser
    }
}

impl TableParser for PairedTableParser {
    fn parse(&self, table: &RawTable, source: &str) -> Result<Parsed> {
        let (records, report) = melt_paired(table)?;
        non_empty(records, report, source)
    }

    fn layout(&self) -> Layout {
        Layout::Paired
    }
}

/// Total-marker / component-row parser
#[derive(Debug, Default)]
pub struct HierarchicalTableParser;

impl HierarchicalTableParser {
    pub fn new() -> Self {
        HierarchicalTableParser
    }
}

impl TableParser for HierarchicalTableParser {
    fn parse(&self, table: &RawTable, source: &str) -> Result<Parsed> {
        let (records, report) = parse_hierarchical(table);
        non_empty(records, report, source)
    }

    fn layout(&self) -> Layout {
        Layout::Hierarchical
    }
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Get appropriate parser for a layout
pub fn get_parser(layout: Layout) -> Box<dyn TableParser> {
    match layout {
        Layout::Simple => Box::new(SimpleTableParser::new()),
        Layout::Paired => Box::new(PairedTableParser::new()),
        Layout::Hierarchical => Box::new(HierarchicalTableParser::new()),
    }
}

/// Guess the layout of an unconfigured table
///
/// # Strategy:
/// 1. Any row label that opens a state block → Hierarchical
/// 2. Period columns that pair up by year (second label repeats the year or
///    has none), with at least one piece of evidence for pairing: a repeated
///    year, a REx/CEx tag in a label, or a REx/CEx sub-header row → Paired
/// 3. Otherwise → Simple
pub fn detect_layout(table: &RawTable) -> Layout {
    let has_markers = table
        .rows()
        .iter()
        .any(|row| matches!(classify_row(&row[0]), RowKind::StateTotal(_)));
    if has_markers {
        return Layout::Hierarchical;
    }

    let labels = table.period_labels();
    let pairs_up = labels.len() >= 2
        && labels.len() % 2 == 0
        && labels.chunks(2).all(|pair| {
            let first = FiscalYear::from_label(&pair[0]);
            let second = FiscalYear::from_label(&pair[1]);
            first.is_some() && (second.is_none() || second == first)
        });
    if !pairs_up {
        return Layout::Simple;
    }

    let repeated_year = labels.chunks(2).any(|pair| {
        FiscalYear::from_label(&pair[1]).is_some()
            && FiscalYear::from_label(&pair[0]) == FiscalYear::from_label(&pair[1])
    });
    let tagged = labels.iter().any(|l| parse_type_tag(l).is_some());
    let subheader = table
        .rows()
        .iter()
        .find(|row| row.iter().any(|c| !c.is_empty()))
        .is_some_and(|row| is_type_subheader(row));

    if repeated_year || tagged || subheader {
        Layout::Paired
    } else {
        Layout::Simple
    }
}
