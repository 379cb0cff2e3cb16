// 🌳 Hierarchical Table Parser
//
// Component tables carry no state column. Instead each state's block opens
// with a total row and the component rows below it belong to that state:
//
//   Components           | 2012-13 | 2013-14
//   Goa (Total)          |  2,000  |  2,100     ← marker, not emitted
//   States' Own Tax      |  1,000  |  1,050     ← (Goa, States' Own Tax, ...)
//   Kerala (total)       |  ...
//   States' Own Tax      |    500  |    520     ← (Kerala, ...)
//
// Parsed in one pass with a single "current owner" variable.

use crate::fiscal::FiscalYear;
use crate::model::{FactRecord, ParseReport};
use crate::numeric::normalize_cell;
use crate::registry::{canonical_name, is_grand_total};
use crate::table::RawTable;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};

static TOTAL_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?P<name>.*?)\s*(?:(?P<paren>\(\s*total\s*\))|(?P<bare>\btotal))\s*$")
        .expect("valid total marker regex")
});

// ============================================================================
// ROW CLASSIFICATION
// ============================================================================

/// What a row label means to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    /// "<State> (Total)": opens a new state block
    StateTotal(String),
    /// Total row that belongs to no state ("Total", "All States (Total)")
    GrandTotal,
    /// Bare "<name> Total" where the name is not a known state: a subtotal
    /// when the name is a component of the current block, otherwise a block
    /// for an entity outside the registry
    BareTotal(String),
    /// Anything else: a component of the current state
    Component,
}

/// Classify a row label
///
/// The parenthesized form always opens a block, even for names the registry
/// does not know, so their components are never credited to the previous
/// state. The bare "<name> Total" form is a state marker when the name is a
/// known state; otherwise the parser decides from the rows already seen.
pub fn classify_row(label: &str) -> RowKind {
    let Some(caps) = TOTAL_MARKER.captures(label) else {
        return RowKind::Component;
    };
    let name = caps.name("name").map_or("", |m| m.as_str()).trim();

    if name.is_empty() || is_grand_total(name) || is_grand_total(label) {
        return RowKind::GrandTotal;
    }
    if caps.name("paren").is_some() || canonical_name(name).is_some() {
        RowKind::StateTotal(name.to_string())
    } else {
        RowKind::BareTotal(name.to_string())
    }
}

fn component_key(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

// ============================================================================
// STATE MACHINE
// ============================================================================

/// Owner of the component rows currently being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    /// No total row seen yet
    Unset,
    /// Inside a recognized state's block
    State(&'static str),
    /// Inside a block we must not attribute (grand total, unknown state)
    Ignored,
}

/// Flatten a hierarchical table into (state, component, year, value) records
///
/// Records keep source order. Missing and unparseable cells are skipped; a
/// cell that parses to zero is kept as 0.0.
pub fn parse_hierarchical(table: &RawTable) -> (Vec<FactRecord>, ParseReport) {
    let mut report = ParseReport::default();

    let years: Vec<(usize, FiscalYear)> = table
        .period_labels()
        .iter()
        .enumerate()
        .filter_map(|(i, label)| match FiscalYear::from_label(label) {
            Some(year) => Some((i + 1, year)),
            None => {
                warn!(column = %label, "skipping column without a fiscal year");
                report.skipped_columns.push(label.clone());
                None
            }
        })
        .collect();

    let mut owner = Owner::Unset;
    // lowercased component labels of the current block
    let mut block_components: HashSet<String> = HashSet::new();
    let mut records = Vec::new();

    for row in table.rows() {
        report.rows_read += 1;
        let label = row[0].trim();
        if label.is_empty() {
            continue;
        }

        match classify_row(label) {
            RowKind::StateTotal(name) => {
                block_components.clear();
                owner = match canonical_name(&name) {
                    Some(state) => Owner::State(state),
                    None => {
                        debug!(state = %name, "unrecognized state block");
                        report.note_unknown_entity(&name);
                        Owner::Ignored
                    }
                };
                continue;
            }
            RowKind::GrandTotal => {
                report.grand_total_rows += 1;
                block_components.clear();
                owner = Owner::Ignored;
                continue;
            }
            RowKind::BareTotal(name) => {
                if block_components.contains(&component_key(&name)) {
                    debug!(label, "skipping subtotal row");
                } else {
                    debug!(entity = %name, "unrecognized total row opens an ignored block");
                    report.note_unknown_entity(&name);
                    block_components.clear();
                    owner = Owner::Ignored;
                }
                continue;
            }
            RowKind::Component => {}
        }

        let state = match owner {
            Owner::State(state) => state,
            Owner::Unset => {
                debug!(label, "component row before any state total");
                report.orphan_rows += 1;
                continue;
            }
            Owner::Ignored => continue,
        };
        block_components.insert(component_key(label));

        for &(idx, year) in &years {
            match normalize_cell(&row[idx]) {
                Some(value) => {
                    records.push(FactRecord::new(state, year, Some(value)).with_component(label))
                }
                None => report.missing_cells += 1,
            }
        }
    }

    report.records = records.len();
    (records, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(records: &'a [FactRecord], state: &str, component: &str) -> Vec<&'a FactRecord> {
        records
            .iter()
            .filter(|r| r.entity == state && r.component.as_deref() == Some(component))
            .collect()
    }

    #[test]
    fn test_classify_row() {
        assert_eq!(classify_row("Maharashtra (total)"), RowKind::StateTotal("Maharashtra".to_string()));
        assert_eq!(classify_row("Goa(TOTAL)"), RowKind::StateTotal("Goa".to_string()));
        assert_eq!(classify_row("Tamil Nadu Total"), RowKind::StateTotal("Tamil Nadu".to_string()));
        assert_eq!(classify_row("Delhi (Total)"), RowKind::StateTotal("Delhi".to_string()));
        assert_eq!(classify_row("Total"), RowKind::GrandTotal);
        assert_eq!(classify_row("All States (Total)"), RowKind::GrandTotal);
        assert_eq!(
            classify_row("Internal Debt Total"),
            RowKind::BareTotal("Internal Debt".to_string())
        );
        assert_eq!(classify_row("Total Revenue"), RowKind::Component);
        assert_eq!(classify_row("States' Own Tax"), RowKind::Component);
        assert_eq!(classify_row("Subtotals"), RowKind::Component);
    }

    #[test]
    fn test_state_carried_forward() {
        let table = RawTable::from_strs(
            &["Components", "2012-13"],
            &[
                &["Own Tax", "999"],
                &["Goa (Total)", "2000"],
                &["Own Tax", "1,000"],
                &["Grants", "1,0x0"],
                &["Kerala (total)", "value"],
                &["Own Tax", "500"],
            ],
        );
        let (records, report) = parse_hierarchical(&table);

        assert_eq!(records.len(), 2);
        assert_eq!(find(&records, "Goa", "Own Tax")[0].value, Some(1000.0));
        assert!(find(&records, "Goa", "Grants").is_empty());
        assert_eq!(find(&records, "Kerala", "Own Tax")[0].value, Some(500.0));
        assert_eq!(records.iter().filter(|r| r.value == Some(999.0)).count(), 0);
        assert_eq!(report.orphan_rows, 1);
        assert_eq!(report.missing_cells, 1);
    }

    #[test]
    fn test_zero_is_preserved() {
        let table = RawTable::from_strs(
            &["Components", "2012-13", "2013-14"],
            &[&["Goa (Total)", "0", "0"], &["Grants", "0", "0.00"]],
        );
        let (records, _) = parse_hierarchical(&table);

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.value == Some(0.0)));
    }

    #[test]
    fn test_unknown_state_block_is_not_attributed() {
        let table = RawTable::from_strs(
            &["Components", "2012-13"],
            &[
                &["Goa (Total)", "1"],
                &["Own Tax", "1"],
                &["Delhi (Total)", "1"],
                &["Own Tax", "2"],
                &["All States (Total)", "9"],
                &["Own Tax", "3"],
            ],
        );
        let (records, report) = parse_hierarchical(&table);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entity, "Goa");
        assert_eq!(records[0].value, Some(1.0));
        assert_eq!(report.unknown_entities, vec!["Delhi".to_string()]);
        assert_eq!(report.grand_total_rows, 1);
    }

    #[test]
    fn test_subtotal_keeps_owner() {
        let table = RawTable::from_strs(
            &["Components", "2012-13"],
            &[
                &["Bihar Total", "10"],
                &["Internal Debt", "4"],
                &["Internal Debt Total", "4"],
                &["Loans from Centre", "6"],
            ],
        );
        let (records, _) = parse_hierarchical(&table);

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.entity == "Bihar"));
    }

    #[test]
    fn test_unknown_bare_total_opens_ignored_block() {
        let table = RawTable::from_strs(
            &["Components", "2012-13"],
            &[
                &["West Bengal Total", "100"],
                &["Own Tax", "60"],
                &["Jammu and Kashmir Total", "50"],
                &["Own Tax", "7"],
                &["NCT  Delhi Total", "20"],
                &["Own Tax", "3"],
                &["Goa Total", "9"],
                &["Own Tax", "9"],
            ],
        );
        let (records, report) = parse_hierarchical(&table);

        let west_bengal = find(&records, "West Bengal", "Own Tax");
        assert_eq!(west_bengal.len(), 1);
        assert_eq!(west_bengal[0].value, Some(60.0));
        assert_eq!(find(&records, "Goa", "Own Tax")[0].value, Some(9.0));
        assert_eq!(records.len(), 2);
        assert_eq!(
            report.unknown_entities,
            vec!["Jammu and Kashmir".to_string(), "NCT  Delhi".to_string()]
        );
    }

    #[test]
    fn test_subtotal_needs_a_component_of_the_block() {
        // "Internal Debt" belongs to Goa's block, not Bihar's
        let table = RawTable::from_strs(
            &["Components", "2012-13"],
            &[
                &["Goa Total", "5"],
                &["Internal Debt", "5"],
                &["Bihar Total", "10"],
                &["Internal Debt Total", "4"],
                &["Loans from Centre", "6"],
            ],
        );
        let (records, report) = parse_hierarchical(&table);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entity, "Goa");
        assert_eq!(report.unknown_entities, vec!["Internal Debt".to_string()]);
    }

    #[test]
    fn test_year_less_column_skipped() {
        let table = RawTable::from_strs(
            &["Components", "Unit", "2012-13", "2013-14"],
            &[&["Goa (Total)", "", "", ""], &["Own Tax", "Rs crore", "1", "2"]],
        );
        let (records, report) = parse_hierarchical(&table);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].year, 2012);
        assert_eq!(records[1].year, 2013);
        assert_eq!(report.skipped_columns, vec!["Unit".to_string()]);
    }

    #[test]
    fn test_only_markers_yields_nothing() {
        let table = RawTable::from_strs(&["Components", "2012-13"], &[&["Goa (Total)", "1"]]);
        let (records, report) = parse_hierarchical(&table);
        assert!(records.is_empty());
        assert_eq!(report.records, 0);
    }
}
