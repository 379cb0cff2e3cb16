// ↔️ Wide-to-Long Reshaper
//
// Simple tables:  States | 2012-13 | 2013-14 | ...
// Paired tables:  States | 2012-13 | 2012-13 | 2013-14 | 2013-14 | ...
//                        |   REx   |   CEx   |   REx   |   CEx   |
//
// Output is one FactRecord per (entity, column) cell, missing cells
// included as explicit-missing, sorted by (year, entity).

use crate::error::{PipelineError, Result};
use crate::fiscal::{parse_type_tag, ColumnLabel, ExpenditureType, FiscalYear};
use crate::model::{sort_canonical, FactRecord, ParseReport};
use crate::numeric::normalize_cell;
use crate::registry::{canonical_name, is_grand_total};
use crate::table::RawTable;
use tracing::{debug, warn};

/// Positional type assignment within each pair of columns
const PAIR_ORDER: [ExpenditureType; 2] = [ExpenditureType::Revenue, ExpenditureType::Capital];

// ============================================================================
// ROW FILTERING
// ============================================================================

/// Resolve a row label to a state, recording why a row was dropped
fn row_entity(label: &str, report: &mut ParseReport) -> Option<&'static str> {
    if label.is_empty() {
        return None;
    }
    if is_grand_total(label) {
        report.grand_total_rows += 1;
        debug!(label, "dropping grand total row");
        return None;
    }
    match canonical_name(label) {
        Some(name) => Some(name),
        None => {
            debug!(label, "dropping row with unrecognized entity");
            report.note_unknown_entity(label);
            None
        }
    }
}

fn push_cell(
    records: &mut Vec<FactRecord>,
    report: &mut ParseReport,
    entity: &str,
    column: ColumnLabel,
    cell: &str,
) {
    let value = normalize_cell(cell);
    if value.is_none() {
        report.missing_cells += 1;
    }
    let mut fact = FactRecord::new(entity, column.year, value);
    if let Some(kind) = column.kind {
        fact = fact.with_kind(kind);
    }
    records.push(fact);
}

// ============================================================================
// SIMPLE WIDE TABLE
// ============================================================================

/// Melt a table whose period columns are year labels
///
/// Labels may carry a type suffix ("2012-13_REx"), which lands in `kind`.
/// Columns without a year token are skipped, not fatal.
pub fn melt_simple(table: &RawTable) -> (Vec<FactRecord>, ParseReport) {
    let mut report = ParseReport::default();

    let columns: Vec<(usize, ColumnLabel)> = table
        .period_labels()
        .iter()
        .enumerate()
        .filter_map(|(i, label)| match ColumnLabel::parse(label) {
            Some(parsed) => Some((i + 1, parsed)),
            None => {
                warn!(column = %label, "skipping column without a fiscal year");
                report.skipped_columns.push(label.clone());
                None
            }
        })
        .collect();

    let mut records = Vec::with_capacity(table.rows().len() * columns.len());
    for row in table.rows() {
        report.rows_read += 1;
        let Some(entity) = row_entity(&row[0], &mut report) else {
            continue;
        };
        for &(idx, column) in &columns {
            push_cell(&mut records, &mut report, entity, column, &row[idx]);
        }
    }

    sort_canonical(&mut records);
    report.records = records.len();
    (records, report)
}

// ============================================================================
// PAIRED WIDE TABLE
// ============================================================================

/// Validate the pair layout and return one label per value column
///
/// Every pair must start with a year; the second label repeats that year or
/// has none (a spreadsheet "Unnamed: N" placeholder). Explicit type tags
/// must agree with the positional order.
pub fn paired_columns(labels: &[String]) -> Result<Vec<ColumnLabel>> {
    if labels.len() % 2 != 0 {
        return Err(PipelineError::Layout(format!(
            "expected an even number of period columns, found {}",
            labels.len()
        )));
    }

    let mut columns = Vec::with_capacity(labels.len());
    for (pair_idx, pair) in labels.chunks(2).enumerate() {
        let year = FiscalYear::from_label(&pair[0]).ok_or_else(|| {
            PipelineError::Layout(format!(
                "pair {} starts with '{}', which has no fiscal year",
                pair_idx + 1,
                pair[0]
            ))
        })?;

        if let Some(second) = FiscalYear::from_label(&pair[1]) {
            if second != year {
                return Err(PipelineError::Layout(format!(
                    "pair {} mixes years '{}' and '{}'",
                    pair_idx + 1,
                    pair[0],
                    pair[1]
                )));
            }
        }

        for (label, expected) in pair.iter().zip(PAIR_ORDER) {
            if let Some(tag) = parse_type_tag(label) {
                if tag != expected {
                    return Err(PipelineError::Layout(format!(
                        "column '{}' is tagged {} but sits in the {} position",
                        label,
                        tag,
                        expected
                    )));
                }
            }
            columns.push(ColumnLabel {
                year,
                kind: Some(expected),
            });
        }
    }
    Ok(columns)
}

/// A row whose value cells are type tags ("REx", "CEx") rather than numbers
pub(crate) fn is_type_subheader(row: &[String]) -> bool {
    let cells = &row[1..];
    cells.iter().any(|c| !c.is_empty())
        && cells
            .iter()
            .all(|c| c.is_empty() || ExpenditureType::from_code(c).is_some())
}

fn check_subheader(row: &[String], columns: &[ColumnLabel]) -> Result<()> {
    for (cell, column) in row[1..].iter().zip(columns) {
        if let Some(tag) = ExpenditureType::from_code(cell) {
            if Some(tag) != column.kind {
                return Err(PipelineError::Layout(format!(
                    "sub-header tags {} for the {} column of {}",
                    tag,
                    column.kind.map(|k| k.code()).unwrap_or("?"),
                    column.year
                )));
            }
        }
    }
    Ok(())
}

/// Melt a revenue/capital paired table
///
/// The first column of each year pair is revenue expenditure, the second
/// capital expenditure. Only the leading row may be a REx/CEx sub-header;
/// tag-only rows further down are ordinary rows.
pub fn melt_paired(table: &RawTable) -> Result<(Vec<FactRecord>, ParseReport)> {
    let columns = paired_columns(table.period_labels())?;
    let mut report = ParseReport::default();
    let mut records = Vec::with_capacity(table.rows().len() * columns.len());

    for (i, row) in table.rows().iter().enumerate() {
        if i == 0 && is_type_subheader(row) {
            check_subheader(row, &columns)?;
            debug!("dropping REx/CEx sub-header row");
            continue;
        }
        report.rows_read += 1;
        let Some(entity) = row_entity(&row[0], &mut report) else {
            continue;
        };
        for (offset, &column) in columns.iter().enumerate() {
            push_cell(&mut records, &mut report, entity, column, &row[offset + 1]);
        }
    }

    sort_canonical(&mut records);
    report.records = records.len();
    Ok((records, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_melt_simple() {
        let table = RawTable::from_strs(
            &["States", "2012-13", "2013-14"],
            &[&["Kerala", "1,000", "1,100"], &["Goa", "200", "-"]],
        );
        let (records, report) = melt_simple(&table);

        assert_eq!(records.len(), 4);
        assert_eq!(records[0], FactRecord::new("Goa", FiscalYear(2012), Some(200.0)));
        assert_eq!(records[1], FactRecord::new("Kerala", FiscalYear(2012), Some(1000.0)));
        assert_eq!(records[2], FactRecord::new("Goa", FiscalYear(2013), None));
        assert_eq!(records[3], FactRecord::new("Kerala", FiscalYear(2013), Some(1100.0)));
        assert_eq!(report.missing_cells, 1);
        assert_eq!(report.records, 4);
    }

    #[test]
    fn test_grand_total_rows_never_appear() {
        let table = RawTable::from_strs(
            &["States", "2012-13"],
            &[
                &["Goa", "1"],
                &["Total", "10"],
                &["ALL STATES", "10"],
                &["india total", "10"],
                &["Grand Total", "10"],
            ],
        );
        let (records, report) = melt_simple(&table);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entity, "Goa");
        assert_eq!(report.grand_total_rows, 4);
    }

    #[test]
    fn test_unknown_entities_and_year_less_columns() {
        let table = RawTable::from_strs(
            &["States", "Notes", "2012-13"],
            &[&["Delhi", "x", "5"], &["orissa", "y", "7"], &["", "", "3"]],
        );
        let (records, report) = melt_simple(&table);

        assert_eq!(records, vec![FactRecord::new("Odisha", FiscalYear(2012), Some(7.0))]);
        assert_eq!(report.skipped_columns, vec!["Notes".to_string()]);
        assert_eq!(report.unknown_entities, vec!["Delhi".to_string()]);
    }

    #[test]
    fn test_simple_with_type_suffix() {
        let table = RawTable::from_strs(
            &["States", "2012-13_REx", "2012-13_CEx"],
            &[&["Goa", "10", "2"]],
        );
        let (records, _) = melt_simple(&table);
        assert_eq!(records[0].kind, Some(ExpenditureType::Revenue));
        assert_eq!(records[1].kind, Some(ExpenditureType::Capital));
    }

    #[test]
    fn test_paired_assigns_by_position() {
        let table = RawTable::from_strs(
            &["States", "2012-13", "2012-13", "2013-14", "2013-14"],
            &[&["Goa", "1", "2", "3", "4"], &["Bihar", "5", "6", "7", "8"]],
        );
        let (records, _) = melt_paired(&table).unwrap();

        assert_eq!(records.len(), 8);
        for year in [2012, 2013] {
            for entity in ["Goa", "Bihar"] {
                let kinds: Vec<_> = records
                    .iter()
                    .filter(|r| r.year == year && r.entity == entity)
                    .map(|r| (r.kind, r.value))
                    .collect();
                assert_eq!(kinds.len(), 2);
                assert_eq!(kinds[0].0, Some(ExpenditureType::Revenue));
                assert_eq!(kinds[1].0, Some(ExpenditureType::Capital));
                assert!(kinds[0].1 < kinds[1].1);
            }
        }
        // (year, entity) order: Bihar before Goa within a year
        assert_eq!(records[0].entity, "Bihar");
        assert_eq!(records[0].value, Some(5.0));
        assert_eq!(records[2].entity, "Goa");
    }

    #[test]
    fn test_paired_with_unnamed_and_subheader() {
        let table = RawTable::from_strs(
            &["States", "2022-23", "Unnamed: 2", "2023-24", "Unnamed: 4"],
            &[
                &["", "REx", "CEx", "REx", "CEx"],
                &["Total", "9", "9", "9", "9"],
                &["Punjab", "1,000", "200", "-", "300"],
            ],
        );
        let (records, report) = melt_paired(&table).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(report.grand_total_rows, 1);
        assert_eq!(records[0].kind, Some(ExpenditureType::Revenue));
        assert_eq!(records[0].value, Some(1000.0));
        assert_eq!(records[2].year, 2023);
        assert_eq!(records[2].value, None);
    }

    #[test]
    fn test_paired_tag_row_below_data_is_not_a_subheader() {
        let table = RawTable::from_strs(
            &["States", "2012-13", "2012-13"],
            &[&["Goa", "1", "2"], &["", "CEx", "REx"], &["Bihar", "3", "4"]],
        );
        let (records, _) = melt_paired(&table).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].entity, "Bihar");
        assert_eq!(records[2].entity, "Goa");
    }

    #[test]
    fn test_paired_rejects_misordered_leading_subheader() {
        let table = RawTable::from_strs(
            &["States", "2012-13", "2012-13"],
            &[&["", "CEx", "REx"], &["Goa", "1", "2"]],
        );
        assert!(matches!(melt_paired(&table), Err(PipelineError::Layout(_))));
    }

    #[test]
    fn test_paired_rejects_odd_columns() {
        let table = RawTable::from_strs(&["States", "2012-13", "2012-13", "2013-14"], &[]);
        assert!(matches!(melt_paired(&table), Err(PipelineError::Layout(_))));
    }

    #[test]
    fn test_paired_rejects_mixed_years() {
        let result = paired_columns(&labels(&["2012-13", "2013-14"]));
        assert!(matches!(result, Err(PipelineError::Layout(_))));
    }

    #[test]
    fn test_paired_rejects_contradicting_tags() {
        let result = paired_columns(&labels(&["2012-13_CEx", "2012-13_REx"]));
        assert!(matches!(result, Err(PipelineError::Layout(_))));

        let table = RawTable::from_strs(
            &["States", "2012-13", "2012-13"],
            &[&["", "CEx", "REx"], &["Goa", "1", "2"]],
        );
        assert!(matches!(melt_paired(&table), Err(PipelineError::Layout(_))));
    }

    #[test]
    fn test_paired_columns_many_years() {
        let header: Vec<String> = (2010..2020)
            .flat_map(|y| {
                let label = FiscalYear(y).label();
                [label.clone(), label]
            })
            .collect();
        let columns = paired_columns(&header).unwrap();

        assert_eq!(columns.len(), 20);
        for (i, column) in columns.iter().enumerate() {
            let expected = if i % 2 == 0 {
                ExpenditureType::Revenue
            } else {
                ExpenditureType::Capital
            };
            assert_eq!(column.kind, Some(expected));
            assert_eq!(column.year, FiscalYear(2010 + (i / 2) as i32));
        }
    }
}
