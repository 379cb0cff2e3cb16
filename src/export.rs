// 📥 CSV export of the cleaned relation
//
// Same records + same options → same bytes: fixed column set per layout,
// `\n` terminators, shortest round-trip float formatting, empty field for
// missing values, no index column.

use crate::dataset::Dataset;
use crate::error::{PipelineError, Result};
use crate::fiscal::ExpenditureType;
use crate::model::FactRecord;
use crate::numeric::normalize_cell;
use crate::parser::Layout;
use crate::shares::{percentage_shares, GroupBy};
use csv::{ReaderBuilder, Terminator, WriterBuilder};
use std::io::{Read, Write};

/// Header for a layout, with or without the share column
pub fn columns(layout: Layout, with_share: bool) -> Vec<&'static str> {
    let mut cols = vec!["state"];
    if layout.has_component() {
        cols.push("component");
    }
    cols.push("year");
    if layout.has_kind() {
        cols.push("type");
    }
    cols.push("value");
    if with_share {
        cols.push("share");
    }
    cols
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write records as CSV; `shares` must align with `records` when given
pub fn write_csv<W: Write>(
    writer: W,
    layout: Layout,
    records: &[FactRecord],
    shares: Option<&[f64]>,
) -> Result<()> {
    let mut out = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    out.write_record(columns(layout, shares.is_some()))?;

    for (i, record) in records.iter().enumerate() {
        let mut row = vec![record.entity.clone()];
        if layout.has_component() {
            row.push(record.component.clone().unwrap_or_default());
        }
        row.push(record.year.to_string());
        if layout.has_kind() {
            row.push(record.kind.map(|k| k.code().to_string()).unwrap_or_default());
        }
        row.push(format_value(record.value));
        if let Some(shares) = shares {
            row.push(format_value(shares.get(i).copied()));
        }
        out.write_record(&row)?;
    }

    out.flush()?;
    Ok(())
}

/// The downloadable form of a dataset
pub fn dataset_csv(dataset: &Dataset, group_by: Option<GroupBy>) -> Result<Vec<u8>> {
    let shares = group_by.map(|g| percentage_shares(dataset.records(), g));
    let mut buf = Vec::new();
    write_csv(&mut buf, dataset.layout, dataset.records(), shares.as_deref())?;
    Ok(buf)
}

/// Read a long-form CSV (as written by `write_csv`) back into records
///
/// `state`, `year` and `value` columns are required; `component` and `type`
/// are optional; anything else is ignored.
pub fn read_long_csv<R: Read>(reader: R) -> Result<Vec<FactRecord>> {
    let mut input = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = input.headers()?.clone();
    let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
    let require = |name: &str| {
        find(name).ok_or_else(|| PipelineError::Layout(format!("long table has no '{}' column", name)))
    };

    let state_col = require("state")?;
    let year_col = require("year")?;
    let value_col = require("value")?;
    let component_col = find("component");
    let type_col = find("type");

    let mut records = Vec::new();
    for (line_num, result) in input.records().enumerate() {
        let row = result?;
        let year = row
            .get(year_col)
            .and_then(|y| y.trim().parse::<i32>().ok())
            .ok_or_else(|| {
                PipelineError::Layout(format!("line {}: year is not an integer", line_num + 2))
            })?;

        let value = row.get(value_col).and_then(normalize_cell);
        let mut record = FactRecord {
            entity: row.get(state_col).unwrap_or("").to_string(),
            component: None,
            year,
            kind: None,
            value,
        };
        if let Some(c) = component_col.and_then(|i| row.get(i)).filter(|c| !c.is_empty()) {
            record.component = Some(c.to_string());
        }
        record.kind = type_col
            .and_then(|i| row.get(i))
            .and_then(ExpenditureType::from_code);
        records.push(record);
    }
    Ok(records)
}
