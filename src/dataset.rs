// 🗂️ Dataset Pipeline
// file → RawTable → parser(layout) → catalog filter → read-only Dataset

use crate::error::{PipelineError, Result};
use crate::fiscal::{ExpenditureType, FiscalYear};
use crate::model::{ComponentCatalog, FactRecord, ParseReport};
use crate::parser::{get_parser, Layout};
use crate::shares::{percentage_shares, with_shares, GroupBy, ShareRecord};
use crate::table::RawTable;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::info;

// ============================================================================
// DATASET SPEC
// ============================================================================

/// Where a dataset lives and how to read it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSpec {
    pub name: String,
    pub path: PathBuf,
    pub layout: Layout,
    pub catalog: ComponentCatalog,
    pub title: String,
    pub download_name: String,
}

impl DatasetSpec {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, layout: Layout) -> Self {
        let name = name.into();
        DatasetSpec {
            title: name.clone(),
            download_name: format!("cleaned_{}.csv", name),
            name,
            path: path.into(),
            layout,
            catalog: ComponentCatalog::Open,
        }
    }

    /// Builder pattern: restrict components
    pub fn with_catalog(mut self, catalog: ComponentCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Builder pattern: set display title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Run the whole pipeline for one dataset
///
/// An unreadable file, a layout violation or an empty result is an error;
/// everything cell-level is recovered and reported.
pub fn load_dataset(spec: &DatasetSpec) -> Result<Dataset> {
    let table = RawTable::read(&spec.path)?;
    let parsed = get_parser(spec.layout).parse(&table, &spec.name)?;

    let mut records = parsed.records;
    let mut report = parsed.report;
    report.excluded_components = spec.catalog.retain(&mut records);
    report.records = records.len();

    if records.iter().all(|r| r.value.is_none()) {
        return Err(PipelineError::EmptyResult {
            dataset: spec.name.clone(),
        });
    }

    info!(
        dataset = %spec.name,
        layout = %spec.layout,
        records = records.len(),
        "loaded dataset: {}",
        report.summary()
    );

    Ok(Dataset {
        name: spec.name.clone(),
        layout: spec.layout,
        catalog: spec.catalog.clone(),
        records,
        report,
    })
}

// ============================================================================
// DATASET
// ============================================================================

/// Cleaned long-form relation for one source file
///
/// Never mutated after loading; queries return filtered copies.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub layout: Layout,
    pub catalog: ComponentCatalog,
    records: Vec<FactRecord>,
    report: ParseReport,
}

/// Record filter used by chart builders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactFilter {
    /// Empty means every state
    pub states: Vec<String>,
    pub year: Option<i32>,
    pub kind: Option<ExpenditureType>,
    pub component: Option<String>,
}

impl FactFilter {
    pub fn matches(&self, record: &FactRecord) -> bool {
        (self.states.is_empty() || self.states.iter().any(|s| *s == record.entity))
            && self.year.map_or(true, |y| y == record.year)
            && self.kind.map_or(true, |k| Some(k) == record.kind)
            && self
                .component
                .as_deref()
                .map_or(true, |c| record.component.as_deref() == Some(c))
    }
}

/// Headline metrics for a dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub latest_year: i32,
    pub latest_year_label: String,
    /// Sum of all values in the latest year
    pub latest_total: f64,
    pub states: usize,
    pub records: usize,
    /// Mean over states of each component's share of the state total,
    /// latest year only
    pub average_component_share: BTreeMap<String, f64>,
}

impl Dataset {
    /// Build a dataset from already-cleaned records
    pub fn from_records(
        name: impl Into<String>,
        layout: Layout,
        catalog: ComponentCatalog,
        records: Vec<FactRecord>,
    ) -> Self {
        let report = ParseReport {
            records: records.len(),
            ..ParseReport::default()
        };
        Dataset {
            name: name.into(),
            layout,
            catalog,
            records,
            report,
        }
    }

    pub fn records(&self) -> &[FactRecord] {
        &self.records
    }

    pub fn report(&self) -> &ParseReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct states, sorted by name
    pub fn states(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.entity.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct fiscal years, oldest first
    pub fn years(&self) -> Vec<i32> {
        self.records
            .iter()
            .map(|r| r.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct components; catalog order when the catalog is fixed,
    /// alphabetical otherwise
    pub fn components(&self) -> Vec<String> {
        let mut components: Vec<String> = self
            .records
            .iter()
            .filter_map(|r| r.component.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        components.sort_by_key(|c| self.catalog.position(c).unwrap_or(usize::MAX));
        components
    }

    /// Filtered copy of the records
    pub fn filter(&self, filter: &FactFilter) -> Vec<FactRecord> {
        self.records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    /// Every record with its share of the group total
    pub fn with_shares(&self, group_by: GroupBy) -> Vec<ShareRecord> {
        with_shares(&self.records, group_by)
    }

    /// States ordered by one component's share of their total in `year`,
    /// largest first; states without that component go last, by name
    pub fn state_order_by_component_share(&self, year: i32, component: &str) -> Vec<String> {
        let slice = self.filter(&FactFilter {
            year: Some(year),
            ..FactFilter::default()
        });
        let shares = percentage_shares(&slice, GroupBy::State);

        let mut by_state: BTreeMap<String, f64> = BTreeMap::new();
        for (record, share) in slice.iter().zip(shares) {
            by_state.entry(record.entity.clone()).or_insert(f64::NEG_INFINITY);
            if record.component.as_deref() == Some(component) {
                by_state.insert(record.entity.clone(), share);
            }
        }

        let mut order: Vec<(String, f64)> = by_state.into_iter().collect();
        order.sort_by(|a, b| b.1.total_cmp(&a.1));
        order.into_iter().map(|(state, _)| state).collect()
    }

    /// Headline metrics; `None` for an empty dataset
    pub fn summary(&self) -> Option<Summary> {
        let latest_year = *self.years().last()?;
        let latest = self.filter(&FactFilter {
            year: Some(latest_year),
            ..FactFilter::default()
        });
        let latest_total = latest.iter().filter_map(|r| r.value).sum();

        let mut share_sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        if self.layout.has_component() {
            let shares = percentage_shares(&latest, GroupBy::StateYear);
            for (record, share) in latest.iter().zip(shares) {
                if let Some(component) = &record.component {
                    let entry = share_sums.entry(component.clone()).or_insert((0.0, 0));
                    entry.0 += share;
                    entry.1 += 1;
                }
            }
        }

        Some(Summary {
            latest_year,
            latest_year_label: FiscalYear(latest_year).label(),
            latest_total,
            states: self.states().len(),
            records: self.records.len(),
            average_component_share: share_sums
                .into_iter()
                .map(|(c, (sum, n))| (c, sum / n as f64))
                .collect(),
        })
    }
}
