// 📦 Core types - Fact Record + Component Catalog

use crate::fiscal::{ExpenditureType, FiscalYear};
use serde::{Deserialize, Serialize};

// ============================================================================
// FACT RECORD
// ============================================================================

/// FactRecord - one cleaned (entity, [component], year, [type], value) tuple
///
/// `value` is a finite number or `None` (explicit-missing). Zero is a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    #[serde(rename = "state")]
    pub entity: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub component: Option<String>,

    pub year: i32,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub kind: Option<ExpenditureType>,

    pub value: Option<f64>,
}

impl FactRecord {
    /// Create a record with the required fields
    pub fn new(entity: impl Into<String>, year: FiscalYear, value: Option<f64>) -> Self {
        FactRecord {
            entity: entity.into(),
            component: None,
            year: year.start(),
            kind: None,
            value,
        }
    }

    /// Builder pattern: add component
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Builder pattern: add expenditure type
    pub fn with_kind(mut self, kind: ExpenditureType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn fiscal_year(&self) -> FiscalYear {
        FiscalYear(self.year)
    }

    pub fn is_missing(&self) -> bool {
        self.value.is_none()
    }
}

/// Stable sort by (year, entity), the canonical presentation order
pub fn sort_canonical(records: &mut [FactRecord]) {
    records.sort_by(|a, b| a.year.cmp(&b.year).then_with(|| a.entity.cmp(&b.entity)));
}

// ============================================================================
// PARSE REPORT
// ============================================================================

/// What a table parse dropped, and why
///
/// Best-effort parsing never fails on a single cell; this is where the
/// dropped pieces are accounted for instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    pub rows_read: usize,
    pub records: usize,

    /// "Total" / "All States" rows excluded before reshaping
    pub grand_total_rows: usize,

    /// Component rows seen before any state total row
    pub orphan_rows: usize,

    /// Period columns with no 4-digit year token
    pub skipped_columns: Vec<String>,

    /// Cells that normalized to explicit-missing
    pub missing_cells: usize,

    /// Row labels not in the state registry
    pub unknown_entities: Vec<String>,

    /// Records removed by the component catalog
    pub excluded_components: usize,
}

impl ParseReport {
    pub fn summary(&self) -> String {
        format!(
            "rows: {}, records: {}, missing cells: {}, orphans: {}, totals: {}, unknown entities: {}, skipped columns: {}, excluded components: {}",
            self.rows_read,
            self.records,
            self.missing_cells,
            self.orphan_rows,
            self.grand_total_rows,
            self.unknown_entities.len(),
            self.skipped_columns.len(),
            self.excluded_components,
        )
    }

    pub(crate) fn note_unknown_entity(&mut self, label: &str) {
        if !self.unknown_entities.iter().any(|e| e == label) {
            self.unknown_entities.push(label.to_string());
        }
    }
}

// ============================================================================
// COMPONENT CATALOG
// ============================================================================

/// Recognized component names for a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComponentCatalog {
    /// Accept any component except stray "Total" rows
    #[default]
    Open,
    /// Ordered closed set; order is presentation order
    Fixed(Vec<String>),
}

impl ComponentCatalog {
    /// The six revenue receipt components of the state revenue table
    pub fn revenue_receipts() -> Self {
        ComponentCatalog::Fixed(
            [
                "States' Own Tax",
                "Share in Union Taxes",
                "Grants in Aid - CSS",
                "Grants in Aid - Others",
                "Non Tax Rev - Int, Div, Profit",
                "Non Tax Rev - Others",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        )
    }

    pub fn accepts(&self, component: &str) -> bool {
        match self {
            ComponentCatalog::Open => !component.to_lowercase().contains("total"),
            ComponentCatalog::Fixed(names) => names.iter().any(|n| n == component),
        }
    }

    /// Catalog position, used to order components for display
    pub fn position(&self, component: &str) -> Option<usize> {
        match self {
            ComponentCatalog::Open => None,
            ComponentCatalog::Fixed(names) => names.iter().position(|n| n == component),
        }
    }

    /// Drop records whose component the catalog does not recognize
    ///
    /// Records without a component (wide tables) pass through untouched.
    pub fn retain(&self, records: &mut Vec<FactRecord>) -> usize {
        let before = records.len();
        records.retain(|r| r.component.as_deref().map_or(true, |c| self.accepts(c)));
        before - records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fact_record_builder() {
        let fact = FactRecord::new("Goa", FiscalYear(2012), Some(10.0))
            .with_component("Own Tax")
            .with_kind(ExpenditureType::Capital);

        assert_eq!(fact.entity, "Goa");
        assert_eq!(fact.component.as_deref(), Some("Own Tax"));
        assert_eq!(fact.year, 2012);
        assert_eq!(fact.kind, Some(ExpenditureType::Capital));
        assert!(!fact.is_missing());
        assert_eq!(fact.fiscal_year().label(), "2012-13");
    }

    #[test]
    fn test_sort_canonical_is_stable() {
        let mut records = vec![
            FactRecord::new("Kerala", FiscalYear(2013), Some(1.0)),
            FactRecord::new("Goa", FiscalYear(2013), Some(2.0)),
            FactRecord::new("Kerala", FiscalYear(2012), Some(3.0)).with_kind(ExpenditureType::Revenue),
            FactRecord::new("Kerala", FiscalYear(2012), Some(4.0)).with_kind(ExpenditureType::Capital),
        ];
        sort_canonical(&mut records);

        let order: Vec<_> = records.iter().map(|r| r.value.unwrap()).collect();
        assert_eq!(order, vec![3.0, 4.0, 2.0, 1.0]);
    }

    #[test]
    fn test_open_catalog_drops_totals() {
        let catalog = ComponentCatalog::Open;
        assert!(catalog.accepts("Interest Payments"));
        assert!(!catalog.accepts("Total Revenue"));
        assert!(!catalog.accepts("Sub-TOTAL"));
    }

    #[test]
    fn test_fixed_catalog() {
        let catalog = ComponentCatalog::revenue_receipts();
        assert!(catalog.accepts("States' Own Tax"));
        assert!(!catalog.accepts("Total Revenue Receipts"));
        assert_eq!(catalog.position("Share in Union Taxes"), Some(1));

        let mut records = vec![
            FactRecord::new("Goa", FiscalYear(2012), Some(1.0)).with_component("States' Own Tax"),
            FactRecord::new("Goa", FiscalYear(2012), Some(9.0)).with_component("Total"),
            FactRecord::new("Goa", FiscalYear(2012), Some(5.0)),
        ];
        assert_eq!(catalog.retain(&mut records), 1);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_fact_record_json_shape() {
        let fact = FactRecord::new("Goa", FiscalYear(2012), Some(0.0)).with_kind(ExpenditureType::Capital);
        let json = serde_json::to_value(&fact).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": "Goa", "year": 2012, "type": "CEx", "value": 0.0})
        );

        let missing: FactRecord =
            serde_json::from_str(r#"{"state": "Goa", "component": "Own Tax", "year": 2013, "value": null}"#)
                .unwrap();
        assert!(missing.is_missing());
        assert_eq!(missing.component.as_deref(), Some("Own Tax"));
    }
}
