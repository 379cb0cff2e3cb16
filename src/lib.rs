// State Finances - Core Library
// Normalizes Indian state finance tables into long-form fact records.
// Exposes all modules for use in CLI, API server, and tests

pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod fiscal;
pub mod hierarchy;
pub mod model;
pub mod numeric;
pub mod parser;
pub mod registry;
pub mod reshape;
pub mod shares;
pub mod table;

// Re-export commonly used types
pub use cache::{CacheEntry, DatasetCache};
pub use config::AppConfig;
pub use dataset::{load_dataset, Dataset, DatasetSpec, FactFilter, Summary};
pub use error::{PipelineError, Result};
pub use export::{dataset_csv, read_long_csv, write_csv};
pub use fiscal::{ColumnLabel, ExpenditureType, FiscalYear};
pub use hierarchy::parse_hierarchical;
pub use model::{ComponentCatalog, FactRecord, ParseReport};
pub use numeric::{normalize_cell, CellInput};
pub use parser::{
    detect_layout, get_parser, HierarchicalTableParser, Layout, PairedTableParser, Parsed,
    SimpleTableParser, TableParser,
};
pub use registry::{canonical_name, initials, is_grand_total, State};
pub use reshape::{melt_paired, melt_simple};
pub use shares::{percentage_shares, with_shares, GroupBy, ShareRecord};
pub use table::RawTable;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the fmt subscriber; RUST_LOG wins over `default_filter`
pub fn init_logging(default_filter: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
