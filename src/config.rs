// ⚙️ Configuration - which files exist and how to read them
//
// Resolution order: explicit path (--config), then $STATE_FINANCES_CONFIG,
// then the built-in layout of the six state finance tables under ./data.

use crate::dataset::DatasetSpec;
use crate::model::ComponentCatalog;
use crate::parser::Layout;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a YAML config file
pub const CONFIG_ENV: &str = "STATE_FINANCES_CONFIG";

// ============================================================================
// CONFIG TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory that dataset paths are relative to
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// tracing EnvFilter directive, used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub datasets: Vec<DatasetConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub path: PathBuf,
    pub layout: Layout,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub download_name: Option<String>,
}

/// `catalog: open`, `catalog: revenue-receipts`, or an explicit list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogConfig {
    Keyword(String),
    Names(Vec<String>),
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig::Keyword("open".to_string())
    }
}

impl CatalogConfig {
    pub fn resolve(&self) -> Result<ComponentCatalog> {
        match self {
            CatalogConfig::Names(names) => Ok(ComponentCatalog::Fixed(names.clone())),
            CatalogConfig::Keyword(k) => match k.trim().to_lowercase().as_str() {
                "open" => Ok(ComponentCatalog::Open),
                "revenue-receipts" => Ok(ComponentCatalog::revenue_receipts()),
                other => bail!("Unknown component catalog '{}'", other),
            },
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

// ============================================================================
// LOADING
// ============================================================================

impl AppConfig {
    /// Load from `path`, else from $STATE_FINANCES_CONFIG, else built-in
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (i, ds) in self.datasets.iter().enumerate() {
            if self.datasets[..i].iter().any(|other| other.name == ds.name) {
                bail!("Dataset '{}' is defined twice", ds.name);
            }
            ds.catalog
                .resolve()
                .with_context(|| format!("Dataset '{}'", ds.name))?;
        }
        Ok(())
    }

    /// Pipeline specs with paths resolved against `data_dir`
    pub fn dataset_specs(&self) -> Result<Vec<DatasetSpec>> {
        self.datasets.iter().map(|ds| self.spec_for(ds)).collect()
    }

    /// Spec for one dataset by name
    pub fn dataset(&self, name: &str) -> Result<Option<DatasetSpec>> {
        self.datasets
            .iter()
            .find(|ds| ds.name == name)
            .map(|ds| self.spec_for(ds))
            .transpose()
    }

    fn spec_for(&self, ds: &DatasetConfig) -> Result<DatasetSpec> {
        let mut spec = DatasetSpec::new(ds.name.clone(), self.data_dir.join(&ds.path), ds.layout)
            .with_catalog(ds.catalog.resolve()?);
        if let Some(title) = &ds.title {
            spec = spec.with_title(title.clone());
        }
        if let Some(download_name) = &ds.download_name {
            spec.download_name = download_name.clone();
        }
        Ok(spec)
    }
}

impl Default for AppConfig {
    /// The six tables behind the state finances dashboard
    fn default() -> Self {
        let dataset = |name: &str, path: &str, layout, catalog: &str, title: &str, download: &str| {
            DatasetConfig {
                name: name.to_string(),
                path: PathBuf::from(path),
                layout,
                catalog: CatalogConfig::Keyword(catalog.to_string()),
                title: Some(title.to_string()),
                download_name: Some(download.to_string()),
            }
        };

        AppConfig {
            data_dir: default_data_dir(),
            log_filter: default_log_filter(),
            server: ServerConfig::default(),
            datasets: vec![
                dataset(
                    "revenue-receipts",
                    "state_finances.csv",
                    Layout::Simple,
                    "open",
                    "State Finances Over Time",
                    "cleaned_revenue_receipts.csv",
                ),
                dataset(
                    "revenue-components",
                    "state_revenue_components.csv",
                    Layout::Hierarchical,
                    "revenue-receipts",
                    "State Revenue Components",
                    "state_revenue_data.csv",
                ),
                dataset(
                    "revex-capex",
                    "state_revex_capex.csv",
                    Layout::Paired,
                    "open",
                    "State-wise Revenue and Capital Expenditure",
                    "cleaned_revex_capex_data.csv",
                ),
                dataset(
                    "capex-components",
                    "states_capex_components.csv",
                    Layout::Hierarchical,
                    "open",
                    "Capital Expenditure Components",
                    "cleaned_capex_component_data.csv",
                ),
                dataset(
                    "revex-components",
                    "states_revex_components.csv",
                    Layout::Hierarchical,
                    "open",
                    "Revenue Expenditure Components",
                    "cleaned_revex_component_data.csv",
                ),
                dataset(
                    "public-debt",
                    "states_public_liability_debt.csv",
                    Layout::Hierarchical,
                    "open",
                    "Public Liability and Debt Components",
                    "cleaned_pld_component_data.csv",
                ),
            ],
        }
    }
}
