use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

// Use library instead of local modules
use state_finances::{
    dataset_csv, detect_layout, get_parser, init_logging, initials, write_csv, AppConfig, DatasetCache,
    GroupBy, PipelineError, RawTable,
};

#[derive(Parser)]
#[command(name = "state-finances")]
#[command(version)]
#[command(about = "Clean Indian state finance tables into long-form data", long_about = None)]
struct Cli {
    /// YAML config file (defaults to $STATE_FINANCES_CONFIG, then built-in)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured datasets
    Datasets,

    /// Write a cleaned dataset as CSV
    Clean {
        /// Dataset name from the config
        name: String,

        /// Output file path (writes to stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append a percentage share column grouped by
        /// state-year | state | year | state-year-type | state-type
        #[arg(long)]
        shares: Option<GroupBy>,
    },

    /// Clean an arbitrary file, guessing its layout
    Sniff {
        /// Path to a delimited table
        file: PathBuf,
    },

    /// Print headline metrics for a dataset
    Summary {
        /// Dataset name from the config
        name: String,

        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Load every dataset and report what was dropped
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config.log_filter);

    let cache = DatasetCache::new();

    match cli.command {
        Commands::Datasets => run_datasets(&config),
        Commands::Clean {
            name,
            output,
            shares,
        } => run_clean(&config, &cache, &name, output, shares),
        Commands::Sniff { file } => run_sniff(file),
        Commands::Summary { name, json } => run_summary(&config, &cache, &name, json),
        Commands::Check => run_check(&config, &cache),
    }
}

fn find_spec(config: &AppConfig, name: &str) -> Result<state_finances::DatasetSpec> {
    config
        .dataset(name)?
        .ok_or_else(|| PipelineError::UnknownDataset(name.to_string()).into())
}

fn run_datasets(config: &AppConfig) -> Result<()> {
    for spec in config.dataset_specs()? {
        println!(
            "{:<20} {:<13} {}  ({})",
            spec.name,
            spec.layout.code(),
            spec.path.display(),
            spec.title
        );
    }
    Ok(())
}

fn run_clean(
    config: &AppConfig,
    cache: &DatasetCache,
    name: &str,
    output: Option<PathBuf>,
    shares: Option<GroupBy>,
) -> Result<()> {
    let spec = find_spec(config, name)?;
    let dataset = cache
        .get_or_load(&spec)
        .with_context(|| format!("Failed to clean dataset '{}'", name))?;
    let bytes = dataset_csv(&dataset, shares)?;

    match output {
        Some(path) => {
            fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("✓ Wrote {} records to {}", dataset.len(), path.display());
        }
        None => io::stdout().write_all(&bytes)?,
    }
    Ok(())
}

fn run_sniff(file: PathBuf) -> Result<()> {
    let table = RawTable::read(&file)?;
    let layout = detect_layout(&table);
    eprintln!("📂 {} looks like a {}", file.display(), layout.name().to_lowercase());

    let source = file.display().to_string();
    let parsed = get_parser(layout).parse(&table, &source)?;
    eprintln!("✓ {}", parsed.report.summary());

    write_csv(io::stdout().lock(), layout, &parsed.records, None)?;
    Ok(())
}

fn run_summary(config: &AppConfig, cache: &DatasetCache, name: &str, json: bool) -> Result<()> {
    let spec = find_spec(config, name)?;
    let dataset = cache.get_or_load(&spec)?;
    let Some(summary) = dataset.summary() else {
        println!("No data in {}", name);
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("📊 {}", spec.title);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Latest year:   {}", summary.latest_year_label);
    println!("Total value:   ₹{:.0} crore", summary.latest_total);
    println!("States:        {}", summary.states);
    println!("Records:       {}", summary.records);
    for (component, share) in &summary.average_component_share {
        println!("  {:<36} {:>6.1}%", component, share);
    }

    if let Some(component) = dataset.components().first() {
        let order = dataset.state_order_by_component_share(summary.latest_year, component);
        let codes: Vec<&str> = order
            .iter()
            .map(|state| initials(state).unwrap_or(state.as_str()))
            .collect();
        println!("\nRanked by {}: {}", component, codes.join(" "));
    }
    Ok(())
}

fn run_check(config: &AppConfig, cache: &DatasetCache) -> Result<()> {
    let mut failures = 0;
    for spec in config.dataset_specs()? {
        match cache.get_or_load(&spec) {
            Ok(dataset) => println!("✓ {:<20} {}", spec.name, dataset.report().summary()),
            Err(e) if e.is_empty_result() => println!("∅ {:<20} no data", spec.name),
            Err(e) => {
                failures += 1;
                println!("❌ {:<20} {}", spec.name, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} dataset(s) failed to load", failures);
    }
    Ok(())
}
