//! Command-line interface components.

use crate::constants::DEFAULT_BATCH_SIZE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sensor-dataset")]
#[command(about = "Inspect and batch satellite sensor observations from a Parquet catalog")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Catalog root directory (defaults to <data_dir>/nnja/catalog)
    #[arg(short, long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List datasets available in the catalog
    List,

    /// Load a dataset selection and print its shape and first sample
    Inspect(SelectArgs),

    /// Iterate a dataset selection in stacked batches
    Batches {
        #[command(flatten)]
        select: SelectArgs,

        /// Samples per batch
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
}

/// Dataset selection shared by the loading commands
#[derive(clap::Args, Debug, Clone)]
pub struct SelectArgs {
    /// Catalog dataset name
    #[arg(value_name = "DATASET_NAME")]
    pub dataset_name: String,

    /// Instant (RFC 3339 or YYYY-MM-DD) or range `<start>..<end>`
    #[arg(short, long)]
    pub time: String,

    /// Sensor type (AMSU, ATMS, MHS, IASI, CrIS)
    #[arg(short, long, default_value = "AMSU")]
    pub sensor: String,

    /// Primary descriptor columns, comma separated
    #[arg(long, value_delimiter = ',', default_value = "OBS_TIMESTAMP,LAT,LON")]
    pub primary: Vec<String>,

    /// Additional variables appended to the metadata vector, comma separated
    #[arg(long = "var", value_delimiter = ',')]
    pub additional: Vec<String>,
}

impl Args {
    /// Log level implied by the verbosity flag
    pub fn get_log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

/// Command implementations
pub mod commands {
    use super::{Args, Command, SelectArgs};
    use crate::catalog::{Catalog, LocalCatalog, TimeSelection};
    use crate::config::{DatasetRequest, LoaderConfig};
    use crate::dataset::SensorDataset;
    use anyhow::{Context, Result};
    use chrono::DateTime;
    use colored::*;
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Instant;
    use tracing::debug;

    /// Number of metadata values shown in sample previews
    const PREVIEW_VALUES: usize = 6;

    /// Run the selected command
    pub fn run(args: Args) -> Result<()> {
        setup_logging(&args);

        let mut config = LoaderConfig::default();
        if let Some(root) = &args.catalog {
            config = config.with_catalog_root(root);
        }
        debug!("Catalog root: {}", config.catalog_root.display());
        let catalog = LocalCatalog::new(&config);

        match args.command {
            Command::List => run_list(&catalog),
            Command::Inspect(select) => run_inspect(&catalog, &config, &select),
            Command::Batches { select, batch_size } => {
                let config = config.with_batch_size(batch_size);
                run_batches(&catalog, &config, &select)
            }
        }
    }

    /// Set up structured logging based on CLI arguments
    fn setup_logging(args: &Args) {
        use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("sensor_dataset={}", args.get_log_level()))
        });

        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    fn build_request(select: &SelectArgs) -> Result<DatasetRequest> {
        let time: TimeSelection = select
            .time
            .parse()
            .with_context(|| format!("Invalid time selection '{}'", select.time))?;

        Ok(
            DatasetRequest::from_tag(&select.dataset_name, time, &select.sensor)?
                .with_primary_descriptors(select.primary.iter().cloned())
                .with_additional_variables(select.additional.iter().cloned()),
        )
    }

    fn load(
        catalog: &LocalCatalog,
        config: &LoaderConfig,
        select: &SelectArgs,
    ) -> Result<SensorDataset> {
        let request = build_request(select)?;
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        spinner.set_message(format!(
            "Loading {} ({})...",
            request.dataset_name, request.time
        ));
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));

        let dataset = SensorDataset::open(catalog, config, &request)
            .with_context(|| format!("Failed to load dataset '{}'", request.dataset_name));
        spinner.finish_and_clear();
        dataset
    }

    fn run_list(catalog: &LocalCatalog) -> Result<()> {
        let names = catalog.list()?;
        if names.is_empty() {
            println!(
                "{} {}",
                "No datasets found in".bright_yellow(),
                catalog.root().display()
            );
            return Ok(());
        }

        println!("{}", "Available datasets:".bright_green().bold());
        for (i, name) in names.iter().enumerate() {
            println!(
                "  {}. {}",
                (i + 1).to_string().bright_yellow().bold(),
                name.bright_cyan()
            );
        }
        Ok(())
    }

    fn run_inspect(
        catalog: &LocalCatalog,
        config: &LoaderConfig,
        select: &SelectArgs,
    ) -> Result<()> {
        let dataset = load(catalog, config, select)?;
        let summary = dataset.summary();

        println!("{}", "Dataset Summary".bright_green().bold());
        println!("  {} {}", "Dataset:".bright_cyan(), summary.dataset_name);
        println!("  {} {}", "Sensor:".bright_cyan(), summary.sensor_type);
        println!(
            "  {} {}",
            "Partitions:".bright_cyan(),
            summary.partitions_selected
        );
        println!(
            "  {} {}",
            "Samples:".bright_cyan(),
            summary.rows.to_string().bright_white().bold()
        );
        println!(
            "  {} {}",
            "Metadata width:".bright_cyan(),
            summary.metadata_width.to_string().bright_white().bold()
        );

        if dataset.is_empty() {
            println!("\n{}", "Selection is empty".bright_yellow());
            return Ok(());
        }

        let sample = dataset.get(0)?;
        let when = format_timestamp(sample.timestamp);

        println!("\n{}", "First sample".bright_green().bold());
        println!("  {} {} ({})", "timestamp:".bright_cyan(), sample.timestamp, when);
        println!("  {} {}", "latitude:".bright_cyan(), sample.latitude);
        println!("  {} {}", "longitude:".bright_cyan(), sample.longitude);
        let preview: Vec<String> = dataset
            .metadata_columns()
            .iter()
            .zip(&sample.metadata)
            .take(PREVIEW_VALUES)
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        let more = sample.metadata.len().saturating_sub(PREVIEW_VALUES);
        println!(
            "  {} [{}{}]",
            "metadata:".bright_cyan(),
            preview.join(", "),
            if more > 0 {
                format!(", ... {more} more")
            } else {
                String::new()
            }
        );
        Ok(())
    }

    /// RFC 3339 rendering of epoch seconds; `NaN` (a null timestamp) is "invalid"
    pub(crate) fn format_timestamp(seconds: f64) -> String {
        Some(seconds)
            .filter(|ts| ts.is_finite())
            .and_then(|ts| DateTime::from_timestamp(ts.floor() as i64, 0))
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "invalid".to_string())
    }

    fn run_batches(
        catalog: &LocalCatalog,
        config: &LoaderConfig,
        select: &SelectArgs,
    ) -> Result<()> {
        let start_time = Instant::now();
        let dataset = load(catalog, config, select)?;
        let batches = dataset.batches(config.batch_size)?;

        let pb = ProgressBar::new(batches.batch_count() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                .progress_chars("#>-"),
        );
        pb.set_message("Stacking batches");

        let mut batch_count = 0usize;
        let mut sample_count = 0usize;
        let mut missing_values = 0usize;
        let mut first_shapes = None;
        for batch in batches {
            let batch = batch?;
            if first_shapes.is_none() {
                first_shapes = Some(batch.shapes());
            }
            missing_values += batch.metadata.iter().filter(|v| v.is_nan()).count();
            sample_count += batch.len();
            batch_count += 1;
            pb.inc(1);
        }
        pb.finish_with_message("All batches stacked");

        println!("\n{}", "Batch Summary".bright_green().bold());
        println!(
            "  {} {}ms",
            "Time elapsed:".bright_cyan(),
            start_time.elapsed().as_millis().to_string().bright_white()
        );
        println!("  {} {}", "Batches:".bright_cyan(), batch_count);
        println!("  {} {}", "Samples:".bright_cyan(), sample_count);
        if missing_values > 0 {
            println!(
                "  {} {}",
                "Missing metadata values:".bright_red(),
                missing_values.to_string().bright_red().bold()
            );
        }
        if let Some(shapes) = first_shapes {
            println!("  {}", "First batch shapes:".bright_cyan());
            for (name, shape) in shapes {
                println!("    {name}: {shape:?}");
            }
        }
        Ok(())
    }
}
