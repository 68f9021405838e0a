//! facetmap CLI - explore a hub dataset from the terminal.

use clap::{Parser, Subcommand};
use facetmap::{AppContext, DatasetTarget, HubDatasetProvider};
use facetmap_config::{Config, ConfigError};
use facetmap_core::{BgTheme, Dialect, Environment, SimpleType, StaticTheme, Value};
use facetmap_widgets::format::{format_pct, value_label};
use facetmap_widgets::{FilterWidget, WidgetInteraction};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "facetmap")]
#[command(about = "Explore and filter hub datasets")]
#[command(version)]
struct Cli {
    /// Dataset id, or a name from the configured catalog
    #[arg(short, long, global = true)]
    dataset: Option<String>,

    /// Dataset slug
    #[arg(long, global = true, conflicts_with = "dataset")]
    slug: Option<String>,

    /// Hub environment (prod, qa)
    #[arg(short, long, global = true, default_value = "prod")]
    env: Environment,

    /// Configuration file (.yaml, .yml or .toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Basemap theme used for symbology (light, dark)
    #[arg(long, global = true, default_value = "light")]
    theme: BgTheme,

    /// More logging; repeat for more
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured datasets
    Catalog,

    /// List the fields of a dataset
    Fields,

    /// Show the value distribution of a field
    Stats {
        /// Field name
        field: String,

        /// List every value, not only the top ones
        #[arg(long)]
        all: bool,
    },

    /// Build the histogram of a field
    Histogram {
        /// Field name
        field: String,
    },

    /// Print the symbology for a field, or for the geometry alone
    Style {
        /// Field name
        field: Option<String>,
    },

    /// Search values of a field
    Search {
        /// Field name
        field: String,

        /// Text to look for
        query: String,
    },

    /// Filter a field and print the composed predicate and count
    Filter {
        /// Field name
        field: String,

        /// Range to keep
        #[arg(long, num_args = 2, value_names = ["LOW", "HIGH"], allow_negative_numbers = true)]
        range: Option<Vec<f64>>,

        /// Values to keep, comma separated
        #[arg(long, value_delimiter = ',')]
        values: Vec<String>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Facetmap(#[from] facetmap_core::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if matches!(cli.command, Commands::Catalog) {
        for entry in &config.datasets {
            println!("{:<32} {}", entry.name, entry.id);
        }
        return Ok(());
    }

    let target = dataset_target(&cli, &config)?;
    let hub = HubDatasetProvider::new(config.environments.clone());
    let mut ctx = AppContext::new(config, Arc::new(hub), Arc::new(StaticTheme(cli.theme)));
    let dataset = ctx.load_dataset(&target, cli.env).await?;
    debug!(id = %dataset.id, url = %dataset.url, "loaded");

    match cli.command {
        Commands::Catalog => {}
        Commands::Fields => fields(&ctx)?,
        Commands::Stats { field, all } => stats(&ctx, &field, all).await?,
        Commands::Histogram { field } => {
            let built = ctx.histogram(&field).await?;
            println!("{}", serde_json::to_string_pretty(&built)?);
        }
        Commands::Style { field } => {
            let style = ctx.style_by(field.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(style)?);
        }
        Commands::Search { field, query } => {
            for candidate in ctx.search_values(&field, &query).await? {
                println!("{}", candidate.label);
            }
        }
        Commands::Filter {
            field,
            range,
            values,
        } => filter(&mut ctx, &field, range.as_deref(), &values).await?,
    }
    Ok(())
}

fn dataset_target(cli: &Cli, config: &Config) -> Result<DatasetTarget, CliError> {
    match (&cli.dataset, &cli.slug) {
        (Some(dataset), _) => Ok(DatasetTarget::Id(
            config
                .catalog_entry(dataset)
                .map_or_else(|| dataset.clone(), |entry| entry.id.clone()),
        )),
        (None, Some(slug)) => Ok(DatasetTarget::Slug(slug.clone())),
        (None, None) => Err(CliError::Usage(
            "pass --dataset <id|name> or --slug <slug>".to_string(),
        )),
    }
}

fn fields(ctx: &AppContext) -> Result<(), CliError> {
    for field in ctx.field_catalog()? {
        let kind = format!("{:?}", field.simple_type).to_lowercase();
        println!("{:<24} {kind:<8} {}", field.name, field.label);
    }
    Ok(())
}

async fn stats(ctx: &AppContext, field: &str, all: bool) -> Result<(), CliError> {
    let stats = ctx.field_stats(field).await?;
    let is_date = ctx
        .dataset()
        .and_then(|d| d.field(field).ok())
        .is_some_and(|f| f.simple_type == SimpleType::Date);
    println!(
        "{}: {} records, {} distinct values",
        stats.field, stats.count, stats.unique_count
    );
    let rows = if all { &stats.values } else { &stats.top_values };
    for row in rows {
        println!(
            "{:>8} {:>7}  {}",
            row.count,
            format_pct(row.pct),
            value_label(&row.value, is_date)
        );
    }
    Ok(())
}

async fn filter(
    ctx: &mut AppContext,
    field: &str,
    range: Option<&[f64]>,
    values: &[String],
) -> Result<(), CliError> {
    let widget = ctx.add_filter(field).await?.widget.clone();
    let field = widget.field().to_string();

    let interactions: Vec<WidgetInteraction> = match (&widget, range) {
        (FilterWidget::RangeHistogram(_), Some(&[low, high])) => vec![WidgetInteraction::Range {
            low,
            high,
            released: true,
        }],
        (FilterWidget::TimeWindow(_), Some(&[start, end])) => vec![WidgetInteraction::Window {
            start,
            end,
            released: true,
        }],
        (FilterWidget::ValueList(list), None) => values
            .iter()
            .map(|wanted| {
                list.items()
                    .iter()
                    .position(|item| item.value.to_string() == *wanted)
                    .map_or_else(
                        || WidgetInteraction::AddCandidate {
                            value: Value::text(wanted.as_str()),
                        },
                        |index| WidgetInteraction::Toggle {
                            index,
                            checked: true,
                        },
                    )
            })
            .collect(),
        (_, None) if values.is_empty() => Vec::new(),
        (widget, _) => {
            return Err(CliError::Usage(format!(
                "{field} has a {:?} widget; use --range for histograms and time windows, --values for value lists",
                widget.kind()
            )))
        }
    };
    for interaction in &interactions {
        ctx.interact(&field, interaction).await?;
    }

    println!("server: {}", ctx.compose(Dialect::Server));
    println!("client: {}", ctx.compose(Dialect::Client));
    match ctx.last_count() {
        Some(count) => println!("count:  {count}"),
        None => println!("count:  unknown"),
    }
    Ok(())
}
