mod dataset;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use rowdraw::{Catalog, CountSource, QueryResult, RowDrawSession, SampleOptions, SamplerConfig};
use tracing::debug;

use crate::dataset::Dataset;

#[derive(Parser)]
#[command(name = "rowdraw")]
#[command(about = "rowdraw - Uniform random row sampling", long_about = None)]
struct Cli {
    /// JSON dataset to load before running the command.
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// TOML file with sampler defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a relation's columns.
    Columns { relation: String },
    /// Draw a uniform random sample.
    Sample {
        relation: String,
        /// Number of rows to draw.
        #[arg(short = 'n', long)]
        limit: usize,
        #[command(flatten)]
        tuning: Tuning,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show the statements a sample would issue.
    Explain {
        relation: String,
        #[command(flatten)]
        tuning: Tuning,
    },
}

#[derive(clap::Args)]
struct Tuning {
    /// Integer key column; without one, rows are drawn by position.
    #[arg(short, long)]
    key: Option<String>,
    #[arg(long)]
    gaps: Option<f64>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_iterations: Option<u32>,
    #[arg(long)]
    time_budget_ms: Option<u64>,
    #[arg(long, value_enum)]
    count: Option<CountArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CountArg {
    Statistics,
    Exact,
}

impl Tuning {
    fn apply(&self, mut options: SampleOptions) -> SampleOptions {
        if let Some(key) = &self.key {
            options = options.with_key_column(key.as_str());
        }
        if let Some(gaps) = self.gaps {
            options = options.with_gaps(gaps);
        }
        if let Some(seed) = self.seed {
            options = options.with_seed(seed);
        }
        if let Some(max_iterations) = self.max_iterations {
            options = options.with_max_iterations(max_iterations);
        }
        if let Some(ms) = self.time_budget_ms {
            options = options.with_time_budget(Duration::from_millis(ms));
        }
        if let Some(count) = self.count {
            options = options.with_count_source(match count {
                CountArg::Statistics => CountSource::Statistics,
                CountArg::Exact => CountSource::Exact,
            });
        }
        options
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_ansi(std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none())
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let session = build_session(cli.data.as_ref(), cli.config.as_ref())?;

    match cli.command {
        Commands::Columns { relation } => print_columns(&session, &relation)?,
        Commands::Sample {
            relation,
            limit,
            tuning,
            json,
        } => {
            let options = tuning.apply(session.options(limit));
            execute_sample(&session, &relation, options, json).await?;
        }
        Commands::Explain { relation, tuning } => {
            let options = tuning.apply(session.options(1));
            for statement in session
                .explain(&relation, &options)
                .context("Failed to explain sample")?
            {
                println!("{statement}");
            }
        }
    }

    Ok(())
}

fn build_session(data: Option<&PathBuf>, config: Option<&PathBuf>) -> Result<RowDrawSession> {
    let catalog = Arc::new(Catalog::new());
    if let Some(path) = data {
        Dataset::from_file(path)?.load_into(&catalog)?;
        debug!(relations = catalog.relation_names().len(), "dataset loaded");
    }
    let config = match config {
        Some(path) => SamplerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SamplerConfig::default(),
    };
    Ok(RowDrawSession::with_catalog(catalog).with_config(config))
}

fn print_columns(session: &RowDrawSession, relation: &str) -> Result<()> {
    let columns = session
        .columns(relation)
        .context("Failed to describe relation")?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "column", "type", "nullable"]);
    for column in &columns {
        table.add_row(vec![
            column.ordinal.to_string(),
            column.name.quoted(),
            column.data_type.to_string(),
            if column.nullable { "YES" } else { "NO" }.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn execute_sample(
    session: &RowDrawSession,
    relation: &str,
    options: SampleOptions,
    json: bool,
) -> Result<()> {
    let requested = options.limit;
    let outcome = session
        .sample(relation, options)
        .await
        .context("Failed to sample relation")?;
    let result = outcome.to_query_result()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result.to_json_response())?);
    } else {
        print_result(&result);
    }
    eprintln!(
        "({} of {} rows, {}, {} iterations, {:?})",
        outcome.row_count(),
        requested,
        outcome.status,
        outcome.stats.iterations,
        outcome.stats.elapsed
    );
    Ok(())
}

fn print_result(result: &QueryResult) {
    if result.is_empty() {
        println!("(0 rows)");
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(result.column_names());
    for row in &result.rows {
        table.add_row(row.iter().map(|value| value.to_string()).collect::<Vec<_>>());
    }
    println!("{table}");
}
