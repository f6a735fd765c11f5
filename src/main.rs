use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use table_scraper::app::ports::{HttpClientPort, ObjectStorePort};
use table_scraper::config::{AppConfig, FileConfig, StorageConfig};
use table_scraper::constants::{DEFAULT_CONFIG_PATH, ENV_BUCKET};
use table_scraper::gateway::{LocalObjectStore, S3ObjectStore};
use table_scraper::infra::http_client::ReqwestHttp;
use table_scraper::logging;
use table_scraper::pipeline::extract::summarize_tables;
use table_scraper::pipeline::fetch::{FetchPolicy, Fetcher};
use table_scraper::pipeline::orchestrator::{cancel_on_ctrl_c, Orchestrator};
use table_scraper::pipeline::rate_limiter::RateLimiter;
use table_scraper::types::SourceSpec;

#[derive(Parser)]
#[command(name = "table_scraper")]
#[command(about = "Scrapes ranking tables and stores them as CSV")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the optional TOML config
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, extract, validate and upload every source
    Run {
        /// Source as URL=NAME or URL=NAME#TABLE_INDEX (repeatable). Replaces configured sources.
        #[arg(long = "source")]
        sources: Vec<SourceSpec>,
        /// Upload extracted rows as-is, skipping schema validation
        #[arg(long)]
        raw: bool,
        /// Write CSVs under this directory instead of the object store
        #[arg(long)]
        local_dir: Option<PathBuf>,
        /// How many sources run at once
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        concurrency: Option<u64>,
        /// Total attempts per fetch
        #[arg(long)]
        max_retries: Option<u32>,
        /// Per-attempt timeout in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout_secs: Option<u64>,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch a page and list the tables found on it
    Inspect {
        url: String,
        /// Print the table list as JSON
        #[arg(long)]
        json: bool,
    },
}

struct RunArgs {
    overrides: Overrides,
    raw: bool,
    local_dir: Option<PathBuf>,
    json: bool,
}

/// Command-line values that replace what `config.toml` says.
#[derive(Default)]
struct Overrides {
    sources: Vec<SourceSpec>,
    concurrency: Option<u64>,
    max_retries: Option<u32>,
    timeout_secs: Option<u64>,
}

impl Overrides {
    fn apply(self, mut file: FileConfig) -> FileConfig {
        if !self.sources.is_empty() {
            file.sources = self.sources;
        }
        if let Some(n) = self.concurrency {
            file.concurrency = n as usize;
        }
        if let Some(n) = self.max_retries {
            file.fetch.max_retries = n;
        }
        if let Some(secs) = self.timeout_secs {
            file.fetch.timeout_seconds = secs;
        }
        file
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let _guard = logging::init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            sources,
            raw,
            local_dir,
            concurrency,
            max_retries,
            timeout_secs,
            json,
        } => {
            let args = RunArgs {
                overrides: Overrides {
                    sources,
                    concurrency,
                    max_retries,
                    timeout_secs,
                },
                raw,
                local_dir,
                json,
            };
            run(&cli.config, args).await
        }
        Commands::Inspect { url, json } => inspect(&cli.config, &url, json).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Fatal error");
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_file_config(path: &Path) -> anyhow::Result<FileConfig> {
    FileConfig::load(path).with_context(|| format!("loading config from {}", path.display()))
}

/// Returns whether every source finished.
async fn run(config_path: &Path, args: RunArgs) -> anyhow::Result<bool> {
    let file = args.overrides.apply(load_file_config(config_path)?);

    // Storage settings are resolved before any network traffic.
    let (storage, store): (StorageConfig, Arc<dyn ObjectStorePort>) = match &args.local_dir {
        Some(dir) => {
            let bucket = std::env::var(ENV_BUCKET).unwrap_or_else(|_| "local".to_string());
            info!(dir = %dir.display(), "Writing to local directory");
            let store: Arc<dyn ObjectStorePort> = Arc::new(LocalObjectStore::new(dir.clone()));
            (StorageConfig::local(bucket), store)
        }
        None => {
            let storage = StorageConfig::from_env().context("reading storage settings")?;
            let store: Arc<dyn ObjectStorePort> = Arc::new(
                S3ObjectStore::new(storage.region.clone(), storage.endpoint.as_deref())
                    .context("building object store client")?,
            );
            (storage, store)
        }
    };

    let http: Arc<dyn HttpClientPort> =
        Arc::new(ReqwestHttp::new().context("building HTTP client")?);

    let mut config = AppConfig::new(file, storage);
    config.validate = !args.raw;

    let orchestrator = Orchestrator::new(config, http, store);
    tokio::spawn(cancel_on_ctrl_c(orchestrator.cancel_token()));

    let report = orchestrator.run().await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(report.all_succeeded())
}

async fn inspect(config_path: &Path, url: &str, json: bool) -> anyhow::Result<bool> {
    let file = load_file_config(config_path)?;
    let http: Arc<dyn HttpClientPort> =
        Arc::new(ReqwestHttp::new().context("building HTTP client")?);
    let fetcher = Fetcher::new(http, RateLimiter::unlimited())
        .with_initial_backoff(file.fetch.initial_backoff());

    let page = fetcher.fetch_with(url, FetchPolicy::from(&file.fetch)).await?;
    let tables = summarize_tables(&page.body);

    if json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
        return Ok(true);
    }

    println!("🔎 {} table(s) at {}", tables.len(), page.final_url);
    for table in &tables {
        match &table.error {
            None => println!(
                "   [{}] {} rows, columns: {}",
                table.index,
                table.rows,
                table.header.join(" | ")
            ),
            Some(e) => println!("   [{}] unreadable: {}", table.index, e),
        }
    }
    Ok(true)
}
