//! collector - Eric Prydz setlist collector
//!
//! Subcommands, in the order a first run uses them:
//! - `init`: raw data directory, credentials file, default config
//! - `collect-urls`: walk the DJ index pages into `tracklist_urls.json`
//! - `scrape`: parse pending tracklist pages into `tracklists.json`
//! - `load`: insert stored tracklists into PostgreSQL
//! - `status`: raw data store summary

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use collector::db::{self, TracklistLoader};
use collector::services::{TracklistSpider, UrlCollector};
use collector::setup;
use collector::RawDataStore;
use collector_common::config::{load_config, resolve_config_path, resolve_project_root, LoggingConfig, TomlConfig};
use collector_common::credentials::{load_env_file, DbCredentials};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "collector")]
#[command(about = "Collect Eric Prydz tracklists from 1001tracklists.com")]
#[command(version)]
struct Args {
    /// Config file (overrides COLLECTOR_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Project root holding raw_data/ and the credentials file (overrides COLLECTOR_ROOT)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the raw data directory, credentials file and default config
    Init,

    /// Collect tracklist URLs from the DJ index pages
    CollectUrls,

    /// Parse tracklist pages that have not been processed yet
    Scrape {
        /// Log only, no progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Load stored tracklists into PostgreSQL
    Load {
        /// Connection URL used instead of the DB_* variables
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },

    /// Summarize the raw data store
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let root = resolve_project_root(args.root.as_deref()).context("Failed to resolve project root")?;
    let config_path = resolve_config_path(args.config.as_deref(), &root);
    let config = load_config(config_path.as_deref()).context("Failed to load configuration")?;

    init_tracing(&config.logging, &root)?;

    info!(
        "collector {} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("COLLECTOR_GIT_HASH"),
        env!("COLLECTOR_BUILD_TIMESTAMP"),
        env!("COLLECTOR_BUILD_PROFILE")
    );
    info!("Project root: {}", root.display());

    // Config lookup ran before logging was up; repeat what matters
    let config_in_use = config_path.as_deref().filter(|p| p.exists());
    match (&config_path, config_in_use) {
        (Some(path), None) => warn!("Config file {} not found, using built-in defaults", path.display()),
        (_, Some(path)) => info!("Configuration: {}", path.display()),
        (None, None) => info!("Configuration: built-in defaults"),
    }

    match args.command {
        Command::Init => init(&root, &config, config_in_use),
        Command::CollectUrls => collect_urls(&root, &config).await,
        Command::Scrape { no_progress } => scrape(&root, &config, no_progress).await,
        Command::Load { database_url } => load(&root, &config, database_url.as_deref()).await,
        Command::Status => status(&root, &config),
    }
}

fn init_tracing(logging: &LoggingConfig, root: &Path) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,collector={0},collector_common={0}",
            logging.level
        ))
    });

    let file_layer = match &logging.file {
        Some(path) => {
            let path = root.join(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

fn open_store(root: &Path, config: &TomlConfig) -> Result<RawDataStore> {
    let dir = root.join(&config.raw_data_dir);
    RawDataStore::open(&dir).with_context(|| format!("Failed to open raw data store {}", dir.display()))
}

fn init(root: &Path, config: &TomlConfig, config_in_use: Option<&Path>) -> Result<()> {
    let report = setup::bootstrap(root, config, config_in_use).context("Setup failed")?;

    println!("Raw data directory: {}", report.raw_data_dir.display());
    println!(
        "Credentials file:   {} ({:?})",
        report.credentials_file.display(),
        report.credentials
    );
    if let Some(path) = report.config_written {
        println!("Config file:        {}", path.display());
    }
    if report.credentials_ready {
        println!("Setup complete.");
    } else {
        println!("Setup complete. Edit the credentials file with your database details.");
    }
    Ok(())
}

async fn collect_urls(root: &Path, config: &TomlConfig) -> Result<()> {
    let store = open_store(root, config)?;
    let collector = UrlCollector::new(&config.crawl).context("Failed to create URL collector")?;

    let summary = collector.run(&store).await.context("URL collection failed")?;

    println!("Index pages visited:  {}", summary.pages_visited);
    println!("URLs collected:       {}", summary.collected.len());
    println!("New tracklists:       {}", summary.new.len());
    println!("Already parsed:       {}", summary.already_parsed);
    println!("URLs in {}: {}", store.urls_path().display(), summary.total_saved);
    Ok(())
}

async fn scrape(root: &Path, config: &TomlConfig, no_progress: bool) -> Result<()> {
    let store = open_store(root, config)?;
    let mut spider = TracklistSpider::new(&config.crawl).context("Failed to create spider")?;
    if no_progress {
        spider = spider.with_progress(false);
    }

    let summary = spider.run(&store).await.context("Scrape failed")?;

    println!("Pages attempted: {}", summary.attempted);
    println!("Saved:           {}", summary.saved);
    println!("Already stored:  {}", summary.skipped);
    println!("Failed:          {}", summary.failed);
    Ok(())
}

async fn load(root: &Path, config: &TomlConfig, database_url: Option<&str>) -> Result<()> {
    let store = open_store(root, config)?;
    let tracklists = store.load_tracklists().context("Failed to read tracklists")?;
    info!(count = tracklists.len(), "Loaded tracklists from raw data store");

    let pool = match database_url {
        Some(url) => db::connect_url(url, config.database.max_connections).await,
        None => {
            let env_file = root.join(&config.credentials_file);
            if load_env_file(&env_file)?.is_none() {
                warn!("Credentials file {} not found, using process environment", env_file.display());
            }
            let creds = DbCredentials::from_env().context("Database credentials incomplete")?;
            db::connect(&creds, config.database.max_connections).await
        }
    }
    .context("Failed to connect to database")?;

    let loader = TracklistLoader::new(pool, config.database.schema.clone())?;
    loader.init_schema().await.context("Failed to create tables")?;
    let summary = loader.load(&tracklists).await.context("Load failed")?;

    println!("Tracklists read:     {}", summary.tracklists_read);
    println!("Tracklists inserted: {}", summary.tracklists_inserted);
    println!("Already loaded:      {}", summary.tracklists_skipped);
    println!("Tracks inserted:     {}", summary.tracks_inserted);
    Ok(())
}

fn status(root: &Path, config: &TomlConfig) -> Result<()> {
    let store = open_store(root, config)?;
    let summary = store.summary().context("Failed to read raw data store")?;

    println!("Raw data:        {}", store.dir().display());
    println!("Collected URLs:  {}", summary.collected_urls);
    println!("Processed URLs:  {}", summary.processed_urls);
    println!("Tracklists:      {} ({} empty)", summary.tracklists, summary.empty_tracklists);
    println!("Tracks:          {}", summary.tracks);
    for url in store.empty_tracklists().context("Failed to read tracklists")? {
        println!("  no tracks:     {}", url);
    }
    match summary.last_run {
        Some(ts) => println!("Last saved:      {}", ts.to_rfc3339()),
        None => println!("Last saved:      never"),
    }
    Ok(())
}
