//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use blogforge_browser::BrowserSession;
use blogforge_core::{
    ChatCompletionsGenerator, Enhancer, FixedDelays, ProgressReporter, acquire,
};
use blogforge_search::{FallbackSearch, GoogleSearch, SearchWithFallback};
use blogforge_shared::{
    AcquireConfig, AppConfig, ArticleFilter, ArticleId, ArticleSort, EnhanceConfig,
    GeneratorConfig, RenderConfig, expand_home, init_config, load_config,
};
use blogforge_storage::{ArticleStore, Storage};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// blogforge: scrape blog articles and rewrite them against top-ranking competitors.
#[derive(Parser)]
#[command(
    name = "blogforge",
    version,
    about = "Scrape blog articles and enhance them using top-ranking competitor content.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database path (overrides the configured one).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape the newest articles from the blog index.
    Scrape {
        /// Blog index URL (defaults to the configured one).
        #[arg(long)]
        url: Option<String>,

        /// Number of articles to scrape.
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Enhance one article, or every article not yet enhanced.
    Enhance {
        /// Article ID.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Enhance all articles that have not been updated.
        #[arg(long)]
        all: bool,

        /// Maximum number of articles for --all.
        #[arg(long, requires = "all")]
        limit: Option<u32>,
    },

    /// List stored articles, newest first.
    List {
        /// Only articles with this update state.
        #[arg(long)]
        updated: Option<bool>,

        /// Maximum number of articles.
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Print one article as JSON.
    Show {
        /// Article ID.
        id: String,
    },

    /// Delete one article.
    Delete {
        /// Article ID.
        id: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "blogforge=info",
        1 => "blogforge=debug",
        _ => "blogforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Scrape { url, count } => cmd_scrape(db, url, count).await,
        Command::Enhance { id, all, limit } => match id {
            Some(id) if !all => cmd_enhance_one(db, &id).await,
            _ => cmd_enhance_all(db, limit).await,
        },
        Command::List { updated, limit } => cmd_list(db, updated, limit).await,
        Command::Show { id } => cmd_show(db, &id).await,
        Command::Delete { id } => cmd_delete(db, &id).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Open the database named by `--db`, or the configured one.
async fn open_storage(config: &AppConfig, db: Option<PathBuf>) -> Result<Storage> {
    let path = match db {
        Some(path) => path,
        None => expand_home(&config.storage.database_path)?,
    };
    info!(path = %path.display(), "opening database");
    Ok(Storage::open(&path).await?)
}

fn parse_id(id: &str) -> Result<ArticleId> {
    id.parse()
        .map_err(|e| eyre!("invalid article id '{id}': {e}"))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_scrape(db: Option<PathBuf>, url: Option<String>, count: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let mut acquire_config = AcquireConfig::from(&config);
    if let Some(url) = url {
        acquire_config.index_url = url;
    }
    if let Some(count) = count {
        acquire_config.count = count;
    }

    let storage = open_storage(&config, db).await?;
    let pacer = FixedDelays::from(&config.pacing);
    let reporter = CliProgress::new();

    let session = BrowserSession::open(RenderConfig::from(&config)).await?;
    let result = acquire(&session, &storage, &pacer, &acquire_config, &reporter).await;
    session.close().await;
    let report = result?;

    println!();
    println!("  Scraped {} article(s)", report.outcomes.len());
    println!("  Created: {}", report.created);
    println!("  Existing: {}", report.reused);
    println!("  Failed:  {}", report.failed);
    for article in &report.articles {
        println!("  {}  {}", article.id, article.title);
    }
    println!("  Time:    {:.1}s", report.elapsed.as_secs_f64());
    println!();
    Ok(())
}

async fn cmd_enhance_one(db: Option<PathBuf>, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let config = load_config()?;
    let generator = ChatCompletionsGenerator::new(GeneratorConfig::from_app(&config)?)?;
    let storage = open_storage(&config, db).await?;
    let pacer = FixedDelays::from(&config.pacing);
    let reporter = CliProgress::new();

    let session = BrowserSession::open(RenderConfig::from(&config)).await?;
    let search = search_provider(&session, &config);
    let enhancer = Enhancer::new(
        &storage,
        &search,
        &session,
        &generator,
        &pacer,
        EnhanceConfig::from(&config),
    )
    .with_progress(&reporter);
    let result = enhancer.enhance_article(&id).await;
    session.close().await;
    reporter.finish("");
    let article = result?;

    println!();
    println!("  Article enhanced!");
    println!("  ID:         {}", article.id);
    println!("  Title:      {}", article.title);
    println!("  References: {}", article.references.len());
    for (i, reference) in article.references.iter().enumerate() {
        println!("    {}. {} ({})", i + 1, reference.title, reference.url);
    }
    println!();
    Ok(())
}

async fn cmd_enhance_all(db: Option<PathBuf>, limit: Option<u32>) -> Result<()> {
    let config = load_config()?;
    let generator = ChatCompletionsGenerator::new(GeneratorConfig::from_app(&config)?)?;
    let storage = open_storage(&config, db).await?;
    let pacer = FixedDelays::from(&config.pacing);
    let reporter = CliProgress::new();

    let mut enhance_config = EnhanceConfig::from(&config);
    if let Some(limit) = limit {
        enhance_config.batch_limit = limit;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let signal = {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current article");
                cancel.store(true, Ordering::SeqCst);
            }
        })
    };

    let session = BrowserSession::open(RenderConfig::from(&config)).await?;
    let search = search_provider(&session, &config);
    let enhancer = Enhancer::new(&storage, &search, &session, &generator, &pacer, enhance_config)
        .with_progress(&reporter)
        .with_cancel_flag(cancel);
    let result = enhancer.enhance_all().await;
    session.close().await;
    signal.abort();
    let report = result?;

    println!();
    println!("  Enhanced: {}", report.enhanced.len());
    println!("  Failed:   {}", report.failed.len());
    for (id, error) in &report.failed {
        println!("    {id}: {error}");
    }
    if report.cancelled {
        println!("  Stopped early on interrupt.");
    }
    println!();
    Ok(())
}

/// Live Google search, backed by the fixed list unless disabled.
fn search_provider<'a>(
    session: &'a BrowserSession,
    config: &AppConfig,
) -> SearchWithFallback<GoogleSearch<'a>, FallbackSearch> {
    let live = GoogleSearch::new(session, config.search.engine_url.clone());
    let fallback = if config.search.use_fallback {
        FallbackSearch::default()
    } else {
        FallbackSearch::empty()
    };
    SearchWithFallback::new(live, fallback)
}

async fn cmd_list(db: Option<PathBuf>, updated: Option<bool>, limit: Option<u32>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;

    let articles = storage
        .find(
            ArticleFilter {
                is_updated: updated,
            },
            ArticleSort::PublishedDesc,
            limit,
        )
        .await?;

    if articles.is_empty() {
        println!("No articles stored.");
        return Ok(());
    }

    for article in &articles {
        let published = article
            .published_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        let marker = if article.is_updated { "*" } else { " " };
        println!("{}  {published} {marker} {}", article.id, article.title);
    }
    println!();
    println!("{} article(s); * = enhanced", articles.len());
    Ok(())
}

async fn cmd_show(db: Option<PathBuf>, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;

    let article = storage
        .find_by_id(&id)
        .await?
        .ok_or_else(|| eyre!("article {id} not found"))?;
    println!("{}", serde_json::to_string_pretty(&article)?);
    Ok(())
}

async fn cmd_delete(db: Option<PathBuf>, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;

    if !storage.delete_by_id(&id).await? {
        return Err(eyre!("article {id} not found"));
    }
    println!("Deleted article {id}");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item(&self, label: &str, current: usize, total: usize) {
        self.spinner.set_message(format!("[{current}/{total}] {label}"));
    }

    fn finish(&self, _summary: &str) {
        self.spinner.finish_and_clear();
    }
}
