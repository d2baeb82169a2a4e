//! Application configuration for blogforge.
//!
//! User config lives at `~/.blogforge/blogforge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BlogforgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "blogforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".blogforge";

/// Desktop Chrome user agent presented by the headless browser.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching blogforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source blog to acquire from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Headless browser settings.
    #[serde(default)]
    pub renderer: RendererConfig,

    /// Competitor search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Pacing delays between network operations.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Content-length thresholds for extraction.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Prompt truncation budgets.
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Text generation endpoint.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Article database.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Blog index page listing the articles.
    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// Number of listing entries to acquire per run.
    #[serde(default = "default_count")]
    pub count: usize,

    /// Site-specific article container, tried before the generic cascade.
    #[serde(default = "default_content_selector")]
    pub content_selector: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            index_url: default_index_url(),
            count: default_count(),
            content_selector: default_content_selector(),
        }
    }
}

fn default_index_url() -> String {
    "https://beyondchats.com/blogs/".into()
}
fn default_count() -> usize {
    2
}
fn default_content_selector() -> String {
    "#content".into()
}

/// `[renderer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Navigation timeout in ms.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Extra wait after a network-idle load, letting late scripts settle.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Explicit Chrome/Chromium executable. Auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            headless: true,
            settle_ms: default_settle_ms(),
            chrome_path: None,
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_viewport_width() -> u32 {
    1920
}
fn default_viewport_height() -> u32 {
    1080
}
fn default_settle_ms() -> u64 {
    2000
}
fn default_true() -> bool {
    true
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of competitor results to use per article.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Search results page queried with `?q=`.
    #[serde(default = "default_engine_url")]
    pub engine_url: String,

    /// Serve the fixed fallback list when the live query returns nothing.
    #[serde(default = "default_true")]
    pub use_fallback: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            engine_url: default_engine_url(),
            use_fallback: true,
        }
    }
}

fn default_max_results() -> usize {
    2
}
fn default_engine_url() -> String {
    "https://www.google.com/search".into()
}

/// `[pacing]` section. All values in ms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Wait after the competitor search.
    #[serde(default = "default_search_delay")]
    pub search_delay_ms: u64,

    /// Wait between competitor page fetches.
    #[serde(default = "default_competitor_delay")]
    pub competitor_delay_ms: u64,

    /// Wait between articles in batch enhancement.
    #[serde(default = "default_article_delay")]
    pub article_delay_ms: u64,

    /// Wait between article pages during acquisition.
    #[serde(default = "default_acquisition_delay")]
    pub acquisition_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            search_delay_ms: default_search_delay(),
            competitor_delay_ms: default_competitor_delay(),
            article_delay_ms: default_article_delay(),
            acquisition_delay_ms: default_acquisition_delay(),
        }
    }
}

fn default_search_delay() -> u64 {
    2000
}
fn default_competitor_delay() -> u64 {
    2000
}
fn default_article_delay() -> u64 {
    5000
}
fn default_acquisition_delay() -> u64 {
    1000
}

/// `[extraction]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Below this many characters a container is not real content.
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// Paragraphs at or below this length are skipped by the fallback.
    #[serde(default = "default_min_paragraph_chars")]
    pub min_paragraph_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_content_chars: default_min_content_chars(),
            min_paragraph_chars: default_min_paragraph_chars(),
        }
    }
}

fn default_min_content_chars() -> usize {
    200
}
fn default_min_paragraph_chars() -> usize {
    50
}

/// `[prompt]` section. Budgets are in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_original_budget")]
    pub original_budget: usize,

    #[serde(default = "default_competitor_budget")]
    pub competitor_budget: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            original_budget: default_original_budget(),
            competitor_budget: default_competitor_budget(),
        }
    }
}

fn default_original_budget() -> usize {
    2000
}
fn default_competitor_budget() -> usize {
    1500
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".into()
}
fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4000
}
fn default_llm_timeout() -> u64 {
    120
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file. A leading `~` expands to the home directory.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "~/.blogforge/blogforge.db".into()
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime browser configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub headless: bool,
    pub settle: Duration,
    pub chrome_path: Option<PathBuf>,
}

impl From<&AppConfig> for RenderConfig {
    fn from(config: &AppConfig) -> Self {
        let r = &config.renderer;
        Self {
            timeout: Duration::from_millis(r.timeout_ms),
            user_agent: r.user_agent.clone(),
            viewport: (r.viewport_width, r.viewport_height),
            headless: r.headless,
            settle: Duration::from_millis(r.settle_ms),
            chrome_path: r.chrome_path.as_ref().map(PathBuf::from),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Runtime acquisition configuration.
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    pub index_url: String,
    pub count: usize,
    pub content_selector: String,
    pub min_content_chars: usize,
    pub min_paragraph_chars: usize,
}

impl From<&AppConfig> for AcquireConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            index_url: config.source.index_url.clone(),
            count: config.source.count,
            content_selector: config.source.content_selector.clone(),
            min_content_chars: config.extraction.min_content_chars,
            min_paragraph_chars: config.extraction.min_paragraph_chars,
        }
    }
}

/// Runtime enhancement configuration.
#[derive(Debug, Clone)]
pub struct EnhanceConfig {
    pub max_results: usize,
    pub min_content_chars: usize,
    pub min_paragraph_chars: usize,
    pub original_budget: usize,
    pub competitor_budget: usize,
    /// Upper bound on articles picked up by one batch run.
    pub batch_limit: u32,
}

impl From<&AppConfig> for EnhanceConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_results: config.search.max_results,
            min_content_chars: config.extraction.min_content_chars,
            min_paragraph_chars: config.extraction.min_paragraph_chars,
            original_budget: config.prompt.original_budget,
            competitor_budget: config.prompt.competitor_budget,
            batch_limit: 50,
        }
    }
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Runtime text-generation configuration.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl GeneratorConfig {
    /// Resolve the API key from the configured env var.
    pub fn from_app(config: &AppConfig) -> Result<Self> {
        validate_api_key(config)?;
        let api_key = std::env::var(&config.llm.api_key_env).unwrap_or_default();
        Ok(Self {
            base_url: config.llm.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            timeout: Duration::from_secs(config.llm.timeout_secs),
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.blogforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BlogforgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.blogforge/blogforge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BlogforgeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BlogforgeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BlogforgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BlogforgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BlogforgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| BlogforgeError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

/// Check that the LLM API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.llm.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(BlogforgeError::config(format!(
            "LLM API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("index_url"));
        assert!(toml_str.contains("GROQ_API_KEY"));
        assert!(toml_str.contains("search_delay_ms"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.search.max_results, 2);
        assert_eq!(parsed.renderer.timeout_ms, 30_000);
        assert_eq!(parsed.llm.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[search]
max_results = 3

[pacing]
article_delay_ms = 0
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.search.max_results, 3);
        assert!(config.search.use_fallback);
        assert_eq!(config.pacing.article_delay_ms, 0);
        assert_eq!(config.pacing.search_delay_ms, 2000);
        assert_eq!(config.extraction.min_content_chars, 200);
    }

    #[test]
    fn runtime_configs_from_app_config() {
        let app = AppConfig::default();
        let render = RenderConfig::from(&app);
        assert_eq!(render.timeout, Duration::from_secs(30));
        assert_eq!(render.viewport, (1920, 1080));

        let enhance = EnhanceConfig::from(&app);
        assert_eq!(enhance.original_budget, 2000);
        assert_eq!(enhance.competitor_budget, 1500);
        assert_eq!(enhance.min_paragraph_chars, 50);

        let acquire = AcquireConfig::from(&app);
        assert_eq!(acquire.count, 2);
        assert_eq!(acquire.content_selector, "#content");
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(
            expand_home("/tmp/blogforge.db").expect("expand"),
            PathBuf::from("/tmp/blogforge.db")
        );
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.llm.api_key_env = "BF_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
