//! Shared types, error model, and configuration for blogforge.
//!
//! This crate is the foundation depended on by all other blogforge crates.
//! It provides:
//! - [`BlogforgeError`]: the unified error type
//! - Domain types ([`Article`], [`Reference`], [`ScrapeOutcome`], [`SearchResult`])
//! - Configuration ([`AppConfig`], runtime configs, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AcquireConfig, AppConfig, DEFAULT_USER_AGENT, EnhanceConfig, ExtractionConfig,
    GeneratorConfig, LlmConfig, PacingConfig, PromptConfig, RenderConfig, RendererConfig,
    SearchConfig, SourceConfig, StorageConfig, config_dir, config_file_path, expand_home,
    init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{BlogforgeError, Result};
pub use types::{
    Article, ArticleFilter, ArticleId, ArticlePatch, ArticleSort, DEFAULT_AUTHOR, EMPTY_CONTENT,
    FAILED_CONTENT, ListingEntry, NewArticle, Reference, ScrapeOutcome, SearchResult,
    parse_published_date,
};
