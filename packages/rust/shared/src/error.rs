//! Error types for blogforge.
//!
//! Library crates use [`BlogforgeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all blogforge operations.
#[derive(Debug, thiserror::Error)]
pub enum BlogforgeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error outside of page rendering.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// An article with this URL is already stored.
    #[error("article already exists for url {url}")]
    Duplicate { url: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (invalid patch, malformed id, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Browser navigation failed or timed out.
    #[error("failed to render {url}: {cause}")]
    Render { url: String, cause: String },

    /// The requested article does not exist.
    #[error("article {id} not found")]
    NotFound { id: String },

    /// No usable competitor content for an article.
    #[error("no competitors for article {id}: {reason}")]
    NoCompetitors { id: String, reason: String },

    /// The text generator failed or returned nothing.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// The article disappeared between fetch and write.
    #[error("failed to persist article {id}: record no longer exists")]
    PersistFailed { id: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlogforgeError>;

impl BlogforgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a render error for `url`.
    pub fn render(url: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Render {
            url: url.into(),
            cause: cause.to_string(),
        }
    }

    /// Create a no-competitors error for article `id`.
    pub fn no_competitors(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NoCompetitors {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = BlogforgeError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = BlogforgeError::render("https://example.com/a", "navigation timed out");
        assert_eq!(
            err.to_string(),
            "failed to render https://example.com/a: navigation timed out"
        );

        let err = BlogforgeError::no_competitors("A1", "search returned nothing");
        assert!(err.to_string().contains("A1"));
    }
}
