//! SQL migration definitions for the blogforge database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: articles",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Acquired (and possibly enhanced) articles
CREATE TABLE IF NOT EXISTS articles (
    id               TEXT PRIMARY KEY,
    title            TEXT NOT NULL,
    url              TEXT NOT NULL UNIQUE,
    content          TEXT NOT NULL,
    published_date   TEXT,
    author           TEXT NOT NULL DEFAULT 'Unknown',
    image_url        TEXT,
    excerpt          TEXT,
    is_updated       INTEGER NOT NULL DEFAULT 0,
    updated_content  TEXT,
    references_json  TEXT NOT NULL DEFAULT '[]',
    scraped_at       TEXT NOT NULL,
    updated_at       TEXT
);

CREATE INDEX IF NOT EXISTS idx_articles_is_updated ON articles(is_updated);
CREATE INDEX IF NOT EXISTS idx_articles_published ON articles(published_date);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
