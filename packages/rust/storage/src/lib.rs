//! libSQL storage layer for articles.
//!
//! [`ArticleStore`] is the store interface the pipeline depends on;
//! [`Storage`] implements it on a local libSQL database. `url` is unique:
//! creating a second article for the same URL fails with
//! [`BlogforgeError::Duplicate`].

mod migrations;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tracing::{debug, info};

use blogforge_shared::{
    Article, ArticleFilter, ArticleId, ArticlePatch, ArticleSort, BlogforgeError, NewArticle,
    Reference, Result,
};

/// Columns selected for every article query, in `row_to_article` order.
const ARTICLE_COLUMNS: &str = "id, title, url, content, published_date, author, image_url, \
     excerpt, is_updated, updated_content, references_json, scraped_at, updated_at";

// ---------------------------------------------------------------------------
// Store interface
// ---------------------------------------------------------------------------

/// Persistence operations used by acquisition and enhancement.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn find(
        &self,
        filter: ArticleFilter,
        sort: ArticleSort,
        limit: Option<u32>,
    ) -> Result<Vec<Article>>;

    async fn find_by_id(&self, id: &ArticleId) -> Result<Option<Article>>;

    async fn find_by_url(&self, url: &str) -> Result<Option<Article>>;

    /// Insert a new article. Fails with `Duplicate` if the URL is taken.
    async fn create(&self, article: NewArticle) -> Result<Article>;

    /// Apply `patch`; `None` when the id does not exist.
    async fn update_by_id(&self, id: &ArticleId, patch: ArticlePatch) -> Result<Option<Article>>;

    /// Remove an article; `false` when the id does not exist.
    async fn delete_by_id(&self, id: &ArticleId) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

fn storage_err(e: impl std::fmt::Display) -> BlogforgeError {
    BlogforgeError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BlogforgeError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        debug!(path = %path.display(), "storage opened");
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        BlogforgeError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    async fn query_articles(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Article>> {
        let mut rows = self.conn.query(sql, params).await.map_err(storage_err)?;

        let mut articles = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            articles.push(row_to_article(&row)?);
        }
        Ok(articles)
    }

    async fn write_article(&self, article: &Article) -> Result<()> {
        let references =
            serde_json::to_string(&article.references).map_err(storage_err)?;
        self.conn
            .execute(
                "UPDATE articles SET title = ?2, content = ?3, is_updated = ?4,
                    updated_content = ?5, references_json = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    article.id.to_string(),
                    article.title.as_str(),
                    article.content.as_str(),
                    i64::from(article.is_updated),
                    article.updated_content.as_deref(),
                    references,
                    article.updated_at.map(|d| d.to_rfc3339()),
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for Storage {
    async fn find(
        &self,
        filter: ArticleFilter,
        sort: ArticleSort,
        limit: Option<u32>,
    ) -> Result<Vec<Article>> {
        let order = match sort {
            ArticleSort::PublishedDesc => {
                "published_date IS NULL, published_date DESC, scraped_at DESC"
            }
            ArticleSort::ScrapedAsc => "scraped_at ASC, id ASC",
        };
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles
             WHERE (?1 IS NULL OR is_updated = ?1)
             ORDER BY {order}
             LIMIT ?2"
        );
        let is_updated = filter.is_updated.map(i64::from);
        let limit = limit.map(i64::from).unwrap_or(-1);

        self.query_articles(&sql, params![is_updated, limit]).await
    }

    async fn find_by_id(&self, id: &ArticleId) -> Result<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1");
        Ok(self
            .query_articles(&sql, params![id.to_string()])
            .await?
            .into_iter()
            .next())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE url = ?1");
        Ok(self
            .query_articles(&sql, params![url])
            .await?
            .into_iter()
            .next())
    }

    async fn create(&self, new: NewArticle) -> Result<Article> {
        if self.find_by_url(&new.url).await?.is_some() {
            return Err(BlogforgeError::Duplicate { url: new.url });
        }

        let article = Article::from_new(new);
        self.conn
            .execute(
                "INSERT INTO articles (id, title, url, content, published_date, author,
                    image_url, excerpt, is_updated, references_json, scraped_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, '[]', ?9)",
                params![
                    article.id.to_string(),
                    article.title.as_str(),
                    article.url.as_str(),
                    article.content.as_str(),
                    article.published_date.map(|d| d.to_rfc3339()),
                    article.author.as_str(),
                    article.image_url.as_deref(),
                    article.excerpt.as_deref(),
                    article.scraped_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint failed") {
                    BlogforgeError::Duplicate {
                        url: article.url.clone(),
                    }
                } else {
                    storage_err(e)
                }
            })?;

        debug!(id = %article.id, url = %article.url, "article created");
        Ok(article)
    }

    async fn update_by_id(&self, id: &ArticleId, patch: ArticlePatch) -> Result<Option<Article>> {
        let Some(mut article) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        article.apply(patch);
        if !article.enhancement_is_consistent() {
            return Err(BlogforgeError::validation(format!(
                "article {id} cannot be marked updated without content and references"
            )));
        }

        self.write_article(&article).await?;
        debug!(%id, is_updated = article.is_updated, "article updated");
        Ok(Some(article))
    }

    async fn delete_by_id(&self, id: &ArticleId) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM articles WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(storage_err)?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BlogforgeError::Storage(format!("invalid date {s:?}: {e}")))
}

fn row_to_article(row: &libsql::Row) -> Result<Article> {
    let id: String = row.get(0).map_err(storage_err)?;
    let references_json: String = row.get(10).map_err(storage_err)?;
    let references: Vec<Reference> =
        serde_json::from_str(&references_json).map_err(storage_err)?;

    Ok(Article {
        id: id
            .parse()
            .map_err(|e| BlogforgeError::Storage(format!("invalid article id {id}: {e}")))?,
        title: row.get::<String>(1).map_err(storage_err)?,
        url: row.get::<String>(2).map_err(storage_err)?,
        content: row.get::<String>(3).map_err(storage_err)?,
        published_date: match row.get::<String>(4).ok() {
            Some(s) => Some(parse_timestamp(&s)?),
            None => None,
        },
        author: row.get::<String>(5).map_err(storage_err)?,
        image_url: row.get::<String>(6).ok(),
        excerpt: row.get::<String>(7).ok(),
        is_updated: row.get::<i64>(8).map_err(storage_err)? != 0,
        updated_content: row.get::<String>(9).ok(),
        references,
        scraped_at: parse_timestamp(&row.get::<String>(11).map_err(storage_err)?)?,
        updated_at: match row.get::<String>(12).ok() {
            Some(s) => Some(parse_timestamp(&s)?),
            None => None,
        },
    })
}
