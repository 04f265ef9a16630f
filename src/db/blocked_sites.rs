use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqlitePool};

use crate::rules::normalize_site;

/// Ordered, de-duplicated list of blocked host names.
#[derive(Clone)]
pub struct BlockedSitesRepository {
    pool: SqlitePool,
}

impl BlockedSitesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Returns `false` when the site was already listed.
    pub async fn add(&self, raw_site: &str) -> Result<bool> {
        let Some(site) = normalize_site(raw_site) else {
            bail!("'{}' is not a usable host name", raw_site.trim());
        };
        let affected = sqlx::query(r#"INSERT OR IGNORE INTO blocked_sites (site) VALUES (?1)"#)
            .bind(&site)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected > 0 {
            tracing::info!(target: "store", site = %site, "blocked site added");
        }
        Ok(affected > 0)
    }

    pub async fn remove(&self, raw_site: &str) -> Result<bool> {
        let Some(site) = normalize_site(raw_site) else {
            return Ok(false);
        };
        let affected = sqlx::query(r#"DELETE FROM blocked_sites WHERE site = ?1"#)
            .bind(&site)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected > 0 {
            tracing::info!(target: "store", site = %site, "blocked site removed");
        }
        Ok(affected > 0)
    }

    pub async fn list(&self) -> Result<Vec<BlockedSite>> {
        let rows = sqlx::query_as::<_, BlockedSite>(
            r#"SELECT id, site, added_at FROM blocked_sites ORDER BY id ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Host names in insertion order; the order fixes derived rule IDs.
    pub async fn sites(&self) -> Result<Vec<String>> {
        Ok(self.list().await?.into_iter().map(|row| row.site).collect())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockedSite {
    pub id: i64,
    pub site: String,
    pub added_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for BlockedSite {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            site: row.try_get("site")?,
            added_at: row.try_get("added_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;

    async fn repository() -> BlockedSitesRepository {
        BlockedSitesRepository::new(init_memory_pool().await.unwrap())
    }

    #[tokio::test]
    async fn add_normalizes_and_keeps_order() {
        let repo = repository().await;
        assert!(repo.add("https://www.Example.com/").await.unwrap());
        assert!(repo.add("news.example.org").await.unwrap());
        assert!(!repo.add("example.com").await.unwrap());

        assert_eq!(
            repo.sites().await.unwrap(),
            vec!["example.com".to_string(), "news.example.org".to_string()]
        );
    }

    #[tokio::test]
    async fn remove_matches_normalized_form() {
        let repo = repository().await;
        repo.add("example.com").await.unwrap();
        repo.add("other.net").await.unwrap();

        assert!(repo.remove("http://www.example.com").await.unwrap());
        assert!(!repo.remove("example.com").await.unwrap());
        assert_eq!(repo.sites().await.unwrap(), vec!["other.net".to_string()]);
    }

    #[tokio::test]
    async fn blank_site_is_rejected() {
        let repo = repository().await;
        assert!(repo.add("   ").await.is_err());
        assert!(repo.list().await.unwrap().is_empty());
    }
}
