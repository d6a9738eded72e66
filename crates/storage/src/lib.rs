//! Best-effort key-value persistence backing the history and theme collaborators.

use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

mod history;
mod theme;

pub use history::{HistoryStore, HISTORY_KEY, HISTORY_LIMIT};
pub use theme::{ThemeStore, THEME_KEY};

const MEMORY_URL: &str = "sqlite::memory:";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);

        // Every connection to an in-memory database sees its own empty database,
        // so the pool must hold exactly one connection for its whole lifetime.
        let pool_options = if database_url.starts_with(MEMORY_URL) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run storage migrations")?;
        Ok(Self { pool })
    }

    pub async fn get_value(&self, namespace: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM kv_entries WHERE namespace = ?")
                .bind(namespace)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("failed to read key '{namespace}'"))?;
        Ok(value)
    }

    pub async fn set_value(&self, namespace: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_entries (namespace, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(namespace) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(namespace)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write key '{namespace}'"))?;
        Ok(())
    }

    pub async fn remove_value(&self, namespace: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE namespace = ?")
            .bind(namespace)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove key '{namespace}'"))?;
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with(MEMORY_URL) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
