//! SQLite-backed `TodoStorage`.
//!
//! # Design
//! All sqlx failures pass through `translate` before leaving this module, so
//! the unique-constraint and missing-row cases always surface as the same
//! `TodoError` variant no matter which query produced them.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::context::RequestContext;
use crate::error::TodoError;
use crate::storage::TodoStorage;
use crate::types::TodoItem;

type TodoRow = (String, String, String);

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Wrap an existing pool, creating the `todo_items` table if needed.
    pub async fn new(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS todo_items (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                details TEXT NOT NULL DEFAULT ''
            )
        "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Open a pool for `url` and migrate it.
    ///
    /// Every connection to `sqlite::memory:` is a separate database, so
    /// in-memory URLs get one connection that is never recycled.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = if url.contains(":memory:") || url.contains("mode=memory") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(8)
                .acquire_timeout(Duration::from_secs(5))
        };
        let pool = options.connect(url).await?;
        Self::new(pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Map a sqlx failure onto the domain vocabulary.
pub fn translate(operation: &'static str, err: sqlx::Error) -> TodoError {
    match err {
        sqlx::Error::RowNotFound => TodoError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => TodoError::AlreadyExists,
        other => TodoError::backend(operation, other),
    }
}

fn into_item((id, title, details): TodoRow) -> TodoItem {
    TodoItem { id, title, details }
}

#[async_trait]
impl TodoStorage for SqliteStorage {
    async fn fetch(&self, _ctx: &RequestContext, id: &str) -> Result<TodoItem, TodoError> {
        let row: TodoRow =
            sqlx::query_as("SELECT id, title, details FROM todo_items WHERE id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| translate("sqlite.fetch", e))?;
        Ok(into_item(row))
    }

    async fn list(&self, _ctx: &RequestContext) -> Result<Vec<TodoItem>, TodoError> {
        let rows: Vec<TodoRow> =
            sqlx::query_as("SELECT id, title, details FROM todo_items ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| translate("sqlite.list", e))?;
        Ok(rows.into_iter().map(into_item).collect())
    }

    async fn create(&self, _ctx: &RequestContext, item: &TodoItem) -> Result<(), TodoError> {
        sqlx::query("INSERT INTO todo_items (id, title, details) VALUES (?, ?, ?)")
            .bind(&item.id)
            .bind(&item.title)
            .bind(&item.details)
            .execute(&self.pool)
            .await
            .map_err(|e| translate("sqlite.create", e))?;
        Ok(())
    }

    async fn update(&self, _ctx: &RequestContext, item: &TodoItem) -> Result<(), TodoError> {
        let result = sqlx::query("UPDATE todo_items SET title = ?, details = ? WHERE id = ?")
            .bind(&item.title)
            .bind(&item.details)
            .bind(&item.id)
            .execute(&self.pool)
            .await
            .map_err(|e| translate("sqlite.update", e))?;

        if result.rows_affected() == 0 {
            return Err(TodoError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, _ctx: &RequestContext, id: &str) -> Result<(), TodoError> {
        sqlx::query("DELETE FROM todo_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| translate("sqlite.delete", e))?;
        Ok(())
    }
}
