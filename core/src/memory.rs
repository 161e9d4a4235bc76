//! In-memory `TodoStorage`, for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::context::RequestContext;
use crate::error::TodoError;
use crate::storage::TodoStorage;
use crate::types::TodoItem;

type Db = Arc<RwLock<HashMap<String, TodoItem>>>;

/// A map of id to item behind a `RwLock`. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    db: Db,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.db.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.db.read().await.is_empty()
    }
}

#[async_trait]
impl TodoStorage for InMemoryStorage {
    async fn fetch(&self, _ctx: &RequestContext, id: &str) -> Result<TodoItem, TodoError> {
        let todos = self.db.read().await;
        todos.get(id).cloned().ok_or(TodoError::NotFound)
    }

    async fn list(&self, _ctx: &RequestContext) -> Result<Vec<TodoItem>, TodoError> {
        let todos = self.db.read().await;
        let mut items: Vec<TodoItem> = todos.values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    async fn create(&self, _ctx: &RequestContext, item: &TodoItem) -> Result<(), TodoError> {
        let mut todos = self.db.write().await;
        if todos.contains_key(&item.id) {
            return Err(TodoError::AlreadyExists);
        }
        todos.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn update(&self, _ctx: &RequestContext, item: &TodoItem) -> Result<(), TodoError> {
        let mut todos = self.db.write().await;
        let todo = todos.get_mut(&item.id).ok_or(TodoError::NotFound)?;
        *todo = item.clone();
        Ok(())
    }

    async fn delete(&self, _ctx: &RequestContext, id: &str) -> Result<(), TodoError> {
        self.db.write().await.remove(id);
        Ok(())
    }
}
