//! The storage port: what a backing store must provide to `TodoService`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::TodoError;
use crate::types::TodoItem;

/// Persistence for todo items.
///
/// Implementations translate their own failures into `TodoError` before
/// returning. `delete` of an unknown id must succeed; every adapter in this
/// crate follows that policy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TodoStorage: Send + Sync {
    /// The item with `id`, or `TodoError::NotFound`.
    async fn fetch(&self, ctx: &RequestContext, id: &str) -> Result<TodoItem, TodoError>;

    /// Every stored item. Empty store yields an empty vec.
    async fn list(&self, ctx: &RequestContext) -> Result<Vec<TodoItem>, TodoError>;

    /// Insert a new item keyed by `item.id`, or `TodoError::AlreadyExists`.
    async fn create(&self, ctx: &RequestContext, item: &TodoItem) -> Result<(), TodoError>;

    /// Replace the stored item with the same id, or `TodoError::NotFound`.
    async fn update(&self, ctx: &RequestContext, item: &TodoItem) -> Result<(), TodoError>;

    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<(), TodoError>;
}

#[async_trait]
impl<S> TodoStorage for Arc<S>
where
    S: TodoStorage + ?Sized,
{
    async fn fetch(&self, ctx: &RequestContext, id: &str) -> Result<TodoItem, TodoError> {
        (**self).fetch(ctx, id).await
    }

    async fn list(&self, ctx: &RequestContext) -> Result<Vec<TodoItem>, TodoError> {
        (**self).list(ctx).await
    }

    async fn create(&self, ctx: &RequestContext, item: &TodoItem) -> Result<(), TodoError> {
        (**self).create(ctx, item).await
    }

    async fn update(&self, ctx: &RequestContext, item: &TodoItem) -> Result<(), TodoError> {
        (**self).update(ctx, item).await
    }

    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<(), TodoError> {
        (**self).delete(ctx, id).await
    }
}
