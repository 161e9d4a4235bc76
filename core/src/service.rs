//! Todo item service.
//!
//! # Design
//! `TodoService` is generic over `TodoStorage` and holds no mutable state of
//! its own, so it can be shared across concurrent requests as long as the
//! storage can. It assigns ids, applies field masks, and tags errors with the
//! operation name. It never inspects backend errors and never retries.
//!
//! `update` is read-merge-write and not atomic: two concurrent updates of
//! the same item race, and the last full write wins.

use std::sync::Arc;

use tracing::Span;

use crate::context::RequestContext;
use crate::error::{ErrorKind, ServiceError, TodoError};
use crate::id::{IdGenerator, UuidGenerator};
use crate::storage::TodoStorage;
use crate::types::{FieldMask, TodoItem};

const OP_CREATE: &str = "todo.create";
const OP_FETCH: &str = "todo.fetch";
const OP_LIST: &str = "todo.list";
const OP_UPDATE: &str = "todo.update";
const OP_DELETE: &str = "todo.delete";

pub struct TodoService<S> {
    storage: S,
    ids: Arc<dyn IdGenerator>,
}

impl<S: TodoStorage> TodoService<S> {
    pub fn new(storage: S) -> Self {
        Self::with_id_generator(storage, Arc::new(UuidGenerator))
    }

    pub fn with_id_generator(storage: S, ids: Arc<dyn IdGenerator>) -> Self {
        Self { storage, ids }
    }

    /// Store `draft` under a freshly generated id and return it. Any id on the
    /// draft is discarded.
    #[tracing::instrument(name = "todo.create", skip_all, fields(id))]
    pub async fn create(
        &self,
        ctx: &RequestContext,
        mut draft: TodoItem,
    ) -> Result<TodoItem, ServiceError> {
        draft.id = self.ids.generate();
        Span::current().record("id", draft.id.as_str());
        tracing::debug!("creating todo item");

        ctx.run(self.storage.create(ctx, &draft))
            .await
            .map_err(|e| wrap(OP_CREATE, e))?;
        Ok(draft)
    }

    #[tracing::instrument(name = "todo.fetch", skip_all, fields(id = %id))]
    pub async fn fetch(&self, ctx: &RequestContext, id: &str) -> Result<TodoItem, ServiceError> {
        tracing::debug!("fetching todo item");

        ctx.run(self.storage.fetch(ctx, id))
            .await
            .map_err(|e| wrap(OP_FETCH, e))
    }

    #[tracing::instrument(name = "todo.list", skip_all)]
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<TodoItem>, ServiceError> {
        tracing::debug!("listing todo items");

        ctx.run(self.storage.list(ctx))
            .await
            .map_err(|e| wrap(OP_LIST, e))
    }

    /// Apply the fields of `patch` named in `mask` to the stored item with
    /// `patch.id`. Fields outside the mask keep their stored value even when
    /// `patch` carries something else for them.
    #[tracing::instrument(name = "todo.update", skip_all, fields(id = %patch.id, mask = ?mask))]
    pub async fn update(
        &self,
        ctx: &RequestContext,
        patch: &TodoItem,
        mask: &FieldMask,
    ) -> Result<(), ServiceError> {
        if mask.is_empty() {
            tracing::debug!(ignored = ?mask.ignored(), "update names no known field");
        } else {
            tracing::debug!("updating todo item");
        }

        let current = ctx
            .run(self.storage.fetch(ctx, &patch.id))
            .await
            .map_err(|e| wrap(OP_UPDATE, e))?;
        let merged = mask.merge(&current, patch);

        ctx.run(self.storage.update(ctx, &merged))
            .await
            .map_err(|e| wrap(OP_UPDATE, e))
    }

    #[tracing::instrument(name = "todo.delete", skip_all, fields(id = %id))]
    pub async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<(), ServiceError> {
        tracing::debug!("deleting todo item");

        ctx.run(self.storage.delete(ctx, id))
            .await
            .map_err(|e| wrap(OP_DELETE, e))
    }
}

fn wrap(op: &'static str, error: TodoError) -> ServiceError {
    if error.kind() == ErrorKind::Internal {
        tracing::warn!(op, error = %error, "todo storage failure");
    }
    ServiceError::new(op, error)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::storage::MockTodoStorage;

    struct FixedId(&'static str);

    impl IdGenerator for FixedId {
        fn generate(&self) -> String {
            self.0.to_string()
        }
    }

    fn stored() -> TodoItem {
        TodoItem {
            id: "xid1".to_string(),
            title: "A".to_string(),
            details: "B".to_string(),
        }
    }

    #[tokio::test]
    async fn create_replaces_caller_id() {
        let mut storage = MockTodoStorage::new();
        storage
            .expect_create()
            .withf(|_, item| item.id == "generated" && item.title == "buy grocery")
            .times(1)
            .returning(|_, _| Ok(()));
        let service = TodoService::with_id_generator(storage, Arc::new(FixedId("generated")));

        let mut draft = TodoItem::draft("buy grocery", "buy milk and bread");
        draft.id = "caller-chosen".to_string();
        let created = service
            .create(&RequestContext::background(), draft)
            .await
            .unwrap();

        assert_eq!(created.id, "generated");
        assert_eq!(created.details, "buy milk and bread");
    }

    #[tokio::test]
    async fn create_propagates_already_exists() {
        let mut storage = MockTodoStorage::new();
        storage
            .expect_create()
            .returning(|_, _| Err(TodoError::AlreadyExists));
        let service = TodoService::new(storage);

        let err = service
            .create(&RequestContext::background(), TodoItem::draft("t", "d"))
            .await
            .unwrap_err();

        assert!(err.is_already_exists());
        assert_eq!(err.op(), "todo.create");
    }

    #[tokio::test]
    async fn list_tags_errors_without_reinterpreting() {
        let mut storage = MockTodoStorage::new();
        storage
            .expect_list()
            .returning(|_| Err(TodoError::backend("sqlite.list", "disk full")));
        let service = TodoService::new(storage);

        let err = service.list(&RequestContext::background()).await.unwrap_err();

        assert_eq!(err.op(), "todo.list");
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.to_string(), "todo.list: sqlite.list: disk full");
    }

    #[tokio::test]
    async fn update_writes_merged_record() {
        let mut storage = MockTodoStorage::new();
        storage
            .expect_fetch()
            .withf(|_, id| id == "xid1")
            .returning(|_, _| Ok(stored()));
        storage
            .expect_update()
            .withf(|_, item| item.id == "xid1" && item.title == "Z" && item.details == "B")
            .times(1)
            .returning(|_, _| Ok(()));
        let service = TodoService::new(storage);

        let patch = TodoItem {
            id: "xid1".to_string(),
            title: "Z".to_string(),
            details: "Y".to_string(),
        };
        service
            .update(
                &RequestContext::background(),
                &patch,
                &FieldMask::from_paths(["title"]),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_with_unknown_paths_only_rewrites_unchanged_record() {
        let mut storage = MockTodoStorage::new();
        storage.expect_fetch().returning(|_, _| Ok(stored()));
        storage
            .expect_update()
            .withf(|_, item| *item == stored())
            .times(1)
            .returning(|_, _| Ok(()));
        let service = TodoService::new(storage);

        let patch = TodoItem {
            id: "xid1".to_string(),
            title: "Z".to_string(),
            details: "Y".to_string(),
        };
        service
            .update(
                &RequestContext::background(),
                &patch,
                &FieldMask::from_paths(["priority"]),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_on_missing_id_does_not_write() {
        let mut storage = MockTodoStorage::new();
        storage
            .expect_fetch()
            .returning(|_, _| Err(TodoError::NotFound));
        storage.expect_update().never();
        let service = TodoService::new(storage);

        let patch = TodoItem {
            id: "missing".to_string(),
            ..TodoItem::default()
        };
        let err = service
            .update(&RequestContext::background(), &patch, &FieldMask::all())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.op(), "todo.update");
    }

    #[tokio::test]
    async fn delete_tags_errors() {
        let mut storage = MockTodoStorage::new();
        storage
            .expect_delete()
            .withf(|_, id| id == "xid9")
            .returning(|_, _| Err(TodoError::backend("sqlite.delete", "readonly database")));
        let service = TodoService::new(storage);

        let err = service
            .delete(&RequestContext::background(), "xid9")
            .await
            .unwrap_err();

        assert_eq!(err.op(), "todo.delete");
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn cancelled_request_never_reaches_storage() {
        let mut storage = MockTodoStorage::new();
        storage.expect_fetch().never();
        let service = TodoService::new(storage);

        let ctx = RequestContext::background();
        ctx.cancel();
        let err = service.fetch(&ctx, "xid1").await.unwrap_err();

        assert_eq!(err, TodoError::Cancelled);
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    struct StalledStorage;

    #[async_trait::async_trait]
    impl TodoStorage for StalledStorage {
        async fn fetch(&self, _: &RequestContext, _: &str) -> Result<TodoItem, TodoError> {
            std::future::pending().await
        }

        async fn list(&self, _: &RequestContext) -> Result<Vec<TodoItem>, TodoError> {
            std::future::pending().await
        }

        async fn create(&self, _: &RequestContext, _: &TodoItem) -> Result<(), TodoError> {
            std::future::pending().await
        }

        async fn update(&self, _: &RequestContext, _: &TodoItem) -> Result<(), TodoError> {
            std::future::pending().await
        }

        async fn delete(&self, _: &RequestContext, _: &str) -> Result<(), TodoError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_storage_surfaces_deadline() {
        let service = TodoService::new(StalledStorage);
        let ctx = RequestContext::with_timeout(Duration::from_millis(100));

        let err = service.list(&ctx).await.unwrap_err();

        assert_eq!(err, TodoError::DeadlineExceeded);
        assert_eq!(err.op(), "todo.list");
    }

    /// Records every span's name and its `id` field, including values
    /// recorded after the span was opened.
    #[derive(Clone, Default)]
    struct SpanLog(Arc<std::sync::Mutex<Vec<(&'static str, Option<String>)>>>);

    struct Slot(usize);

    struct IdField<'a>(&'a mut Option<String>);

    impl tracing::field::Visit for IdField<'_> {
        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            if field.name() == "id" {
                *self.0 = Some(value.to_string());
            }
        }

        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "id" {
                *self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S> tracing_subscriber::Layer<S> for SpanLog
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            id: &tracing::span::Id,
            ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut value = None;
            attrs.record(&mut IdField(&mut value));
            let mut spans = self.0.lock().unwrap();
            spans.push((attrs.metadata().name(), value));
            if let Some(span) = ctx.span(id) {
                span.extensions_mut().insert(Slot(spans.len() - 1));
            }
        }

        fn on_record(
            &self,
            id: &tracing::span::Id,
            values: &tracing::span::Record<'_>,
            ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let Some(span) = ctx.span(id) else { return };
            let Some(slot) = span.extensions().get::<Slot>().map(|s| s.0) else {
                return;
            };
            let mut spans = self.0.lock().unwrap();
            values.record(&mut IdField(&mut spans[slot].1));
        }
    }

    #[tokio::test]
    async fn every_operation_opens_a_named_span_with_the_id() {
        use tracing_subscriber::layer::SubscriberExt;

        let log = SpanLog::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(log.clone()));

        let service = TodoService::with_id_generator(
            crate::memory::InMemoryStorage::new(),
            Arc::new(FixedId("xid1")),
        );
        let ctx = RequestContext::background();

        let created = service
            .create(&ctx, TodoItem::draft("buy grocery", "buy milk"))
            .await
            .unwrap();
        service.fetch(&ctx, &created.id).await.unwrap();
        service.list(&ctx).await.unwrap();
        service
            .update(&ctx, &created, &FieldMask::from_paths(["priority"]))
            .await
            .unwrap();
        service.delete(&ctx, &created.id).await.unwrap();

        let spans = log.0.lock().unwrap().clone();
        let xid1 = Some("xid1".to_string());
        assert_eq!(
            spans,
            vec![
                ("todo.create", xid1.clone()),
                ("todo.fetch", xid1.clone()),
                ("todo.list", None),
                ("todo.update", xid1.clone()),
                ("todo.delete", xid1),
            ]
        );
    }
}
