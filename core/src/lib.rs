//! Storage-agnostic service layer for todo items.
//!
//! # Overview
//! `TodoService` assigns ids, applies field-masked partial updates and tags
//! errors with the failing operation. It talks to persistence only through
//! the `TodoStorage` port; `InMemoryStorage` and `SqliteStorage` are the two
//! adapters shipped here.
//!
//! # Design
//! - Adapters translate backend failures into `TodoError` at their boundary.
//!   Above it, code branches on `ErrorKind` only.
//! - Every storage call runs under a `RequestContext`, so a cancelled or
//!   timed-out request stops waiting on storage promptly.
//! - `update` is fetch, merge, write. It is not atomic; concurrent updates of
//!   one item are last-write-wins.

pub mod context;
pub mod error;
pub mod id;
pub mod memory;
pub mod service;
pub mod sqlite;
pub mod storage;
pub mod types;

pub use context::RequestContext;
pub use error::{ErrorKind, ServiceError, TodoError};
pub use id::{IdGenerator, UuidGenerator};
pub use memory::InMemoryStorage;
pub use service::TodoService;
pub use sqlite::SqliteStorage;
pub use storage::TodoStorage;
pub use types::{FieldMask, TodoItem, UpdatableField};
