//! Domain error vocabulary for the todo service.
//!
//! # Design
//! Storage adapters classify every backend failure into `TodoError` before
//! returning, so nothing above the adapter boundary ever looks at a
//! backend-specific code. The service wraps errors in `ServiceError`, which
//! adds the operation name for diagnostics but keeps the inner variant
//! reachable for matching. Callers branch on `ErrorKind`, never on message
//! text.

/// Errors returned by `TodoStorage` implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TodoError {
    /// No item with the requested id exists.
    #[error("todo item not found")]
    NotFound,

    /// An item with the same id, or another unique key, is already stored.
    #[error("todo item already exists")]
    AlreadyExists,

    /// The caller cancelled the request before storage answered.
    #[error("request cancelled")]
    Cancelled,

    /// The request deadline passed before storage answered.
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// Any other backend failure. Carries the original message but is never
    /// matchable as one of the variants above.
    #[error("{operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

impl TodoError {
    pub fn backend(operation: &'static str, message: impl ToString) -> Self {
        Self::Backend {
            operation,
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TodoError::NotFound => ErrorKind::NotFound,
            TodoError::AlreadyExists => ErrorKind::AlreadyExists,
            TodoError::Cancelled | TodoError::DeadlineExceeded => ErrorKind::Cancelled,
            TodoError::Backend { .. } => ErrorKind::Internal,
        }
    }
}

/// Coarse classification used by transport adapters to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Cancelled,
    Internal,
}

/// A `TodoError` tagged with the service operation that produced it,
/// e.g. `"todo.update"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{op}: {error}")]
pub struct ServiceError {
    op: &'static str,
    #[source]
    error: TodoError,
}

impl ServiceError {
    pub fn new(op: &'static str, error: TodoError) -> Self {
        Self { op, error }
    }

    pub fn op(&self) -> &'static str {
        self.op
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    pub fn into_inner(self) -> TodoError {
        self.error
    }
}

impl PartialEq<TodoError> for ServiceError {
    fn eq(&self, other: &TodoError) -> bool {
        &self.error == other
    }
}
