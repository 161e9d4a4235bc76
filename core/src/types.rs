//! Domain records for the todo service.
//!
//! # Design
//! `TodoItem` is the plain record that crosses every boundary: transport,
//! service and storage all speak it, so no adapter needs its own copy.
//! Partial updates are described by a `FieldMask` of `UpdatableField`s. The
//! mapping from a mask entry to a struct field lives in
//! `UpdatableField::apply` and nowhere else.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single todo item.
///
/// `id` is assigned by `TodoService::create`; any id carried by a draft is
/// overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub details: String,
}

impl TodoItem {
    /// An item without identity, ready to be passed to `TodoService::create`.
    pub fn draft(title: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            details: details.into(),
        }
    }
}

/// The fields of `TodoItem` that an update may touch. `id` is never one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpdatableField {
    Title,
    Details,
}

impl UpdatableField {
    pub const ALL: [UpdatableField; 2] = [UpdatableField::Title, UpdatableField::Details];

    pub fn as_str(self) -> &'static str {
        match self {
            UpdatableField::Title => "title",
            UpdatableField::Details => "details",
        }
    }

    /// Copy this field from `patch` onto `target`.
    pub fn apply(self, target: &mut TodoItem, patch: &TodoItem) {
        match self {
            UpdatableField::Title => target.title.clone_from(&patch.title),
            UpdatableField::Details => target.details.clone_from(&patch.details),
        }
    }
}

/// Returned when a mask path names no updatable field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field path: {0}")]
pub struct UnknownField(pub String);

impl FromStr for UpdatableField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UpdatableField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Ordered, de-duplicated set of fields an update applies.
///
/// Paths that name no updatable field are dropped, not rejected. The dropped
/// paths are kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMask {
    fields: Vec<UpdatableField>,
    ignored: Vec<String>,
}

impl FieldMask {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            fields: UpdatableField::ALL.to_vec(),
            ignored: Vec::new(),
        }
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut mask = Self::default();
        for path in paths {
            let path = path.as_ref();
            match path.parse::<UpdatableField>() {
                Ok(field) if !mask.fields.contains(&field) => mask.fields.push(field),
                Ok(_) => {}
                Err(UnknownField(name)) => {
                    tracing::debug!(path = %name, "ignoring unknown field mask path");
                    mask.ignored.push(name);
                }
            }
        }
        mask
    }

    pub fn contains(&self, field: UpdatableField) -> bool {
        self.fields.contains(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = UpdatableField> + '_ {
        self.fields.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Paths that were dropped by `from_paths`.
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    /// Build the record to write back: `current` with every masked field
    /// taken from `patch`. The id always comes from `current`.
    pub fn merge(&self, current: &TodoItem, patch: &TodoItem) -> TodoItem {
        let mut merged = current.clone();
        for field in self.iter() {
            field.apply(&mut merged, patch);
        }
        merged
    }
}

impl FromIterator<UpdatableField> for FieldMask {
    fn from_iter<T: IntoIterator<Item = UpdatableField>>(iter: T) -> Self {
        let mut fields = Vec::new();
        for field in iter {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        Self {
            fields,
            ignored: Vec::new(),
        }
    }
}
