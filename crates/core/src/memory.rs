//! Memory model shared by the volatile and durable stores.
//!
//! An item is an arbitrary JSON document plus system-assigned metadata.
//! Stores are synchronous: every operation runs to completion under the
//! store's own lock, so an insert and its eviction (or an update and its
//! reindex) are never observed half-done.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::error::MemoryError;

/// The free-form part of a memory item.
pub type Document = serde_json::Map<String, Value>;

pub const DEFAULT_PROJECT: &str = "default";
pub const DEFAULT_CATEGORY: &str = "general";

/// Key reserved for metadata in the persisted form.
pub const META_KEY: &str = "_meta";

/// System-assigned metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMeta {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub project: String,
    pub category: String,
}

/// A stored document. Serializes as the document's own fields plus `_meta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    #[serde(flatten)]
    pub data: Document,

    #[serde(rename = "_meta")]
    pub meta: ItemMeta,
}

impl MemoryItem {
    /// Wrap `data` with fresh metadata. Partition labels come from the
    /// document's own `project`/`category` fields when they are strings.
    pub fn new(id: impl Into<String>, mut data: Document, now: DateTime<Utc>) -> Self {
        data.remove(META_KEY);
        let (project, category) = partition_labels(&data);
        Self {
            meta: ItemMeta {
                id: id.into(),
                created_at: now,
                updated_at: now,
                project,
                category,
            },
            data,
        }
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    /// Replace the document, keeping `id` and `created_at`.
    pub fn replace(&mut self, mut data: Document, now: DateTime<Utc>) {
        data.remove(META_KEY);
        let (project, category) = partition_labels(&data);
        self.meta.project = project;
        self.meta.category = category;
        self.meta.updated_at = now;
        self.data = data;
    }

    /// Look up a field by name, falling back to a dot-separated path
    /// through nested objects (`"owner.name"`).
    pub fn field(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.data.get(path) {
            return Some(value);
        }
        if !path.contains('.') {
            return None;
        }
        let mut parts = path.split('.');
        let mut current = self.data.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

fn partition_labels(data: &Document) -> (String, String) {
    let label = |key: &str, default: &str| {
        data.get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };
    (label("project", DEFAULT_PROJECT), label("category", DEFAULT_CATEGORY))
}

/// A query against a memory store. All present filters must match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryQuery {
    /// Field predicates, exact equality; keys may be dot paths
    #[serde(default)]
    pub fields: Document,

    /// Case-insensitive substring over the serialized item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Inclusive lower bound on `created_at`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<DateTime<Utc>>,

    /// Inclusive upper bound on `created_at`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<DateTime<Utc>>,

    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

impl Default for MemoryQuery {
    fn default() -> Self {
        Self {
            fields: Document::new(),
            text: None,
            project: None,
            category: None,
            after: None,
            before: None,
            limit: default_limit(),
        }
    }
}

impl MemoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(path.into(), value.into());
        self
    }

    pub fn text(mut self, needle: impl Into<String>) -> Self {
        self.text = Some(needle.into());
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn after(mut self, at: DateTime<Utc>) -> Self {
        self.after = Some(at);
        self
    }

    pub fn before(mut self, at: DateTime<Utc>) -> Self {
        self.before = Some(at);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Whether `item` satisfies every filter in this query.
    pub fn matches(&self, item: &MemoryItem) -> bool {
        if self.project.as_deref().is_some_and(|p| p != item.meta.project) {
            return false;
        }
        if self.category.as_deref().is_some_and(|c| c != item.meta.category) {
            return false;
        }
        if self.after.is_some_and(|after| item.meta.created_at < after) {
            return false;
        }
        if self.before.is_some_and(|before| item.meta.created_at > before) {
            return false;
        }
        let fields_match = self
            .fields
            .iter()
            .all(|(path, expected)| item.field(path) == Some(expected));
        if !fields_match {
            return false;
        }
        match &self.text {
            Some(needle) => serde_json::to_string(item)
                .map(|s| s.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            None => true,
        }
    }
}

/// Newest first; equal timestamps keep their incoming order.
pub fn sort_newest_first(items: &mut [MemoryItem]) {
    items.sort_by(|a, b| b.meta.created_at.cmp(&a.meta.created_at));
}

/// The store contract shared by the volatile and durable backends.
pub trait MemoryStore: Send + Sync {
    /// The backend name (e.g., "volatile", "file").
    fn name(&self) -> &str;

    /// Insert a document and return its freshly assigned id.
    fn add(&self, data: Document) -> std::result::Result<String, MemoryError>;

    /// Fetch an item by id.
    fn get(&self, id: &str) -> std::result::Result<Option<MemoryItem>, MemoryError>;

    /// Items matching `query`, newest first, at most `query.limit`.
    fn search(&self, query: &MemoryQuery) -> std::result::Result<Vec<MemoryItem>, MemoryError>;

    /// Replace an item's document. Returns false if the id is unknown.
    fn update(&self, id: &str, data: Document) -> std::result::Result<bool, MemoryError>;

    /// Remove an item. Returns false if the id is unknown.
    fn delete(&self, id: &str) -> std::result::Result<bool, MemoryError>;

    /// Remove everything.
    fn clear(&self) -> std::result::Result<(), MemoryError>;

    /// Number of live items.
    fn count(&self) -> std::result::Result<usize, MemoryError>;
}
