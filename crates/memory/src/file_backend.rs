//! File-based memory backend: one JSON document per item.
//!
//! Each item lives at `<root>/<id>.json` as its own fields plus a `_meta`
//! object. The files are the source of truth. When the in-memory index is
//! enabled, item metadata and the `project -> [id]` / `category -> [id]`
//! buckets are rebuilt from disk on open; otherwise every operation scans
//! the directory.
//!
//! I/O failures never take the store down: they are logged and the single
//! operation reports failure (`Err` from `add`, `None`/`false` elsewhere).
//!
//! Default location: `~/.devassist/memory/`

use chrono::{DateTime, Utc};
use devassist_core::clock::{Clock, SystemClock};
use devassist_core::error::MemoryError;
use devassist_core::memory::{Document, ItemMeta, MemoryItem, MemoryQuery, MemoryStore, sort_newest_first};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Tuning for [`FileMemory`].
#[derive(Debug, Clone)]
pub struct FileMemoryOptions {
    pub index_in_memory: bool,
    pub max_items_per_category: usize,
}

impl Default for FileMemoryOptions {
    fn default() -> Self {
        Self {
            index_in_memory: true,
            max_items_per_category: 1000,
        }
    }
}

/// Snapshot returned by [`FileMemory::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct FileMemoryStats {
    pub storage_path: PathBuf,
    pub index_in_memory: bool,
    pub items: usize,
    pub projects: usize,
    pub categories: usize,
    pub total_bytes: u64,
    /// Up to five most populous projects
    pub top_projects: Vec<(String, usize)>,
}

#[derive(Default)]
struct Index {
    meta: HashMap<String, ItemMeta>,
    by_project: BTreeMap<String, Vec<String>>,
    by_category: BTreeMap<String, Vec<String>>,
}

impl Index {
    fn insert(&mut self, meta: ItemMeta) {
        self.by_project.entry(meta.project.clone()).or_default().push(meta.id.clone());
        self.by_category.entry(meta.category.clone()).or_default().push(meta.id.clone());
        self.meta.insert(meta.id.clone(), meta);
    }

    fn remove(&mut self, id: &str) -> Option<ItemMeta> {
        let meta = self.meta.remove(id)?;
        detach(&mut self.by_project, &meta.project, id);
        detach(&mut self.by_category, &meta.category, id);
        Some(meta)
    }

    /// Store new metadata for an existing id, moving it between buckets
    /// only where its labels changed.
    fn relabel(&mut self, meta: ItemMeta) {
        let Some(old) = self.meta.get(&meta.id) else {
            self.insert(meta);
            return;
        };
        if old.project != meta.project {
            detach(&mut self.by_project, &old.project, &meta.id);
            self.by_project.entry(meta.project.clone()).or_default().push(meta.id.clone());
        }
        if old.category != meta.category {
            detach(&mut self.by_category, &old.category, &meta.id);
            self.by_category.entry(meta.category.clone()).or_default().push(meta.id.clone());
        }
        self.meta.insert(meta.id.clone(), meta);
    }

    /// Ids that could satisfy `query`, newest first.
    fn candidates(&self, query: &MemoryQuery) -> Vec<&ItemMeta> {
        let bucket = match (&query.project, &query.category) {
            (Some(project), _) => self.by_project.get(project),
            (None, Some(category)) => self.by_category.get(category),
            (None, None) => None,
        };
        let mut metas: Vec<&ItemMeta> = match bucket {
            Some(ids) => ids.iter().filter_map(|id| self.meta.get(id)).collect(),
            None if query.project.is_some() || query.category.is_some() => Vec::new(),
            None => self.meta.values().collect(),
        };
        metas.retain(|m| {
            query.category.as_deref().is_none_or(|c| c == m.category)
                && query.after.is_none_or(|after| m.created_at >= after)
                && query.before.is_none_or(|before| m.created_at <= before)
        });
        metas.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        metas
    }
}

fn detach(buckets: &mut BTreeMap<String, Vec<String>>, label: &str, id: &str) {
    if let Some(ids) = buckets.get_mut(label) {
        ids.retain(|existing| existing != id);
        if ids.is_empty() {
            buckets.remove(label);
        }
    }
}

/// Ids become file names, so only a conservative alphabet is accepted.
fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// A durable store keeping one JSON file per item.
pub struct FileMemory {
    root: PathBuf,
    options: FileMemoryOptions,
    clock: Arc<dyn Clock>,
    /// `None` when the in-memory index is disabled. The lock also
    /// serializes file operations.
    index: Mutex<Option<Index>>,
}

impl FileMemory {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>, options: FileMemoryOptions) -> Result<Self, MemoryError> {
        Self::open_with_clock(root, options, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        root: impl Into<PathBuf>,
        options: FileMemoryOptions,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, MemoryError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| MemoryError::Io {
            path: root.display().to_string(),
            source: e,
        })?;

        let store = Self {
            root,
            options,
            clock,
            index: Mutex::new(None),
        };

        if store.options.index_in_memory {
            let mut index = Index::default();
            for item in store.scan() {
                index.insert(item.meta);
            }
            debug!(path = %store.root.display(), count = index.meta.len(), "File memory index rebuilt");
            *store.index.lock() = Some(index);
        }
        info!(path = %store.root.display(), index = store.options.index_in_memory, "Long-term memory opened");
        Ok(store)
    }

    /// Default root: `~/.devassist/memory`
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".devassist").join("memory")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ── File helpers ──

    fn item_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    fn read_item(&self, path: &Path) -> Result<MemoryItem, MemoryError> {
        let content = std::fs::read_to_string(path).map_err(|e| MemoryError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| MemoryError::Serialization(format!("{}: {e}", path.display())))
    }

    /// Write through a temp file so a crash never leaves a half-written item.
    fn write_item(&self, item: &MemoryItem) -> Result<(), MemoryError> {
        let content = serde_json::to_string_pretty(item).map_err(|e| MemoryError::Serialization(e.to_string()))?;
        let path = self.item_path(item.id());
        let tmp = self.root.join(format!(".{}.json.tmp", item.id()));
        std::fs::write(&tmp, content)
            .and_then(|()| std::fs::rename(&tmp, &path))
            .map_err(|e| MemoryError::Io {
                path: path.display().to_string(),
                source: e,
            })
    }

    /// Remove an item's file. A file that is already gone counts as removed.
    fn remove_file(&self, id: &str) -> bool {
        match std::fs::remove_file(self.item_path(id)) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                error!(id, error = %e, "Failed to delete memory file");
                false
            }
        }
    }

    fn json_files(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                error!(path = %self.root.display(), error = %e, "Failed to list memory directory");
                return Vec::new();
            }
        };
        entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "json")
                    && path.file_name().is_some_and(|n| !n.to_string_lossy().starts_with('.'))
            })
            .collect()
    }

    /// Every readable item on disk, oldest first. Corrupt files are skipped.
    fn scan(&self) -> Vec<MemoryItem> {
        let mut items: Vec<MemoryItem> = self
            .json_files()
            .into_iter()
            .filter_map(|path| match self.read_item(&path) {
                Ok(item) if path.file_stem().is_some_and(|stem| stem == item.id()) => Some(item),
                Ok(item) => {
                    warn!(path = %path.display(), id = item.id(), "Skipping memory file whose name does not match its id");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted memory file");
                    None
                }
            })
            .collect();
        items.sort_by(|a, b| a.meta.created_at.cmp(&b.meta.created_at).then_with(|| a.id().cmp(b.id())));
        items
    }

    // ── Capacity ──

    /// Evict the oldest ids of `category` until it fits the cap.
    fn prune_category(&self, index: &mut Option<Index>, category: &str) {
        let max = self.options.max_items_per_category;
        match index {
            Some(index) => {
                while let Some(oldest) = index
                    .by_category
                    .get(category)
                    .filter(|ids| ids.len() > max)
                    .and_then(|ids| ids.first().cloned())
                {
                    if !self.remove_file(&oldest) {
                        break;
                    }
                    index.remove(&oldest);
                    debug!(id = %oldest, category, "Pruned oldest item in category");
                }
            }
            None => {
                let in_category: Vec<MemoryItem> = self
                    .scan()
                    .into_iter()
                    .filter(|item| item.meta.category == category)
                    .collect();
                let excess = in_category.len().saturating_sub(max);
                for item in in_category.iter().take(excess) {
                    if self.remove_file(item.id()) {
                        debug!(id = item.id(), category, "Pruned oldest item in category");
                    }
                }
            }
        }
    }

    // ── Listing ──

    pub fn projects(&self) -> Vec<String> {
        match self.index.lock().as_ref() {
            Some(index) => index.by_project.keys().cloned().collect(),
            None => self.scan_labels(|meta| &meta.project),
        }
    }

    pub fn categories(&self) -> Vec<String> {
        match self.index.lock().as_ref() {
            Some(index) => index.by_category.keys().cloned().collect(),
            None => self.scan_labels(|meta| &meta.category),
        }
    }

    fn scan_labels(&self, label: impl Fn(&ItemMeta) -> &String) -> Vec<String> {
        let labels: BTreeSet<String> = self.scan().iter().map(|item| label(&item.meta).clone()).collect();
        labels.into_iter().collect()
    }

    pub fn project_items(&self, project: &str, limit: usize) -> Vec<MemoryItem> {
        self.search(&MemoryQuery::new().project(project).limit(limit))
            .unwrap_or_default()
    }

    pub fn category_items(&self, category: &str, limit: usize) -> Vec<MemoryItem> {
        self.search(&MemoryQuery::new().category(category).limit(limit))
            .unwrap_or_default()
    }

    pub fn stats(&self) -> FileMemoryStats {
        let total_bytes = self
            .json_files()
            .iter()
            .filter_map(|path| std::fs::metadata(path).ok())
            .map(|m| m.len())
            .sum();

        let guard = self.index.lock();
        let (items, projects, categories, mut top_projects) = match guard.as_ref() {
            Some(index) => (
                index.meta.len(),
                index.by_project.len(),
                index.by_category.len(),
                index
                    .by_project
                    .iter()
                    .map(|(project, ids)| (project.clone(), ids.len()))
                    .collect::<Vec<_>>(),
            ),
            None => (self.json_files().len(), 0, 0, Vec::new()),
        };
        top_projects.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_projects.truncate(5);

        FileMemoryStats {
            storage_path: self.root.clone(),
            index_in_memory: guard.is_some(),
            items,
            projects,
            categories,
            total_bytes,
            top_projects,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl MemoryStore for FileMemory {
    fn name(&self) -> &str {
        "file"
    }

    fn add(&self, data: Document) -> Result<String, MemoryError> {
        let mut index = self.index.lock();
        let id = Uuid::new_v4().to_string();
        let item = MemoryItem::new(id.clone(), data, self.now());

        if let Err(e) = self.write_item(&item) {
            error!(id = %id, error = %e, "Failed to persist memory item");
            return Err(e);
        }

        let category = item.meta.category.clone();
        if let Some(index) = index.as_mut() {
            index.insert(item.meta);
        }
        self.prune_category(&mut index, &category);

        debug!(id = %id, category = %category, "Stored memory item");
        Ok(id)
    }

    fn get(&self, id: &str) -> Result<Option<MemoryItem>, MemoryError> {
        if !valid_id(id) {
            warn!(id, "Rejected malformed memory id");
            return Ok(None);
        }
        let index = self.index.lock();
        if index.as_ref().is_some_and(|index| !index.meta.contains_key(id)) {
            return Ok(None);
        }
        match self.read_item(&self.item_path(id)) {
            Ok(item) => Ok(Some(item)),
            Err(MemoryError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                error!(id, error = %e, "Failed to read memory item");
                Ok(None)
            }
        }
    }

    fn search(&self, query: &MemoryQuery) -> Result<Vec<MemoryItem>, MemoryError> {
        let index = self.index.lock();
        let results = match index.as_ref() {
            Some(index) => index
                .candidates(query)
                .into_iter()
                .filter_map(|meta| match self.read_item(&self.item_path(&meta.id)) {
                    Ok(item) => Some(item),
                    Err(e) => {
                        error!(id = %meta.id, error = %e, "Failed to read memory item during search");
                        None
                    }
                })
                .filter(|item| query.matches(item))
                .take(query.limit)
                .collect(),
            None => {
                let mut hits: Vec<MemoryItem> = self.scan().into_iter().rev().filter(|item| query.matches(item)).collect();
                sort_newest_first(&mut hits);
                hits.truncate(query.limit);
                hits
            }
        };
        debug!(results = results.len(), "Long-term search complete");
        Ok(results)
    }

    fn update(&self, id: &str, data: Document) -> Result<bool, MemoryError> {
        if !valid_id(id) {
            warn!(id, "Rejected malformed memory id");
            return Ok(false);
        }
        let mut index = self.index.lock();
        if index.as_ref().is_some_and(|index| !index.meta.contains_key(id)) {
            debug!(id, "Cannot update item: not found");
            return Ok(false);
        }

        let mut item = match self.read_item(&self.item_path(id)) {
            Ok(item) => item,
            Err(MemoryError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                debug!(id, "Cannot update item: not found");
                return Ok(false);
            }
            Err(e) => {
                error!(id, error = %e, "Failed to read memory item for update");
                return Ok(false);
            }
        };
        let previous_category = item.meta.category.clone();
        item.replace(data, self.now());

        if let Err(e) = self.write_item(&item) {
            error!(id, error = %e, "Failed to persist updated memory item");
            return Ok(false);
        }

        let category = item.meta.category.clone();
        if let Some(index) = index.as_mut() {
            index.relabel(item.meta);
        }
        if category != previous_category {
            self.prune_category(&mut index, &category);
        }
        debug!(id, "Updated memory item");
        Ok(true)
    }

    fn delete(&self, id: &str) -> Result<bool, MemoryError> {
        if !valid_id(id) {
            return Ok(false);
        }
        let mut index = self.index.lock();
        let path = self.item_path(id);
        match index.as_mut() {
            Some(index) => {
                if !index.meta.contains_key(id) {
                    return Ok(false);
                }
                if !self.remove_file(id) {
                    return Ok(false);
                }
                index.remove(id);
                Ok(true)
            }
            None => match std::fs::remove_file(&path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => {
                    error!(id, error = %e, "Failed to delete memory file");
                    Ok(false)
                }
            },
        }
    }

    fn clear(&self) -> Result<(), MemoryError> {
        let mut index = self.index.lock();
        let mut failures = 0usize;
        for path in self.json_files() {
            if let Err(e) = std::fs::remove_file(&path) {
                error!(path = %path.display(), error = %e, "Failed to delete memory file");
                failures += 1;
            }
        }
        if let Some(index) = index.as_mut() {
            *index = Index::default();
            if failures > 0 {
                // Files that survived must stay indexed.
                for item in self.scan() {
                    index.insert(item.meta);
                }
            }
        }
        info!(failures, "Long-term memory cleared");
        Ok(())
    }

    fn count(&self) -> Result<usize, MemoryError> {
        match self.index.lock().as_ref() {
            Some(index) => Ok(index.meta.len()),
            None => Ok(self.json_files().len()),
        }
    }
}
