//! Bounded volatile memory: capacity-limited, TTL-expiring, LRU-evicting.
//!
//! Entries live in an arena keyed by id. Two ordered indexes are kept in
//! lockstep with it: one by last access (eviction picks its first entry) and
//! one by creation (expiry drains it from the front). Every key carries a
//! monotonically increasing sequence number, so equal timestamps fall back
//! to insertion/access order.
//!
//! Expiry is lazy: each operation first drops entries older than the TTL.

use chrono::{DateTime, Duration, Utc};
use devassist_core::clock::{Clock, SystemClock};
use devassist_core::error::MemoryError;
use devassist_core::memory::{Document, MemoryItem, MemoryQuery, MemoryStore};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Utilization above which every insert logs a warning.
const PRESSURE_RATIO: f64 = 0.9;

type OrderKey = (DateTime<Utc>, u64);

struct Slot {
    item: MemoryItem,
    accessed: OrderKey,
    created: OrderKey,
}

#[derive(Default)]
struct Arena {
    slots: HashMap<String, Slot>,
    by_access: BTreeMap<OrderKey, String>,
    by_creation: BTreeMap<OrderKey, String>,
    seq: u64,
}

impl Arena {
    fn next_key(&mut self, at: DateTime<Utc>) -> OrderKey {
        self.seq += 1;
        (at, self.seq)
    }

    fn insert(&mut self, item: MemoryItem, now: DateTime<Utc>) {
        let created = self.next_key(item.meta.created_at);
        let accessed = self.next_key(now);
        let id = item.meta.id.clone();
        self.by_creation.insert(created, id.clone());
        self.by_access.insert(accessed, id.clone());
        self.slots.insert(id, Slot { item, accessed, created });
    }

    /// Move `id` to the most-recently-used end.
    fn touch(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        let key = self.next_key(now);
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        self.by_access.remove(&slot.accessed);
        slot.accessed = key;
        self.by_access.insert(key, id.to_string());
        true
    }

    fn remove(&mut self, id: &str) -> Option<MemoryItem> {
        let slot = self.slots.remove(id)?;
        self.by_access.remove(&slot.accessed);
        self.by_creation.remove(&slot.created);
        Some(slot.item)
    }

    fn purge_expired(&mut self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let mut purged = 0;
        while let Some((&(created_at, _), _)) = self.by_creation.first_key_value() {
            if now - created_at <= ttl {
                break;
            }
            let Some((_, id)) = self.by_creation.pop_first() else {
                break;
            };
            if let Some(slot) = self.slots.remove(&id) {
                self.by_access.remove(&slot.accessed);
            }
            purged += 1;
        }
        purged
    }

    fn evict_lru(&mut self) -> Option<MemoryItem> {
        let (_, id) = self.by_access.pop_first()?;
        let slot = self.slots.remove(&id)?;
        self.by_creation.remove(&slot.created);
        Some(slot.item)
    }

    fn clear(&mut self) -> usize {
        let count = self.slots.len();
        self.slots.clear();
        self.by_access.clear();
        self.by_creation.clear();
        count
    }
}

/// How full the store is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Utilization {
    MostlyEmpty,
    Light,
    Moderate,
    NearlyFull,
}

impl Utilization {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio > PRESSURE_RATIO {
            Self::NearlyFull
        } else if ratio > 0.7 {
            Self::Moderate
        } else if ratio > 0.4 {
            Self::Light
        } else {
            Self::MostlyEmpty
        }
    }
}

/// Snapshot returned by [`BoundedMemory::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct VolatileStats {
    pub items: usize,
    pub capacity: usize,
    pub ttl_secs: i64,
    pub utilization: f64,
    pub status: Utilization,
}

/// Fixed-capacity in-memory store with TTL expiry and LRU eviction.
pub struct BoundedMemory {
    capacity: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    arena: Mutex<Arena>,
}

impl BoundedMemory {
    pub fn new(capacity: usize, ttl: std::time::Duration) -> Self {
        Self::with_clock(capacity, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, ttl: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        if capacity < 100 {
            warn!(capacity, "Short-term memory capacity is quite small");
        } else if capacity > 10_000 {
            warn!(capacity, "Short-term memory capacity is unusually large");
        }
        let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(36_500));
        info!(capacity, ttl_secs = ttl.num_seconds(), "Short-term memory initialized");
        Self {
            capacity: capacity.max(1),
            ttl,
            clock,
            arena: Mutex::new(Arena::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> VolatileStats {
        let (arena, _) = self.live();
        let utilization = arena.slots.len() as f64 / self.capacity as f64;
        VolatileStats {
            items: arena.slots.len(),
            capacity: self.capacity,
            ttl_secs: self.ttl.num_seconds(),
            utilization,
            status: Utilization::from_ratio(utilization),
        }
    }

    /// Lock the arena with expired entries already dropped.
    fn live(&self) -> (MutexGuard<'_, Arena>, DateTime<Utc>) {
        let mut arena = self.arena.lock();
        let now = self.clock.now();
        let purged = arena.purge_expired(now, self.ttl);
        if purged > 0 {
            debug!(purged, "Pruned expired items from short-term memory");
        }
        (arena, now)
    }
}

impl MemoryStore for BoundedMemory {
    fn name(&self) -> &str {
        "volatile"
    }

    fn add(&self, data: Document) -> Result<String, MemoryError> {
        let (mut arena, now) = self.live();
        let id = Uuid::new_v4().to_string();

        while arena.slots.len() >= self.capacity {
            match arena.evict_lru() {
                Some(evicted) => debug!(id = %evicted.meta.id, "Evicted least recently used item"),
                None => break,
            }
        }
        arena.insert(MemoryItem::new(id.clone(), data, now), now);

        let ratio = arena.slots.len() as f64 / self.capacity as f64;
        if ratio > PRESSURE_RATIO {
            warn!(
                utilization_pct = ratio * 100.0,
                "Short-term memory is nearly full, consider increasing capacity"
            );
        }
        Ok(id)
    }

    fn get(&self, id: &str) -> Result<Option<MemoryItem>, MemoryError> {
        let (mut arena, now) = self.live();
        if !arena.touch(id, now) {
            debug!(id, "Item not found in short-term memory");
            return Ok(None);
        }
        Ok(arena.slots.get(id).map(|slot| slot.item.clone()))
    }

    fn search(&self, query: &MemoryQuery) -> Result<Vec<MemoryItem>, MemoryError> {
        let (mut arena, now) = self.live();
        let hits: Vec<MemoryItem> = arena
            .by_creation
            .values()
            .rev()
            .filter_map(|id| arena.slots.get(id))
            .filter(|slot| query.matches(&slot.item))
            .take(query.limit)
            .map(|slot| slot.item.clone())
            .collect();
        for item in &hits {
            arena.touch(&item.meta.id, now);
        }
        debug!(results = hits.len(), "Short-term search complete");
        Ok(hits)
    }

    fn update(&self, id: &str, data: Document) -> Result<bool, MemoryError> {
        let (mut arena, now) = self.live();
        let Some(slot) = arena.slots.get_mut(id) else {
            debug!(id, "Cannot update item: not found");
            return Ok(false);
        };
        slot.item.replace(data, now);
        arena.touch(id, now);
        Ok(true)
    }

    fn delete(&self, id: &str) -> Result<bool, MemoryError> {
        let (mut arena, _) = self.live();
        Ok(arena.remove(id).is_some())
    }

    fn clear(&self) -> Result<(), MemoryError> {
        let removed = self.arena.lock().clear();
        info!(removed, "Short-term memory cleared");
        Ok(())
    }

    fn count(&self) -> Result<usize, MemoryError> {
        let (arena, _) = self.live();
        Ok(arena.slots.len())
    }
}
