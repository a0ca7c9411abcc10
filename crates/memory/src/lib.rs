//! Memory stores for DevAssist.
//!
//! - [`BoundedMemory`]: fixed-capacity, TTL-expiring, LRU-evicting store for
//!   short-lived working state
//! - [`FileMemory`]: one JSON file per item with project/category indexes

pub mod file_backend;
pub mod in_memory;

pub use file_backend::{FileMemory, FileMemoryOptions, FileMemoryStats};
pub use in_memory::{BoundedMemory, Utilization, VolatileStats};
