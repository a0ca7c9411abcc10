//! # DevAssist Core
//!
//! Domain types, traits, and error definitions for the DevAssist agent framework.
//! This crate defines the model every other crate implements against:
//!
//! - [`MemoryStore`] for the volatile and durable stores
//! - [`Tool`] and the lazily-populated [`ToolRegistry`]
//! - [`Provider`] and [`ModelClient`] for the model capability used by planning
//! - [`Clock`] so time-dependent behaviour can be driven from tests

pub mod clock;
pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use memory::{Document, ItemMeta, MemoryItem, MemoryQuery, MemoryStore};
pub use message::{Message, Role};
pub use provider::{ModelClient, Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use tool::{Tool, ToolInfo, ToolOutcome, ToolRegistry};
