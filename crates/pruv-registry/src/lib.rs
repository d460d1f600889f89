//! # pruv Registry
//!
//! Persistence for pruv records. A record is one entity's metadata plus its
//! full chain, always written and read together.
//!
//! ## Key Types
//!
//! - [`Registry`] - The async trait for all record operations
//! - [`SqliteRegistry`] - SQLite-based persistent storage
//! - [`MemoryRegistry`] - In-memory storage
//! - [`TimedRegistry`] - Bounds every call on another registry
//! - [`EntityLocks`] - Per-id mutexes for read-modify-write sequences
//!
//! ## Design Notes
//!
//! - **Atomic records**: metadata and chain are replaced in one write
//! - **Optimistic writes**: `save_if` rejects a write when the stored chain
//!   length differs from what the writer loaded
//! - **Explicit handles**: there is no global registry; services receive one

pub mod error;
pub mod locks;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod timed;
pub mod traits;

pub use error::{RegistryError, Result};
pub use locks::{EntityGuard, EntityLocks};
pub use memory::MemoryRegistry;
pub use sqlite::{SqliteDatabase, SqliteRegistry};
pub use timed::{TimedRegistry, DEFAULT_IO_TIMEOUT};
pub use traits::{Entity, Record, Registry};
