//! Persistence and publication of built graphs.
//!
//! - [`snapshot`]: single-file, versioned, gzip-compressed bincode snapshot
//! - [`handle`]: the currently published graph, swapped atomically on rebuild

pub mod handle;
pub mod snapshot;

use crate::error::StoreError;

pub use handle::GraphHandle;
pub use snapshot::{SNAPSHOT_VERSION, load_snapshot, save_snapshot};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
