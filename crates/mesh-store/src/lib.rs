//! Mind Mesh collaborator seams
//!
//! The plan engine talks to the outside world through four traits:
//! - [`Datastore`] / [`Transaction`]: canvas tables with begin/commit/rollback
//! - [`LockProvider`]: current canvas-lock state per workspace
//! - [`HistoryStore`]: bounded per-workspace log of committed plans
//! - [`Clock`]: the time source for lock expiry and timestamp repairs
//!
//! Each comes with an in-memory implementation suitable for tests, the CLI
//! and single-process embedding.

#![warn(unreachable_pub)]

pub mod clock;
pub mod datastore;
pub mod error;
pub mod history;
pub mod lock;

pub use clock::{Clock, FixedClock, SystemClock};
pub use datastore::{Datastore, MemoryDatastore, Transaction};
pub use error::StoreError;
pub use history::{HistoryStore, MemoryHistoryStore};
pub use lock::{CanvasLock, LockProvider, MemoryLockService};
