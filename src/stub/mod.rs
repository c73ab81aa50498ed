//! Dependency Substitution
//!
//! - `Stubs` - Request → replacement exports for one transaction
//! - `SnapshotTable` / `RestoreGuard` - What a transaction displaced, and
//!   the guard that puts it back
//! - `run` - The warm-up / substitute / execute / restore transaction
//! - `Harness` - Attached handle that deregisters itself from the caller

mod bootstrap;
mod snapshot;
mod stubs;
mod transaction;

pub use bootstrap::{Harness, HARNESS_MODULE};
pub use snapshot::{RestoreGuard, SnapshotTable};
pub use stubs::Stubs;
pub use transaction::run;
