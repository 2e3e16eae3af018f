//! # Syncify Sync Engine
//!
//! Branch synchronization and polling sync driver for Syncify.
//!
//! This crate provides:
//! - The remote fetcher contract (branch lookup, fetch, push)
//! - In-memory and storage-backed remotes
//! - Divergence detection between a local branch and its remote-tracking ref
//! - Fast-forward, push and conflict handling per branch
//! - A polling driver with connection status and retry with backoff
//!
//! ## Architecture
//!
//! Each synchronization runs three steps:
//! 1. Fetch the commits the remote has beyond the remote-tracking head
//! 2. Create the branch on the remote if it only exists locally
//! 3. Reconcile: fast-forward, push, or report a conflict
//!
//! A conflict is settled locally with a merge commit that keeps either
//! side's state; the next cycle pushes it as an ordinary fast-forward.
//!
//! ## Key Invariants
//!
//! - The remote only ever moves forward; a push that would drop its head is rejected
//! - Local commits are never discarded by synchronization
//! - A failed push leaves the remote unchanged
//! - At most one cycle per engine is in flight

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod differences;
mod error;
mod fetcher;
mod state;
mod storage_fetcher;
mod synchronizer;
mod workspace_fetcher;

pub use config::{RetryConfig, SyncConfig, MIN_SYNC_INTERVAL};
pub use differences::{Differences, Divergence};
pub use error::{SyncError, SyncResult};
pub use fetcher::RemoteFetcher;
pub use state::{
    Clock, ConflictResolution, ConnectionStatus, SyncEngine, SyncStats, SystemClock, TickOutcome,
};
pub use storage_fetcher::StorageRemoteFetcher;
pub use synchronizer::{BranchSynchronizer, Conflict, SyncOutcome};
pub use workspace_fetcher::WorkspaceRemoteFetcher;
