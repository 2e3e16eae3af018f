//! # Syncify Storage
//!
//! Repository contract and commit/branch persistence for Syncify.
//!
//! This crate provides:
//! - The async [`Repository`] contract with add/update/delete rules
//! - [`InMemoryRepository`], which publishes [`RepositoryEvent`]s
//! - Stored record shapes with deterministic UUIDv5 ids
//! - [`StorageService`], which saves and loads whole workspaces
//!
//! ## Ids
//!
//! Commits are keyed by a UUIDv5 of their hash. Branch refs are keyed by a
//! UUIDv5 of `"<kind>/<name>"`, so the local and remote-tracking refs of the
//! same branch never share a key.
//!
//! ## Example
//!
//! ```rust,ignore
//! use syncify_storage::StorageService;
//!
//! let service = StorageService::in_memory();
//! service.save_workspace(&workspace).await?;
//! let restored = service.load_workspace(&restorer).await?;
//! assert_eq!(restored, workspace);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod id;
mod memory;
mod records;
mod repository;
mod service;

pub use error::{StorageError, StorageResult};
pub use id::{Identifiable, ItemId};
pub use memory::{InMemoryRepository, RepositoryEvent};
pub use records::{branch_key, commit_id, commit_key, StoredBranch, StoredCommit};
pub use repository::Repository;
pub use service::{order_snapshots, BranchRepository, CommitRepository, StorageService};
