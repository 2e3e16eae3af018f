//! # Syncify Testkit
//!
//! Test utilities for Syncify.
//!
//! This crate provides:
//! - `TestState`, a numeric state with arithmetic commands and a restorer
//! - Workspace fixtures for linear and diverged histories
//! - Property-based test generators using proptest
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use syncify_testkit::prelude::*;
//!
//! #[test]
//! fn undo_restores_initial_state() {
//!     let ws = ahead_local();
//!     let ws = WorkspaceManipulator::new(ws).undo().unwrap().into_workspace();
//!     assert_eq!(main_state(&ws), TestState(5.0));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod test_state;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::test_state::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
pub use test_state::*;
