//! Roomstate Testing Infrastructure
//!
//! Shared fixtures (well-formed room state, thread and page payloads) and
//! proptest strategies for normalized collections and message parts.
//!
//! ```toml
//! [dev-dependencies]
//! roomstate-testkit = { path = "../roomstate-testkit" }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod fixtures;
pub mod strategies;

pub use fixtures::*;
