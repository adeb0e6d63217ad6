//! Core building blocks for the pitchdesk backend: domain models, the
//! error taxonomy shared by every layer, the storage adapter abstraction,
//! runtime options and environment/logging bootstrap.
//!
//! This crate performs no I/O of its own; storage backends and the HTTP
//! surface live in sibling crates and depend on the traits defined here.

pub mod db;
pub mod env;
pub mod error;
pub mod options;
pub mod utils;

// Re-exports for convenience
pub use db::adapter::{Adapter, TransactionAdapter};
pub use db::models::{Bookmark, Idea, IdeaStatus, Role, Session, User, Vote, VoteKind};
pub use error::{ApiError, ErrorCode, PitchdeskError, Result};
pub use options::PitchdeskOptions;
