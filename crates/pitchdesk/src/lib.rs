//! Service layer for the pitchdesk backend.
//!
//! Everything here operates through the [`pitchdesk_core::Adapter`] trait,
//! so the same logic runs against the in-memory store and SQL backends.
//! Handlers resolve the caller once (session token to [`pitchdesk_core::User`])
//! and pass the identity explicitly into every operation; there is no
//! ambient current-user state.

pub mod bookmarks;
pub mod bootstrap;
pub mod context;
pub mod crypto;
pub mod feed;
pub mod ideas;
pub mod identity;
pub mod store;
pub mod votes;

pub use context::AppContext;
pub use store::Store;
