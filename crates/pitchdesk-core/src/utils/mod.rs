// Utility functions: id and token generation.

pub mod id;

pub use id::{generate_id, generate_session_token};
