pub mod adapter;
pub mod models;
pub mod schema;

pub use adapter::Adapter;
pub use models::{Bookmark, Idea, Session, User, Vote};
pub use schema::{AppSchema, AppTable, FieldType, SchemaField};
