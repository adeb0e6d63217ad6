// pitchdesk-memory — In-memory storage adapter for pitchdesk.
//
// Uses a HashMap-based store for fast, ephemeral data storage.
// Ideal for testing, prototyping, and development.

pub mod adapter;

pub use adapter::MemoryAdapter;
