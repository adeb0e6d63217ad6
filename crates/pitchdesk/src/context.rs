// Application context, shared across all request handlers as
// `Arc<AppContext>`. Built once at startup from options plus a storage
// adapter.

use std::sync::Arc;

use pitchdesk_core::db::adapter::Adapter;
use pitchdesk_core::options::PitchdeskOptions;

use crate::store::Store;

/// The fully-initialized application context.
#[derive(Debug)]
pub struct AppContext {
    /// Runtime configuration (session TTL, credit policy, upload paths).
    pub options: PitchdeskOptions,

    /// Typed access to the backing store.
    pub store: Store,
}

impl AppContext {
    /// Create a new context from options and a storage adapter.
    pub fn new(options: PitchdeskOptions, adapter: Arc<dyn Adapter>) -> Arc<Self> {
        Arc::new(Self {
            options,
            store: Store::new(adapter),
        })
    }

    /// The session cookie name derived from the configured prefix.
    pub fn session_cookie_name(&self) -> String {
        format!("{}.session_token", self.options.cookie_prefix)
    }
}
