//! Application state shared across routes

use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::items::ItemRepository;
use crate::store::{Backend, MemoryStore, SupabaseClient};
use crate::util::rate_limit::WriteRateLimiter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub items: ItemRepository,
    pub write_limiter: WriteRateLimiter,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        // Initialize the configured row store
        let backend = match &config.store {
            StoreBackend::Supabase(supabase) => Backend::Supabase(SupabaseClient::new(supabase)),
            StoreBackend::Memory => Backend::Memory(MemoryStore::new()),
        };

        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: Config, backend: Backend) -> Self {
        let write_limiter = WriteRateLimiter::new(config.write_rate_limit);

        Self {
            config: Arc::new(config),
            items: ItemRepository::new(backend),
            write_limiter,
        }
    }
}
