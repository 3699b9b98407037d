//! Persistence collaborator
//!
//! Questions, drafts, and attempts live in a hosted database. The recording
//! controller only ever writes one attempt per submission; the rest of the
//! API reads and edits through the same trait.

mod memory;
mod models;
mod service;
mod supabase;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{PersistenceBackend, PersistenceConfig};

pub use memory::MemoryStore;
pub use models::{Attempt, Draft, NewAttempt, Question, QuestionFilter, StarText};
pub use service::{PersistenceError, PersistenceService};
pub use supabase::SupabaseStore;

/// Create the configured persistence backend
pub fn connect(config: &PersistenceConfig) -> Result<Arc<dyn PersistenceService>> {
    match config.backend {
        PersistenceBackend::Memory => Ok(Arc::new(MemoryStore::seeded())),
        PersistenceBackend::Supabase => {
            let url = config
                .url
                .as_deref()
                .context("persistence.url is required for the supabase backend")?;
            let api_key = std::env::var(&config.api_key_env)
                .with_context(|| format!("{} is not set", config.api_key_env))?;

            let store = SupabaseStore::new(url, api_key, Duration::from_secs(config.timeout_secs))?;
            Ok(Arc::new(store))
        }
    }
}
