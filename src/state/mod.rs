// state module: AppState, initialization, and re-exports of submodules.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::{
    config::{Settings, StoreBackend},
    models::Id,
};

mod bills;
mod directory;
mod journal;
mod memory;
mod mongo;
mod plans;
mod reports;
pub mod seed;
mod store;

pub use bills::*;
pub use directory::*;
pub use journal::*;
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use plans::*;
pub use reports::*;
pub use store::{
    BillFilter, InstallmentFilter, Store, StoreError, StoreResult, TransactionFilter,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Recorded as the author of activities the API writes on its own.
    pub audit_user_id: Id,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, audit_user_id: Id) -> Self {
        AppState {
            store,
            audit_user_id,
        }
    }

    pub fn in_memory() -> Self {
        AppState::new(Arc::new(MemoryStore::new()), 1)
    }
}

pub async fn init_state(settings: &Settings) -> Result<AppState> {
    let store: Arc<dyn Store> = match settings.store_backend {
        StoreBackend::Memory => {
            info!("using in-memory store");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Mongo => {
            info!(db = %settings.mongodb_db, "connecting to MongoDB");
            Arc::new(MongoStore::connect(&settings.mongodb_uri, &settings.mongodb_db).await?)
        }
    };
    store.ping().await?;

    let state = AppState::new(store, settings.audit_user_id);

    // Fixtures only go into an empty store.
    if let Some(dir) = &settings.seed_dir {
        if seed::is_store_empty(&state).await? {
            let loaded = seed::load_fixtures(&state, dir).await?;
            info!(suppliers = loaded.suppliers, customers = loaded.customers, "seeded fixtures");
        }
    }

    Ok(state)
}
