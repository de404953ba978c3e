mod config_cmd;
mod profile;
mod progress;
mod routine;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use profile::ProfileCommand;
pub use progress::{ProgressCommand, ProgressSubcommand};
pub use routine::{RoutineCommand, RoutineSubcommand};
pub use sync_cmd::SyncCommand;

use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;

use crate::config::Config;
use crate::db::Cache;
use crate::remote::{AutomergeDocumentStore, DocumentStore, HttpDocumentStore};
use crate::session::Session;
use crate::sync::{SyncEngine, SyncProfileRepository, SyncRoutineRepository};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Everything a command needs: the cache, the remote store and the session.
#[derive(Clone)]
pub struct App {
    pub cache: Cache,
    pub store: Arc<dyn DocumentStore>,
    pub session: Session,
}

impl App {
    /// Opens the cache and the remote store named by the configuration.
    pub async fn open(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let cache = Cache::open(&config.database_path.value).await?;
        let store = open_store(config)?;
        Ok(Self {
            cache,
            store,
            session: config.session(),
        })
    }

    pub fn profiles(&self) -> SyncProfileRepository {
        SyncProfileRepository::new(self.store.clone(), self.cache.clone(), self.session.clone())
    }

    pub fn routines(&self) -> SyncRoutineRepository {
        SyncRoutineRepository::new(self.store.clone(), self.cache.clone(), self.session.clone())
    }

    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(self.store.clone(), self.cache.clone(), self.session.clone())
    }
}

fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>, Box<dyn std::error::Error>> {
    match &config.remote.url {
        Some(url) => {
            let store = HttpDocumentStore::new(
                url.as_str(),
                config.remote.api_key.clone(),
                Duration::from_secs(config.remote.timeout_secs),
            )?;
            Ok(Arc::new(store))
        }
        None => {
            let path = config.document_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Arc::new(AutomergeDocumentStore::open(path)?))
        }
    }
}
