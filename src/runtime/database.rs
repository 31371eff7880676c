use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::cascade::CascadeExecutor;
use crate::document::Document;
use crate::persist::{DocumentStore, SharedStore, SqliteStore};
use crate::registry::SchemaRegistry;

use super::{Collection, OdmError, events::CascadeEvent};

/// Database settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite file; `None` keeps everything in memory.
    pub path: Option<PathBuf>,
    /// Upper bound on every storage call, background cascades included.
    pub store_timeout_ms: u64,
    /// How many hops nested cascades may chain.
    pub max_cascade_depth: usize,
    /// Buffered cascade events per subscriber.
    pub event_capacity: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            store_timeout_ms: 5_000,
            max_cascade_depth: 4,
            event_capacity: 1024,
        }
    }
}

/// A store, its schema registry and the cascade executor bound to them.
///
/// Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct Database {
    store: SharedStore,
    registry: Arc<SchemaRegistry>,
    executor: CascadeExecutor,
    events: broadcast::Sender<CascadeEvent>,
}

impl Database {
    /// Opens the SQLite database described by `config`.
    pub fn open(config: &DatabaseConfig, registry: SchemaRegistry) -> Result<Self, OdmError> {
        let store: Arc<dyn DocumentStore> = match &config.path {
            Some(path) => Arc::new(SqliteStore::open(path)?),
            None => Arc::new(SqliteStore::open_in_memory()?),
        };
        Ok(Self::with_store(store, registry, config))
    }

    /// Uses an existing store; `config.path` is ignored.
    pub fn with_store(
        store: Arc<dyn DocumentStore>,
        registry: SchemaRegistry,
        config: &DatabaseConfig,
    ) -> Self {
        let store = SharedStore::new(store, Duration::from_millis(config.store_timeout_ms));
        let registry = Arc::new(registry);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let executor = CascadeExecutor::new(
            store.clone(),
            Arc::clone(&registry),
            events.clone(),
            config.max_cascade_depth,
        );
        Self {
            store,
            registry,
            executor,
            events,
        }
    }

    /// Typed access to the collection registered for `T`.
    pub fn collection<T: Document>(&self) -> Result<Collection<T>, OdmError> {
        let schema = self.registry.schema(T::TYPE_NAME)?;
        Ok(Collection::new(
            schema.collection().to_string(),
            schema.indexes().to_vec(),
            self.clone(),
        ))
    }

    /// Receives cascade events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CascadeEvent> {
        self.events.subscribe()
    }

    /// Registered types.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Async storage front.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub(crate) fn executor(&self) -> &CascadeExecutor {
        &self.executor
    }
}
