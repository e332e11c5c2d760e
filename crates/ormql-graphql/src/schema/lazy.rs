//! Lazy schema loading.
//!
//! `LazySchema` defers the schema export until first access and caches the
//! result. Invalidating it starts a new build session: the mapper's type
//! registry is cleared, so the next build maps every entity again.

use std::sync::Arc;

use async_graphql::dynamic::Schema;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::EntitySchemaBuilder;
use crate::error::MappingError;

/// State of the lazy schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// Schema has not been built yet.
    Uninitialized,
    /// Schema is currently being built.
    Building,
    /// Schema is ready for use.
    Ready,
    /// Schema build failed.
    Failed,
}

/// Thread-safe lazy schema holder.
///
/// # Example
///
/// ```ignore
/// let lazy_schema = LazySchema::new(schema_builder);
///
/// // First access triggers build
/// let schema = lazy_schema.get_or_build().await?;
///
/// // Force rebuild on next access
/// lazy_schema.invalidate().await;
/// ```
pub struct LazySchema {
    /// The cached schema (None if not built yet or invalidated).
    schema: RwLock<Option<Arc<Schema>>>,

    /// Build lock to ensure only one build at a time.
    build_lock: Mutex<()>,

    state: RwLock<SchemaState>,

    builder: Arc<EntitySchemaBuilder>,

    /// Last build error message (for diagnostics).
    last_error: RwLock<Option<String>>,
}

impl LazySchema {
    /// Creates a new lazy schema with the given builder.
    #[must_use]
    pub fn new(builder: EntitySchemaBuilder) -> Self {
        Self {
            schema: RwLock::new(None),
            build_lock: Mutex::new(()),
            state: RwLock::new(SchemaState::Uninitialized),
            builder: Arc::new(builder),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the current state of the schema.
    pub async fn state(&self) -> SchemaState {
        *self.state.read().await
    }

    /// Gets the schema, building it if necessary.
    ///
    /// Concurrent callers receive an error while a build is in progress;
    /// use `get_or_build_wait()` to wait instead.
    ///
    /// # Errors
    ///
    /// Returns `MappingError::SchemaInitializing` if another build is in progress.
    /// Returns `MappingError::SchemaBuildFailed` if the build fails.
    pub async fn get_or_build(&self) -> Result<Arc<Schema>, MappingError> {
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }

        if *self.state.read().await == SchemaState::Building {
            return Err(MappingError::SchemaInitializing);
        }

        let Ok(_guard) = self.build_lock.try_lock() else {
            return Err(MappingError::SchemaInitializing);
        };

        // Double-check after acquiring lock
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }

        self.build_locked().await
    }

    /// Gets the schema, waiting for an in-progress build to complete.
    ///
    /// A previous failure is reported without rebuilding; call
    /// `invalidate()` to retry.
    ///
    /// # Errors
    ///
    /// Returns `MappingError::SchemaBuildFailed` if the build fails.
    pub async fn get_or_build_wait(&self) -> Result<Arc<Schema>, MappingError> {
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }

        let _guard = self.build_lock.lock().await;

        if let Some(schema) = self.get().await {
            return Ok(schema);
        }

        if *self.state.read().await == SchemaState::Failed
            && let Some(err) = self.last_error.read().await.as_ref()
        {
            return Err(MappingError::SchemaBuildFailed(err.clone()));
        }

        self.build_locked().await
    }

    /// Runs a build. The caller must hold `build_lock`.
    async fn build_locked(&self) -> Result<Arc<Schema>, MappingError> {
        *self.state.write().await = SchemaState::Building;
        info!("Building GraphQL schema...");

        match self.builder.build().await {
            Ok(schema) => {
                let schema = Arc::new(schema);
                *self.schema.write().await = Some(Arc::clone(&schema));
                *self.state.write().await = SchemaState::Ready;
                *self.last_error.write().await = None;
                info!(
                    type_count = self.builder.mapper().registry().len(),
                    "GraphQL schema built successfully"
                );
                Ok(schema)
            }
            Err(e) => {
                let error_msg = e.to_string();
                warn!(error = %error_msg, code = e.error_code(), "Failed to build GraphQL schema");
                *self.state.write().await = SchemaState::Failed;
                *self.last_error.write().await = Some(error_msg.clone());
                Err(MappingError::SchemaBuildFailed(error_msg))
            }
        }
    }

    /// Gets the schema if it's already built, without triggering a build.
    pub async fn get(&self) -> Option<Arc<Schema>> {
        self.schema.read().await.clone()
    }

    /// Drops the cached schema and starts a new build session.
    ///
    /// Used when the entity metadata changes.
    pub async fn invalidate(&self) {
        let _guard = self.build_lock.lock().await;

        self.builder.mapper().reset();
        *self.schema.write().await = None;
        *self.state.write().await = SchemaState::Uninitialized;
        *self.last_error.write().await = None;

        info!("GraphQL schema invalidated - will rebuild on next request");
    }

    /// Returns the last build error, if any.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    /// Returns whether the schema is ready for use.
    pub async fn is_ready(&self) -> bool {
        *self.state.read().await == SchemaState::Ready
    }
}
