use async_trait::async_trait;
use serde_json::Value;

use crate::error::IndexStoreError;
use crate::events::models::ChangeEvent;

/// Result of an index create request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateIndexOutcome {
    Created,
    /// Someone else created the index between our existence check and create.
    AlreadyExists,
}

/// The document store change events are written to.
///
/// One implementation talks to Elasticsearch; tests use in-memory fakes.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Name of the single index this store writes to.
    fn index_name(&self) -> &str;

    /// Cheap reachability check used while waiting for the cluster at startup.
    async fn ping(&self) -> Result<(), IndexStoreError>;

    async fn index_exists(&self) -> Result<bool, IndexStoreError>;

    /// Create the index with the given settings/mappings body.
    async fn create_index(&self, body: &Value) -> Result<CreateIndexOutcome, IndexStoreError>;

    /// Write one document. A single attempt; callers decide what a failure means.
    async fn index_document(&self, event: &ChangeEvent) -> Result<(), IndexStoreError>;
}
