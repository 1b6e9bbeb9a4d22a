use serde_json::{json, Value};
use tracing::info;

use super::index_store::{CreateIndexOutcome, IndexStore};
use crate::error::ProvisionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    AlreadyExisted,
    Created,
    /// Our create lost to a concurrent one; the index is there either way.
    CreatedConcurrently,
}

/// Mapping for change event documents.
pub fn index_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "@timestamp": { "type": "date" },
                "table_name": { "type": "keyword" },
                "operation_type": { "type": "keyword" },
                "database": { "type": "keyword" },
                "data": { "type": "object" },
                "old_data": { "type": "object" },
                "sql_type": { "type": "object" },
                "mysql_type": { "type": "object" },
                "pk_names": { "type": "keyword" }
            }
        }
    })
}

/// Create the change event index unless it already exists.
///
/// Safe to call repeatedly and from several instances at once; an existing
/// index is never modified.
pub async fn ensure_index_exists<S>(store: &S) -> Result<ProvisionOutcome, ProvisionError>
where
    S: IndexStore + ?Sized,
{
    let index = store.index_name();

    let exists = store
        .index_exists()
        .await
        .map_err(|source| ProvisionError::ExistenceCheck {
            index: index.to_string(),
            source,
        })?;

    if exists {
        info!(index, "Elasticsearch index already exists");
        return Ok(ProvisionOutcome::AlreadyExisted);
    }

    let outcome = store
        .create_index(&index_mapping())
        .await
        .map_err(|source| ProvisionError::Create {
            index: index.to_string(),
            source,
        })?;

    match outcome {
        CreateIndexOutcome::Created => {
            info!(index, "Created Elasticsearch index");
            Ok(ProvisionOutcome::Created)
        }
        CreateIndexOutcome::AlreadyExists => {
            info!(index, "Elasticsearch index was created concurrently");
            Ok(ProvisionOutcome::CreatedConcurrently)
        }
    }
}
