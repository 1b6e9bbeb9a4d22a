use async_trait::async_trait;
use elasticsearch::{
    http::{
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
        StatusCode,
    },
    indices::{IndicesCreateParts, IndicesExistsParts},
    Elasticsearch, IndexParts,
};
use serde_json::Value;
use url::Url;

use super::index_store::{CreateIndexOutcome, IndexStore};
use crate::error::IndexStoreError;
use crate::events::models::ChangeEvent;

const ALREADY_EXISTS_EXCEPTION: &str = "resource_already_exists_exception";

#[derive(Clone)]
pub struct ElasticsearchClient {
    client: Elasticsearch,
    index: String,
}

impl ElasticsearchClient {
    /// Build a client for a single node. No request is sent until first use.
    pub fn new(url: &str, index: &str) -> Result<Self, IndexStoreError> {
        let parsed = Url::parse(url)?;
        let pool = SingleNodeConnectionPool::new(parsed);
        let transport = TransportBuilder::new(pool).build()?;

        Ok(Self {
            client: Elasticsearch::new(transport),
            index: index.to_string(),
        })
    }
}

#[async_trait]
impl IndexStore for ElasticsearchClient {
    fn index_name(&self) -> &str {
        &self.index
    }

    async fn ping(&self) -> Result<(), IndexStoreError> {
        let response = self.client.ping().send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn index_exists(&self) -> Result<bool, IndexStoreError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[self.index.as_str()]))
            .send()
            .await?;

        match response.status_code() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => ensure_success(response).await.map(|_| false),
        }
    }

    async fn create_index(&self, body: &Value) -> Result<CreateIndexOutcome, IndexStoreError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&self.index))
            .body(body)
            .send()
            .await?;

        let status = response.status_code();
        if status.is_success() {
            return Ok(CreateIndexOutcome::Created);
        }

        let text = response.text().await.unwrap_or_default();
        if is_already_exists(status.as_u16(), &text) {
            return Ok(CreateIndexOutcome::AlreadyExists);
        }

        Err(IndexStoreError::Rejected {
            status: status.as_u16(),
            body: text,
        })
    }

    async fn index_document(&self, event: &ChangeEvent) -> Result<(), IndexStoreError> {
        let response = self
            .client
            .index(IndexParts::Index(&self.index))
            .body(event)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, IndexStoreError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(IndexStoreError::Rejected {
        status: status.as_u16(),
        body,
    })
}

/// A create that lost a race comes back as a 400 carrying this exception type.
fn is_already_exists(status: u16, body: &str) -> bool {
    status == 400 && body.contains(ALREADY_EXISTS_EXCEPTION)
}
