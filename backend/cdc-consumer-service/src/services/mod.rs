pub mod elasticsearch;
pub mod index_store;
pub mod provisioner;

pub use elasticsearch::ElasticsearchClient;
pub use index_store::{CreateIndexOutcome, IndexStore};
pub use provisioner::{ensure_index_exists, index_mapping, ProvisionOutcome};
