//! Change stream consumption: decoding Canal-JSON batches and driving them
//! into the index store.

pub mod decoder;
pub mod models;
pub mod pipeline;
pub mod stream;

pub use decoder::{decode, decode_now};
pub use models::{ChangeBatch, ChangeEvent, RawChangeMessage};
pub use pipeline::{MessageOutcome, Pipeline, RunSummary};
pub use stream::{ChangeStream, KafkaChangeStream};
