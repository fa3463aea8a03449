pub mod jsonl;
pub mod memory;
pub mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::probe_config::SinkConfig;
use crate::mimir::MimirSink;
use crate::probe::ProbeResult;

pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;
pub use mongo::MongoSink;

/// Durable persistence of measurement records.
///
/// Implementations must accept concurrent inserts from every probe of a
/// round. Each insert is an independent write.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn insert(&self, record: ProbeResult) -> Result<(), SinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error on record store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to encode remote write request: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("Failed to compress remote write request: {0}")]
    Compress(#[from] snap::Error),

    #[error("HTTP error while pushing records: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Store rejected records: {status} - {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Builds the sink described by the configuration.
pub async fn build_sink(config: &SinkConfig) -> Result<Arc<dyn RecordSink>, SinkError> {
    match config {
        SinkConfig::Jsonl { path } => {
            log::info!("Recording measurements to {}", path.display());
            Ok(Arc::new(JsonLinesSink::open(path).await?))
        }
        SinkConfig::Mimir {
            endpoint,
            tenant_id,
        } => {
            log::info!("Using Mimir endpoint: {}", endpoint);
            Ok(Arc::new(MimirSink::new(endpoint.clone(), tenant_id.clone())?))
        }
        SinkConfig::Mongodb {
            uri,
            database,
            collection,
        } => {
            let sink = MongoSink::connect(uri, database.as_deref(), collection).await?;
            log::info!(
                "Recording measurements to MongoDB collection {}.{}",
                sink.database_name(),
                sink.collection_name()
            );
            Ok(Arc::new(sink))
        }
    }
}
