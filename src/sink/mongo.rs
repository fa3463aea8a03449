use async_trait::async_trait;
use mongodb::{Client, Collection};

use super::{RecordSink, SinkError};
use crate::probe::ProbeResult;

pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/monitor_db";
pub const DEFAULT_DATABASE: &str = "monitor_db";
pub const DEFAULT_COLLECTION: &str = "metrics";

/// Stores each record as one document in a MongoDB collection.
///
/// Documents have the same flat shape as the JSON lines store.
pub struct MongoSink {
    collection: Collection<ProbeResult>,
}

impl MongoSink {
    /// Connects lazily: the URI is validated here, the server is first
    /// contacted on insert. Without an explicit `database` the one named in
    /// the URI is used, falling back to [`DEFAULT_DATABASE`].
    pub async fn connect(
        uri: &str,
        database: Option<&str>,
        collection: &str,
    ) -> Result<Self, SinkError> {
        let client = Client::with_uri_str(uri).await?;
        let database = match database {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(DEFAULT_DATABASE)),
        };
        Ok(Self {
            collection: database.collection(collection),
        })
    }

    pub fn database_name(&self) -> String {
        self.collection.namespace().db
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }
}

#[async_trait]
impl RecordSink for MongoSink {
    async fn insert(&self, record: ProbeResult) -> Result<(), SinkError> {
        self.collection.insert_one(&record).await?;
        Ok(())
    }
}
