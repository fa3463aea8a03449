use std::sync::Mutex;

use async_trait::async_trait;

use super::{RecordSink, SinkError};
use crate::probe::ProbeResult;

/// Keeps records in process memory. Useful when embedding the agent.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<ProbeResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the records received so far.
    pub fn records(&self) -> Vec<ProbeResult> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn insert(&self, record: ProbeResult) -> Result<(), SinkError> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.push(record);
        Ok(())
    }
}
