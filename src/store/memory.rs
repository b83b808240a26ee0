use super::ResultStore;
use crate::error::Result;
use crate::result::{Activity, AnalysisResult};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Result store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: Mutex<Vec<AnalysisResult>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn record(&self, result: &AnalysisResult) -> Result<()> {
        self.records.lock().push(result.clone());
        Ok(())
    }

    async fn results(&self, activity: Activity) -> Result<Vec<AnalysisResult>> {
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| r.activity == activity)
            .cloned()
            .collect())
    }
}
