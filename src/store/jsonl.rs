use super::ResultStore;
use crate::error::{Result, StoreError};
use crate::result::{Activity, AnalysisResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Result store backed by a JSON-lines file, one result per line.
///
/// Appends are serialized through a lock and synced before returning, so a
/// recorded result survives a crash right after `record`.
pub struct JsonlResultStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlResultStore {
    /// Open (or lazily create) the store at `path`, creating parent directories
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Open {
                    path: path.display().to_string(),
                    details: e.to_string(),
                })?;
        }

        info!("Result store at {}", path.display());
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResultStore for JsonlResultStore {
    async fn record(&self, result: &AnalysisResult) -> Result<()> {
        let append_error = |details: String| StoreError::Append {
            result_id: result.id.to_string(),
            details,
        };

        let mut line = serde_json::to_string(result)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| append_error(e.to_string()))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| append_error(e.to_string()))?;
        file.sync_data()
            .await
            .map_err(|e| append_error(e.to_string()))?;

        debug!("Recorded {} result {}", result.activity, result.id);
        Ok(())
    }

    async fn results(&self, activity: Activity) -> Result<Vec<AnalysisResult>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Open {
                    path: self.path.display().to_string(),
                    details: e.to_string(),
                }
                .into())
            }
        };

        let mut results = Vec::new();
        for (i, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let result: AnalysisResult =
                serde_json::from_str(line).map_err(|e| StoreError::Corrupt {
                    line: i + 1,
                    details: e.to_string(),
                })?;
            if result.activity == activity {
                results.push(result);
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JumpVariant;
    use crate::error::KinetrackError;
    use crate::result::{ActivityMetric, RepetitionRate};
    use std::time::Duration;
    use tempfile::TempDir;

    fn punches(user_id: u64, total: u32) -> AnalysisResult {
        AnalysisResult::new(
            user_id,
            "boxing.jsonl",
            300,
            ActivityMetric::Punches(RepetitionRate::new(total, Duration::from_secs(10))),
        )
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlResultStore::open(temp_dir.path().join("nested/results.jsonl"))
            .await
            .unwrap();

        let first = punches(1, 14);
        let undefined_jump = AnalysisResult::new(
            2,
            "jump.jsonl",
            12,
            ActivityMetric::Jump {
                variant: JumpVariant::Stabilized,
                height_cm: None,
            },
        );
        store.record(&first).await.unwrap();
        store.record(&undefined_jump).await.unwrap();
        store.record(&punches(3, 9)).await.unwrap();

        let stored = store.results(Activity::Punches).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].id, first.id);
        assert_eq!(stored[0].user_id, 1);
        assert_eq!(stored[1].user_id, 3);

        let jumps = store.results(Activity::Jump).await.unwrap();
        assert_eq!(jumps.len(), 1);
        assert_eq!(jumps[0].metric.score(), None);
    }

    #[tokio::test]
    async fn test_reopen_keeps_earlier_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("results.jsonl");

        JsonlResultStore::open(&path)
            .await
            .unwrap()
            .record(&punches(1, 5))
            .await
            .unwrap();

        let reopened = JsonlResultStore::open(&path).await.unwrap();
        reopened.record(&punches(2, 6)).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert_eq!(reopened.results(Activity::Punches).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlResultStore::open(temp_dir.path().join("results.jsonl"))
            .await
            .unwrap();

        assert!(store.results(Activity::Pushups).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_line_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("results.jsonl");
        let store = JsonlResultStore::open(&path).await.unwrap();
        store.record(&punches(1, 5)).await.unwrap();

        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("{not json\n");
        std::fs::write(&path, contents).unwrap();

        match store.results(Activity::Punches).await {
            Err(KinetrackError::Store(StoreError::Corrupt { line, .. })) => assert_eq!(line, 2),
            other => panic!("expected corrupt record error, got {:?}", other),
        }
    }
}
