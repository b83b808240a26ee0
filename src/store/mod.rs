mod jsonl;
mod memory;

pub use jsonl::JsonlResultStore;
pub use memory::MemoryResultStore;

use crate::error::Result;
use crate::result::{Activity, AnalysisResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use uuid::Uuid;

/// Append-only persistence for finished analyses
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Append one result; earlier records are never rewritten
    async fn record(&self, result: &AnalysisResult) -> Result<()>;

    /// All stored results for `activity`, in the order they were recorded
    async fn results(&self, activity: Activity) -> Result<Vec<AnalysisResult>>;
}

/// One ranked row of a leaderboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: u64,
    pub result_id: Uuid,
    pub score: f64,
    pub analyzed_at: DateTime<Utc>,
}

/// Rank stored results for `activity`, best first.
///
/// Results without a score (no jump detected) are left out. Equal scores keep
/// the earlier result ahead.
pub async fn leaderboard(
    store: &dyn ResultStore,
    activity: Activity,
    limit: usize,
) -> Result<Vec<LeaderboardEntry>> {
    let mut scored: Vec<(f64, AnalysisResult)> = store
        .results(activity)
        .await?
        .into_iter()
        .filter_map(|result| result.metric.score().map(|score| (score, result)))
        .collect();

    scored.sort_by(|(a, ra), (b, rb)| {
        b.partial_cmp(a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| ra.analyzed_at.cmp(&rb.analyzed_at))
    });

    Ok(scored
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (score, result))| LeaderboardEntry {
            rank: i + 1,
            user_id: result.user_id,
            result_id: result.id,
            score,
            analyzed_at: result.analyzed_at,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JumpVariant;
    use crate::result::{ActivityMetric, RepetitionRate};
    use std::time::Duration;

    fn pushups(user_id: u64, total: u32) -> AnalysisResult {
        AnalysisResult::new(
            user_id,
            "pushups.jsonl",
            60,
            ActivityMetric::Pushups(RepetitionRate::new(total, Duration::from_secs(30))),
        )
    }

    fn jump(user_id: u64, height_cm: Option<f64>) -> AnalysisResult {
        AnalysisResult::new(
            user_id,
            "jump.jsonl",
            40,
            ActivityMetric::Jump {
                variant: JumpVariant::Stabilized,
                height_cm,
            },
        )
    }

    #[tokio::test]
    async fn test_leaderboard_orders_descending() {
        let store = MemoryResultStore::new();
        store.record(&pushups(1, 12)).await.unwrap();
        store.record(&pushups(2, 31)).await.unwrap();
        store.record(&pushups(3, 20)).await.unwrap();
        store.record(&jump(4, Some(40.0))).await.unwrap();

        let board = leaderboard(&store, Activity::Pushups, 10).await.unwrap();
        let users: Vec<u64> = board.iter().map(|e| e.user_id).collect();
        assert_eq!(users, vec![2, 3, 1]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].score, 31.0);
    }

    #[tokio::test]
    async fn test_leaderboard_skips_undefined_jumps() {
        let store = MemoryResultStore::new();
        store.record(&jump(1, None)).await.unwrap();
        store.record(&jump(2, Some(22.5))).await.unwrap();
        store.record(&jump(3, Some(0.0))).await.unwrap();

        let board = leaderboard(&store, Activity::Jump, 10).await.unwrap();
        let users: Vec<u64> = board.iter().map(|e| e.user_id).collect();
        assert_eq!(users, vec![2, 3]);

        // Still kept in the store
        assert_eq!(store.len(), 3);
        assert_eq!(store.results(Activity::Jump).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_leaderboard_limit_and_ties() {
        let store = MemoryResultStore::new();
        for user_id in 1..=5 {
            store.record(&pushups(user_id, 10)).await.unwrap();
        }

        let board = leaderboard(&store, Activity::Pushups, 3).await.unwrap();
        assert_eq!(board.len(), 3);
        assert!(board.windows(2).all(|w| w[0].analyzed_at <= w[1].analyzed_at));
        assert_eq!(
            board.iter().map(|e| e.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn test_empty_leaderboard() {
        let store = MemoryResultStore::new();
        assert!(store.is_empty());
        assert!(leaderboard(&store, Activity::Punches, 5)
            .await
            .unwrap()
            .is_empty());
    }
}
