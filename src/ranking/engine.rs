use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::window::MetricWindow;

/// Per-movie count of comment events inside a closed time window.
#[async_trait]
pub trait MetricSource: Send + Sync {
    type Error: Send;

    async fn count(&self, movie_id: i64, window: &MetricWindow) -> Result<u64, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub movie_id: i64,
    pub total_comments: u64,
    pub rank: u32,
}

/// Builds the "most discussed" leaderboard for `movie_ids`.
///
/// Every movie gets an entry, zero counts included. Entries come back sorted
/// by `total_comments` descending with dense ranks. With `max_rank` set, the
/// output stops right before the first entry ranked above it. A failing
/// count aborts the whole call.
pub async fn rank_movies<S>(
    source: &S,
    movie_ids: &[i64],
    start_date: NaiveDate,
    end_date: NaiveDate,
    max_rank: Option<u32>,
) -> Result<Vec<LeaderboardEntry>, S::Error>
where
    S: MetricSource + ?Sized,
{
    let window = MetricWindow::from_dates(start_date, end_date);

    let mut counts = Vec::with_capacity(movie_ids.len());
    for &movie_id in movie_ids {
        let total = source.count(movie_id, &window).await?;
        counts.push((movie_id, total));
    }

    let mut leaderboard = assign_dense_ranks(counts);
    if let Some(max_rank) = max_rank {
        truncate_to_rank(&mut leaderboard, max_rank);
    }

    debug!(
        candidates = movie_ids.len(),
        entries = leaderboard.len(),
        max_rank = ?max_rank,
        "Ranked movies"
    );

    Ok(leaderboard)
}

/// Sorts `(movie_id, total_comments)` pairs by count, highest first, and
/// assigns dense ranks. Equal counts keep their input order.
pub fn assign_dense_ranks(mut counts: Vec<(i64, u64)>) -> Vec<LeaderboardEntry> {
    if counts.is_empty() {
        return Vec::new();
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let mut current_min = counts[0].1;
    let mut current_rank = 1;
    counts
        .into_iter()
        .map(|(movie_id, total_comments)| {
            if total_comments < current_min {
                current_rank += 1;
                current_min = total_comments;
            }
            LeaderboardEntry {
                movie_id,
                total_comments,
                rank: current_rank,
            }
        })
        .collect()
}

/// Drops the first entry ranked above `max_rank` and everything after it.
pub fn truncate_to_rank(leaderboard: &mut Vec<LeaderboardEntry>, max_rank: u32) {
    if let Some(cutoff) = leaderboard.iter().position(|entry| entry.rank > max_rank) {
        leaderboard.truncate(cutoff);
    }
}
