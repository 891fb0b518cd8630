use async_trait::async_trait;
use chrono::NaiveDate;

use super::model::*;
use crate::ranking::MetricWindow;

#[async_trait]
pub trait GenreRepo: Send + Sync {
    async fn upsert_genres(&self, genres: &[Genre]) -> DbResult<()>;
    async fn list_genres(&self) -> DbResult<Vec<Genre>>;
    /// Returns the ids from `ids` that have no stored genre.
    async fn missing_genres(&self, ids: &[i64]) -> DbResult<Vec<i64>>;
}

#[async_trait]
pub trait MovieRepo: Send + Sync {
    async fn get_movie(&self, id: i64) -> DbResult<Movie>;
    /// Inserts or updates a movie in place. Returns true if it was newly created.
    async fn upsert_movie(&self, movie: &Movie) -> DbResult<bool>;
    async fn list_movies(&self, query: &MovieQuery) -> DbResult<Vec<Movie>>;
    async fn list_movies_released_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<Movie>>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn create_comment(&self, movie_id: i64, text: &str) -> DbResult<Comment>;
    async fn create_comment_at(
        &self,
        movie_id: i64,
        text: &str,
        created: chrono::DateTime<chrono::Utc>,
    ) -> DbResult<Comment>;
    async fn list_comments(&self, movie_id: Option<i64>) -> DbResult<Vec<Comment>>;
    async fn count_comments(&self, movie_id: i64, window: &MetricWindow) -> DbResult<u64>;
}
