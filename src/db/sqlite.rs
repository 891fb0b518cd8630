use std::fmt::Write;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::model::*;
use super::repo::*;
use crate::ranking::{MetricSource, MetricWindow};

// Fixed width, so text comparison in SQL orders like the instants do.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
const DATE_FORMAT: &str = "%Y-%m-%d";

const MOVIE_COLUMNS: &str = "id, poster_path, adult, overview, release_date, original_title, \
     original_language, title, backdrop_path, popularity, vote_count, video, vote_average";

pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct MovieRow {
    id: i64,
    poster_path: Option<String>,
    adult: bool,
    overview: String,
    release_date: Option<String>,
    original_title: String,
    original_language: String,
    title: String,
    backdrop_path: Option<String>,
    popularity: f64,
    vote_count: i64,
    video: bool,
    vote_average: f64,
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(s: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::InvalidValue(format!("timestamp {}: {}", s, e)))
}

fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(s: &str) -> DbResult<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| DbError::InvalidValue(format!("date {}: {}", s, e)))
}

fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database gets a database of its own.
        let in_memory = db_path.contains(":memory:") || db_path.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        let repo = Self { pool };

        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    async fn genre_ids_for(&self, movie_id: i64) -> DbResult<Vec<i64>> {
        let results = sqlx::query_as::<_, (i64,)>(
            "SELECT genre_id FROM movie_genres WHERE movie_id = ? ORDER BY rowid",
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(results.into_iter().map(|r| r.0).collect())
    }

    async fn load_movie(&self, row: MovieRow) -> DbResult<Movie> {
        let genre_ids = self.genre_ids_for(row.id).await?;
        let release_date = row.release_date.as_deref().map(parse_date).transpose()?;

        Ok(Movie {
            id: row.id,
            poster_path: row.poster_path,
            adult: row.adult,
            overview: row.overview,
            release_date,
            genre_ids,
            original_title: row.original_title,
            original_language: row.original_language,
            title: row.title,
            backdrop_path: row.backdrop_path,
            popularity: row.popularity,
            vote_count: row.vote_count,
            video: row.video,
            vote_average: row.vote_average,
        })
    }

    async fn load_movies(&self, rows: Vec<MovieRow>) -> DbResult<Vec<Movie>> {
        let mut movies = Vec::with_capacity(rows.len());
        for row in rows {
            movies.push(self.load_movie(row).await?);
        }
        Ok(movies)
    }

    async fn movie_exists(&self, id: i64) -> DbResult<bool> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT id FROM movies WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl GenreRepo for SqliteRepository {
    async fn upsert_genres(&self, genres: &[Genre]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        for genre in genres {
            sqlx::query(
                "INSERT INTO genres (id, name) VALUES (?, ?)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            )
            .bind(genre.id)
            .bind(&genre.name)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_genres(&self) -> DbResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(genres)
    }

    async fn missing_genres(&self, ids: &[i64]) -> DbResult<Vec<i64>> {
        let mut missing = Vec::new();
        for &id in ids {
            let row = sqlx::query_as::<_, (i64,)>("SELECT id FROM genres WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            if row.is_none() {
                missing.push(id);
            }
        }
        Ok(missing)
    }
}

#[async_trait]
impl MovieRepo for SqliteRepository {
    async fn get_movie(&self, id: i64) -> DbResult<Movie> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {} FROM movies WHERE id = ?",
            MOVIE_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::NotFound(format!("Movie not found: {}", id)),
            _ => DbError::Sqlx(e),
        })?;

        self.load_movie(row).await
    }

    async fn upsert_movie(&self, movie: &Movie) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, (i64,)>("SELECT id FROM movies WHERE id = ?")
            .bind(movie.id)
            .fetch_optional(&mut *tx)
            .await?
            .is_none();

        // Update in place: a REPLACE would cascade-delete the comments.
        sqlx::query(
            "INSERT INTO movies
            (id, poster_path, adult, overview, release_date, original_title, original_language,
             title, backdrop_path, popularity, vote_count, video, vote_average)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                poster_path = excluded.poster_path,
                adult = excluded.adult,
                overview = excluded.overview,
                release_date = excluded.release_date,
                original_title = excluded.original_title,
                original_language = excluded.original_language,
                title = excluded.title,
                backdrop_path = excluded.backdrop_path,
                popularity = excluded.popularity,
                vote_count = excluded.vote_count,
                video = excluded.video,
                vote_average = excluded.vote_average",
        )
        .bind(movie.id)
        .bind(&movie.poster_path)
        .bind(movie.adult)
        .bind(&movie.overview)
        .bind(movie.release_date.as_ref().map(format_date))
        .bind(&movie.original_title)
        .bind(&movie.original_language)
        .bind(&movie.title)
        .bind(&movie.backdrop_path)
        .bind(movie.popularity)
        .bind(movie.vote_count)
        .bind(movie.video)
        .bind(movie.vote_average)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM movie_genres WHERE movie_id = ?")
            .bind(movie.id)
            .execute(&mut *tx)
            .await?;

        for genre_id in &movie.genre_ids {
            sqlx::query("INSERT OR IGNORE INTO movie_genres (movie_id, genre_id) VALUES (?, ?)")
                .bind(movie.id)
                .bind(genre_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(movie_id = movie.id, created, "Stored movie");
        Ok(created)
    }

    async fn list_movies(&self, query: &MovieQuery) -> DbResult<Vec<Movie>> {
        let mut sql = format!("SELECT {} FROM movies", MOVIE_COLUMNS);

        let pattern = query
            .title
            .as_deref()
            .map(|title| format!("%{}%", escape_like(title)));
        if pattern.is_some() {
            sql.push_str(" WHERE title LIKE ? ESCAPE '\\' OR original_title LIKE ? ESCAPE '\\'");
        }

        sql.push_str(" ORDER BY ");
        for order in &query.order_by {
            let direction = if order.descending { "DESC" } else { "ASC" };
            let _ = write!(&mut sql, "{} {}, ", order.field.column(), direction);
        }
        sql.push_str("id ASC");

        let mut q = sqlx::query_as::<_, MovieRow>(&sql);
        if let Some(ref pattern) = pattern {
            q = q.bind(pattern).bind(pattern);
        }
        let rows = q.fetch_all(&self.pool).await?;

        self.load_movies(rows).await
    }

    async fn list_movies_released_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<Movie>> {
        let rows = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {} FROM movies
             WHERE release_date IS NOT NULL AND release_date >= ? AND release_date <= ?
             ORDER BY id",
            MOVIE_COLUMNS
        ))
        .bind(format_date(&start))
        .bind(format_date(&end))
        .fetch_all(&self.pool)
        .await?;

        self.load_movies(rows).await
    }
}

#[async_trait]
impl CommentRepo for SqliteRepository {
    async fn create_comment(&self, movie_id: i64, text: &str) -> DbResult<Comment> {
        self.create_comment_at(movie_id, text, Utc::now()).await
    }

    async fn create_comment_at(
        &self,
        movie_id: i64,
        text: &str,
        created: DateTime<Utc>,
    ) -> DbResult<Comment> {
        if !self.movie_exists(movie_id).await? {
            return Err(DbError::NotFound(format!("Movie not found: {}", movie_id)));
        }

        let created = created.trunc_subsecs(3);
        let result = sqlx::query("INSERT INTO comments (movie_id, text, created) VALUES (?, ?, ?)")
            .bind(movie_id)
            .bind(text)
            .bind(format_timestamp(&created))
            .execute(&self.pool)
            .await?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            movie_id,
            text: text.to_string(),
            created,
        })
    }

    async fn list_comments(&self, movie_id: Option<i64>) -> DbResult<Vec<Comment>> {
        let rows = match movie_id {
            Some(movie_id) => {
                sqlx::query_as::<_, (i64, i64, String, String)>(
                    "SELECT id, movie_id, text, created FROM comments WHERE movie_id = ? ORDER BY id",
                )
                .bind(movie_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, (i64, i64, String, String)>(
                    "SELECT id, movie_id, text, created FROM comments ORDER BY id",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter()
            .map(|r| {
                Ok(Comment {
                    id: r.0,
                    movie_id: r.1,
                    text: r.2,
                    created: parse_timestamp(&r.3)?,
                })
            })
            .collect()
    }

    async fn count_comments(&self, movie_id: i64, window: &MetricWindow) -> DbResult<u64> {
        let (count,) = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM comments WHERE movie_id = ? AND created >= ? AND created <= ?",
        )
        .bind(movie_id)
        .bind(format_timestamp(&window.start))
        .bind(format_timestamp(&window.end))
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl MetricSource for SqliteRepository {
    type Error = DbError;

    async fn count(&self, movie_id: i64, window: &MetricWindow) -> DbResult<u64> {
        self.count_comments(movie_id, window).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: i64, title: &str, release_date: &str) -> Movie {
        Movie {
            id,
            poster_path: None,
            adult: false,
            overview: format!("About {}", title),
            release_date: Some(NaiveDate::parse_from_str(release_date, DATE_FORMAT).unwrap()),
            genre_ids: vec![],
            original_title: title.to_string(),
            original_language: "en".to_string(),
            title: title.to_string(),
            backdrop_path: None,
            popularity: id as f64,
            vote_count: 10 * id,
            video: false,
            vote_average: 7.5,
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    async fn repo() -> SqliteRepository {
        SqliteRepository::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_movie_reports_creation() {
        let repo = repo().await;
        repo.upsert_genres(&[
            Genre { id: 18, name: "Drama".to_string() },
            Genre { id: 80, name: "Crime".to_string() },
        ])
        .await
        .unwrap();

        let mut godfather = movie(238, "The Godfather", "1972-03-14");
        godfather.genre_ids = vec![18, 80];
        assert!(repo.upsert_movie(&godfather).await.unwrap());

        godfather.vote_count = 999;
        godfather.genre_ids = vec![80];
        assert!(!repo.upsert_movie(&godfather).await.unwrap());

        let stored = repo.get_movie(238).await.unwrap();
        assert_eq!(stored, godfather);
    }

    #[tokio::test]
    async fn test_update_keeps_comments() {
        let repo = repo().await;
        let godfather = movie(238, "The Godfather", "1972-03-14");
        repo.upsert_movie(&godfather).await.unwrap();
        repo.create_comment(238, "Tremendous").await.unwrap();

        repo.upsert_movie(&godfather).await.unwrap();
        assert_eq!(repo.list_comments(Some(238)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_movie() {
        let repo = repo().await;
        assert!(matches!(repo.get_movie(1).await, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_genres() {
        let repo = repo().await;
        repo.upsert_genres(&[Genre { id: 18, name: "Drama".to_string() }])
            .await
            .unwrap();
        assert_eq!(repo.missing_genres(&[18, 80, 12]).await.unwrap(), vec![80, 12]);
        assert_eq!(repo.list_genres().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_movies_filter_and_order() {
        let repo = repo().await;
        repo.upsert_movie(&movie(238, "The Godfather", "1972-03-14")).await.unwrap();
        repo.upsert_movie(&movie(240, "The Godfather Part II", "1974-12-20")).await.unwrap();
        repo.upsert_movie(&movie(109445, "Frozen", "2013-11-27")).await.unwrap();

        let query = MovieQuery {
            title: Some("godFATHER".to_string()),
            order_by: vec![MovieOrder::parse("-release_date").unwrap()],
        };
        let ids: Vec<i64> = repo.list_movies(&query).await.unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![240, 238]);

        let all = repo.list_movies(&MovieQuery::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, 238);
    }

    #[tokio::test]
    async fn test_title_filter_treats_wildcards_literally() {
        let repo = repo().await;
        repo.upsert_movie(&movie(1, "100% Wolf", "2020-01-01")).await.unwrap();
        repo.upsert_movie(&movie(2, "1000 Wolves", "2020-01-01")).await.unwrap();

        let query = MovieQuery { title: Some("100%".to_string()), order_by: vec![] };
        let movies = repo.list_movies(&query).await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].id, 1);
    }

    #[tokio::test]
    async fn test_released_between_is_inclusive() {
        let repo = repo().await;
        repo.upsert_movie(&movie(1, "First", "2020-01-01")).await.unwrap();
        repo.upsert_movie(&movie(2, "Last", "2020-12-31")).await.unwrap();
        repo.upsert_movie(&movie(3, "Later", "2021-01-01")).await.unwrap();
        let mut undated = movie(4, "Undated", "2020-06-01");
        undated.release_date = None;
        repo.upsert_movie(&undated).await.unwrap();

        let movies = repo
            .list_movies_released_between(date("2020-01-01"), date("2020-12-31"))
            .await
            .unwrap();
        let ids: Vec<i64> = movies.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_comment_requires_movie() {
        let repo = repo().await;
        assert!(matches!(
            repo.create_comment(42, "Who?").await,
            Err(DbError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_comments() {
        let repo = repo().await;
        repo.upsert_movie(&movie(1, "One", "2020-01-01")).await.unwrap();
        repo.upsert_movie(&movie(2, "Two", "2020-01-01")).await.unwrap();
        let first = repo.create_comment(1, "Great").await.unwrap();
        repo.create_comment(2, "Meh").await.unwrap();

        let all = repo.list_comments(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], first);

        let only_two = repo.list_comments(Some(2)).await.unwrap();
        assert_eq!(only_two.len(), 1);
        assert_eq!(only_two[0].text, "Meh");
    }

    #[tokio::test]
    async fn test_count_comments_window_boundaries() {
        let repo = repo().await;
        repo.upsert_movie(&movie(1, "One", "2020-01-01")).await.unwrap();
        for created in [
            "2020-05-01T00:00:00.000Z",
            "2020-05-10T23:59:59.999Z",
            "2020-05-11T00:00:00.000Z",
            "2020-04-30T23:59:59.999Z",
        ] {
            repo.create_comment_at(1, "hi", at(created)).await.unwrap();
        }

        let window = MetricWindow::from_dates(date("2020-05-01"), date("2020-05-10"));
        assert_eq!(repo.count_comments(1, &window).await.unwrap(), 2);

        let next_day = MetricWindow::from_dates(date("2020-05-11"), date("2020-05-11"));
        assert_eq!(repo.count(1, &next_day).await.unwrap(), 1);

        let inverted = MetricWindow::from_dates(date("2020-05-10"), date("2020-05-01"));
        assert_eq!(repo.count(1, &inverted).await.unwrap(), 0);
    }
}
