use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::client::{MovieCatalog, TmdbResult};
use super::types::TmdbMovie;
use crate::db::Genre;

/// In-memory catalog matching titles by case-insensitive substring.
pub struct StaticCatalog {
    movies: Vec<TmdbMovie>,
    genres: Vec<Genre>,
    genre_fetches: AtomicUsize,
}

impl StaticCatalog {
    pub fn new(movies: Vec<TmdbMovie>, genres: Vec<Genre>) -> Self {
        Self {
            movies,
            genres,
            genre_fetches: AtomicUsize::new(0),
        }
    }

    pub fn classics() -> Self {
        let movie = |id: i64, title: &str, release_date: &str, genre_ids: Vec<i64>| TmdbMovie {
            id,
            poster_path: None,
            adult: false,
            overview: format!("About {}", title),
            release_date: Some(release_date.to_string()),
            genre_ids,
            original_title: title.to_string(),
            original_language: "en".to_string(),
            title: title.to_string(),
            backdrop_path: None,
            popularity: 10.0,
            vote_count: 100,
            video: false,
            vote_average: 8.0,
        };

        Self::new(
            vec![
                movie(238, "The Godfather", "1972-03-14", vec![18, 80]),
                movie(109445, "Frozen", "2013-11-27", vec![16]),
                movie(500, "Mystery Film", "2001-01-01", vec![18, 9999]),
            ],
            vec![
                Genre { id: 16, name: "Animation".to_string() },
                Genre { id: 18, name: "Drama".to_string() },
                Genre { id: 80, name: "Crime".to_string() },
            ],
        )
    }

    pub fn genre_fetches(&self) -> usize {
        self.genre_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MovieCatalog for StaticCatalog {
    async fn search_movie(&self, title: &str) -> TmdbResult<Option<TmdbMovie>> {
        let needle = title.to_lowercase();
        Ok(self
            .movies
            .iter()
            .find(|m| m.title.to_lowercase().contains(&needle))
            .cloned())
    }

    async fn fetch_genres(&self) -> TmdbResult<Vec<Genre>> {
        self.genre_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.genres.clone())
    }
}
