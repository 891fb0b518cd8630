use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::{Genre, Movie};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreListResponse {
    pub genres: Vec<TmdbGenre>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbGenre {
    pub id: i64,
    pub name: String,
}

impl From<TmdbGenre> for Genre {
    fn from(genre: TmdbGenre) -> Self {
        Genre {
            id: genre.id,
            name: genre.name,
        }
    }
}

/// A movie as returned by `/search/movie`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbMovie {
    pub id: i64,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub original_language: String,
    pub title: String,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(default)]
    pub video: bool,
    #[serde(default)]
    pub vote_average: f64,
}

impl TmdbMovie {
    /// TMDB sends an empty string for unreleased titles.
    pub fn parsed_release_date(&self) -> Option<NaiveDate> {
        self.release_date
            .as_deref()
            .filter(|s| !s.is_empty())
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    }

    pub fn into_movie(self) -> Movie {
        let release_date = self.parsed_release_date();
        Movie {
            id: self.id,
            poster_path: self.poster_path,
            adult: self.adult,
            overview: self.overview,
            release_date,
            genre_ids: self.genre_ids,
            original_title: self.original_title,
            original_language: self.original_language,
            title: self.title,
            backdrop_path: self.backdrop_path,
            popularity: self.popularity,
            vote_count: self.vote_count,
            video: self.video,
            vote_average: self.vote_average,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_response() {
        let body = r#"{
            "page": 1,
            "results": [
                {
                    "adult": false,
                    "backdrop_path": "/tmU7GeKVybMWFButWEGl2M4GeiP.jpg",
                    "genre_ids": [18, 80],
                    "id": 238,
                    "original_language": "en",
                    "original_title": "The Godfather",
                    "overview": "Spanning the years 1945 to 1955...",
                    "popularity": 95.013,
                    "poster_path": "/3bhkrj58Vtu7enYsRolD1fZdja1.jpg",
                    "release_date": "1972-03-14",
                    "title": "The Godfather",
                    "video": false,
                    "vote_average": 8.7,
                    "vote_count": 17000
                }
            ],
            "total_pages": 1,
            "total_results": 1
        }"#;

        let response: SearchResponse<TmdbMovie> = serde_json::from_str(body).unwrap();
        assert_eq!(response.results.len(), 1);

        let movie = response.results[0].clone().into_movie();
        assert_eq!(movie.id, 238);
        assert_eq!(movie.genre_ids, vec![18, 80]);
        assert_eq!(movie.release_date, NaiveDate::from_ymd_opt(1972, 3, 14));
        assert_eq!(movie.original_title, "The Godfather");
    }

    #[test]
    fn test_empty_release_date() {
        let body = r#"{"id": 1, "title": "Untitled Sequel", "release_date": ""}"#;
        let movie: TmdbMovie = serde_json::from_str(body).unwrap();
        assert_eq!(movie.parsed_release_date(), None);
        assert_eq!(movie.into_movie().release_date, None);
    }

    #[test]
    fn test_no_results() {
        let body = r#"{"page": 1, "results": [], "total_pages": 0, "total_results": 0}"#;
        let response: SearchResponse<TmdbMovie> = serde_json::from_str(body).unwrap();
        assert!(response.results.is_empty());
    }
}
