use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub poster_path: Option<String>,
    pub adult: bool,
    pub overview: String,
    pub release_date: Option<NaiveDate>,
    pub genre_ids: Vec<i64>,
    pub original_title: String,
    pub original_language: String,
    pub title: String,
    pub backdrop_path: Option<String>,
    pub popularity: f64,
    pub vote_count: i64,
    pub video: bool,
    pub vote_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub movie_id: i64,
    pub text: String,
    pub created: DateTime<Utc>,
}

/// Columns a movie listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieSortField {
    Id,
    Title,
    OriginalTitle,
    OriginalLanguage,
    ReleaseDate,
    Popularity,
    VoteCount,
    VoteAverage,
}

impl MovieSortField {
    pub fn parse(name: &str) -> Option<Self> {
        let field = match name {
            "id" => Self::Id,
            "title" => Self::Title,
            "original_title" => Self::OriginalTitle,
            "original_language" => Self::OriginalLanguage,
            "release_date" => Self::ReleaseDate,
            "popularity" => Self::Popularity,
            "vote_count" => Self::VoteCount,
            "vote_average" => Self::VoteAverage,
            _ => return None,
        };
        Some(field)
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::OriginalTitle => "original_title",
            Self::OriginalLanguage => "original_language",
            Self::ReleaseDate => "release_date",
            Self::Popularity => "popularity",
            Self::VoteCount => "vote_count",
            Self::VoteAverage => "vote_average",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieOrder {
    pub field: MovieSortField,
    pub descending: bool,
}

impl MovieOrder {
    /// Parses `field` or `-field`.
    pub fn parse(value: &str) -> Option<Self> {
        let (name, descending) = match value.strip_prefix('-') {
            Some(name) => (name, true),
            None => (value, false),
        };
        MovieSortField::parse(name).map(|field| MovieOrder { field, descending })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MovieQuery {
    pub title: Option<String>,
    pub order_by: Vec<MovieOrder>,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}

pub type DbResult<T> = Result<T, DbError>;
