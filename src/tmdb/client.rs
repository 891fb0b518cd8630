use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::*;
use crate::config::TmdbConfig;
use crate::db::Genre;

#[derive(Debug, thiserror::Error)]
pub enum TmdbError {
    #[error("No TMDB API key configured")]
    MissingApiKey,
    #[error("TMDB request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("TMDB returned status {0}")]
    Status(u16),
}

pub type TmdbResult<T> = Result<T, TmdbError>;

/// Source of movie metadata.
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Best match for `title`, if any.
    async fn search_movie(&self, title: &str) -> TmdbResult<Option<TmdbMovie>>;
    async fn fetch_genres(&self) -> TmdbResult<Vec<Genre>>;
}

pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    pub fn new(
        api_key: String,
        base_url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> TmdbResult<Self> {
        if api_key.trim().is_empty() {
            return Err(TmdbError::MissingApiKey);
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &TmdbConfig) -> TmdbResult<Self> {
        let api_key = config.resolve_api_key().ok_or(TmdbError::MissingApiKey)?;
        Self::new(
            api_key,
            &config.base_url,
            &config.user_agent,
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> TmdbResult<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TmdbError::Status(status.as_u16()));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl MovieCatalog for TmdbClient {
    async fn search_movie(&self, title: &str) -> TmdbResult<Option<TmdbMovie>> {
        debug!(query = %title, "Searching TMDB movies");

        let response: SearchResponse<TmdbMovie> = self
            .get_with_params("/search/movie", &[("query", title)])
            .await?;
        Ok(response.results.into_iter().next())
    }

    async fn fetch_genres(&self) -> TmdbResult<Vec<Genre>> {
        debug!("Fetching TMDB genre list");

        let response: GenreListResponse = self.get_with_params("/genre/movie/list", &[]).await?;
        Ok(response.genres.into_iter().map(Genre::from).collect())
    }
}
