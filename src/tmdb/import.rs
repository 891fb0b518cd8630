use tracing::{info, warn};

use super::client::{MovieCatalog, TmdbError};
use crate::db::{DbError, GenreRepo, Movie, MovieRepo};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("No movie matching '{0}' in the catalog")]
    NotFound(String),
    #[error("Catalog error: {0}")]
    Catalog(#[from] TmdbError),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// Looks `title` up in the catalog and stores the best match.
///
/// Genres the local store does not know yet are pulled from the catalog
/// first. Returns the stored movie and whether it was newly created.
pub async fn import_movie<R, C>(repo: &R, catalog: &C, title: &str) -> Result<(Movie, bool), ImportError>
where
    R: GenreRepo + MovieRepo + ?Sized,
    C: MovieCatalog + ?Sized,
{
    let found = catalog
        .search_movie(title)
        .await?
        .ok_or_else(|| ImportError::NotFound(title.to_string()))?;
    let mut movie = found.into_movie();

    let missing = repo.missing_genres(&movie.genre_ids).await?;
    if !missing.is_empty() {
        let genres = catalog.fetch_genres().await?;
        info!(count = genres.len(), "Refreshed genre list from catalog");
        repo.upsert_genres(&genres).await?;

        let unknown = repo.missing_genres(&movie.genre_ids).await?;
        if !unknown.is_empty() {
            warn!(movie_id = movie.id, genres = ?unknown, "Dropping unknown genre ids");
            movie.genre_ids.retain(|id| !unknown.contains(id));
        }
    }

    let created = repo.upsert_movie(&movie).await?;
    info!(movie_id = movie.id, title = %movie.title, created, "Imported movie");

    Ok((movie, created))
}
