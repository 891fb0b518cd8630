use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    Form, Json,
};
use chrono::NaiveDate;

use super::error::ApiError;
use crate::db::{Comment, CommentRepo, DbError, Movie, MovieOrder, MovieQuery, MovieRepo};
use crate::ranking::{rank_movies, LeaderboardEntry};
use crate::server::AppState;
use crate::tmdb::import_movie;
use crate::util::QueryParams;

fn require<'a>(params: &'a QueryParams, field: &'static str) -> Result<&'a str, ApiError> {
    params.get(field).ok_or(ApiError::MissingField(field))
}

fn parse_id(field: &'static str, value: &str) -> Result<i64, ApiError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ApiError::invalid(field, value))
}

/// Accepts exactly `YYYY-MM-DD`. The store compares dates and timestamps as
/// text, so signed or wider years must not get through.
fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ApiError> {
    let trimmed = value.trim();
    let well_formed = trimmed.len() == 10
        && trimmed.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(ApiError::invalid(field, value));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| ApiError::invalid(field, value))
}

// Ranks never get near u32::MAX, so larger limits cut nothing.
fn parse_max_rank(value: &str) -> Result<u32, ApiError> {
    match value.trim().parse::<u64>() {
        Ok(rank) if rank >= 1 => Ok(u32::try_from(rank).unwrap_or(u32::MAX)),
        _ => Err(ApiError::invalid_because(
            "max_rank",
            value,
            "must be a positive integer",
        )),
    }
}

pub async fn welcome() -> &'static str {
    "Welcome to MovieProxy"
}

pub async fn create_movie(
    State(state): State<AppState>,
    Form(params): Form<QueryParams>,
) -> Result<(StatusCode, Json<Movie>), ApiError> {
    let title = require(&params, "title")?;

    let (movie, created) = import_movie(state.db.as_ref(), state.catalog.as_ref(), title).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(movie)))
}

pub async fn list_movies(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Vec<Movie>>, ApiError> {
    let mut query = MovieQuery {
        title: params.get("title").map(str::to_string),
        order_by: Vec::new(),
    };

    if let Some(order_by) = params.get("order_by") {
        for field in order_by.trim_matches(',').split(',') {
            let field = field.trim();
            let order = MovieOrder::parse(field).ok_or_else(|| {
                ApiError::invalid_because("order_by", field, "not a sortable movie field")
            })?;
            query.order_by.push(order);
        }
    }

    let movies = state.db.list_movies(&query).await?;
    Ok(Json(movies))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Form(params): Form<QueryParams>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let raw_movie_id = require(&params, "movie_id")?;
    let text = require(&params, "text")?;
    let movie_id = parse_id("movie_id", raw_movie_id)?;

    let comment = state
        .db
        .create_comment(movie_id, text)
        .await
        .map_err(|e| match e {
            DbError::NotFound(_) => {
                ApiError::invalid_because("movie_id", raw_movie_id, "movie not in database")
            }
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let movie_id = params
        .get("movie_id")
        .map(|value| parse_id("movie_id", value))
        .transpose()?;

    let comments = state.db.list_comments(movie_id).await?;
    Ok(Json(comments))
}

pub async fn top(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let raw_start = require(&params, "start_date")?;
    let raw_end = require(&params, "end_date")?;
    let start_date = parse_date("start_date", raw_start)?;
    let end_date = parse_date("end_date", raw_end)?;
    let max_rank = params.get("max_rank").map(parse_max_rank).transpose()?;

    let movies = state
        .db
        .list_movies_released_between(start_date, end_date)
        .await?;
    let movie_ids: Vec<i64> = movies.iter().map(|m| m.id).collect();

    let leaderboard =
        rank_movies(state.db.as_ref(), &movie_ids, start_date, end_date, max_rank).await?;

    Ok(Json(leaderboard))
}

pub async fn movies_method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed {
        method,
        allowed: &["GET", "POST"],
    }
}

pub async fn comments_method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed {
        method,
        allowed: &["GET", "POST"],
    }
}

pub async fn top_method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed {
        method,
        allowed: &["GET"],
    }
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("resource")
}
