use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, header::AUTHORIZATION},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::{
    AppState,
    catalog::{self, MovieListing},
    error::{AppError, AppResult},
    models::{Cinema, Dashboard, Movie, PopularityOrder, ScheduledScreening, Showtime},
    pipeline::RunSummary,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/dashboard", get(dashboard))
        .route("/api/movies", get(movies))
        .route("/api/movies/upcoming", get(upcoming_movies))
        .route("/api/movies/search", get(search_movies))
        .route("/api/movies/{id}", get(movie))
        .route("/api/movies/{id}/showtimes", get(movie_showtimes))
        .route("/api/movies/{id}/cinemas", get(movie_cinemas))
        .route("/api/cinemas", get(cinemas))
        .route("/api/cinemas/{id}", get(cinema))
        .route("/api/cinemas/{id}/today", get(cinema_today))
        .route("/admin/fetch", post(admin_fetch))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn today() -> String {
    let today: jiff::civil::Date = jiff::Zoned::now().into();
    today.to_string()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviesQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    order: Option<PopularityOrder>,
    #[serde(default)]
    has_description: bool,
}

impl From<MoviesQuery> for MovieListing {
    fn from(q: MoviesQuery) -> Self {
        Self {
            limit: q.limit,
            offset: q.offset.unwrap_or(0),
            order: q.order,
            has_description: q.has_description,
        }
    }
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> AppResult<Json<Dashboard>> {
    Ok(Json(catalog::dashboard(&state.store, &today()).await?))
}

pub async fn movies(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MoviesQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    let listing = MovieListing::from(q);
    Ok(Json(catalog::showing_movies(&state.store, &today(), &listing).await?))
}

pub async fn upcoming_movies(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MoviesQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    let listing = MovieListing::from(q);
    Ok(Json(catalog::upcoming_movies(&state.store, &today(), &listing).await?))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

pub async fn search_movies(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(catalog::search_movies(&state.store, &q.q).await?))
}

pub async fn movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Movie>> {
    let movie = state.store.movie(&id).await?;
    movie.map(Json).ok_or_else(|| AppError::not_found(format!("movie {id} not found")))
}

#[derive(Debug, Deserialize)]
pub struct ShowtimesQuery {
    cinema: Option<i64>,
}

pub async fn movie_showtimes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<ShowtimesQuery>,
) -> AppResult<Json<Vec<Showtime>>> {
    Ok(Json(catalog::movie_showtimes(&state.store, &id, q.cinema, &today()).await?))
}

pub async fn movie_cinemas(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Cinema>>> {
    Ok(Json(catalog::cinemas_showing(&state.store, &id).await?))
}

pub async fn cinemas(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Cinema>>> {
    Ok(Json(state.store.all_cinemas().await?))
}

pub async fn cinema(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<Cinema>> {
    let cinema = state.store.cinema(id).await?;
    cinema.map(Json).ok_or_else(|| AppError::not_found(format!("cinema {id} not found")))
}

pub async fn cinema_today(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<ScheduledScreening>>> {
    Ok(Json(catalog::cinema_schedule(&state.store, id, &today()).await?))
}

/// Manual pipeline trigger guarded by `Authorization: Bearer <CRON_SECRET>`.
pub async fn admin_fetch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<RunSummary>> {
    authorize(&headers, state.config.cron_secret.as_deref())?;
    Ok(Json(state.pipeline.run_manual().await?))
}

fn authorize(headers: &HeaderMap, secret: Option<&str>) -> AppResult<()> {
    let Some(secret) = secret else {
        error!("CRON_SECRET is not configured");
        return Err(AppError::internal("server configuration error"));
    };

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if provided != Some(secret) {
        warn!("rejected admin fetch with bad credentials");
        return Err(AppError::unauthorized("unauthorized"));
    }
    Ok(())
}
