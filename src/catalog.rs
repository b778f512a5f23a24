//! Read-side queries behind the JSON API. Duplicate language variants of a
//! title are merged here, never in storage.

use std::collections::{HashMap, HashSet};

use crate::{
    dedup::deduplicate_movies,
    error::{AppError, AppResult},
    models::{CinemaSummary, Dashboard, Movie, PopularityOrder, ScheduledScreening, Showtime},
    store::CatalogStore,
};

const DASHBOARD_MOVIES: usize = 4;
const DASHBOARD_UPCOMING: usize = 4;
const DASHBOARD_CINEMAS: usize = 20;
const MAX_SEARCH_CHARS: usize = 100;
const MAX_SEARCH_WORDS: usize = 10;

#[derive(Clone, Copy, Debug, Default)]
pub struct MovieListing {
    pub limit: Option<usize>,
    pub offset: usize,
    pub order: Option<PopularityOrder>,
    pub has_description: bool,
}

fn popularity(movie: &Movie) -> f64 {
    movie.tmdb_popularity.unwrap_or(0.0)
}

fn sort_by_popularity(movies: &mut [Movie], order: PopularityOrder) {
    movies.sort_by(|a, b| {
        let ord = popularity(a).total_cmp(&popularity(b));
        match order {
            PopularityOrder::Asc => ord,
            PopularityOrder::Desc => ord.reverse(),
        }
    });
}

/// Takes twice the page size before merging variants so a page stays full
/// after duplicates collapse.
fn page(mut movies: Vec<Movie>, listing: &MovieListing) -> Vec<Movie> {
    if let Some(order) = listing.order {
        sort_by_popularity(&mut movies, order);
    }
    let window = listing.limit.map_or(movies.len(), |limit| limit.saturating_mul(2));
    let mut deduped = deduplicate_movies(movies.into_iter().skip(listing.offset).take(window));
    if let Some(limit) = listing.limit {
        deduped.truncate(limit);
    }
    deduped
}

async fn showing_ids(store: &CatalogStore, today: &str) -> AppResult<HashSet<String>> {
    Ok(store.events_from(today).await?.into_iter().map(|e| e.film_external_id).collect())
}

/// Movies with at least one screening today or later.
pub async fn showing_movies(
    store: &CatalogStore,
    today: &str,
    listing: &MovieListing,
) -> AppResult<Vec<Movie>> {
    let showing = showing_ids(store, today).await?;
    let movies = store
        .all_movies()
        .await?
        .into_iter()
        .filter(|m| showing.contains(&m.external_id))
        .filter(|m| !listing.has_description || m.description.is_some())
        .collect();
    Ok(page(movies, listing))
}

pub async fn upcoming_movies(
    store: &CatalogStore,
    today: &str,
    listing: &MovieListing,
) -> AppResult<Vec<Movie>> {
    let movies = store
        .all_movies()
        .await?
        .into_iter()
        .filter(|m| m.release_date.as_str() > today)
        .filter(|m| !listing.has_description || m.description.is_some())
        .collect();
    Ok(page(movies, listing))
}

/// Case-insensitive match requiring every word of `term` in the title.
pub async fn search_movies(store: &CatalogStore, term: &str) -> AppResult<Vec<Movie>> {
    let sanitized: String = term.trim().chars().take(MAX_SEARCH_CHARS).collect();
    let words: Vec<String> = sanitized.split_whitespace().map(str::to_lowercase).collect();

    if words.is_empty() {
        return Ok(Vec::new());
    }
    if words.len() > MAX_SEARCH_WORDS {
        return Err(AppError::bad_request(format!(
            "too many search terms (max {MAX_SEARCH_WORDS})"
        )));
    }

    let matches = store.all_movies().await?.into_iter().filter(|m| {
        let name = m.name.to_lowercase();
        words.iter().all(|w| name.contains(w.as_str()))
    });
    Ok(deduplicate_movies(matches))
}

pub async fn cinemas_showing(
    store: &CatalogStore,
    film_external_id: &str,
) -> AppResult<Vec<crate::models::Cinema>> {
    let mut seen = HashSet::new();
    let ids: Vec<i64> = store
        .film_events(film_external_id)
        .await?
        .into_iter()
        .map(|e| e.cinema_external_id)
        .filter(|id| seen.insert(*id))
        .collect();
    store.cinemas_by_ids(&ids).await
}

/// Screenings of one film from `today` on, each with its cinema attached.
pub async fn movie_showtimes(
    store: &CatalogStore,
    film_external_id: &str,
    cinema_external_id: Option<i64>,
    today: &str,
) -> AppResult<Vec<Showtime>> {
    let events: Vec<_> = store
        .film_events_from(film_external_id, today)
        .await?
        .into_iter()
        .filter(|e| cinema_external_id.is_none_or(|id| e.cinema_external_id == id))
        .collect();

    let mut ids: Vec<i64> = events.iter().map(|e| e.cinema_external_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let cinemas: HashMap<i64, _> = store
        .cinemas_by_ids(&ids)
        .await?
        .into_iter()
        .map(|c| (c.external_id, c))
        .collect();

    Ok(events
        .into_iter()
        .map(|event| {
            let cinema = cinemas.get(&event.cinema_external_id).cloned();
            Showtime { event, cinema }
        })
        .collect())
}

/// A cinema's programme for one business day, each screening with its movie.
pub async fn cinema_schedule(
    store: &CatalogStore,
    cinema_external_id: i64,
    day: &str,
) -> AppResult<Vec<ScheduledScreening>> {
    let events = store.cinema_events_on(cinema_external_id, day).await?;

    let mut ids: Vec<String> = events.iter().map(|e| e.film_external_id.clone()).collect();
    ids.sort_unstable();
    ids.dedup();
    let movies: HashMap<String, Movie> = store
        .movies_by_ids(&ids)
        .await?
        .into_iter()
        .map(|m| (m.external_id.clone(), m))
        .collect();

    Ok(events
        .into_iter()
        .map(|event| {
            let movie = movies.get(&event.film_external_id).cloned();
            ScheduledScreening { event, movie }
        })
        .collect())
}

pub async fn dashboard(store: &CatalogStore, today: &str) -> AppResult<Dashboard> {
    let showing = showing_ids(store, today).await?;
    let movies = store.all_movies().await?;

    let mut current: Vec<Movie> = movies
        .iter()
        .filter(|m| m.release_date.as_str() <= today && showing.contains(&m.external_id))
        .cloned()
        .collect();
    sort_by_popularity(&mut current, PopularityOrder::Desc);

    let featured_movie = current.iter().find(|m| m.description.is_some()).cloned();

    current.truncate(DASHBOARD_MOVIES * 2);
    let mut current = deduplicate_movies(current);
    current.truncate(DASHBOARD_MOVIES);

    let mut upcoming: Vec<Movie> =
        movies.into_iter().filter(|m| m.release_date.as_str() > today).collect();
    sort_by_popularity(&mut upcoming, PopularityOrder::Desc);
    upcoming.truncate(DASHBOARD_UPCOMING * 2);
    let mut upcoming = deduplicate_movies(upcoming);
    upcoming.truncate(DASHBOARD_UPCOMING);

    let mut cinemas = store.all_cinemas().await?;
    cinemas.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    let cinemas = cinemas
        .into_iter()
        .take(DASHBOARD_CINEMAS)
        .map(|c| CinemaSummary {
            external_id: c.external_id,
            display_name: c.display_name,
            image_url: c.image_url,
        })
        .collect();

    Ok(Dashboard { featured_movie, movies: current, upcoming_movies: upcoming, cinemas })
}
