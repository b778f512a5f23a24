//! In-process fakes and fixtures shared by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    config::Config,
    db,
    error::{AppError, AppResult},
    models::{Cinema, Movie, MovieEvent},
    store::CatalogStore,
    tmdb::{MetadataSource, MovieDetails},
    upstream::{BookingApi, FilmListing, UpstreamError},
};

pub async fn memory_store() -> CatalogStore {
    CatalogStore::new(db::connect_and_migrate("sqlite::memory:").await.unwrap())
}

pub fn test_config(cron_secret: Option<&str>) -> Config {
    Config {
        addr: "127.0.0.1:0".parse().unwrap(),
        database_url: "sqlite::memory:".into(),
        booking_api_base_url: "http://booking.invalid".into(),
        booking_until: None,
        tmdb_access_token: None,
        tmdb_base_url: "http://tmdb.invalid".into(),
        tmdb_image_base_url: "http://images.invalid".into(),
        tmdb_rps: 4,
        cinema_concurrency: 5,
        tmdb_concurrency: 10,
        event_batch_size: 100,
        http_timeout_secs: 30,
        pipeline_deadline_secs: 3600,
        enrichment_budget_secs: 1800,
        fetch_hour_utc: 2,
        cron_secret: cron_secret.map(str::to_string),
    }
}

pub fn cinema(id: i64) -> Cinema {
    Cinema {
        external_id: id,
        group_id: format!("group-{id}"),
        display_name: format!("Cinema {id}"),
        link: format!("https://booking/cinemas/{id}"),
        image_url: format!("https://cdn/cinema-{id}.jpg"),
        address: format!("Street {id}"),
        booking_url: None,
        block_online_sales: false,
        block_online_sales_until: None,
        latitude: 44.4,
        longitude: 26.1,
    }
}

pub fn film(id: &str, name: &str) -> Movie {
    Movie {
        external_id: id.to_string(),
        name: name.to_string(),
        length: 120,
        poster_link: format!("https://cdn/{id}.jpg"),
        video_link: None,
        link: format!("https://booking/films/{id}"),
        weight: 0.0,
        release_year: Some("2025".into()),
        release_date: "2025-01-01".into(),
        attribute_ids: vec!["2d".into()],
        imdb_id: None,
        description: None,
        tmdb_popularity: None,
    }
}

pub fn event(id: &str, film_id: &str, cinema_id: i64) -> MovieEvent {
    MovieEvent {
        external_id: id.to_string(),
        film_external_id: film_id.to_string(),
        cinema_external_id: cinema_id,
        business_day: "2025-01-01".into(),
        event_date_time: "2025-01-01T18:00:00".into(),
        attributes: vec!["2d".into(), "original-lang-en-us".into()],
        booking_link: format!("https://booking/events/{id}"),
        secondary_booking_link: None,
        presentation_code: "2D".into(),
        sold_out: false,
        auditorium: "Sala 1".into(),
        auditorium_tiny_name: "1".into(),
    }
}

fn decode_error(what: &str) -> UpstreamError {
    UpstreamError::Decode {
        url: format!("stub://{what}"),
        source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
    }
}

/// Scripted booking API. Anything not scripted answers with an empty list.
#[derive(Default)]
pub struct StubBookingApi {
    cinemas: Vec<Cinema>,
    cinema_list_fails: bool,
    cinema_list_delay: Option<Duration>,
    dates: HashMap<i64, Vec<String>>,
    failing_dates: HashSet<i64>,
    listings: HashMap<(i64, String), FilmListing>,
    failing_listings: HashSet<(i64, String)>,
}

impl StubBookingApi {
    pub fn new(cinemas: Vec<Cinema>) -> Self {
        Self { cinemas, ..Default::default() }
    }

    pub fn with_dates(mut self, cinema_id: i64, dates: &[&str]) -> Self {
        self.dates.insert(cinema_id, dates.iter().map(|d| d.to_string()).collect());
        self
    }

    pub fn with_listing(
        mut self,
        cinema_id: i64,
        date: &str,
        films: Vec<Movie>,
        events: Vec<MovieEvent>,
    ) -> Self {
        self.listings.insert((cinema_id, date.to_string()), FilmListing { films, events });
        self
    }

    pub fn failing_dates(mut self, cinema_id: i64) -> Self {
        self.failing_dates.insert(cinema_id);
        self
    }

    pub fn failing_listing(mut self, cinema_id: i64, date: &str) -> Self {
        self.failing_listings.insert((cinema_id, date.to_string()));
        self
    }

    pub fn failing_cinema_list(mut self) -> Self {
        self.cinema_list_fails = true;
        self
    }

    pub fn slow_cinema_list(mut self, delay: Duration) -> Self {
        self.cinema_list_delay = Some(delay);
        self
    }
}

#[async_trait]
impl BookingApi for StubBookingApi {
    async fn list_cinemas(&self) -> Result<Vec<Cinema>, UpstreamError> {
        if let Some(delay) = self.cinema_list_delay {
            tokio::time::sleep(delay).await;
        }
        if self.cinema_list_fails {
            return Err(decode_error("cinemas"));
        }
        Ok(self.cinemas.clone())
    }

    async fn list_dates(&self, cinema_id: i64) -> Result<Vec<String>, UpstreamError> {
        if self.failing_dates.contains(&cinema_id) {
            return Err(decode_error("dates"));
        }
        Ok(self.dates.get(&cinema_id).cloned().unwrap_or_default())
    }

    async fn list_film_events(
        &self,
        cinema_id: i64,
        date: &str,
    ) -> Result<FilmListing, UpstreamError> {
        let key = (cinema_id, date.to_string());
        if self.failing_listings.contains(&key) {
            return Err(decode_error("film-events"));
        }
        Ok(self.listings.get(&key).cloned().unwrap_or_default())
    }
}

/// Scripted metadata service keyed by search query. Records every query.
#[derive(Default)]
pub struct StubMetadata {
    matches: HashMap<String, MovieDetails>,
    failing: HashSet<String>,
    live_posters: HashSet<String>,
    search_delay: Option<Duration>,
    queries: Mutex<Vec<String>>,
}

impl StubMetadata {
    pub fn with_match(mut self, query: &str, details: MovieDetails) -> Self {
        self.matches.insert(query.to_string(), details);
        self
    }

    pub fn failing_query(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn with_live_poster(mut self, url: &str) -> Self {
        self.live_posters.insert(url.to_string());
        self
    }

    pub fn slow_search(mut self, delay: Duration) -> Self {
        self.search_delay = Some(delay);
        self
    }

    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }
}

#[async_trait]
impl MetadataSource for StubMetadata {
    async fn search_movie(&self, query: &str) -> AppResult<Option<i64>> {
        self.queries.lock().await.push(query.to_string());
        if let Some(delay) = self.search_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(query) {
            return Err(AppError::from(anyhow::anyhow!("search failed for {query}")));
        }
        Ok(self.matches.get(query).map(|d| d.id))
    }

    async fn movie_details(&self, tmdb_id: i64) -> AppResult<MovieDetails> {
        self.matches
            .values()
            .find(|d| d.id == tmdb_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("no details for {tmdb_id}")))
    }

    async fn poster_resolves(&self, url: &str) -> bool {
        self.live_posters.contains(url)
    }

    fn poster_url(&self, poster_path: &str) -> String {
        format!("https://image.tmdb.org/t/p/w500{poster_path}")
    }
}
