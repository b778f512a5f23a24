use std::collections::HashSet;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::{
    concurrency::process_in_batches,
    models::{Cinema, Movie, MovieEvent},
    upstream::{BookingApi, FilmListing, UpstreamError},
};

/// Everything one crawl produced, deduplicated by external id.
#[derive(Clone, Debug, Default)]
pub struct CollectedCatalog {
    pub cinemas: Vec<Cinema>,
    pub movies: Vec<Movie>,
    pub events: Vec<MovieEvent>,
    pub failed_cinemas: usize,
    pub failed_dates: usize,
}

#[derive(Default)]
struct CinemaHarvest {
    listings: Vec<FilmListing>,
    failed_dates: usize,
    failed: bool,
}

/// First-seen-wins accumulation keyed by external id. Owned by the driving
/// task only; per-cinema work hands its listings back instead of writing here.
#[derive(Default)]
struct Accumulator {
    movie_ids: HashSet<String>,
    movies: Vec<Movie>,
    event_ids: HashSet<String>,
    events: Vec<MovieEvent>,
}

impl Accumulator {
    fn absorb(&mut self, listing: FilmListing) {
        for film in listing.films {
            if self.movie_ids.insert(film.external_id.clone()) {
                self.movies.push(film);
            }
        }
        for event in listing.events {
            if self.event_ids.insert(event.external_id.clone()) {
                self.events.push(event);
            }
        }
    }
}

/// Crawls every cinema and date. Only a failure to list cinemas is returned;
/// per-cinema and per-date failures are logged, counted and skipped.
pub async fn collect(
    api: &dyn BookingApi,
    cinema_concurrency: usize,
) -> Result<CollectedCatalog, UpstreamError> {
    let cinemas = api.list_cinemas().await?;
    info!(cinemas = cinemas.len(), "fetched cinema list");

    let harvests = process_in_batches(cinemas.iter().collect(), cinema_concurrency, |cinema| {
        harvest_cinema(api, cinema)
    })
    .await;

    let mut acc = Accumulator::default();
    let mut failed_cinemas = 0;
    let mut failed_dates = 0;

    for harvest in harvests {
        if harvest.failed {
            failed_cinemas += 1;
        }
        failed_dates += harvest.failed_dates;
        for listing in harvest.listings {
            acc.absorb(listing);
        }
    }

    info!(
        movies = acc.movies.len(),
        events = acc.events.len(),
        failed_cinemas,
        failed_dates,
        "collected unique movies and events"
    );

    Ok(CollectedCatalog {
        cinemas,
        movies: acc.movies,
        events: acc.events,
        failed_cinemas,
        failed_dates,
    })
}

async fn harvest_cinema(api: &dyn BookingApi, cinema: &Cinema) -> CinemaHarvest {
    let cinema_id = cinema.external_id;

    let dates = match api.list_dates(cinema_id).await {
        Ok(dates) => dates,
        Err(err) => {
            warn!(cinema_id, error = %err, "failed to fetch dates, skipping cinema");
            return CinemaHarvest { failed: true, ..Default::default() };
        },
    };

    let results = join_all(dates.iter().map(|date| async move {
        (date, api.list_film_events(cinema_id, date).await)
    }))
    .await;

    let mut harvest = CinemaHarvest::default();
    for (date, result) in results {
        match result {
            Ok(listing) => harvest.listings.push(listing),
            Err(err) => {
                warn!(cinema_id, date = %date, error = %err, "failed to fetch film events, skipping date");
                harvest.failed_dates += 1;
            },
        }
    }

    debug!(cinema = %cinema.display_name, dates = dates.len(), "harvested cinema");
    harvest
}
