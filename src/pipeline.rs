use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tracing::{error, info};

use crate::{
    collector::collect,
    enrichment::{EnrichmentReport, enrich_movies},
    error::AppError,
    store::CatalogStore,
    tmdb::MetadataSource,
    upstream::{BookingApi, UpstreamError},
};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to fetch cinema list: {0}")]
    CinemaList(#[source] UpstreamError),
    #[error("failed to persist catalog: {0}")]
    Storage(#[source] AppError),
    #[error("movie fetch exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub cinema_concurrency: usize,
    pub tmdb_concurrency: usize,
    pub event_batch_size: usize,
    /// Limit for crawling and persistence.
    pub deadline: Duration,
    /// Separate limit for enrichment; movies not reached in time are counted.
    pub enrichment_budget: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            cinema_concurrency: 5,
            tmdb_concurrency: 10,
            event_batch_size: 100,
            deadline: Duration::from_secs(3600),
            enrichment_budget: Duration::from_secs(1800),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub cinemas: usize,
    pub movies: usize,
    pub events: usize,
    pub failed_cinemas: usize,
    pub failed_dates: usize,
    pub enrichment: EnrichmentReport,
}

/// Crawl, persist, enrich. One instance is shared by the scheduler, the
/// admin route and the CLI.
pub struct Pipeline {
    booking: Arc<dyn BookingApi>,
    metadata: Option<Arc<dyn MetadataSource>>,
    store: CatalogStore,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        booking: Arc<dyn BookingApi>,
        metadata: Option<Arc<dyn MetadataSource>>,
        store: CatalogStore,
        settings: PipelineSettings,
    ) -> Self {
        Self { booking, metadata, store, settings }
    }

    pub async fn run_scheduled(&self) -> Result<RunSummary, PipelineError> {
        info!("starting scheduled movie fetch");
        self.run().await
    }

    pub async fn run_manual(&self) -> Result<RunSummary, PipelineError> {
        info!("manually triggered movie fetch");
        self.run().await
    }

    /// Enrichment alone, over whatever is already stored.
    pub async fn enrich(&self) -> EnrichmentReport {
        enrich_movies(
            &self.store,
            self.metadata.as_deref(),
            self.settings.tmdb_concurrency,
            self.settings.enrichment_budget,
        )
        .await
    }

    /// The deadline covers crawling and persistence only. Enrichment runs
    /// afterwards under its own budget and cannot fail the run.
    async fn run(&self) -> Result<RunSummary, PipelineError> {
        let deadline = self.settings.deadline;
        let mut summary = match tokio::time::timeout(deadline, self.collect_and_store()).await {
            Ok(Ok(summary)) => summary,
            Ok(Err(err)) => {
                error!(error = %err, "movie fetch failed");
                return Err(err);
            },
            Err(_) => {
                error!(?deadline, "movie fetch timed out");
                return Err(PipelineError::DeadlineExceeded(deadline));
            },
        };

        summary.enrichment = self.enrich().await;
        info!(?summary, "movie fetch completed");
        Ok(summary)
    }

    async fn collect_and_store(&self) -> Result<RunSummary, PipelineError> {
        let catalog = collect(self.booking.as_ref(), self.settings.cinema_concurrency)
            .await
            .map_err(PipelineError::CinemaList)?;

        self.store.upsert_cinemas(&catalog.cinemas).await.map_err(PipelineError::Storage)?;
        info!(count = catalog.cinemas.len(), "stored cinemas");

        self.store.upsert_movies(&catalog.movies).await.map_err(PipelineError::Storage)?;
        info!(count = catalog.movies.len(), "stored movies");

        self.store
            .upsert_events(&catalog.events, self.settings.event_batch_size)
            .await
            .map_err(PipelineError::Storage)?;
        info!(count = catalog.events.len(), "stored movie events");

        Ok(RunSummary {
            cinemas: catalog.cinemas.len(),
            movies: catalog.movies.len(),
            events: catalog.events.len(),
            failed_cinemas: catalog.failed_cinemas,
            failed_dates: catalog.failed_dates,
            enrichment: EnrichmentReport::default(),
        })
    }
}
