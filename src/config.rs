use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

use crate::pipeline::PipelineSettings;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub booking_api_base_url: String,
    /// Last date the booking API is asked about. Defaults to a year out.
    pub booking_until: Option<jiff::civil::Date>,
    /// Enrichment is skipped when unset.
    pub tmdb_access_token: Option<String>,
    pub tmdb_base_url: String,
    pub tmdb_image_base_url: String,
    pub tmdb_rps: u32,
    pub cinema_concurrency: usize,
    pub tmdb_concurrency: usize,
    pub event_batch_size: usize,
    pub http_timeout_secs: u64,
    pub pipeline_deadline_secs: u64,
    pub enrichment_budget_secs: u64,
    pub fetch_hour_utc: i8,
    pub cron_secret: Option<String>,
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://showtimes.db?mode=rwc".to_string());

        let booking_api_base_url = std::env::var("BOOKING_API_BASE_URL").unwrap_or_else(|_| {
            "https://www.cinemacity.ro/ro/data-api-service/v1/quickbook/10107".to_string()
        });

        let booking_until = non_empty("BOOKING_UNTIL")
            .map(|s| s.parse::<jiff::civil::Date>())
            .transpose()
            .context("BOOKING_UNTIL")?;

        let tmdb_access_token = non_empty("TMDB_ACCESS_TOKEN");
        let tmdb_base_url = std::env::var("TMDB_BASE_URL")
            .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string());
        let tmdb_image_base_url = std::env::var("TMDB_IMAGE_BASE_URL")
            .unwrap_or_else(|_| "https://image.tmdb.org/t/p/w500".to_string());

        let tmdb_rps: u32 =
            std::env::var("TMDB_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(4);

        let cinema_concurrency: usize =
            std::env::var("CINEMA_CONCURRENCY").ok().and_then(|s| s.parse().ok()).unwrap_or(5);

        let tmdb_concurrency: usize =
            std::env::var("TMDB_CONCURRENCY").ok().and_then(|s| s.parse().ok()).unwrap_or(10);

        let event_batch_size: usize =
            std::env::var("EVENT_BATCH_SIZE").ok().and_then(|s| s.parse().ok()).unwrap_or(100);

        let http_timeout_secs: u64 =
            std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        let pipeline_deadline_secs: u64 = std::env::var("PIPELINE_DEADLINE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        let enrichment_budget_secs: u64 = std::env::var("ENRICHMENT_BUDGET_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1800);

        let fetch_hour_utc: i8 =
            std::env::var("FETCH_HOUR_UTC").ok().and_then(|s| s.parse().ok()).unwrap_or(2);
        if !(0..=23).contains(&fetch_hour_utc) {
            anyhow::bail!("FETCH_HOUR_UTC must be between 0 and 23, got {fetch_hour_utc}");
        }

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            booking_api_base_url,
            booking_until,
            tmdb_access_token,
            tmdb_base_url,
            tmdb_image_base_url,
            tmdb_rps,
            cinema_concurrency,
            tmdb_concurrency,
            event_batch_size,
            http_timeout_secs,
            pipeline_deadline_secs,
            enrichment_budget_secs,
            fetch_hour_utc,
            cron_secret: non_empty("CRON_SECRET"),
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            cinema_concurrency: self.cinema_concurrency,
            tmdb_concurrency: self.tmdb_concurrency,
            event_batch_size: self.event_batch_size,
            deadline: Duration::from_secs(self.pipeline_deadline_secs),
            enrichment_budget: Duration::from_secs(self.enrichment_budget_secs),
        }
    }
}
