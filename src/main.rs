mod catalog;
mod collector;
mod concurrency;
mod config;
mod db;
mod dedup;
mod enrichment;
mod entities;
mod error;
mod models;
mod normalize;
mod pipeline;
mod routes;
mod scheduler;
mod store;
#[cfg(test)]
mod testing;
mod tmdb;
mod upstream;

use std::{sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::{
    config::Config,
    pipeline::Pipeline,
    store::CatalogStore,
    tmdb::{MetadataSource, TmdbClient},
    upstream::CinemaCityClient,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: CatalogStore,
    pub pipeline: Arc<Pipeline>,
}

#[derive(Debug, Parser)]
#[command(name = "showtimes", version, about = "Cinema showtime aggregator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Serve the JSON API and run the nightly fetch (default).
    Serve,
    /// Run one full fetch now and print the summary.
    Fetch,
    /// Re-run TMDB enrichment over the stored movies.
    Enrich,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,showtimes=debug,sqlx=warn".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent("showtimes/0.1")
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let store = CatalogStore::new(db);
    let pipeline = Arc::new(build_pipeline(&config, http, store.clone()));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Fetch => {
            let summary = pipeline.run_manual().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        },
        Command::Enrich => {
            let report = pipeline.enrich().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        },
        Command::Serve => {
            tokio::spawn(scheduler::run_nightly(pipeline.clone(), config.fetch_hour_utc));

            let state = Arc::new(AppState { config: config.clone(), store, pipeline });
            let app = routes::router(state);

            let listener = tokio::net::TcpListener::bind(config.addr).await?;
            info!(addr = %config.addr, "listening");
            axum::serve(listener, app).await?;
        },
    }

    Ok(())
}

fn build_pipeline(config: &Config, http: reqwest::Client, store: CatalogStore) -> Pipeline {
    let booking = Arc::new(CinemaCityClient::new(
        http.clone(),
        config.booking_api_base_url.clone(),
        config.booking_until,
    ));

    let metadata = config.tmdb_access_token.clone().map(|token| {
        Arc::new(TmdbClient::new(
            http,
            token,
            config.tmdb_base_url.clone(),
            config.tmdb_image_base_url.clone(),
            config.tmdb_rps,
        )) as Arc<dyn MetadataSource>
    });
    if metadata.is_none() {
        warn!("TMDB_ACCESS_TOKEN not set, enrichment will be skipped");
    }

    Pipeline::new(booking, metadata, store, config.pipeline_settings())
}
