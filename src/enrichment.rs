use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{
    concurrency::process_in_batches,
    error::{AppError, AppResult},
    models::{Movie, MovieEnrichment},
    normalize::normalize_movie_name,
    store::CatalogStore,
    tmdb::MetadataSource,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentReport {
    pub enriched: usize,
    pub failed: usize,
    /// Movies not finished before the budget ran out.
    pub timed_out: usize,
    /// Set when no metadata source was configured.
    pub skipped: bool,
    /// Set when the stored movies could not be read at all.
    pub load_failed: bool,
}

enum Outcome {
    Enriched,
    Unmatched,
    Failed,
    TimedOut,
}

/// Best-effort metadata pass over every stored movie. Per-movie problems are
/// logged and counted; nothing here is returned as an error. Work still
/// pending when `budget` elapses is abandoned and counted as timed out.
pub async fn enrich_movies(
    store: &CatalogStore,
    source: Option<&dyn MetadataSource>,
    concurrency: usize,
    budget: Duration,
) -> EnrichmentReport {
    let Some(source) = source else {
        info!("no TMDB access token configured, skipping enrichment");
        return EnrichmentReport { skipped: true, ..Default::default() };
    };

    let movies = match store.all_movies().await {
        Ok(movies) => movies,
        Err(err) => {
            error!(error = %err, "failed to load movies for enrichment");
            return EnrichmentReport { load_failed: true, ..Default::default() };
        },
    };

    info!(movies = movies.len(), ?budget, "enriching movies with TMDB data");
    let deadline = Instant::now() + budget;

    let outcomes = process_in_batches(movies, concurrency, |movie| async move {
        let Ok(result) = tokio::time::timeout_at(deadline, enrich_one(store, source, &movie)).await
        else {
            return Outcome::TimedOut;
        };
        match result {
            Ok(true) => {
                debug!(movie = %movie.name, "enriched");
                Outcome::Enriched
            },
            Ok(false) => Outcome::Unmatched,
            Err(err) => {
                warn!(movie = %movie.name, error = %err, "enrichment failed");
                Outcome::Failed
            },
        }
    })
    .await;

    let mut report = EnrichmentReport::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Enriched => report.enriched += 1,
            Outcome::Unmatched | Outcome::Failed => report.failed += 1,
            Outcome::TimedOut => report.timed_out += 1,
        }
    }

    if report.timed_out > 0 {
        warn!(timed_out = report.timed_out, ?budget, "enrichment budget exhausted");
    }
    info!(enriched = report.enriched, failed = report.failed, "TMDB enrichment complete");
    report
}

/// Ok(false) means the search found nothing for this title.
async fn enrich_one(
    store: &CatalogStore,
    source: &dyn MetadataSource,
    movie: &Movie,
) -> AppResult<bool> {
    let query = normalize_movie_name(&movie.name);

    let Some(tmdb_id) = source.search_movie(&query).await? else {
        debug!(movie = %movie.name, query = %query, "no TMDB results");
        return Ok(false);
    };

    let details = source.movie_details(tmdb_id).await?;

    let poster_link = match details.poster_path.as_deref().filter(|p| !p.is_empty()) {
        Some(path) if !source.poster_resolves(&movie.poster_link).await => {
            source.poster_url(path)
        },
        _ => movie.poster_link.clone(),
    };

    let enrichment = MovieEnrichment {
        imdb_id: details.imdb_id,
        description: details.overview,
        tmdb_popularity: details.popularity,
        poster_link,
    };

    if !store.apply_enrichment(&movie.external_id, &enrichment).await? {
        return Err(AppError::not_found(format!("movie {} disappeared", movie.external_id)));
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use sea_orm::{ConnectionTrait, Statement};

    use super::*;
    use crate::{
        testing::{StubMetadata, film, memory_store},
        tmdb::MovieDetails,
    };

    const BUDGET: Duration = Duration::from_secs(60);

    fn details(id: i64, poster: Option<&str>) -> MovieDetails {
        MovieDetails {
            id,
            imdb_id: Some(format!("tt{id:07}")),
            overview: Some(format!("Overview {id}")),
            popularity: Some(id as f64 / 10.0),
            poster_path: poster.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn missing_source_skips_the_stage() {
        let store = memory_store().await;
        store.upsert_movies(&[film("F1", "X")]).await.unwrap();

        let report = enrich_movies(&store, None, 10, BUDGET).await;

        assert_eq!(report, EnrichmentReport { skipped: true, ..Default::default() });
        assert!(store.movie("F1").await.unwrap().unwrap().imdb_id.is_none());
    }

    #[tokio::test]
    async fn searches_with_normalized_name_and_patches_movie() {
        let store = memory_store().await;
        store.upsert_movies(&[film("F1", "Avatar: Fire and ash Hu dub")]).await.unwrap();

        let source = StubMetadata::default()
            .with_match("Avatar: Fire and ash", details(83533, Some("/avatar.jpg")))
            .with_live_poster("https://cdn/F1.jpg");

        let report = enrich_movies(&store, Some(&source), 10, BUDGET).await;

        assert_eq!(report.enriched, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(source.queries().await, vec!["Avatar: Fire and ash"]);

        let stored = store.movie("F1").await.unwrap().unwrap();
        assert_eq!(stored.imdb_id.as_deref(), Some("tt0083533"));
        assert_eq!(stored.description.as_deref(), Some("Overview 83533"));
        assert_eq!(stored.tmdb_popularity, Some(8353.3));
        assert_eq!(stored.poster_link, "https://cdn/F1.jpg");
    }

    #[tokio::test]
    async fn broken_poster_is_replaced_only_when_tmdb_has_one() {
        let store = memory_store().await;
        store.upsert_movies(&[film("F1", "One"), film("F2", "Two")]).await.unwrap();

        let source = StubMetadata::default()
            .with_match("One", details(1, Some("/one.jpg")))
            .with_match("Two", details(2, None));

        enrich_movies(&store, Some(&source), 10, BUDGET).await;

        let one = store.movie("F1").await.unwrap().unwrap();
        assert_eq!(one.poster_link, "https://image.tmdb.org/t/p/w500/one.jpg");
        let two = store.movie("F2").await.unwrap().unwrap();
        assert_eq!(two.poster_link, "https://cdn/F2.jpg");
    }

    #[tokio::test]
    async fn unmatched_and_failing_movies_do_not_stop_the_rest() {
        let store = memory_store().await;
        let movies: Vec<_> =
            (1..=12).map(|n| film(&format!("F{n}"), &format!("Film {n}"))).collect();
        store.upsert_movies(&movies).await.unwrap();

        let mut source = StubMetadata::default().failing_query("Film 3");
        for n in 1..=12 {
            if n != 5 {
                source = source.with_match(&format!("Film {n}"), details(n, None));
            }
        }

        let report = enrich_movies(&store, Some(&source), 10, BUDGET).await;

        assert_eq!(report, EnrichmentReport { enriched: 10, failed: 2, ..Default::default() });
        assert!(store.movie("F3").await.unwrap().unwrap().imdb_id.is_none());
        assert!(store.movie("F5").await.unwrap().unwrap().imdb_id.is_none());
        assert!(store.movie("F12").await.unwrap().unwrap().imdb_id.is_some());
    }

    #[tokio::test]
    async fn exhausted_budget_counts_unfinished_movies() {
        let store = memory_store().await;
        store.upsert_movies(&[film("F1", "One"), film("F2", "Two")]).await.unwrap();

        let source = StubMetadata::default()
            .with_match("One", details(1, None))
            .with_match("Two", details(2, None))
            .slow_search(Duration::from_millis(300));

        let report = enrich_movies(&store, Some(&source), 10, Duration::from_millis(20)).await;

        assert_eq!(report, EnrichmentReport { timed_out: 2, ..Default::default() });
        assert!(store.movie("F1").await.unwrap().unwrap().imdb_id.is_none());
    }

    #[tokio::test]
    async fn unreadable_movies_are_flagged() {
        let store = memory_store().await;
        store
            .db()
            .execute(Statement::from_string(store.db().get_database_backend(), "DROP TABLE movies".to_string()))
            .await
            .unwrap();

        let report = enrich_movies(&store, Some(&StubMetadata::default()), 10, BUDGET).await;

        assert!(report.load_failed);
        assert!(!report.skipped);
        assert_eq!(report.enriched + report.failed, 0);
    }
}
