use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::AppResult;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieDetails {
    pub id: i64,
    pub imdb_id: Option<String>,
    pub overview: Option<String>,
    pub popularity: Option<f64>,
    pub poster_path: Option<String>,
}

/// External movie metadata as used by the enrichment pass.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Id of the top-ranked search hit, if any.
    async fn search_movie(&self, query: &str) -> AppResult<Option<i64>>;

    async fn movie_details(&self, tmdb_id: i64) -> AppResult<MovieDetails>;

    /// True only when a HEAD request for `url` answers 200.
    async fn poster_resolves(&self, url: &str) -> bool;

    fn poster_url(&self, poster_path: &str) -> String;
}

pub struct TmdbClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
    image_base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(
        client: reqwest::Client,
        access_token: String,
        base_url: String,
        image_base_url: String,
        rps: u32,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN),
        )));
        Self { client, access_token, base_url, image_base_url, limiter }
    }
}

#[async_trait]
impl MetadataSource for TmdbClient {
    async fn search_movie(&self, query: &str) -> AppResult<Option<i64>> {
        self.limiter.until_ready().await;

        let url = format!("{}/search/movie", self.base_url.trim_end_matches('/'));
        let resp: SearchResponse = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("query", query),
                ("include_adult", "false"),
                ("language", "en-US"),
                ("page", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(query = %query, results = resp.results.len(), "TMDB search");
        Ok(resp.results.into_iter().next().map(|m| m.id))
    }

    async fn movie_details(&self, tmdb_id: i64) -> AppResult<MovieDetails> {
        self.limiter.until_ready().await;

        let url = format!("{}/movie/{}", self.base_url.trim_end_matches('/'), tmdb_id);
        let details = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("language", "en-US")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(details)
    }

    async fn poster_resolves(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(resp) => resp.status() == StatusCode::OK,
            Err(err) => {
                debug!(url = %url, error = %err, "poster check failed");
                false
            },
        }
    }

    fn poster_url(&self, poster_path: &str) -> String {
        format!("{}{}", self.image_base_url.trim_end_matches('/'), poster_path)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchMovie>,
}

#[derive(Debug, Deserialize)]
struct SearchMovie {
    id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TmdbClient {
        TmdbClient::new(
            reqwest::Client::new(),
            "token".into(),
            "https://api.themoviedb.org/3/".into(),
            "https://image.tmdb.org/t/p/w500/".into(),
            0,
        )
    }

    #[test]
    fn poster_url_joins_image_base() {
        assert_eq!(client().poster_url("/abc.jpg"), "https://image.tmdb.org/t/p/w500/abc.jpg");
    }

    #[test]
    fn details_tolerate_missing_fields() {
        let details: MovieDetails = serde_json::from_str(r#"{"id": 603, "imdb_id": null}"#).unwrap();
        assert_eq!(details.id, 603);
        assert!(details.imdb_id.is_none());
        assert!(details.poster_path.is_none());
    }

    #[test]
    fn search_takes_first_result_shape() {
        let resp: SearchResponse =
            serde_json::from_str(r#"{"page":1,"results":[{"id":7},{"id":9}]}"#).unwrap();
        assert_eq!(resp.results.first().map(|m| m.id), Some(7));

        let empty: SearchResponse = serde_json::from_str(r#"{"page":1}"#).unwrap();
        assert!(empty.results.is_empty());
    }
}
