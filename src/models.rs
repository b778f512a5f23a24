use serde::{Deserialize, Serialize};

use crate::entities::{cinema, movie, movie_event};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cinema {
    pub external_id: i64,
    pub group_id: String,
    pub display_name: String,
    pub link: String,
    pub image_url: String,
    pub address: String,
    pub booking_url: Option<String>,
    pub block_online_sales: bool,
    /// Milliseconds since the Unix epoch.
    pub block_online_sales_until: Option<i64>,
    pub latitude: f64,
    pub longitude: f64,
}

/// A title as published upstream. Dubbed and subtitled variants of one film
/// are separate rows; they are merged only when read.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub external_id: String,
    pub name: String,
    pub length: i32,
    pub poster_link: String,
    pub video_link: Option<String>,
    pub link: String,
    pub weight: f64,
    pub release_year: Option<String>,
    pub release_date: String,
    pub attribute_ids: Vec<String>,
    pub imdb_id: Option<String>,
    pub description: Option<String>,
    pub tmdb_popularity: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieEvent {
    pub external_id: String,
    pub film_external_id: String,
    pub cinema_external_id: i64,
    pub business_day: String,
    pub event_date_time: String,
    pub attributes: Vec<String>,
    pub booking_link: String,
    pub secondary_booking_link: Option<String>,
    pub presentation_code: String,
    pub sold_out: bool,
    pub auditorium: String,
    pub auditorium_tiny_name: String,
}

/// Fields written by the enrichment pass, and nothing else.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieEnrichment {
    pub imdb_id: Option<String>,
    pub description: Option<String>,
    pub tmdb_popularity: Option<f64>,
    pub poster_link: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopularityOrder {
    Asc,
    Desc,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Showtime {
    #[serde(flatten)]
    pub event: MovieEvent,
    pub cinema: Option<Cinema>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledScreening {
    #[serde(flatten)]
    pub event: MovieEvent,
    pub movie: Option<Movie>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CinemaSummary {
    pub external_id: i64,
    pub display_name: String,
    pub image_url: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub featured_movie: Option<Movie>,
    pub movies: Vec<Movie>,
    pub upcoming_movies: Vec<Movie>,
    pub cinemas: Vec<CinemaSummary>,
}

impl From<cinema::Model> for Cinema {
    fn from(m: cinema::Model) -> Self {
        Self {
            external_id: m.external_id,
            group_id: m.group_id,
            display_name: m.display_name,
            link: m.link,
            image_url: m.image_url,
            address: m.address,
            booking_url: m.booking_url,
            block_online_sales: m.block_online_sales,
            block_online_sales_until: m.block_online_sales_until,
            latitude: m.latitude,
            longitude: m.longitude,
        }
    }
}

impl From<movie::Model> for Movie {
    fn from(m: movie::Model) -> Self {
        Self {
            external_id: m.external_id,
            name: m.name,
            length: m.length,
            poster_link: m.poster_link,
            video_link: m.video_link,
            link: m.link,
            weight: m.weight,
            release_year: m.release_year,
            release_date: m.release_date,
            attribute_ids: m.attribute_ids.0,
            imdb_id: m.imdb_id,
            description: m.description,
            tmdb_popularity: m.tmdb_popularity,
        }
    }
}

impl From<movie_event::Model> for MovieEvent {
    fn from(m: movie_event::Model) -> Self {
        Self {
            external_id: m.external_id,
            film_external_id: m.film_external_id,
            cinema_external_id: m.cinema_external_id,
            business_day: m.business_day,
            event_date_time: m.event_date_time,
            attributes: m.attributes.0,
            booking_link: m.booking_link,
            secondary_booking_link: m.secondary_booking_link,
            presentation_code: m.presentation_code,
            sold_out: m.sold_out,
            auditorium: m.auditorium,
            auditorium_tiny_name: m.auditorium_tiny_name,
        }
    }
}
