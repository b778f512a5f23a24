use async_trait::async_trait;
use jiff::{Timestamp, civil::DateTime, tz::TimeZone};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{Cinema, Movie, MovieEvent};

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Films and showtimes published for one cinema on one date.
#[derive(Clone, Debug, Default)]
pub struct FilmListing {
    pub films: Vec<Movie>,
    pub events: Vec<MovieEvent>,
}

/// The booking API as seen by the collector. Errors are returned untouched;
/// callers decide what is fatal.
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn list_cinemas(&self) -> Result<Vec<Cinema>, UpstreamError>;

    async fn list_dates(&self, cinema_id: i64) -> Result<Vec<String>, UpstreamError>;

    async fn list_film_events(
        &self,
        cinema_id: i64,
        date: &str,
    ) -> Result<FilmListing, UpstreamError>;
}

pub struct CinemaCityClient {
    client: reqwest::Client,
    base_url: String,
    until: String,
}

impl CinemaCityClient {
    pub fn new(client: reqwest::Client, base_url: String, until: Option<jiff::civil::Date>) -> Self {
        let until = until.unwrap_or_else(|| {
            let today: jiff::civil::Date = jiff::Zoned::now().into();
            today + jiff::Span::new().years(1)
        });
        Self { client, base_url, until: until.to_string() }
    }

    async fn get_body<T: DeserializeOwned>(
        &self,
        path: &str,
        lang: &str,
    ) -> Result<T, UpstreamError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        debug!(url = %url, "fetching booking API");

        let text = self
            .client
            .get(&url)
            .query(&[("attr", ""), ("lang", lang)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let envelope: Envelope<T> =
            serde_json::from_str(&text).map_err(|source| UpstreamError::Decode { url, source })?;
        Ok(envelope.body)
    }
}

#[async_trait]
impl BookingApi for CinemaCityClient {
    async fn list_cinemas(&self) -> Result<Vec<Cinema>, UpstreamError> {
        let body: CinemasBody =
            self.get_body(&format!("cinemas/with-event/until/{}", self.until), "ro_RO").await?;
        Ok(decode_each::<RawCinema>("cinema", body.cinemas)
            .into_iter()
            .filter_map(RawCinema::into_cinema)
            .collect())
    }

    async fn list_dates(&self, cinema_id: i64) -> Result<Vec<String>, UpstreamError> {
        let body: DatesBody = self
            .get_body(&format!("dates/in-cinema/{}/until/{}", cinema_id, self.until), "en_GB")
            .await?;
        Ok(body.dates)
    }

    async fn list_film_events(
        &self,
        cinema_id: i64,
        date: &str,
    ) -> Result<FilmListing, UpstreamError> {
        let body: FilmEventsBody = self
            .get_body(&format!("film-events/in-cinema/{}/at-date/{}", cinema_id, date), "en_GB")
            .await?;
        Ok(body.into_listing())
    }
}

/// Attribute tags arrive as a JSON array, as a string holding a JSON array,
/// or as junk. Junk becomes an empty list; this never fails.
pub fn normalize_attributes(value: &Value) -> Vec<String> {
    fn strings(items: &[Value]) -> Vec<String> {
        items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
    }

    match value {
        Value::Array(items) => strings(items),
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Array(items)) => strings(&items),
            _ => {
                debug!(value = %encoded, "attribute string is not a JSON array");
                Vec::new()
            },
        },
        Value::Null => Vec::new(),
        other => {
            warn!(value = %other, "unexpected attribute shape");
            Vec::new()
        },
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    body: T,
}

#[derive(Debug, Deserialize)]
struct CinemasBody {
    #[serde(default)]
    cinemas: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct DatesBody {
    #[serde(default)]
    dates: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FilmEventsBody {
    #[serde(default)]
    films: Vec<Value>,
    #[serde(default)]
    events: Vec<Value>,
}

impl FilmEventsBody {
    fn into_listing(self) -> FilmListing {
        FilmListing {
            films: decode_each::<RawFilm>("film", self.films)
                .into_iter()
                .map(RawFilm::into_movie)
                .collect(),
            events: decode_each::<RawEvent>("event", self.events)
                .into_iter()
                .filter_map(RawEvent::into_event)
                .collect(),
        }
    }
}

/// Decodes records one by one; a malformed record is logged and dropped
/// without taking its siblings with it.
fn decode_each<T: DeserializeOwned>(kind: &'static str, records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|raw| {
            let id = raw.get("id").map(Value::to_string).unwrap_or_default();
            match serde_json::from_value::<T>(raw) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(kind, id = %id, error = %err, "skipping malformed record");
                    None
                },
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCinema {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    group_id: Option<String>,
    display_name: Option<String>,
    link: Option<String>,
    image_url: Option<String>,
    address: Option<String>,
    booking_url: Option<String>,
    block_online_sales: Option<bool>,
    block_online_sales_until: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl RawCinema {
    fn into_cinema(self) -> Option<Cinema> {
        let Ok(external_id) = self.id.trim().parse::<i64>() else {
            warn!(id = %self.id, "skipping cinema with non-numeric id");
            return None;
        };

        Some(Cinema {
            external_id,
            group_id: self.group_id.unwrap_or_default(),
            display_name: self.display_name.unwrap_or_default(),
            link: self.link.unwrap_or_default(),
            image_url: self.image_url.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            booking_url: self.booking_url,
            block_online_sales: self.block_online_sales.unwrap_or(false),
            block_online_sales_until: self
                .block_online_sales_until
                .as_deref()
                .and_then(parse_epoch_millis),
            latitude: self.latitude.unwrap_or_default(),
            longitude: self.longitude.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFilm {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    name: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_f64")]
    length: Option<f64>,
    poster_link: Option<String>,
    video_link: Option<String>,
    link: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_f64")]
    weight: Option<f64>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    release_year: Option<String>,
    release_date: Option<String>,
    #[serde(default)]
    attribute_ids: Value,
}

impl RawFilm {
    fn into_movie(self) -> Movie {
        Movie {
            attribute_ids: normalize_attributes(&self.attribute_ids),
            external_id: self.id,
            name: self.name.unwrap_or_default(),
            length: self.length.unwrap_or_default().round() as i32,
            poster_link: self.poster_link.unwrap_or_default(),
            video_link: self.video_link,
            link: self.link.unwrap_or_default(),
            weight: self.weight.unwrap_or_default(),
            release_year: self.release_year,
            release_date: self.release_date.unwrap_or_default(),
            imdb_id: None,
            description: None,
            tmdb_popularity: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(deserialize_with = "string_or_number")]
    film_id: String,
    #[serde(deserialize_with = "string_or_number")]
    cinema_id: String,
    business_day: Option<String>,
    event_date_time: Option<String>,
    #[serde(default)]
    attribute_ids: Value,
    booking_link: Option<String>,
    secondary_booking_link: Option<String>,
    presentation_code: Option<String>,
    sold_out: Option<bool>,
    auditorium: Option<String>,
    auditorium_tiny_name: Option<String>,
}

impl RawEvent {
    fn into_event(self) -> Option<MovieEvent> {
        let Ok(cinema_external_id) = self.cinema_id.trim().parse::<i64>() else {
            warn!(event = %self.id, cinema_id = %self.cinema_id, "skipping event with non-numeric cinema id");
            return None;
        };

        Some(MovieEvent {
            attributes: normalize_attributes(&self.attribute_ids),
            external_id: self.id,
            film_external_id: self.film_id,
            cinema_external_id,
            business_day: self.business_day.unwrap_or_default(),
            event_date_time: self.event_date_time.unwrap_or_default(),
            booking_link: self.booking_link.unwrap_or_default(),
            secondary_booking_link: self.secondary_booking_link,
            presentation_code: self.presentation_code.unwrap_or_default(),
            sold_out: self.sold_out.unwrap_or(false),
            auditorium: self.auditorium.unwrap_or_default(),
            auditorium_tiny_name: self.auditorium_tiny_name.unwrap_or_default(),
        })
    }
}

/// Accepts RFC 3339 timestamps and offset-less local datetimes (read as UTC).
fn parse_epoch_millis(raw: &str) -> Option<i64> {
    if let Ok(ts) = raw.parse::<Timestamp>() {
        return Some(ts.as_millisecond());
    }
    match raw.parse::<DateTime>().and_then(|dt| dt.to_zoned(TimeZone::UTC)) {
        Ok(zoned) => Some(zoned.timestamp().as_millisecond()),
        Err(err) => {
            warn!(value = %raw, error = %err, "unparseable blockOnlineSalesUntil");
            None
        },
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(v: StringOrNumber) -> Self {
        match v {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(d).map(String::from)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(d)?.map(String::from))
}

/// Numbers sometimes arrive quoted. Unparseable text reads as absent.
fn opt_lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(d)?
        .and_then(|v| String::from(v).trim().parse::<f64>().ok()))
}
