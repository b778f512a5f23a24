use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::debug;

use crate::{
    entities::{AttributeList, cinema, movie, movie_event},
    error::AppResult,
    models::{Cinema, Movie, MovieEnrichment, MovieEvent},
};

/// Catalog storage. Every write is an upsert keyed on the upstream external
/// id, so replaying a crawl never creates duplicate rows.
#[derive(Clone)]
pub struct CatalogStore {
    db: DatabaseConnection,
}

impl CatalogStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[cfg(test)]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn upsert_cinemas(&self, cinemas: &[Cinema]) -> AppResult<()> {
        let txn = self.db.begin().await?;
        for c in cinemas {
            upsert_cinema(&txn, c).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    pub async fn upsert_movies(&self, movies: &[Movie]) -> AppResult<()> {
        let txn = self.db.begin().await?;
        for m in movies {
            upsert_movie(&txn, m).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    /// Events are written in sequential transactions of `batch_size` rows.
    pub async fn upsert_events(&self, events: &[MovieEvent], batch_size: usize) -> AppResult<()> {
        for (n, batch) in events.chunks(batch_size.max(1)).enumerate() {
            let txn = self.db.begin().await?;
            for e in batch {
                upsert_event(&txn, e).await?;
            }
            txn.commit().await?;
            debug!(batch = n, size = batch.len(), "upserted event batch");
        }
        Ok(())
    }

    /// Overwrites only the enrichment columns. Returns false when no stored
    /// movie has this external id.
    pub async fn apply_enrichment(
        &self,
        external_id: &str,
        enrichment: &MovieEnrichment,
    ) -> AppResult<bool> {
        let res = movie::Entity::update_many()
            .col_expr(movie::Column::ImdbId, Expr::value(enrichment.imdb_id.clone()))
            .col_expr(movie::Column::Description, Expr::value(enrichment.description.clone()))
            .col_expr(movie::Column::TmdbPopularity, Expr::value(enrichment.tmdb_popularity))
            .col_expr(movie::Column::PosterLink, Expr::value(enrichment.poster_link.clone()))
            .filter(movie::Column::ExternalId.eq(external_id))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }

    pub async fn all_cinemas(&self) -> AppResult<Vec<Cinema>> {
        let rows = cinema::Entity::find().order_by_asc(cinema::Column::Id).all(&self.db).await?;
        Ok(rows.into_iter().map(Cinema::from).collect())
    }

    pub async fn all_movies(&self) -> AppResult<Vec<Movie>> {
        let rows = movie::Entity::find().order_by_asc(movie::Column::Id).all(&self.db).await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    pub async fn cinema(&self, external_id: i64) -> AppResult<Option<Cinema>> {
        let row = cinema::Entity::find()
            .filter(cinema::Column::ExternalId.eq(external_id))
            .one(&self.db)
            .await?;
        Ok(row.map(Cinema::from))
    }

    pub async fn movie(&self, external_id: &str) -> AppResult<Option<Movie>> {
        let row = movie::Entity::find()
            .filter(movie::Column::ExternalId.eq(external_id))
            .one(&self.db)
            .await?;
        Ok(row.map(Movie::from))
    }

    pub async fn cinemas_by_ids(&self, external_ids: &[i64]) -> AppResult<Vec<Cinema>> {
        if external_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = cinema::Entity::find()
            .filter(cinema::Column::ExternalId.is_in(external_ids.iter().copied()))
            .order_by_asc(cinema::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Cinema::from).collect())
    }

    pub async fn movies_by_ids(&self, external_ids: &[String]) -> AppResult<Vec<Movie>> {
        if external_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = movie::Entity::find()
            .filter(movie::Column::ExternalId.is_in(external_ids.iter().cloned()))
            .order_by_asc(movie::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    /// Events whose business day is on or after `day` (`YYYY-MM-DD`).
    pub async fn events_from(&self, day: &str) -> AppResult<Vec<MovieEvent>> {
        let rows = movie_event::Entity::find()
            .filter(movie_event::Column::BusinessDay.gte(day))
            .order_by_asc(movie_event::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(MovieEvent::from).collect())
    }

    pub async fn film_events(&self, film_external_id: &str) -> AppResult<Vec<MovieEvent>> {
        let rows = movie_event::Entity::find()
            .filter(movie_event::Column::FilmExternalId.eq(film_external_id))
            .order_by_asc(movie_event::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(MovieEvent::from).collect())
    }

    pub async fn film_events_from(
        &self,
        film_external_id: &str,
        day: &str,
    ) -> AppResult<Vec<MovieEvent>> {
        let rows = movie_event::Entity::find()
            .filter(movie_event::Column::FilmExternalId.eq(film_external_id))
            .filter(movie_event::Column::BusinessDay.gte(day))
            .order_by_asc(movie_event::Column::EventDateTime)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(MovieEvent::from).collect())
    }

    /// One cinema's events for a single business day, earliest first.
    pub async fn cinema_events_on(
        &self,
        cinema_external_id: i64,
        day: &str,
    ) -> AppResult<Vec<MovieEvent>> {
        let rows = movie_event::Entity::find()
            .filter(movie_event::Column::BusinessDay.eq(day))
            .filter(movie_event::Column::CinemaExternalId.eq(cinema_external_id))
            .order_by_asc(movie_event::Column::EventDateTime)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(MovieEvent::from).collect())
    }
}

async fn upsert_cinema<C: ConnectionTrait>(conn: &C, c: &Cinema) -> Result<(), DbErr> {
    let model = cinema::ActiveModel {
        id: Default::default(),
        external_id: Set(c.external_id),
        group_id: Set(c.group_id.clone()),
        display_name: Set(c.display_name.clone()),
        link: Set(c.link.clone()),
        image_url: Set(c.image_url.clone()),
        address: Set(c.address.clone()),
        booking_url: Set(c.booking_url.clone()),
        block_online_sales: Set(c.block_online_sales),
        block_online_sales_until: Set(c.block_online_sales_until),
        latitude: Set(c.latitude),
        longitude: Set(c.longitude),
    };

    cinema::Entity::insert(model)
        .on_conflict(
            OnConflict::column(cinema::Column::ExternalId)
                .update_columns([
                    cinema::Column::GroupId,
                    cinema::Column::DisplayName,
                    cinema::Column::Link,
                    cinema::Column::ImageUrl,
                    cinema::Column::Address,
                    cinema::Column::BookingUrl,
                    cinema::Column::BlockOnlineSales,
                    cinema::Column::BlockOnlineSalesUntil,
                    cinema::Column::Latitude,
                    cinema::Column::Longitude,
                ])
                .to_owned(),
        )
        .exec(conn)
        .await?;

    Ok(())
}

// Enrichment columns are only written on first insert.
async fn upsert_movie<C: ConnectionTrait>(conn: &C, m: &Movie) -> Result<(), DbErr> {
    let model = movie::ActiveModel {
        id: Default::default(),
        external_id: Set(m.external_id.clone()),
        name: Set(m.name.clone()),
        length: Set(m.length),
        poster_link: Set(m.poster_link.clone()),
        video_link: Set(m.video_link.clone()),
        link: Set(m.link.clone()),
        weight: Set(m.weight),
        release_year: Set(m.release_year.clone()),
        release_date: Set(m.release_date.clone()),
        attribute_ids: Set(AttributeList(m.attribute_ids.clone())),
        imdb_id: Set(m.imdb_id.clone()),
        description: Set(m.description.clone()),
        tmdb_popularity: Set(m.tmdb_popularity),
    };

    movie::Entity::insert(model)
        .on_conflict(
            OnConflict::column(movie::Column::ExternalId)
                .update_columns([
                    movie::Column::Name,
                    movie::Column::Length,
                    movie::Column::PosterLink,
                    movie::Column::VideoLink,
                    movie::Column::Link,
                    movie::Column::Weight,
                    movie::Column::ReleaseYear,
                    movie::Column::ReleaseDate,
                    movie::Column::AttributeIds,
                ])
                .to_owned(),
        )
        .exec(conn)
        .await?;

    Ok(())
}

async fn upsert_event<C: ConnectionTrait>(conn: &C, e: &MovieEvent) -> Result<(), DbErr> {
    let model = movie_event::ActiveModel {
        id: Default::default(),
        external_id: Set(e.external_id.clone()),
        film_external_id: Set(e.film_external_id.clone()),
        cinema_external_id: Set(e.cinema_external_id),
        business_day: Set(e.business_day.clone()),
        event_date_time: Set(e.event_date_time.clone()),
        attributes: Set(AttributeList(e.attributes.clone())),
        booking_link: Set(e.booking_link.clone()),
        secondary_booking_link: Set(e.secondary_booking_link.clone()),
        presentation_code: Set(e.presentation_code.clone()),
        sold_out: Set(e.sold_out),
        auditorium: Set(e.auditorium.clone()),
        auditorium_tiny_name: Set(e.auditorium_tiny_name.clone()),
    };

    movie_event::Entity::insert(model)
        .on_conflict(
            OnConflict::column(movie_event::Column::ExternalId)
                .update_columns([
                    movie_event::Column::FilmExternalId,
                    movie_event::Column::CinemaExternalId,
                    movie_event::Column::BusinessDay,
                    movie_event::Column::EventDateTime,
                    movie_event::Column::Attributes,
                    movie_event::Column::BookingLink,
                    movie_event::Column::SecondaryBookingLink,
                    movie_event::Column::PresentationCode,
                    movie_event::Column::SoldOut,
                    movie_event::Column::Auditorium,
                    movie_event::Column::AuditoriumTinyName,
                ])
                .to_owned(),
        )
        .exec(conn)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::testing::{cinema, event, film, memory_store};

    async fn counts(store: &CatalogStore) -> (u64, u64, u64) {
        (
            cinema::Entity::find().count(store.db()).await.unwrap(),
            movie::Entity::find().count(store.db()).await.unwrap(),
            movie_event::Entity::find().count(store.db()).await.unwrap(),
        )
    }

    #[tokio::test]
    async fn repeated_upserts_do_not_duplicate_rows() {
        let store = memory_store().await;
        let cinemas = vec![cinema(1), cinema(2)];
        let movies = vec![film("F1", "X"), film("F2", "Y")];
        let events = vec![event("E1", "F1", 1), event("E2", "F2", 2)];

        for _ in 0..2 {
            store.upsert_cinemas(&cinemas).await.unwrap();
            store.upsert_movies(&movies).await.unwrap();
            store.upsert_events(&events, 100).await.unwrap();
        }

        assert_eq!(counts(&store).await, (2, 2, 2));
        assert_eq!(store.all_movies().await.unwrap(), movies);
        assert_eq!(store.all_cinemas().await.unwrap(), cinemas);
    }

    #[tokio::test]
    async fn overlapping_upsert_patches_existing_rows() {
        let store = memory_store().await;
        store.upsert_events(&[event("E1", "F1", 1)], 100).await.unwrap();

        let mut updated = event("E1", "F1", 1);
        updated.sold_out = true;
        store.upsert_events(&[updated, event("E2", "F1", 1)], 100).await.unwrap();

        let events = store.film_events("F1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().find(|e| e.external_id == "E1").unwrap().sold_out);
    }

    #[tokio::test]
    async fn events_are_written_across_batches() {
        let store = memory_store().await;
        let events: Vec<_> = (0..250).map(|n| event(&format!("E{n}"), "F1", 1)).collect();

        store.upsert_events(&events, 100).await.unwrap();

        assert_eq!(counts(&store).await.2, 250);
    }

    #[tokio::test]
    async fn recrawl_keeps_enrichment() {
        let store = memory_store().await;
        store.upsert_movies(&[film("F1", "X")]).await.unwrap();

        let enrichment = MovieEnrichment {
            imdb_id: Some("tt0000001".into()),
            description: Some("A film.".into()),
            tmdb_popularity: Some(42.5),
            poster_link: "https://image.tmdb.org/t/p/w500/x.jpg".into(),
        };
        assert!(store.apply_enrichment("F1", &enrichment).await.unwrap());

        let mut renamed = film("F1", "X (restored)");
        renamed.poster_link = "https://cdn/new.jpg".into();
        store.upsert_movies(&[renamed]).await.unwrap();

        let stored = store.movie("F1").await.unwrap().unwrap();
        assert_eq!(stored.name, "X (restored)");
        assert_eq!(stored.poster_link, "https://cdn/new.jpg");
        assert_eq!(stored.imdb_id.as_deref(), Some("tt0000001"));
        assert_eq!(stored.tmdb_popularity, Some(42.5));
    }

    #[tokio::test]
    async fn enrichment_of_unknown_movie_reports_false() {
        let store = memory_store().await;
        let enrichment = MovieEnrichment {
            imdb_id: None,
            description: None,
            tmdb_popularity: None,
            poster_link: String::new(),
        };
        assert!(!store.apply_enrichment("missing", &enrichment).await.unwrap());
    }

    #[tokio::test]
    async fn attribute_lists_round_trip_in_order() {
        let store = memory_store().await;
        let mut m = film("F1", "X");
        m.attribute_ids = vec!["3D".into(), "DUB".into(), "2D".into()];
        store.upsert_movies(&[m]).await.unwrap();

        let stored = store.movie("F1").await.unwrap().unwrap();
        assert_eq!(stored.attribute_ids, vec!["3D", "DUB", "2D"]);
    }

    #[tokio::test]
    async fn day_filters_use_business_day() {
        let store = memory_store().await;
        let mut late = event("E1", "F1", 1);
        late.business_day = "2025-01-01".into();
        late.event_date_time = "2025-01-02T01:30:00".into();
        let mut early = event("E2", "F1", 1);
        early.business_day = "2025-01-01".into();
        early.event_date_time = "2025-01-01T12:00:00".into();
        let mut next = event("E3", "F1", 1);
        next.business_day = "2025-01-02".into();
        store.upsert_events(&[late, early, next], 100).await.unwrap();

        let today = store.cinema_events_on(1, "2025-01-01").await.unwrap();
        let ids: Vec<_> = today.iter().map(|e| e.external_id.as_str()).collect();
        assert_eq!(ids, vec!["E2", "E1"]);

        assert_eq!(store.events_from("2025-01-02").await.unwrap().len(), 1);
    }
}
