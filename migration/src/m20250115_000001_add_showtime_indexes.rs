use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_movies_release_date")
                    .table(Movies::Table)
                    .col(Movies::ReleaseDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_tmdb_popularity")
                    .table(Movies::Table)
                    .col(Movies::TmdbPopularity)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_events_business_day")
                    .table(MovieEvents::Table)
                    .col(MovieEvents::BusinessDay)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_events_film")
                    .table(MovieEvents::Table)
                    .col(MovieEvents::FilmExternalId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_events_cinema")
                    .table(MovieEvents::Table)
                    .col(MovieEvents::CinemaExternalId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_events_day_cinema")
                    .table(MovieEvents::Table)
                    .col(MovieEvents::BusinessDay)
                    .col(MovieEvents::CinemaExternalId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_movie_events_day_cinema",
            "idx_movie_events_cinema",
            "idx_movie_events_film",
            "idx_movie_events_business_day",
            "idx_movies_tmdb_popularity",
            "idx_movies_release_date",
        ] {
            manager.drop_index(Index::drop().name(name).to_owned()).await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    ReleaseDate,
    TmdbPopularity,
}

#[derive(DeriveIden)]
enum MovieEvents {
    Table,
    BusinessDay,
    FilmExternalId,
    CinemaExternalId,
}
