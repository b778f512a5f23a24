use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cinemas::Table)
                    .if_not_exists()
                    .col(pk_auto(Cinemas::Id))
                    .col(big_integer(Cinemas::ExternalId))
                    .col(string(Cinemas::GroupId))
                    .col(string(Cinemas::DisplayName))
                    .col(string(Cinemas::Link))
                    .col(string(Cinemas::ImageUrl))
                    .col(string(Cinemas::Address))
                    .col(string_null(Cinemas::BookingUrl))
                    .col(boolean(Cinemas::BlockOnlineSales))
                    .col(big_integer_null(Cinemas::BlockOnlineSalesUntil))
                    .col(double(Cinemas::Latitude))
                    .col(double(Cinemas::Longitude))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cinemas_external_id")
                    .table(Cinemas::Table)
                    .col(Cinemas::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(pk_auto(Movies::Id))
                    .col(string(Movies::ExternalId))
                    .col(string(Movies::Name))
                    .col(integer(Movies::Length))
                    .col(string(Movies::PosterLink))
                    .col(string_null(Movies::VideoLink))
                    .col(string(Movies::Link))
                    .col(double(Movies::Weight))
                    .col(string_null(Movies::ReleaseYear))
                    .col(string(Movies::ReleaseDate))
                    .col(json(Movies::AttributeIds))
                    .col(string_null(Movies::ImdbId))
                    .col(text_null(Movies::Description))
                    .col(double_null(Movies::TmdbPopularity))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_external_id")
                    .table(Movies::Table)
                    .col(Movies::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieEvents::Table)
                    .if_not_exists()
                    .col(pk_auto(MovieEvents::Id))
                    .col(string(MovieEvents::ExternalId))
                    .col(string(MovieEvents::FilmExternalId))
                    .col(big_integer(MovieEvents::CinemaExternalId))
                    .col(string(MovieEvents::BusinessDay))
                    .col(string(MovieEvents::EventDateTime))
                    .col(json(MovieEvents::Attributes))
                    .col(string(MovieEvents::BookingLink))
                    .col(string_null(MovieEvents::SecondaryBookingLink))
                    .col(string(MovieEvents::PresentationCode))
                    .col(boolean(MovieEvents::SoldOut))
                    .col(string(MovieEvents::Auditorium))
                    .col(string(MovieEvents::AuditoriumTinyName))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_events_external_id")
                    .table(MovieEvents::Table)
                    .col(MovieEvents::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MovieEvents::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Cinemas::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Cinemas {
    Table,
    Id,
    ExternalId,
    GroupId,
    DisplayName,
    Link,
    ImageUrl,
    Address,
    BookingUrl,
    BlockOnlineSales,
    BlockOnlineSalesUntil,
    Latitude,
    Longitude,
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    ExternalId,
    Name,
    Length,
    PosterLink,
    VideoLink,
    Link,
    Weight,
    ReleaseYear,
    ReleaseDate,
    AttributeIds,
    ImdbId,
    Description,
    TmdbPopularity,
}

#[derive(DeriveIden)]
enum MovieEvents {
    Table,
    Id,
    ExternalId,
    FilmExternalId,
    CinemaExternalId,
    BusinessDay,
    EventDateTime,
    Attributes,
    BookingLink,
    SecondaryBookingLink,
    PresentationCode,
    SoldOut,
    Auditorium,
    AuditoriumTinyName,
}
