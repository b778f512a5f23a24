use sea_orm::entity::prelude::*;

use super::AttributeList;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movie_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub external_id: String,
    pub film_external_id: String,
    pub cinema_external_id: i64,
    pub business_day: String,
    pub event_date_time: String,
    #[sea_orm(column_type = "Json")]
    pub attributes: AttributeList,
    pub booking_link: String,
    pub secondary_booking_link: Option<String>,
    pub presentation_code: String,
    pub sold_out: bool,
    pub auditorium: String,
    pub auditorium_tiny_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
