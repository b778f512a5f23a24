use sea_orm::entity::prelude::*;

use super::AttributeList;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub external_id: String,
    pub name: String,
    pub length: i32,
    pub poster_link: String,
    pub video_link: Option<String>,
    pub link: String,
    #[sea_orm(column_type = "Double")]
    pub weight: f64,
    pub release_year: Option<String>,
    pub release_date: String,
    #[sea_orm(column_type = "Json")]
    pub attribute_ids: AttributeList,
    pub imdb_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Double", nullable)]
    pub tmdb_popularity: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
