use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

pub mod cinema;
pub mod movie;
pub mod movie_event;

/// Ordered tag list stored as a JSON array column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct AttributeList(pub Vec<String>);
