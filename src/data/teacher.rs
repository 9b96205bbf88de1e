use bson::oid::ObjectId;
use bson::Document;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::util::object_id;

pub static TEACHER_COLLECTION_NAME: &str = "teachers";

/// Field popular teacher listings are sorted by.
pub const TEACHER_POPULARITY_FIELD: &str = "students";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Teacher {
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "object_id::deserialize"
    )]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Number of enrolled students.
    #[serde(default)]
    pub students: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fields: Document,
}

impl Teacher {
    pub fn new(name: impl ToString, students: i64) -> Teacher {
        Teacher {
            id: None,
            name: name.to_string(),
            subject: None,
            students,
            image: None,
            fields: Document::new(),
        }
    }
}
