use bson::oid::ObjectId;
use bson::Document;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::util::object_id;

pub static SELECTED_CLASS_COLLECTION_NAME: &str = "selectedClasses";
pub static ENROLLED_CLASS_COLLECTION_NAME: &str = "enrolledClasses";

/// A class a student picked but hasn't paid for yet. Carries a snapshot of
/// the class fields the client wants to show in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SelectedClass {
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "object_id::deserialize"
    )]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub email: String,
    #[serde(rename = "classId")]
    pub class_id: String,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fields: Document,
}

impl SelectedClass {
    pub fn new(email: impl ToString, class_id: impl ToString) -> SelectedClass {
        SelectedClass {
            id: None,
            email: email.to_string(),
            class_id: class_id.to_string(),
            fields: Document::new(),
        }
    }
}

/// Confirmed association of a student with a class, written once payment
/// went through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EnrolledClass {
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "object_id::deserialize"
    )]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub email: String,
    #[serde(rename = "classId")]
    pub class_id: String,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fields: Document,
}

impl EnrolledClass {
    pub fn new(email: impl ToString, class_id: impl ToString) -> EnrolledClass {
        EnrolledClass {
            id: None,
            email: email.to_string(),
            class_id: class_id.to_string(),
            fields: Document::new(),
        }
    }
}
