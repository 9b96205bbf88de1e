use bson::oid::ObjectId;
use bson::Document;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::util::object_id;

pub static CLASS_COLLECTION_NAME: &str = "classes";

/// Field popular class listings are sorted by.
pub const CLASS_POPULARITY_FIELD: &str = "enroled";

/// Fields a class update is never allowed to touch.
const PROTECTED_FIELDS: [&str; 5] = ["_id", "teacher_email", "enroled", "status", "feedback"];

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClassStatus {
    Pending,
    Approved,
    Denied,
}

impl Default for ClassStatus {
    fn default() -> Self {
        ClassStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Class {
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "object_id::deserialize"
    )]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub teacher_email: String,
    #[serde(default)]
    pub title: String,
    /// Seats still available.
    #[serde(default)]
    pub seats: i64,
    #[serde(default)]
    pub enroled: i64,
    #[serde(default)]
    pub status: ClassStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fields: Document,
}

impl Class {
    pub fn new(teacher_email: impl ToString, title: impl ToString, seats: i64) -> Class {
        Class {
            id: None,
            teacher_email: teacher_email.to_string(),
            title: title.to_string(),
            seats,
            enroled: 0,
            status: ClassStatus::Pending,
            feedback: None,
            fields: Document::new(),
        }
    }
}

/// Replacement for the fields a teacher may edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassUpdate {
    pub title: String,
    pub seats: i64,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fields: Document,
}

impl ClassUpdate {
    /// Extra fields of the update, without the ones owned by other operations.
    pub fn editable_fields(&self) -> Document {
        self.fields
            .iter()
            .filter(|(key, _)| !PROTECTED_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn to_set_document(&self) -> Document {
        let mut set = self.editable_fields();
        set.insert("title", self.title.clone());
        set.insert("seats", self.seats);
        set
    }

    pub fn apply(&self, class: &mut Class) {
        class.title = self.title.clone();
        class.seats = self.seats;
        for (key, value) in self.editable_fields() {
            class.fields.insert(key, value);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdate {
    pub status: ClassStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeedbackUpdate {
    #[serde(alias = "feedback")]
    pub feadback: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_classes_default_to_pending() {
        let class: Class = serde_json::from_value(json!({
            "teacher_email": "teacher@x.com",
            "title": "Watercolor basics",
            "seats": 12,
            "price": 40.5,
        }))
        .expect("valid class");

        assert_eq!(class.status, ClassStatus::Pending);
        assert_eq!(class.enroled, 0);
        assert_eq!(class.fields.get_f64("price").ok(), Some(40.5));
    }

    #[test]
    fn update_cannot_touch_protected_fields() {
        let update: ClassUpdate = serde_json::from_value(json!({
            "title": "Ink",
            "seats": 3,
            "enroled": 99,
            "status": "approved",
            "image": "ink.png",
        }))
        .expect("valid update");

        let set = update.to_set_document();
        assert!(!set.contains_key("enroled"));
        assert!(!set.contains_key("status"));
        assert_eq!(set.get_str("image").ok(), Some("ink.png"));
        assert_eq!(set.get_i64("seats").ok(), Some(3));
    }

    #[test]
    fn feedback_accepts_both_spellings() {
        let wire: FeedbackUpdate =
            serde_json::from_value(json!({ "feadback": "Needs a syllabus" })).expect("wire name");
        let fixed: FeedbackUpdate =
            serde_json::from_value(json!({ "feedback": "Needs a syllabus" })).expect("alias");

        assert_eq!(wire.feadback, fixed.feadback);
    }
}
