use bson::oid::ObjectId;
use bson::Document;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::role::Role;
use crate::util::object_id;

pub static USER_COLLECTION_NAME: &str = "users";

/// A student or user profile, keyed by email.
///
/// Everything besides `email` and `role` is kept as sent by the client
/// (display name, photo URL, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "object_id::deserialize"
    )]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub email: String,
    /// Left untouched on upsert when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fields: Document,
}

impl UserProfile {
    pub fn new(email: impl ToString) -> UserProfile {
        UserProfile {
            id: None,
            email: email.to_string(),
            role: None,
            fields: Document::new(),
        }
    }

    /// Applies `update` the way a `$set` of its fields would. Returns whether
    /// anything changed.
    pub fn merge(&mut self, update: &UserProfile) -> bool {
        let before = self.clone();

        if update.role.is_some() {
            self.role = update.role;
        }
        for (key, value) in update.fields.iter() {
            self.fields.insert(key.clone(), value.clone());
        }

        *self != before
    }

    /// Fields an upsert writes. `_id` is owned by the store and never set.
    pub fn to_set_document(&self) -> Result<Document, bson::ser::Error> {
        let mut set = bson::to_document(self)?;
        set.remove("_id");
        Ok(set)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleUpdate {
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_profile_keeps_extra_fields() {
        let profile: UserProfile = serde_json::from_value(json!({
            "email": "student@x.com",
            "name": "Ana",
            "photo": "https://img.example/ana.png",
        }))
        .expect("valid profile");

        assert_eq!(profile.role, None);
        assert_eq!(profile.fields.get_str("name").ok(), Some("Ana"));
    }

    #[test]
    fn merge_keeps_role_when_update_has_none() {
        let mut stored = UserProfile::new("admin@x.com");
        stored.role = Some(Role::Admin);

        let mut update = UserProfile::new("admin@x.com");
        update.fields.insert("name", "Root");

        assert!(stored.merge(&update));
        assert_eq!(stored.role, Some(Role::Admin));
        assert!(!stored.merge(&update), "second merge changes nothing");
    }

    #[test]
    fn upsert_never_sets_client_id() {
        let mut profile = UserProfile::new("student@x.com");
        profile.id = Some(ObjectId::new());
        profile.fields.insert("name", "Ana");

        let set = profile.to_set_document().expect("profile serializes");

        assert!(!set.contains_key("_id"));
        assert_eq!(set.get_str("email").ok(), Some("student@x.com"));
        assert_eq!(set.get_str("name").ok(), Some("Ana"));
    }
}
