use bson::Bson;
use serde::Serialize;
use utoipa::ToSchema;

pub mod cart;
pub mod class;
pub mod payment;
pub mod store;
pub mod teacher;
pub mod user;

/// Outcome of a single-document insert.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    #[schema(value_type = String)]
    pub inserted_id: Bson,
}

impl InsertResult {
    pub fn new(inserted_id: impl Into<Bson>) -> InsertResult {
        InsertResult {
            acknowledged: true,
            inserted_id: inserted_id.into(),
        }
    }
}

/// Outcome of a single-document update or upsert.
#[derive(Debug, Clone, PartialEq, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    #[schema(value_type = Option<String>)]
    pub upserted_id: Option<Bson>,
}

impl UpdateResult {
    pub fn new(matched_count: u64, modified_count: u64, upserted_id: Option<Bson>) -> Self {
        UpdateResult {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_count: upserted_id.is_some() as u64,
            upserted_id,
        }
    }
}

/// Outcome of a single-document delete.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteResult {
    pub fn new(deleted_count: u64) -> DeleteResult {
        DeleteResult {
            acknowledged: true,
            deleted_count,
        }
    }
}

impl From<mongodb::results::InsertOneResult> for InsertResult {
    fn from(value: mongodb::results::InsertOneResult) -> Self {
        InsertResult::new(value.inserted_id)
    }
}

impl From<mongodb::results::UpdateResult> for UpdateResult {
    fn from(value: mongodb::results::UpdateResult) -> Self {
        UpdateResult::new(value.matched_count, value.modified_count, value.upserted_id)
    }
}

impl From<mongodb::results::DeleteResult> for DeleteResult {
    fn from(value: mongodb::results::DeleteResult) -> Self {
        DeleteResult::new(value.deleted_count)
    }
}
