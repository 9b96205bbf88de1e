use std::sync::Arc;

use bson::oid::ObjectId;

use super::cart::{EnrolledClass, SelectedClass};
use super::class::{Class, ClassStatus, ClassUpdate};
use super::payment::{PaymentRecord, PaymentWrites};
use super::teacher::Teacher;
use super::user::UserProfile;
use super::{DeleteResult, InsertResult, UpdateResult};
use crate::error::StoreError;
use crate::role::Role;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Store shared by every request for the lifetime of the process.
pub type Store = Arc<dyn ArtStore>;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    MongoDB,
    /// Volatile store, for local development without a database.
    Memory,
}

impl Default for StoreKind {
    fn default() -> Self {
        StoreKind::MongoDB
    }
}

/// Document store operations used by the API.
///
/// Every write is a single-document operation and independent from all
/// others, except for [ArtStore::pay_in_transaction].
#[rocket::async_trait]
pub trait ArtStore: Send + Sync + std::fmt::Debug {
    /// Merges `profile` into the record with the same email, inserting it if
    /// none exists.
    async fn upsert_user(&self, profile: UserProfile) -> Result<UpdateResult, StoreError>;
    async fn find_user(&self, email: &str) -> Result<Option<UserProfile>, StoreError>;
    async fn list_users(&self) -> Result<Vec<UserProfile>, StoreError>;
    async fn set_role(&self, email: &str, role: Role) -> Result<UpdateResult, StoreError>;

    /// All teachers when `limit <= 0`, otherwise the `limit` teachers with
    /// most students.
    async fn list_teachers(&self, limit: i64) -> Result<Vec<Teacher>, StoreError>;
    /// All classes when `limit <= 0`, otherwise the `limit` most enroled.
    async fn list_classes(&self, limit: i64) -> Result<Vec<Class>, StoreError>;

    async fn insert_class(&self, class: Class) -> Result<InsertResult, StoreError>;
    async fn classes_by_teacher(&self, email: &str) -> Result<Vec<Class>, StoreError>;
    async fn find_class(&self, id: ObjectId) -> Result<Option<Class>, StoreError>;
    async fn update_class(
        &self,
        id: ObjectId,
        update: ClassUpdate,
    ) -> Result<UpdateResult, StoreError>;
    async fn set_class_status(
        &self,
        id: ObjectId,
        status: ClassStatus,
    ) -> Result<UpdateResult, StoreError>;
    async fn set_class_feedback(
        &self,
        id: ObjectId,
        feedback: String,
    ) -> Result<UpdateResult, StoreError>;
    async fn set_class_seats(
        &self,
        id: ObjectId,
        seats: i64,
        enroled: i64,
    ) -> Result<UpdateResult, StoreError>;
    async fn delete_class(&self, id: ObjectId) -> Result<DeleteResult, StoreError>;

    async fn insert_selection(&self, item: SelectedClass) -> Result<InsertResult, StoreError>;
    async fn selections_for(&self, email: &str) -> Result<Vec<SelectedClass>, StoreError>;
    async fn delete_selection(&self, id: ObjectId) -> Result<DeleteResult, StoreError>;

    async fn insert_enrollment(&self, item: EnrolledClass) -> Result<InsertResult, StoreError>;
    async fn enrollments_for(&self, email: &str) -> Result<Vec<EnrolledClass>, StoreError>;

    async fn insert_payment(&self, record: PaymentRecord) -> Result<InsertResult, StoreError>;
    /// Payments of a student, newest first.
    async fn payments_for(&self, email: &str) -> Result<Vec<PaymentRecord>, StoreError>;

    /// Performs all payment writes or none of them.
    async fn pay_in_transaction(&self, writes: PaymentWrites)
        -> Result<DeleteResult, StoreError>;
}
