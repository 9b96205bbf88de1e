use bson::oid::ObjectId;
use bson::{doc, Document};
use mongodb::options::{ClientOptions, FindOptions, UpdateOptions};
use mongodb::{Client, ClientSession, Collection, Database};
use rocket::futures::TryStreamExt;
use serde::de::DeserializeOwned;

use super::ArtStore;
use crate::config::Config;
use crate::data::cart::{
    EnrolledClass, SelectedClass, ENROLLED_CLASS_COLLECTION_NAME, SELECTED_CLASS_COLLECTION_NAME,
};
use crate::data::class::{
    Class, ClassStatus, ClassUpdate, CLASS_COLLECTION_NAME, CLASS_POPULARITY_FIELD,
};
use crate::data::payment::{PaymentRecord, PaymentWrites, PAYMENT_COLLECTION_NAME};
use crate::data::teacher::{Teacher, TEACHER_COLLECTION_NAME, TEACHER_POPULARITY_FIELD};
use crate::data::user::{UserProfile, USER_COLLECTION_NAME};
use crate::data::{DeleteResult, InsertResult, UpdateResult};
use crate::error::StoreError;
use crate::role::Role;

#[inline]
fn by_id(id: ObjectId) -> Document {
    doc! { "_id": id }
}

#[inline]
fn by_email(email: &str) -> Document {
    doc! { "email": email }
}

/// Sorting only applies to limited listings, matching how the catalog is
/// browsed: "top N" or "everything".
fn popular_options(field: &str, limit: i64) -> Option<FindOptions> {
    if limit <= 0 {
        return None;
    }

    Some(
        FindOptions::builder()
            .sort(doc! { field: -1 })
            .limit(limit)
            .build(),
    )
}

async fn collect<T>(
    collection: Collection<T>,
    filter: impl Into<Option<Document>>,
    options: impl Into<Option<FindOptions>>,
) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let cursor = collection.find(filter, options).await?;
    Ok(cursor.try_collect().await?)
}

#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, db: Database) -> MongoStore {
        MongoStore { client, db }
    }

    /// Connects a pooled client and checks the deployment answers a ping.
    pub async fn connect(config: &Config) -> Result<MongoStore, StoreError> {
        let mut options = ClientOptions::parse(config.mongodb_uri()).await?;
        options.max_pool_size = Some(config.max_pool_size);
        options.app_name = Some("artzone-backend".to_string());

        let client = Client::with_options(options)?;

        tracing::info!("Using MongoDB database: {}", config.mongodb_db);
        let db = client.database(config.mongodb_db.as_str());

        client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        tracing::info!("Pinged MongoDB deployment.");

        Ok(MongoStore::new(client, db))
    }

    fn users(&self) -> Collection<UserProfile> {
        self.db.collection(USER_COLLECTION_NAME)
    }

    fn teachers(&self) -> Collection<Teacher> {
        self.db.collection(TEACHER_COLLECTION_NAME)
    }

    fn classes(&self) -> Collection<Class> {
        self.db.collection(CLASS_COLLECTION_NAME)
    }

    fn selections(&self) -> Collection<SelectedClass> {
        self.db.collection(SELECTED_CLASS_COLLECTION_NAME)
    }

    fn enrollments(&self) -> Collection<EnrolledClass> {
        self.db.collection(ENROLLED_CLASS_COLLECTION_NAME)
    }

    fn payments(&self) -> Collection<PaymentRecord> {
        self.db.collection(PAYMENT_COLLECTION_NAME)
    }

    async fn set_class_fields(
        &self,
        id: ObjectId,
        fields: Document,
    ) -> Result<UpdateResult, StoreError> {
        Ok(self
            .classes()
            .update_one(by_id(id), doc! { "$set": fields }, None)
            .await?
            .into())
    }

    async fn write_payment(
        &self,
        writes: &PaymentWrites,
        session: &mut ClientSession,
    ) -> Result<DeleteResult, StoreError> {
        self.payments()
            .insert_one_with_session(&writes.payment, None, session)
            .await?;
        self.classes()
            .update_one_with_session(
                by_id(writes.class_id),
                doc! { "$set": { "seats": writes.seats, "enroled": writes.enroled } },
                None,
                session,
            )
            .await?;
        self.enrollments()
            .insert_one_with_session(&writes.enrollment, None, session)
            .await?;

        Ok(self
            .selections()
            .delete_one_with_session(by_id(writes.selected_id), None, session)
            .await?
            .into())
    }
}

#[rocket::async_trait]
impl ArtStore for MongoStore {
    async fn upsert_user(&self, profile: UserProfile) -> Result<UpdateResult, StoreError> {
        let update = doc! { "$set": profile.to_set_document()? };
        let options = UpdateOptions::builder().upsert(true).build();

        Ok(self
            .users()
            .update_one(by_email(&profile.email), update, options)
            .await?
            .into())
    }

    async fn find_user(&self, email: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.users().find_one(by_email(email), None).await?)
    }

    async fn list_users(&self) -> Result<Vec<UserProfile>, StoreError> {
        collect(self.users(), None, None).await
    }

    async fn set_role(&self, email: &str, role: Role) -> Result<UpdateResult, StoreError> {
        let update = doc! { "$set": { "role": bson::to_bson(&role)? } };

        Ok(self
            .users()
            .update_one(by_email(email), update, None)
            .await?
            .into())
    }

    async fn list_teachers(&self, limit: i64) -> Result<Vec<Teacher>, StoreError> {
        collect(
            self.teachers(),
            None,
            popular_options(TEACHER_POPULARITY_FIELD, limit),
        )
        .await
    }

    async fn list_classes(&self, limit: i64) -> Result<Vec<Class>, StoreError> {
        collect(
            self.classes(),
            None,
            popular_options(CLASS_POPULARITY_FIELD, limit),
        )
        .await
    }

    async fn insert_class(&self, class: Class) -> Result<InsertResult, StoreError> {
        Ok(self.classes().insert_one(class, None).await?.into())
    }

    async fn classes_by_teacher(&self, email: &str) -> Result<Vec<Class>, StoreError> {
        collect(self.classes(), doc! { "teacher_email": email }, None).await
    }

    async fn find_class(&self, id: ObjectId) -> Result<Option<Class>, StoreError> {
        Ok(self.classes().find_one(by_id(id), None).await?)
    }

    async fn update_class(
        &self,
        id: ObjectId,
        update: ClassUpdate,
    ) -> Result<UpdateResult, StoreError> {
        self.set_class_fields(id, update.to_set_document()).await
    }

    async fn set_class_status(
        &self,
        id: ObjectId,
        status: ClassStatus,
    ) -> Result<UpdateResult, StoreError> {
        self.set_class_fields(id, doc! { "status": bson::to_bson(&status)? })
            .await
    }

    async fn set_class_feedback(
        &self,
        id: ObjectId,
        feedback: String,
    ) -> Result<UpdateResult, StoreError> {
        self.set_class_fields(id, doc! { "feedback": feedback }).await
    }

    async fn set_class_seats(
        &self,
        id: ObjectId,
        seats: i64,
        enroled: i64,
    ) -> Result<UpdateResult, StoreError> {
        self.set_class_fields(id, doc! { "seats": seats, "enroled": enroled })
            .await
    }

    async fn delete_class(&self, id: ObjectId) -> Result<DeleteResult, StoreError> {
        Ok(self.classes().delete_one(by_id(id), None).await?.into())
    }

    async fn insert_selection(&self, item: SelectedClass) -> Result<InsertResult, StoreError> {
        Ok(self.selections().insert_one(item, None).await?.into())
    }

    async fn selections_for(&self, email: &str) -> Result<Vec<SelectedClass>, StoreError> {
        collect(self.selections(), by_email(email), None).await
    }

    async fn delete_selection(&self, id: ObjectId) -> Result<DeleteResult, StoreError> {
        Ok(self.selections().delete_one(by_id(id), None).await?.into())
    }

    async fn insert_enrollment(&self, item: EnrolledClass) -> Result<InsertResult, StoreError> {
        Ok(self.enrollments().insert_one(item, None).await?.into())
    }

    async fn enrollments_for(&self, email: &str) -> Result<Vec<EnrolledClass>, StoreError> {
        collect(self.enrollments(), by_email(email), None).await
    }

    async fn insert_payment(&self, record: PaymentRecord) -> Result<InsertResult, StoreError> {
        Ok(self.payments().insert_one(record, None).await?.into())
    }

    async fn payments_for(&self, email: &str) -> Result<Vec<PaymentRecord>, StoreError> {
        let newest_first = FindOptions::builder()
            .sort(doc! { "timestamp": -1 })
            .build();
        collect(self.payments(), by_email(email), newest_first).await
    }

    async fn pay_in_transaction(
        &self,
        writes: PaymentWrites,
    ) -> Result<DeleteResult, StoreError> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        match self.write_payment(&writes, &mut session).await {
            Ok(result) => {
                session.commit_transaction().await?;
                Ok(result)
            }
            Err(e) => {
                if let Err(abort) = session.abort_transaction().await {
                    tracing::warn!("unable to abort payment transaction: {}", abort);
                }
                Err(e)
            }
        }
    }
}
