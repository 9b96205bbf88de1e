use std::sync::atomic::{AtomicUsize, Ordering};

use bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::ArtStore;
use crate::data::cart::{EnrolledClass, SelectedClass};
use crate::data::class::{Class, ClassStatus, ClassUpdate};
use crate::data::payment::{PaymentRecord, PaymentWrites};
use crate::data::teacher::Teacher;
use crate::data::user::UserProfile;
use crate::data::{DeleteResult, InsertResult, UpdateResult};
use crate::error::StoreError;
use crate::role::Role;

const NO_FAILURE: usize = usize::MAX;

#[derive(Debug, Clone, Default)]
struct Collections {
    users: Vec<UserProfile>,
    teachers: Vec<Teacher>,
    classes: Vec<Class>,
    selections: Vec<SelectedClass>,
    enrollments: Vec<EnrolledClass>,
    payments: Vec<PaymentRecord>,
}

fn top<T: Clone>(records: &[T], limit: i64, key: impl Fn(&T) -> i64) -> Vec<T> {
    let mut records = records.to_vec();
    if limit > 0 {
        // stable, so ties keep insertion order
        records.sort_by(|a, b| key(b).cmp(&key(a)));
        records.truncate(limit as usize);
    }
    records
}

fn remove_by_id<T>(
    records: &mut Vec<T>,
    id: ObjectId,
    get_id: impl Fn(&T) -> Option<ObjectId>,
) -> DeleteResult {
    match records.iter().position(|it| get_id(it) == Some(id)) {
        Some(index) => {
            records.remove(index);
            DeleteResult::new(1)
        }
        None => DeleteResult::new(0),
    }
}

impl Collections {
    fn update_class(&mut self, id: ObjectId, apply: impl FnOnce(&mut Class)) -> UpdateResult {
        match self.classes.iter_mut().find(|it| it.id == Some(id)) {
            Some(class) => {
                let before = class.clone();
                apply(class);
                UpdateResult::new(1, (*class != before) as u64, None)
            }
            None => UpdateResult::new(0, 0, None),
        }
    }

    fn insert_payment(&mut self, mut record: PaymentRecord) -> InsertResult {
        let id = *record.id.get_or_insert_with(ObjectId::new);
        self.payments.push(record);
        InsertResult::new(id)
    }

    fn insert_enrollment(&mut self, mut item: EnrolledClass) -> InsertResult {
        let id = *item.id.get_or_insert_with(ObjectId::new);
        self.enrollments.push(item);
        InsertResult::new(id)
    }

    fn set_class_seats(&mut self, id: ObjectId, seats: i64, enroled: i64) -> UpdateResult {
        self.update_class(id, |class| {
            class.seats = seats;
            class.enroled = enroled;
        })
    }

    fn delete_selection(&mut self, id: ObjectId) -> DeleteResult {
        remove_by_id(&mut self.selections, id, |it| it.id)
    }
}

/// Volatile [ArtStore] keeping every collection in process memory.
///
/// Writes can be made to fail on demand to exercise partial failures of
/// multi-write operations.
#[derive(Debug)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    writes_until_failure: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore {
            collections: RwLock::new(Collections::default()),
            writes_until_failure: AtomicUsize::new(NO_FAILURE),
        }
    }
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Lets `writes` more writes succeed and fails the one after.
    pub fn fail_after_writes(&self, writes: usize) {
        self.writes_until_failure.store(writes, Ordering::SeqCst);
    }

    /// Teachers have no write endpoint; they're seeded directly.
    pub async fn insert_teacher(&self, mut teacher: Teacher) -> ObjectId {
        let id = *teacher.id.get_or_insert_with(ObjectId::new);
        self.collections.write().await.teachers.push(teacher);
        id
    }

    fn check_write(&self) -> Result<(), StoreError> {
        let previous = self
            .writes_until_failure
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                NO_FAILURE => None,
                0 => Some(NO_FAILURE),
                left => Some(left - 1),
            });

        match previous {
            Ok(0) => Err(StoreError::Unavailable("injected write failure".to_string())),
            _ => Ok(()),
        }
    }
}

#[rocket::async_trait]
impl ArtStore for MemoryStore {
    async fn upsert_user(&self, profile: UserProfile) -> Result<UpdateResult, StoreError> {
        self.check_write()?;
        let mut collections = self.collections.write().await;

        if let Some(stored) = collections
            .users
            .iter_mut()
            .find(|it| it.email == profile.email)
        {
            let modified = stored.merge(&profile);
            return Ok(UpdateResult::new(1, modified as u64, None));
        }

        let id = ObjectId::new();
        collections.users.push(UserProfile {
            id: Some(id),
            ..profile
        });
        Ok(UpdateResult::new(0, 0, Some(id.into())))
    }

    async fn find_user(&self, email: &str) -> Result<Option<UserProfile>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.users.iter().find(|it| it.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserProfile>, StoreError> {
        Ok(self.collections.read().await.users.clone())
    }

    async fn set_role(&self, email: &str, role: Role) -> Result<UpdateResult, StoreError> {
        self.check_write()?;
        let mut collections = self.collections.write().await;

        Ok(match collections.users.iter_mut().find(|it| it.email == email) {
            Some(user) => {
                let modified = user.role != Some(role);
                user.role = Some(role);
                UpdateResult::new(1, modified as u64, None)
            }
            None => UpdateResult::new(0, 0, None),
        })
    }

    async fn list_teachers(&self, limit: i64) -> Result<Vec<Teacher>, StoreError> {
        let collections = self.collections.read().await;
        Ok(top(&collections.teachers, limit, |it| it.students))
    }

    async fn list_classes(&self, limit: i64) -> Result<Vec<Class>, StoreError> {
        let collections = self.collections.read().await;
        Ok(top(&collections.classes, limit, |it| it.enroled))
    }

    async fn insert_class(&self, mut class: Class) -> Result<InsertResult, StoreError> {
        self.check_write()?;
        let id = *class.id.get_or_insert_with(ObjectId::new);
        self.collections.write().await.classes.push(class);
        Ok(InsertResult::new(id))
    }

    async fn classes_by_teacher(&self, email: &str) -> Result<Vec<Class>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .classes
            .iter()
            .filter(|it| it.teacher_email == email)
            .cloned()
            .collect())
    }

    async fn find_class(&self, id: ObjectId) -> Result<Option<Class>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .classes
            .iter()
            .find(|it| it.id == Some(id))
            .cloned())
    }

    async fn update_class(
        &self,
        id: ObjectId,
        update: ClassUpdate,
    ) -> Result<UpdateResult, StoreError> {
        self.check_write()?;
        let mut collections = self.collections.write().await;
        Ok(collections.update_class(id, |class| update.apply(class)))
    }

    async fn set_class_status(
        &self,
        id: ObjectId,
        status: ClassStatus,
    ) -> Result<UpdateResult, StoreError> {
        self.check_write()?;
        let mut collections = self.collections.write().await;
        Ok(collections.update_class(id, |class| class.status = status))
    }

    async fn set_class_feedback(
        &self,
        id: ObjectId,
        feedback: String,
    ) -> Result<UpdateResult, StoreError> {
        self.check_write()?;
        let mut collections = self.collections.write().await;
        Ok(collections.update_class(id, |class| class.feedback = Some(feedback)))
    }

    async fn set_class_seats(
        &self,
        id: ObjectId,
        seats: i64,
        enroled: i64,
    ) -> Result<UpdateResult, StoreError> {
        self.check_write()?;
        let mut collections = self.collections.write().await;
        Ok(collections.set_class_seats(id, seats, enroled))
    }

    async fn delete_class(&self, id: ObjectId) -> Result<DeleteResult, StoreError> {
        self.check_write()?;
        let mut collections = self.collections.write().await;
        Ok(remove_by_id(&mut collections.classes, id, |it| it.id))
    }

    async fn insert_selection(&self, mut item: SelectedClass) -> Result<InsertResult, StoreError> {
        self.check_write()?;
        let id = *item.id.get_or_insert_with(ObjectId::new);
        self.collections.write().await.selections.push(item);
        Ok(InsertResult::new(id))
    }

    async fn selections_for(&self, email: &str) -> Result<Vec<SelectedClass>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .selections
            .iter()
            .filter(|it| it.email == email)
            .cloned()
            .collect())
    }

    async fn delete_selection(&self, id: ObjectId) -> Result<DeleteResult, StoreError> {
        self.check_write()?;
        Ok(self.collections.write().await.delete_selection(id))
    }

    async fn insert_enrollment(&self, item: EnrolledClass) -> Result<InsertResult, StoreError> {
        self.check_write()?;
        Ok(self.collections.write().await.insert_enrollment(item))
    }

    async fn enrollments_for(&self, email: &str) -> Result<Vec<EnrolledClass>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .enrollments
            .iter()
            .filter(|it| it.email == email)
            .cloned()
            .collect())
    }

    async fn insert_payment(&self, record: PaymentRecord) -> Result<InsertResult, StoreError> {
        self.check_write()?;
        Ok(self.collections.write().await.insert_payment(record))
    }

    async fn payments_for(&self, email: &str) -> Result<Vec<PaymentRecord>, StoreError> {
        let collections = self.collections.read().await;
        let mut payments: Vec<PaymentRecord> = collections
            .payments
            .iter()
            .filter(|it| it.email == email)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(payments)
    }

    async fn pay_in_transaction(
        &self,
        writes: PaymentWrites,
    ) -> Result<DeleteResult, StoreError> {
        let mut collections = self.collections.write().await;
        let mut staged = collections.clone();

        self.check_write()?;
        staged.insert_payment(writes.payment);
        self.check_write()?;
        staged.set_class_seats(writes.class_id, writes.seats, writes.enroled);
        self.check_write()?;
        staged.insert_enrollment(writes.enrollment);
        self.check_write()?;
        let result = staged.delete_selection(writes.selected_id);

        *collections = staged;
        Ok(result)
    }
}
