//! Cart and enrollment flow.
//!
//! A student moves a class through `none -> selected -> enrolled`, or back
//! from `selected` to `none` by removing the cart entry. Paying writes to four
//! collections; how those writes relate to each other is a deployment choice
//! ([Consistency]).
//!
//! Seat and enrollment counters are taken from the client as they are.
//! Nothing compares them against the class capacity or the stored counters,
//! so concurrent payments for one class overwrite each other's counters.

use std::fmt::{Display, Formatter};
use std::future::Future;

use bson::oid::ObjectId;
use rocket::http::Status;
use thiserror::Error;
use tracing_futures::Instrument;

use crate::data::cart::SelectedClass;
use crate::data::payment::{PaymentBundle, PaymentWrites};
use crate::data::store::ArtStore;
use crate::data::{DeleteResult, InsertResult};
use crate::error::StoreError;
use crate::resp::problem::{problems, Problem};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Consistency {
    /// Independent writes, applied in order. A failed write leaves the
    /// earlier ones in place.
    BestEffort,
    /// All writes in one store transaction.
    Transactional,
}

impl Default for Consistency {
    fn default() -> Self {
        Consistency::BestEffort
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStep {
    RecordPayment,
    UpdateSeats,
    Enroll,
    ClearSelection,
}

impl Display for PaymentStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStep::RecordPayment => write!(f, "record payment"),
            PaymentStep::UpdateSeats => write!(f, "update class seats"),
            PaymentStep::Enroll => write!(f, "insert enrollment"),
            PaymentStep::ClearSelection => write!(f, "remove cart entry"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("malformed {kind} id '{id}'")]
    BadId {
        kind: &'static str,
        id: String,
        completed: Vec<PaymentStep>,
    },
    #[error("payment step '{step}' failed")]
    Step {
        step: PaymentStep,
        completed: Vec<PaymentStep>,
        #[source]
        source: StoreError,
    },
    #[error("payment transaction aborted")]
    Aborted(#[source] StoreError),
}

impl EnrollmentError {
    /// Steps that stayed applied when the payment failed.
    pub fn completed(&self) -> &[PaymentStep] {
        match self {
            EnrollmentError::BadId { completed, .. } | EnrollmentError::Step { completed, .. } => {
                completed
            }
            EnrollmentError::Aborted(_) => &[],
        }
    }
}

impl From<EnrollmentError> for Problem {
    fn from(e: EnrollmentError) -> Self {
        let completed = e.completed().to_vec();

        let mut problem = match &e {
            EnrollmentError::BadId { id, .. } => problems::bad_id(id),
            EnrollmentError::Step { step, source, .. } => {
                tracing::error!("payment step '{}' failed: {}", step, source);
                Problem::new_untyped(Status::InternalServerError, "Payment partially recorded.")
                    .insert("failedStep", step)
                    .detail(format!(
                        "'{}' failed; earlier steps were kept and not rolled back.",
                        step
                    ))
                    .to_owned()
            }
            EnrollmentError::Aborted(source) => {
                tracing::error!("payment transaction aborted: {}", source);
                Problem::new_untyped(Status::InternalServerError, "Payment was not recorded.")
                    .detail("The payment transaction was aborted; nothing was written.")
                    .to_owned()
            }
        };

        problem.insert("completedSteps", completed);
        problem
    }
}

fn parse_id(
    kind: &'static str,
    id: &str,
    completed: &[PaymentStep],
) -> Result<ObjectId, EnrollmentError> {
    ObjectId::parse_str(id).map_err(|_| EnrollmentError::BadId {
        kind,
        id: id.to_string(),
        completed: completed.to_vec(),
    })
}

async fn run_step<T>(
    step: PaymentStep,
    completed: &mut Vec<PaymentStep>,
    write: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, EnrollmentError> {
    match write
        .instrument(tracing::debug_span!("payment_step", %step))
        .await
    {
        Ok(it) => {
            completed.push(step);
            Ok(it)
        }
        Err(source) => {
            if !completed.is_empty() {
                tracing::warn!(
                    "payment left partially applied; completed steps: {:?}",
                    completed
                );
            }
            Err(EnrollmentError::Step {
                step,
                completed: completed.clone(),
                source,
            })
        }
    }
}

/// Puts a class into the student's cart. The same class can be selected
/// more than once.
pub async fn select(
    store: &dyn ArtStore,
    item: SelectedClass,
) -> Result<InsertResult, StoreError> {
    tracing::debug!("{} selected class {}", item.email, item.class_id);
    store.insert_selection(item).await
}

/// Removes a cart entry by its id.
pub async fn remove_selection(
    store: &dyn ArtStore,
    id: ObjectId,
) -> Result<DeleteResult, StoreError> {
    store.delete_selection(id).await
}

/// Records a payment and enrolls the student.
///
/// Writes, in order: the payment record, the class `seats`/`enroled`
/// counters, the enrollment and finally the removal of the cart entry. The
/// result of that removal is returned.
pub async fn pay(
    store: &dyn ArtStore,
    mut bundle: PaymentBundle,
    consistency: Consistency,
) -> Result<DeleteResult, EnrollmentError> {
    // both records are always new; a resent id would collide with the first
    bundle.payment.id = None;
    bundle.enrollment.id = None;

    tracing::info!(
        "{} paying {} for class {} ({:?})",
        bundle.payment.email,
        bundle.payment.amount,
        bundle.class.id,
        consistency
    );

    match consistency {
        Consistency::BestEffort => pay_best_effort(store, bundle).await,
        Consistency::Transactional => pay_transactional(store, bundle).await,
    }
}

async fn pay_best_effort(
    store: &dyn ArtStore,
    bundle: PaymentBundle,
) -> Result<DeleteResult, EnrollmentError> {
    let PaymentBundle {
        payment,
        class,
        enrollment,
        selected_id,
    } = bundle;
    let mut completed = Vec::with_capacity(4);

    run_step(
        PaymentStep::RecordPayment,
        &mut completed,
        store.insert_payment(payment),
    )
    .await?;

    // ids are parsed right before use, so a bad one only stops the steps after it
    let class_id = parse_id("class", &class.id, &completed)?;
    run_step(
        PaymentStep::UpdateSeats,
        &mut completed,
        store.set_class_seats(class_id, class.seats, class.enroled),
    )
    .await?;

    run_step(
        PaymentStep::Enroll,
        &mut completed,
        store.insert_enrollment(enrollment),
    )
    .await?;

    let selected_id = parse_id("cart entry", &selected_id, &completed)?;
    run_step(
        PaymentStep::ClearSelection,
        &mut completed,
        store.delete_selection(selected_id),
    )
    .await
}

async fn pay_transactional(
    store: &dyn ArtStore,
    bundle: PaymentBundle,
) -> Result<DeleteResult, EnrollmentError> {
    let writes = PaymentWrites {
        class_id: parse_id("class", &bundle.class.id, &[])?,
        selected_id: parse_id("cart entry", &bundle.selected_id, &[])?,
        seats: bundle.class.seats,
        enroled: bundle.class.enroled,
        payment: bundle.payment,
        enrollment: bundle.enrollment,
    };

    store
        .pay_in_transaction(writes)
        .await
        .map_err(EnrollmentError::Aborted)
}
