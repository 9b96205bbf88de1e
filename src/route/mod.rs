use bson::oid::ObjectId;
use rocket::http::Status;
use rocket::{Build, Request, Rocket, Route};

pub mod cart;
pub mod catalog;
pub mod class;
pub mod index;
pub mod payment;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

use cart::*;
use catalog::*;
use class::*;
use index::*;
use payment::*;
use users::*;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    data::{
        cart::{EnrolledClass, SelectedClass},
        class::{Class, ClassStatus, ClassUpdate, FeedbackUpdate, StatusUpdate},
        payment::{PaymentBundle, PaymentRecord, SeatUpdate},
        teacher::Teacher,
        user::{RoleUpdate, UserProfile},
        DeleteResult, InsertResult, UpdateResult,
    },
    intent::{IntentRequest, IntentResponse},
    resp::{
        jwt::doc::JWTAuth,
        problem::{problems, Problem},
    },
    role::Role,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        root,
        issue_token,
        student_upsert,
        student_get,
        user_upsert,
        user_get,
        user_list,
        user_set_role,
        teacher_list,
        class_list,
        class_create,
        class_list_by_teacher,
        class_get,
        class_update,
        class_set_status,
        class_set_feedback,
        class_delete,
        select_class,
        selected_list,
        selected_delete,
        enrolled_list,
        create_payment_intent,
        payment_history_add,
        payment_history_list,
        payment_complete
    ),
    components(schemas(
        Role,
        UserProfile,
        RoleUpdate,
        Teacher,
        Class,
        ClassStatus,
        ClassUpdate,
        StatusUpdate,
        FeedbackUpdate,
        SelectedClass,
        EnrolledClass,
        PaymentRecord,
        SeatUpdate,
        PaymentBundle,
        IntentRequest,
        IntentResponse,
        TokenResponse,
        InsertResult,
        UpdateResult,
        DeleteResult,
        Problem
    )),
    modifiers(&JWTAuth)
)]
pub struct ApiDoc;

/// Parses a record id taken from a request path.
pub fn parse_id(id: &str) -> Result<ObjectId, Problem> {
    ObjectId::parse_str(id).map_err(|_| problems::bad_id(id))
}

#[catch(default)]
fn default_catcher(status: Status, _: &Request) -> Problem {
    match status.code {
        400 | 422 => problems::parse_problem(),
        _ => Problem::new_untyped(status, status.reason().unwrap_or("Unknown error.")),
    }
}

pub fn api() -> Vec<Route> {
    routes![
        root,
        issue_token,
        student_upsert,
        student_get,
        user_upsert,
        user_get,
        user_list,
        user_set_role,
        teacher_list,
        class_list,
        class_create,
        class_list_by_teacher,
        class_get,
        class_update,
        class_set_status,
        class_set_feedback,
        class_delete,
        select_class,
        selected_list,
        selected_delete,
        enrolled_list,
        create_payment_intent,
        payment_history_add,
        payment_history_list,
        payment_complete
    ]
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/", api())
        .mount(
            "/",
            SwaggerUi::new("/swagger/<_..>").url("/openapi.json", ApiDoc::openapi()),
        )
        .register("/", catchers![default_catcher])
}
