use rocket::serde::json::Json;
use rocket::State;

use super::parse_id;
use crate::data::class::{Class, ClassUpdate, FeedbackUpdate, StatusUpdate};
use crate::data::store::Store;
use crate::data::{DeleteResult, InsertResult, UpdateResult};
use crate::resp::document::DocJson;
use crate::resp::jwt::IdentityClaims;
use crate::resp::problem::{problems, Problem};

/// Adds a class on behalf of its teacher. The token must identify the same
/// email the class is filed under.
#[utoipa::path(
    request_body = Class,
    responses(
        (status = 200, description = "Insert outcome", body = InsertResult),
        (status = 401, description = "Missing or invalid bearer token", body = Problem),
        (status = 403, description = "Class belongs to another teacher", body = Problem)
    ),
    security(("jwt" = []))
)]
#[post("/add_class", format = "application/json", data = "<class>")]
#[tracing::instrument]
pub async fn class_create(
    class: Json<Class>,
    auth: Result<IdentityClaims, Problem>,
    store: &State<Store>,
) -> Result<DocJson<InsertResult>, Problem> {
    let identity = auth?;

    if identity.email() != Some(class.teacher_email.as_str()) {
        tracing::warn!(
            "{:?} tried adding a class for {}",
            identity.email(),
            class.teacher_email
        );
        return Err(problems::forbidden(
            "Classes can only be added by their own teacher.",
        ));
    }

    let mut class = class.into_inner();
    class.id = None;

    Ok(DocJson(store.insert_class(class).await?))
}

#[utoipa::path(
    params(("email", description = "Teacher email")),
    responses((status = 200, description = "Classes of the teacher", body = Vec<Class>))
)]
#[get("/classes/<email>")]
#[tracing::instrument]
pub async fn class_list_by_teacher(
    email: &str,
    store: &State<Store>,
) -> Result<DocJson<Vec<Class>>, Problem> {
    Ok(DocJson(store.classes_by_teacher(email).await?))
}

#[utoipa::path(
    params(("id", description = "Class id")),
    responses(
        (status = 200, description = "Class, or null", body = Option<Class>),
        (status = 400, description = "Malformed id", body = Problem),
        (status = 401, description = "Missing or invalid bearer token", body = Problem)
    ),
    security(("jwt" = []))
)]
#[get("/myClasses/<id>")]
#[tracing::instrument]
pub async fn class_get(
    id: &str,
    auth: Result<IdentityClaims, Problem>,
    store: &State<Store>,
) -> Result<DocJson<Option<Class>>, Problem> {
    auth?;
    let id = parse_id(id)?;

    Ok(DocJson(store.find_class(id).await?))
}

#[utoipa::path(
    request_body = ClassUpdate,
    params(("id", description = "Class id")),
    responses(
        (status = 200, description = "Update outcome", body = UpdateResult),
        (status = 400, description = "Malformed id", body = Problem),
        (status = 401, description = "Missing or invalid bearer token", body = Problem)
    ),
    security(("jwt" = []))
)]
#[put("/classes/<id>", format = "application/json", data = "<update>")]
#[tracing::instrument]
pub async fn class_update(
    id: &str,
    update: Json<ClassUpdate>,
    auth: Result<IdentityClaims, Problem>,
    store: &State<Store>,
) -> Result<DocJson<UpdateResult>, Problem> {
    auth?;
    let id = parse_id(id)?;

    Ok(DocJson(store.update_class(id, update.into_inner()).await?))
}

#[utoipa::path(
    request_body = StatusUpdate,
    params(("id", description = "Class id")),
    responses(
        (status = 200, description = "Update outcome", body = UpdateResult),
        (status = 400, description = "Malformed id", body = Problem),
        (status = 401, description = "Missing or invalid bearer token", body = Problem)
    ),
    security(("jwt" = []))
)]
#[patch("/classes/<id>/status", format = "application/json", data = "<update>")]
#[tracing::instrument]
pub async fn class_set_status(
    id: &str,
    update: Json<StatusUpdate>,
    auth: Result<IdentityClaims, Problem>,
    store: &State<Store>,
) -> Result<DocJson<UpdateResult>, Problem> {
    let identity = auth?;
    let id = parse_id(id)?;
    tracing::info!("{:?} set class {} to {:?}", identity.email(), id, update.status);

    Ok(DocJson(store.set_class_status(id, update.status).await?))
}

#[utoipa::path(
    request_body = FeedbackUpdate,
    params(("id", description = "Class id")),
    responses(
        (status = 200, description = "Update outcome", body = UpdateResult),
        (status = 400, description = "Malformed id", body = Problem)
    )
)]
#[patch("/feadback/classes/<id>", format = "application/json", data = "<update>")]
#[tracing::instrument]
pub async fn class_set_feedback(
    id: &str,
    update: Json<FeedbackUpdate>,
    store: &State<Store>,
) -> Result<DocJson<UpdateResult>, Problem> {
    let id = parse_id(id)?;

    Ok(DocJson(
        store
            .set_class_feedback(id, update.into_inner().feadback)
            .await?,
    ))
}

#[utoipa::path(
    params(("id", description = "Class id")),
    responses(
        (status = 200, description = "Delete outcome", body = DeleteResult),
        (status = 400, description = "Malformed id", body = Problem)
    )
)]
#[delete("/classes/<id>")]
#[tracing::instrument]
pub async fn class_delete(
    id: &str,
    store: &State<Store>,
) -> Result<DocJson<DeleteResult>, Problem> {
    let id = parse_id(id)?;

    Ok(DocJson(store.delete_class(id).await?))
}

#[cfg(test)]
mod class_endpoints {
    use bson::oid::ObjectId;
    use rocket::http::{Method, Status};
    use serde_json::{json, Value};

    use crate::data::store::ArtStore;
    use crate::route::testing::TestApp;

    const TEACHER: &str = "t@x.com";

    async fn create_class(app: &TestApp) -> String {
        let (status, body) = app
            .send_json(
                Method::Post,
                "/add_class",
                json!({
                    "teacher_email": TEACHER,
                    "title": "Watercolor",
                    "seats": 12,
                    "price": 20
                }),
                Some(TEACHER),
            )
            .await;
        assert_eq!(status, Status::Ok, "an ok response");

        body["insertedId"]
            .as_str()
            .expect("inserted id as hex string")
            .to_string()
    }

    #[rocket::async_test]
    async fn teacher_adds_own_class() {
        let app = TestApp::new().await;
        let id = create_class(&app).await;

        let (status, class) = app
            .get_json(&format!("/myClasses/{}", id), Some(TEACHER))
            .await;

        assert_eq!(status, Status::Ok);
        assert_eq!(class["title"], json!("Watercolor"));
        assert_eq!(class["status"], json!("pending"));
        assert_eq!(class["price"], json!(20));
    }

    #[rocket::async_test]
    async fn class_for_other_teacher_is_forbidden_and_not_stored() {
        let app = TestApp::new().await;

        let (status, body) = app
            .send_json(
                Method::Post,
                "/add_class",
                json!({ "teacher_email": "other@x.com", "title": "Forged", "seats": 1 }),
                Some(TEACHER),
            )
            .await;

        assert_eq!(status, Status::Forbidden);
        assert_eq!(body["error"], json!(true));
        assert_eq!(body["message"], json!("forbidden access"));
        assert!(app
            .store
            .classes_by_teacher("other@x.com")
            .await
            .expect("store readable")
            .is_empty());
    }

    #[rocket::async_test]
    async fn adding_class_needs_token() {
        let app = TestApp::new().await;

        let (status, _) = app
            .send_json(
                Method::Post,
                "/add_class",
                json!({ "teacher_email": TEACHER, "title": "Anon", "seats": 1 }),
                None,
            )
            .await;

        assert_eq!(status, Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn classes_listed_by_teacher() {
        let app = TestApp::new().await;
        create_class(&app).await;
        create_class(&app).await;

        let (status, body) = app.get_json(&format!("/classes/{}", TEACHER), None).await;

        assert_eq!(status, Status::Ok);
        assert_eq!(body.as_array().map(Vec::len), Some(2));
    }

    #[rocket::async_test]
    async fn update_keeps_protected_fields() {
        let app = TestApp::new().await;
        let id = create_class(&app).await;

        let (status, result) = app
            .send_json(
                Method::Put,
                &format!("/classes/{}", id),
                json!({ "title": "Gouache", "seats": 8, "status": "approved", "enroled": 99 }),
                Some(TEACHER),
            )
            .await;
        assert_eq!(status, Status::Ok);
        assert_eq!(result["modifiedCount"], json!(1));

        let (_, class) = app
            .get_json(&format!("/myClasses/{}", id), Some(TEACHER))
            .await;
        assert_eq!(class["title"], json!("Gouache"));
        assert_eq!(class["seats"], json!(8));
        assert_eq!(class["status"], json!("pending"));
        assert_eq!(class["enroled"], json!(0));
    }

    #[rocket::async_test]
    async fn status_and_feedback_are_set() {
        let app = TestApp::new().await;
        let id = create_class(&app).await;

        let (status, _) = app
            .send_json(
                Method::Patch,
                &format!("/classes/{}/status", id),
                json!({ "status": "denied" }),
                Some("admin@x.com"),
            )
            .await;
        assert_eq!(status, Status::Ok);

        let (status, _) = app
            .send_json(
                Method::Patch,
                &format!("/feadback/classes/{}", id),
                json!({ "feadback": "Add a syllabus." }),
                None,
            )
            .await;
        assert_eq!(status, Status::Ok);

        let (_, class) = app
            .get_json(&format!("/myClasses/{}", id), Some(TEACHER))
            .await;
        assert_eq!(class["status"], json!("denied"));
        assert_eq!(class["feedback"], json!("Add a syllabus."));
    }

    #[rocket::async_test]
    async fn missing_class_is_null() {
        let app = TestApp::new().await;

        let (status, body) = app
            .get_json(&format!("/myClasses/{}", ObjectId::new().to_hex()), Some(TEACHER))
            .await;

        assert_eq!(status, Status::Ok);
        assert_eq!(body, Value::Null);
    }

    #[rocket::async_test]
    async fn malformed_id_is_bad_request() {
        let app = TestApp::new().await;

        let (status, body) = app.get_json("/myClasses/not-an-id", Some(TEACHER)).await;
        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["id"], json!("not-an-id"));

        let response = app.client.delete("/classes/not-an-id").dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn delete_removes_class() {
        let app = TestApp::new().await;
        let id = create_class(&app).await;

        let response = app
            .client
            .delete(format!("/classes/{}", id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let result: Value = response.into_json().await.expect("invalid response json");
        assert_eq!(result["deletedCount"], json!(1));

        let (_, class) = app
            .get_json(&format!("/myClasses/{}", id), Some(TEACHER))
            .await;
        assert_eq!(class, Value::Null);
    }
}
