use rocket::serde::json::Json;
use rocket::State;

use super::parse_id;
use crate::data::cart::{EnrolledClass, SelectedClass};
use crate::data::store::Store;
use crate::data::{DeleteResult, InsertResult};
use crate::enrollment;
use crate::resp::document::DocJson;
use crate::resp::jwt::IdentityClaims;
use crate::resp::problem::Problem;

#[utoipa::path(
    request_body = SelectedClass,
    responses(
        (status = 200, description = "Insert outcome", body = InsertResult),
        (status = 401, description = "Missing or invalid bearer token", body = Problem)
    ),
    security(("jwt" = []))
)]
#[post("/select_classes", format = "application/json", data = "<item>")]
#[tracing::instrument]
pub async fn select_class(
    item: Json<SelectedClass>,
    auth: Result<IdentityClaims, Problem>,
    store: &State<Store>,
) -> Result<DocJson<InsertResult>, Problem> {
    auth?;
    let mut item = item.into_inner();
    item.id = None;

    Ok(DocJson(enrollment::select(store.inner().as_ref(), item).await?))
}

#[utoipa::path(
    params(("email", description = "Student email")),
    responses(
        (status = 200, description = "Cart entries", body = Vec<SelectedClass>),
        (status = 401, description = "Missing or invalid bearer token", body = Problem)
    ),
    security(("jwt" = []))
)]
#[get("/selectedItems/<email>")]
#[tracing::instrument]
pub async fn selected_list(
    email: &str,
    auth: Result<IdentityClaims, Problem>,
    store: &State<Store>,
) -> Result<DocJson<Vec<SelectedClass>>, Problem> {
    auth?;
    Ok(DocJson(store.selections_for(email).await?))
}

#[utoipa::path(
    params(("id", description = "Cart entry id")),
    responses(
        (status = 200, description = "Delete outcome", body = DeleteResult),
        (status = 400, description = "Malformed id", body = Problem)
    )
)]
#[delete("/selectedItems/<id>")]
#[tracing::instrument]
pub async fn selected_delete(
    id: &str,
    store: &State<Store>,
) -> Result<DocJson<DeleteResult>, Problem> {
    let id = parse_id(id)?;

    Ok(DocJson(
        enrollment::remove_selection(store.inner().as_ref(), id).await?,
    ))
}

#[utoipa::path(
    params(("email", description = "Student email")),
    responses(
        (status = 200, description = "Enrollments", body = Vec<EnrolledClass>),
        (status = 401, description = "Missing or invalid bearer token", body = Problem)
    ),
    security(("jwt" = []))
)]
#[get("/enrolled_classes/<email>")]
#[tracing::instrument]
pub async fn enrolled_list(
    email: &str,
    auth: Result<IdentityClaims, Problem>,
    store: &State<Store>,
) -> Result<DocJson<Vec<EnrolledClass>>, Problem> {
    auth?;
    Ok(DocJson(store.enrollments_for(email).await?))
}

#[cfg(test)]
mod cart_endpoints {
    use rocket::http::{Method, Status};
    use serde_json::json;

    use crate::route::testing::TestApp;

    const STUDENT: &str = "student@x.com";

    #[rocket::async_test]
    async fn selected_class_shows_in_cart() {
        let app = TestApp::new().await;

        let (status, inserted) = app
            .send_json(
                Method::Post,
                "/select_classes",
                json!({ "email": STUDENT, "classId": "C1", "title": "Ink" }),
                Some(STUDENT),
            )
            .await;
        assert_eq!(status, Status::Ok, "an ok response");
        assert!(inserted["insertedId"].is_string());

        let (status, cart) = app
            .get_json(&format!("/selectedItems/{}", STUDENT), Some(STUDENT))
            .await;
        assert_eq!(status, Status::Ok);
        let cart = cart.as_array().cloned().unwrap_or_default();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0]["classId"], json!("C1"));
        assert_eq!(cart[0]["title"], json!("Ink"));
    }

    #[rocket::async_test]
    async fn cart_requires_token() {
        let app = TestApp::new().await;

        let (status, _) = app
            .send_json(
                Method::Post,
                "/select_classes",
                json!({ "email": STUDENT, "classId": "C1" }),
                None,
            )
            .await;
        assert_eq!(status, Status::Unauthorized);

        let (status, body) = app
            .get_json(&format!("/selectedItems/{}", STUDENT), None)
            .await;
        assert_eq!(status, Status::Unauthorized);
        assert_eq!(body["message"], json!("unauthorized access"));
    }

    #[rocket::async_test]
    async fn duplicate_selection_is_kept() {
        let app = TestApp::new().await;
        let item = json!({ "email": STUDENT, "classId": "C1" });

        app.send_json(Method::Post, "/select_classes", item.clone(), Some(STUDENT))
            .await;
        app.send_json(Method::Post, "/select_classes", item, Some(STUDENT))
            .await;

        let (_, cart) = app
            .get_json(&format!("/selectedItems/{}", STUDENT), Some(STUDENT))
            .await;
        assert_eq!(cart.as_array().map(Vec::len), Some(2));
    }

    #[rocket::async_test]
    async fn removed_selection_leaves_cart() {
        let app = TestApp::new().await;
        let (_, inserted) = app
            .send_json(
                Method::Post,
                "/select_classes",
                json!({ "email": STUDENT, "classId": "C1" }),
                Some(STUDENT),
            )
            .await;
        let id = inserted["insertedId"].as_str().unwrap_or_default().to_string();

        let response = app
            .client
            .delete(format!("/selectedItems/{}", id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let (_, cart) = app
            .get_json(&format!("/selectedItems/{}", STUDENT), Some(STUDENT))
            .await;
        assert_eq!(cart, json!([]));
    }

    #[rocket::async_test]
    async fn enrollments_need_token() {
        let app = TestApp::new().await;

        let (status, _) = app
            .get_json(&format!("/enrolled_classes/{}", STUDENT), None)
            .await;
        assert_eq!(status, Status::Unauthorized);

        let (status, body) = app
            .get_json(&format!("/enrolled_classes/{}", STUDENT), Some(STUDENT))
            .await;
        assert_eq!(status, Status::Ok);
        assert_eq!(body, json!([]));
    }
}
