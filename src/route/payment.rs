use rocket::serde::json::Json;
use rocket::State;

use crate::config::Config;
use crate::data::payment::{PaymentBundle, PaymentRecord};
use crate::data::store::Store;
use crate::data::{DeleteResult, InsertResult};
use crate::enrollment;
use crate::intent::{
    amount_in_minor_units, IntentRequest, IntentResponse, PaymentIntentParams, Payments,
};
use crate::resp::document::DocJson;
use crate::resp::jwt::IdentityClaims;
use crate::resp::problem::Problem;

/// Creates a card payment intent for `price` dollars.
#[utoipa::path(
    request_body = IntentRequest,
    responses(
        (status = 200, description = "Client secret of the new intent", body = IntentResponse),
        (status = 400, description = "Price isn't payable", body = Problem),
        (status = 502, description = "Payment provider failed", body = Problem)
    )
)]
#[post("/create_payment_intent", format = "application/json", data = "<request>")]
#[tracing::instrument]
pub async fn create_payment_intent(
    request: Json<IntentRequest>,
    payments: &State<Payments>,
) -> Result<Json<IntentResponse>, Problem> {
    let amount = amount_in_minor_units(request.price);
    let intent = payments
        .create_payment_intent(PaymentIntentParams::card(amount))
        .await?;

    Ok(Json(IntentResponse {
        client_secret: intent.client_secret,
    }))
}

#[utoipa::path(
    request_body = PaymentRecord,
    responses((status = 200, description = "Insert outcome", body = InsertResult))
)]
#[post("/payment_history", format = "application/json", data = "<record>")]
#[tracing::instrument]
pub async fn payment_history_add(
    record: Json<PaymentRecord>,
    store: &State<Store>,
) -> Result<DocJson<InsertResult>, Problem> {
    let mut record = record.into_inner();
    record.id = None;

    Ok(DocJson(store.insert_payment(record).await?))
}

#[utoipa::path(
    params(("email", description = "Student email")),
    responses(
        (status = 200, description = "Payments, newest first", body = Vec<PaymentRecord>),
        (status = 401, description = "Missing or invalid bearer token", body = Problem)
    ),
    security(("jwt" = []))
)]
#[get("/payment_history/<email>")]
#[tracing::instrument]
pub async fn payment_history_list(
    email: &str,
    auth: Result<IdentityClaims, Problem>,
    store: &State<Store>,
) -> Result<DocJson<Vec<PaymentRecord>>, Problem> {
    auth?;
    Ok(DocJson(store.payments_for(email).await?))
}

/// Records the payment, updates the class counters, enrolls the student and
/// clears the cart entry. Answers with the outcome of clearing the cart.
#[utoipa::path(
    request_body = PaymentBundle,
    responses(
        (status = 200, description = "Cart entry delete outcome", body = DeleteResult),
        (status = 400, description = "Malformed id in bundle", body = Problem),
        (status = 500, description = "A payment step failed", body = Problem)
    )
)]
#[post("/payment", format = "application/json", data = "<bundle>")]
#[tracing::instrument]
pub async fn payment_complete(
    bundle: Json<PaymentBundle>,
    store: &State<Store>,
    config: &State<Config>,
) -> Result<DocJson<DeleteResult>, Problem> {
    let result = enrollment::pay(
        store.inner().as_ref(),
        bundle.into_inner(),
        config.payment_consistency,
    )
    .await?;

    Ok(DocJson(result))
}

#[cfg(test)]
mod payment_endpoints {
    use bson::oid::ObjectId;
    use rocket::http::{Method, Status};
    use serde_json::{json, Value};

    use crate::config::Config;
    use crate::data::class::Class;
    use crate::data::store::ArtStore;
    use crate::enrollment::Consistency;
    use crate::route::testing::TestApp;

    const STUDENT: &str = "student@x.com";

    async fn class_with_selection(app: &TestApp) -> (ObjectId, String) {
        let inserted = app
            .store
            .insert_class(Class::new("t@x.com", "Ink", 10))
            .await
            .expect("class inserted");
        let class_id = inserted
            .inserted_id
            .as_object_id()
            .expect("object id");

        let (_, selected) = app
            .send_json(
                Method::Post,
                "/select_classes",
                json!({ "email": STUDENT, "classId": class_id.to_hex() }),
                Some(STUDENT),
            )
            .await;
        let selected_id = selected["insertedId"]
            .as_str()
            .expect("selection id")
            .to_string();

        (class_id, selected_id)
    }

    fn bundle(class_id: &str, selected_id: &str) -> Value {
        json!({
            "payment": { "email": STUDENT, "classId": class_id, "amount": 20.0 },
            "class": { "id": class_id, "seats": 9, "enroled": 1 },
            "enrollment": { "email": STUDENT, "classId": class_id },
            "selectedId": selected_id
        })
    }

    #[rocket::async_test]
    async fn intent_amount_is_in_cents() {
        let app = TestApp::new().await;

        let (status, body) = app
            .send_json(
                Method::Post,
                "/create_payment_intent",
                json!({ "price": 10.00 }),
                None,
            )
            .await;

        assert_eq!(status, Status::Ok, "an ok response");
        assert!(body["client_secret"].is_string());

        let intents = app.payments.intents().await;
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].amount, 1000);
        assert_eq!(intents[0].currency, "usd");
    }

    #[rocket::async_test]
    async fn declined_intent_is_bad_gateway() {
        let app = TestApp::new().await;
        app.payments.reject_with("card declined").await;

        let (status, problem) = app
            .send_json(
                Method::Post,
                "/create_payment_intent",
                json!({ "price": 10.00 }),
                None,
            )
            .await;

        assert_eq!(status, Status::BadGateway);
        assert_eq!(problem["status"], json!(502));
        assert!(app.payments.intents().await.is_empty());
    }

    #[rocket::async_test]
    async fn zero_price_is_rejected() {
        let app = TestApp::new().await;

        let (status, _) = app
            .send_json(
                Method::Post,
                "/create_payment_intent",
                json!({ "price": 0 }),
                None,
            )
            .await;

        assert_eq!(status, Status::BadRequest);
        assert!(app.payments.intents().await.is_empty());
    }

    #[rocket::async_test]
    async fn payment_enrolls_student() {
        let app = TestApp::new().await;
        let (class_id, selected_id) = class_with_selection(&app).await;

        let (status, result) = app
            .send_json(
                Method::Post,
                "/payment",
                bundle(&class_id.to_hex(), &selected_id),
                None,
            )
            .await;
        assert_eq!(status, Status::Ok, "an ok response");
        assert_eq!(result["deletedCount"], json!(1));

        let class = app
            .store
            .find_class(class_id)
            .await
            .expect("store readable")
            .expect("class exists");
        assert_eq!((class.seats, class.enroled), (9, 1));

        let (_, cart) = app
            .get_json(&format!("/selectedItems/{}", STUDENT), Some(STUDENT))
            .await;
        assert_eq!(cart, json!([]));

        let (_, enrolled) = app
            .get_json(&format!("/enrolled_classes/{}", STUDENT), Some(STUDENT))
            .await;
        assert_eq!(enrolled.as_array().map(Vec::len), Some(1));

        let (_, history) = app
            .get_json(&format!("/payment_history/{}", STUDENT), Some(STUDENT))
            .await;
        assert_eq!(history[0]["amount"], json!(20.0));
    }

    #[rocket::async_test]
    async fn best_effort_failure_reports_kept_steps() {
        let app = TestApp::new().await;
        let (class_id, selected_id) = class_with_selection(&app).await;
        app.store.fail_after_writes(2);

        let (status, problem) = app
            .send_json(
                Method::Post,
                "/payment",
                bundle(&class_id.to_hex(), &selected_id),
                None,
            )
            .await;

        assert_eq!(status, Status::InternalServerError);
        assert_eq!(problem["failedStep"], json!("enroll"));
        assert_eq!(problem["completedSteps"].as_array().map(Vec::len), Some(2));
        assert_eq!(
            app.store.payments_for(STUDENT).await.expect("store readable").len(),
            1
        );
    }

    #[rocket::async_test]
    async fn transactional_failure_writes_nothing() {
        let mut config = Config::default();
        config.payment_consistency = Consistency::Transactional;
        let app = TestApp::with_config(config).await;
        let (class_id, selected_id) = class_with_selection(&app).await;
        app.store.fail_after_writes(2);

        let (status, problem) = app
            .send_json(
                Method::Post,
                "/payment",
                bundle(&class_id.to_hex(), &selected_id),
                None,
            )
            .await;

        assert_eq!(status, Status::InternalServerError);
        assert_eq!(problem["completedSteps"], json!([]));
        assert!(app
            .store
            .payments_for(STUDENT)
            .await
            .expect("store readable")
            .is_empty());
        assert_eq!(
            app.store.selections_for(STUDENT).await.expect("store readable").len(),
            1
        );
    }

    #[rocket::async_test]
    async fn malformed_bundle_id_is_bad_request() {
        let app = TestApp::new().await;

        let (status, _) = app
            .send_json(
                Method::Post,
                "/payment",
                bundle("nope", &ObjectId::new().to_hex()),
                None,
            )
            .await;

        assert_eq!(status, Status::BadRequest);
    }

    #[rocket::async_test]
    async fn history_is_newest_first() {
        let app = TestApp::new().await;
        for (amount, at) in [(5.0, "2023-06-01T10:00:00Z"), (9.0, "2023-07-01T10:00:00Z")] {
            let (status, _) = app
                .send_json(
                    Method::Post,
                    "/payment_history",
                    json!({ "email": STUDENT, "classId": "C1", "amount": amount, "timestamp": at }),
                    None,
                )
                .await;
            assert_eq!(status, Status::Ok);
        }

        let (status, history) = app
            .get_json(&format!("/payment_history/{}", STUDENT), Some(STUDENT))
            .await;

        assert_eq!(status, Status::Ok);
        assert_eq!(history[0]["amount"], json!(9.0));
        assert_eq!(history[1]["amount"], json!(5.0));
    }
}
