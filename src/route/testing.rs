use std::sync::Arc;

use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};

use crate::config::Config;
use crate::data::store::MemoryStore;
use crate::intent::MockPaymentProvider;
use crate::resp::jwt::IdentityClaims;
use crate::security::Security;

/// Backend running on an in-memory store and a mock payment provider.
pub struct TestApp {
    pub client: Client,
    pub store: Arc<MemoryStore>,
    pub payments: Arc<MockPaymentProvider>,
    pub security: Security,
}

impl TestApp {
    pub async fn new() -> TestApp {
        TestApp::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> TestApp {
        let store = Arc::new(MemoryStore::new());
        let payments = Arc::new(MockPaymentProvider::new());
        let security = Security::new("route-test-secret");

        let rocket = crate::build(config, security.clone(), store.clone(), payments.clone())
            .expect("unable to build backend");
        let client = Client::tracked(rocket).await.expect("invalid backend");

        TestApp {
            client,
            store,
            payments,
            security,
        }
    }

    /// Authorization header for a token identifying `email`.
    pub fn bearer(&self, email: &str) -> Header<'static> {
        let payload = match json!({ "email": email }) {
            Value::Object(it) => it,
            _ => unreachable!(),
        };
        let token = IdentityClaims::new(payload)
            .encode_jwt(&self.security.jwt_secret)
            .expect("unable to encode test token");

        Header::new("Authorization", format!("Bearer {}", token))
    }

    pub async fn get_json(&self, uri: &str, auth: Option<&str>) -> (Status, Value) {
        let mut request = self.client.get(uri.to_string());
        if let Some(email) = auth {
            request = request.header(self.bearer(email));
        }
        let response = request.dispatch().await;
        let status = response.status();

        (status, response.into_json().await.unwrap_or(Value::Null))
    }

    pub async fn send_json(
        &self,
        method: rocket::http::Method,
        uri: &str,
        body: Value,
        auth: Option<&str>,
    ) -> (Status, Value) {
        let mut request = self
            .client
            .req(method, uri.to_string())
            .header(ContentType::JSON)
            .body(body.to_string());
        if let Some(email) = auth {
            request = request.header(self.bearer(email));
        }
        let response = request.dispatch().await;
        let status = response.status();

        (status, response.into_json().await.unwrap_or(Value::Null))
    }
}
