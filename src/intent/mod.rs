use std::sync::Arc;

use rocket::http::Status;
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::Config;
use crate::data::store::StoreKind;
use crate::resp::problem::Problem;
use crate::security::Security;

pub mod mock;
pub mod stripe;

pub use mock::MockPaymentProvider;
pub use stripe::StripeProvider;

/// Currency every class is priced in.
pub const CURRENCY: &str = "usd";

pub type Payments = Arc<dyn PaymentProvider>;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider isn't configured")]
    NotConfigured,
    #[error("invalid payment parameters: {0}")]
    InvalidParameters(String),
    #[error("payment provider rejected the request: {0}")]
    Provider(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl From<PaymentError> for Problem {
    fn from(e: PaymentError) -> Self {
        tracing::error!("payment intent failed: {}", e);

        match e {
            PaymentError::InvalidParameters(reason) => {
                Problem::new_untyped(Status::BadRequest, "Invalid payment amount.")
                    .detail(reason)
                    .to_owned()
            }
            PaymentError::NotConfigured => Problem::new_untyped(
                Status::ServiceUnavailable,
                "Payments aren't available right now.",
            ),
            PaymentError::Provider(_) | PaymentError::Http(_) => Problem::new_untyped(
                Status::BadGateway,
                "Payment provider failed to create an intent.",
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentIntentParams {
    /// Amount in minor units (cents).
    pub amount: i64,
    pub currency: String,
    pub payment_method_types: Vec<String>,
}

impl PaymentIntentParams {
    pub fn card(amount: i64) -> PaymentIntentParams {
        PaymentIntentParams {
            amount,
            currency: CURRENCY.to_string(),
            payment_method_types: vec!["card".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IntentRequest {
    /// Price in major units, e.g. `10.00` dollars.
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IntentResponse {
    pub client_secret: Option<String>,
}

/// Converts a price in dollars into cents.
pub fn amount_in_minor_units(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

#[rocket::async_trait]
pub trait PaymentProvider: Send + Sync + std::fmt::Debug {
    async fn create_payment_intent(
        &self,
        params: PaymentIntentParams,
    ) -> Result<PaymentIntent, PaymentError>;
}

/// Stripe, unless the server runs on the in-memory store without a Stripe
/// key. Such local runs get intents from [MockPaymentProvider].
pub fn provider_for(config: &Config, security: &Security) -> Payments {
    match (&security.stripe_secret_key, config.store) {
        (None, StoreKind::Memory) => {
            tracing::warn!("No STRIPE_SECRET_KEY; payment intents are simulated.");
            Arc::new(MockPaymentProvider::new())
        }
        (key, _) => Arc::new(StripeProvider::new(&config.stripe_api_base, key.clone())),
    }
}
