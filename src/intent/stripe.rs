use serde::Deserialize;

use super::{PaymentError, PaymentIntent, PaymentIntentParams, PaymentProvider};

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: Option<String>,
}

/// Creates payment intents through the Stripe REST API.
#[derive(Clone)]
pub struct StripeProvider {
    http: reqwest::Client,
    api_base: String,
    secret_key: Option<String>,
}

impl std::fmt::Debug for StripeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeProvider")
            .field("api_base", &self.api_base)
            .field("configured", &self.secret_key.is_some())
            .finish()
    }
}

impl StripeProvider {
    pub fn new(api_base: impl ToString, secret_key: Option<String>) -> StripeProvider {
        StripeProvider {
            http: reqwest::Client::new(),
            api_base: api_base.to_string().trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    /// Form fields of a create-intent request.
    fn form(params: &PaymentIntentParams) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("amount", params.amount.to_string()),
            ("currency", params.currency.clone()),
        ];
        for method in &params.payment_method_types {
            form.push(("payment_method_types[]", method.clone()));
        }
        form
    }
}

#[rocket::async_trait]
impl PaymentProvider for StripeProvider {
    async fn create_payment_intent(
        &self,
        params: PaymentIntentParams,
    ) -> Result<PaymentIntent, PaymentError> {
        let secret_key = self.secret_key.as_ref().ok_or(PaymentError::NotConfigured)?;

        if params.amount <= 0 {
            return Err(PaymentError::InvalidParameters(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(secret_key)
            .form(&Self::form(&params))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(PaymentError::Provider(message));
        }

        let intent: PaymentIntent = response.json().await?;
        tracing::info!("created payment intent {} for {}", intent.id, intent.amount);

        Ok(intent)
    }
}
