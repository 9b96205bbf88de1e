use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PaymentError, PaymentIntent, PaymentIntentParams, PaymentProvider};

/// Payment provider keeping intents in memory. Used by tests and by
/// in-memory runs without a Stripe key.
#[derive(Debug, Default)]
pub struct MockPaymentProvider {
    intents: RwLock<Vec<PaymentIntent>>,
    rejection: RwLock<Option<String>>,
}

impl MockPaymentProvider {
    pub fn new() -> MockPaymentProvider {
        MockPaymentProvider::default()
    }

    pub async fn intents(&self) -> Vec<PaymentIntent> {
        self.intents.read().await.clone()
    }

    /// Makes every following intent fail the way a declining provider does.
    pub async fn reject_with(&self, message: impl ToString) {
        *self.rejection.write().await = Some(message.to_string());
    }
}

#[rocket::async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_payment_intent(
        &self,
        params: PaymentIntentParams,
    ) -> Result<PaymentIntent, PaymentError> {
        if let Some(message) = self.rejection.read().await.clone() {
            return Err(PaymentError::Provider(message));
        }

        if params.amount <= 0 {
            return Err(PaymentError::InvalidParameters(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let intent = PaymentIntent {
            id: format!("pi_mock_{}", Uuid::new_v4().simple()),
            amount: params.amount,
            currency: params.currency,
            client_secret: Some(format!("pi_mock_secret_{}", Uuid::new_v4().simple())),
        };

        self.intents.write().await.push(intent.clone());
        Ok(intent)
    }
}
