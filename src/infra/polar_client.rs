//! Polar billing API client.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::app_error::{AppError, AppResult};
use crate::application::ports::billing_provider::BillingProviderPort;

type HmacSha256 = Hmac<Sha256>;

pub struct PolarClient {
    http: reqwest::Client,
    api_base: String,
    api_key: SecretString,
    webhook_secret: SecretString,
}

impl PolarClient {
    pub fn new(api_base: String, api_key: SecretString, webhook_secret: SecretString) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
            api_key,
            webhook_secret,
        }
    }

    async fn patch_subscription(
        &self,
        subscription_id: &str,
        body: &serde_json::Value,
    ) -> AppResult<()> {
        let url = format!("{}/v1/subscriptions/{}", self.api_base, subscription_id);
        let response = self
            .http
            .patch(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::BillingProvider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::BillingProvider(format!(
                "Polar returned {status}: {text}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BillingProviderPort for PolarClient {
    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<()> {
        self.patch_subscription(
            subscription_id,
            &serde_json::json!({ "cancel_at_period_end": true }),
        )
        .await
    }

    async fn update_subscription(&self, subscription_id: &str, plan_id: &str) -> AppResult<()> {
        self.patch_subscription(subscription_id, &serde_json::json!({ "product_id": plan_id }))
            .await
    }

    /// HMAC-SHA256 over the raw body, hex-encoded. Comparison goes through
    /// the Mac verifier, which is constant time.
    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature.trim()) else {
            return false;
        };
        let Ok(mut mac) =
            HmacSha256::new_from_slice(self.webhook_secret.expose_secret().as_bytes())
        else {
            return false;
        };
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }
}
