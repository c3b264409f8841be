use axum::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use jones_shared::errors::{AppError, AppResult, ErrorCode};

use super::PaymentGateway;

#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    pub api_base: String,
    pub success_url: String,
    pub cancel_url: String,
    pub portal_return_url: String,
}

#[derive(Debug, Deserialize)]
struct Customer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct HostedSession {
    url: String,
}

#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    settings: StripeSettings,
}

impl StripeGateway {
    pub fn new(settings: StripeSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> AppResult<T> {
        let url = format!("{}/v1/{path}", self.settings.api_base.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.secret_key)
            .form(params)
            .send()
            .await
            .map_err(|e| provider_error(path, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(path, format!("{status}: {body}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| provider_error(path, format!("unexpected response: {e}")))
    }
}

fn provider_error(path: &str, detail: String) -> AppError {
    tracing::error!(path, error = %detail, "stripe request failed");
    AppError::new(ErrorCode::PaymentProviderError, "payment provider request failed")
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_customer(&self, email: &str, name: &str) -> AppResult<String> {
        let customer: Customer = self
            .post_form("customers", &[("email", email), ("name", name)])
            .await?;
        Ok(customer.id)
    }

    async fn create_checkout_session(&self, customer_id: &str, price_id: &str) -> AppResult<String> {
        let session: HostedSession = self
            .post_form(
                "checkout/sessions",
                &[
                    ("customer", customer_id),
                    ("mode", "subscription"),
                    ("line_items[0][price]", price_id),
                    ("line_items[0][quantity]", "1"),
                    ("success_url", self.settings.success_url.as_str()),
                    ("cancel_url", self.settings.cancel_url.as_str()),
                ],
            )
            .await?;
        Ok(session.url)
    }

    async fn create_billing_portal_session(&self, customer_id: &str) -> AppResult<String> {
        let session: HostedSession = self
            .post_form(
                "billing_portal/sessions",
                &[("customer", customer_id), ("return_url", self.settings.portal_return_url.as_str())],
            )
            .await?;
        Ok(session.url)
    }
}
