//! Billing provider boundary. Only the subscription flow depends on it.

pub mod stripe;
pub mod webhook;

use axum::async_trait;

use jones_shared::errors::AppResult;

pub use self::stripe::StripeGateway;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns the provider's customer id.
    async fn create_customer(&self, email: &str, name: &str) -> AppResult<String>;
    /// Returns the hosted checkout URL for a recurring `price_id`.
    async fn create_checkout_session(&self, customer_id: &str, price_id: &str) -> AppResult<String>;
    /// Returns the self-service billing portal URL.
    async fn create_billing_portal_session(&self, customer_id: &str) -> AppResult<String>;
}
