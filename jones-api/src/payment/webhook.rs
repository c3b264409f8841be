use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use jones_shared::errors::{AppError, AppResult, ErrorCode};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed webhook, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

/// The billing events the subscription flow reacts to.
#[derive(Debug)]
pub enum BillingEvent {
    InvoicePaid(Invoice),
    InvoicePaymentFailed(Invoice),
    SubscriptionUpdated(StripeSubscription),
    SubscriptionDeleted(StripeSubscription),
    Ignored(String),
}

impl BillingEvent {
    pub fn from_event(event: WebhookEvent) -> AppResult<Self> {
        let object = event.data.object;
        let parsed = match event.event_type.as_str() {
            "invoice.paid" => serde_json::from_value(object).map(BillingEvent::InvoicePaid),
            "invoice.payment_failed" => serde_json::from_value(object).map(BillingEvent::InvoicePaymentFailed),
            "customer.subscription.updated" => {
                serde_json::from_value(object).map(BillingEvent::SubscriptionUpdated)
            }
            "customer.subscription.deleted" => {
                serde_json::from_value(object).map(BillingEvent::SubscriptionDeleted)
            }
            _ => Ok(BillingEvent::Ignored(event.event_type.clone())),
        };

        parsed.map_err(|e| {
            AppError::bad_request(format!("malformed {} payload: {e}", event.event_type))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub customer_email: Option<String>,
    /// Provider subscription id; absent for one-off invoices.
    pub subscription: Option<String>,
    pub lines: List<InvoiceLine>,
}

impl Invoice {
    /// On a plan switch the provider appends the new price as the last line.
    pub fn billed_line(&self) -> Option<&InvoiceLine> {
        self.lines.data.last()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceLine {
    pub price: Option<Price>,
    pub period: Period,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Period {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub canceled_at: Option<i64>,
    pub current_period_end: i64,
    pub items: List<SubscriptionItem>,
}

impl StripeSubscription {
    pub fn price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub price: Price,
}

pub fn timestamp(secs: i64) -> AppResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| AppError::bad_request(format!("timestamp out of range: {secs}")))
}

pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::internal(format!("invalid webhook secret: {e}")))?;
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=…]`) against
/// the raw request body.
pub fn verify_signature(secret: &str, header: &str, payload: &[u8], now: DateTime<Utc>) -> AppResult<()> {
    let invalid = |msg: &str| AppError::new(ErrorCode::InvalidWebhookSignature, msg.to_string());

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| invalid("missing signature timestamp"))?;
    if signatures.is_empty() {
        return Err(invalid("missing v1 signature"));
    }
    if (now.timestamp() - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(invalid("signature timestamp outside tolerance"));
    }

    let expected = sign_payload(secret, timestamp, payload)?;
    let matched = signatures
        .iter()
        .any(|sig| bool::from(expected.as_bytes().ct_eq(sig.as_bytes())));
    if !matched {
        return Err(invalid("signature mismatch"));
    }
    Ok(())
}
