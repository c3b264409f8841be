use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use jones_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Subscription, SubscriptionPlan, User};
use crate::payment::webhook::{timestamp, BillingEvent, Invoice, StripeSubscription};
use crate::payment::PaymentGateway;
use crate::repositories::{SubscriptionRepository, UserRepository};

/// What a subscribe request produced: a hosted checkout to complete, or a
/// subscription that is already active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SubscribeOutcome {
    Checkout { checkout_url: String },
    Activated { subscription_id: Uuid },
}

#[derive(Clone)]
pub struct SubscriptionService {
    users: Arc<dyn UserRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Option<Arc<dyn PaymentGateway>>,
    local_subscription_days: i64,
}

impl SubscriptionService {
    /// `payments` is `None` when the billing provider is disabled; every
    /// plan is then granted locally.
    pub fn new(
        users: Arc<dyn UserRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        payments: Option<Arc<dyn PaymentGateway>>,
        local_subscription_days: i64,
    ) -> Self {
        Self {
            users,
            subscriptions,
            payments,
            local_subscription_days,
        }
    }

    pub fn list_plans(&self) -> AppResult<Vec<SubscriptionPlan>> {
        self.subscriptions.find_all_plans()
    }

    #[tracing::instrument(skip(self))]
    pub async fn subscribe(&self, user_id: Uuid, plan_id: i32) -> AppResult<SubscribeOutcome> {
        let user = self.user(user_id)?;
        let plan = self
            .subscriptions
            .find_plan_by_id(plan_id)?
            .ok_or_else(|| AppError::new(ErrorCode::PlanNotFound, "plan not found"))?;

        let now = Utc::now();
        let current = self.subscriptions.find_active_by_user_id(user_id, now)?;
        if current.as_ref().is_some_and(|s| s.plan_id == plan.id) {
            return Err(AppError::new(ErrorCode::AlreadySubscribed, "already subscribed to this plan"));
        }

        if let (Some(payments), Some(price_id)) = (&self.payments, plan.stripe_price_id.as_deref()) {
            let customer_id = match user.stripe_customer_id.clone() {
                Some(id) => id,
                None => {
                    let id = payments.create_customer(&user.email, &user.name).await?;
                    self.users.set_stripe_customer_id(user.id, &id)?;
                    tracing::info!(user_id = %user.id, customer_id = %id, "billing customer created");
                    id
                }
            };
            let checkout_url = payments.create_checkout_session(&customer_id, price_id).await?;
            return Ok(SubscribeOutcome::Checkout { checkout_url });
        }

        if let Some(mut previous) = current {
            previous.canceled_at = Some(now);
            previous.updated_at = Some(now);
            self.subscriptions.update(&previous)?;
        }

        let subscription = Subscription::new(
            user.id,
            plan.id,
            None,
            now,
            now + Duration::days(self.local_subscription_days),
        );
        self.subscriptions.create(&subscription)?;
        tracing::info!(subscription_id = %subscription.id, plan = %plan.name, "local subscription activated");

        Ok(SubscribeOutcome::Activated { subscription_id: subscription.id })
    }

    pub async fn customer_portal(&self, user_id: Uuid) -> AppResult<String> {
        let payments = self
            .payments
            .as_ref()
            .ok_or_else(|| AppError::bad_request("billing is not enabled"))?;
        let customer_id = self
            .user(user_id)?
            .stripe_customer_id
            .ok_or_else(|| AppError::new(ErrorCode::CustomerNotFound, "customer not found"))?;

        payments.create_billing_portal_session(&customer_id).await
    }

    #[tracing::instrument(skip_all)]
    pub fn handle_event(&self, event: BillingEvent) -> AppResult<()> {
        match event {
            BillingEvent::InvoicePaid(invoice) => self.invoice_paid(&invoice),
            BillingEvent::InvoicePaymentFailed(invoice) => {
                self.invoice_payment_failed(&invoice);
                Ok(())
            }
            BillingEvent::SubscriptionUpdated(sub) => self.subscription_updated(&sub),
            BillingEvent::SubscriptionDeleted(sub) => self.subscription_deleted(&sub),
            BillingEvent::Ignored(kind) => {
                tracing::debug!(event_type = %kind, "ignoring billing event");
                Ok(())
            }
        }
    }

    /// New subscription, renewal, or plan switch. Renewals of the same
    /// provider subscription and plan only extend the expiry.
    fn invoice_paid(&self, invoice: &Invoice) -> AppResult<()> {
        let line = invoice
            .billed_line()
            .ok_or_else(|| AppError::bad_request("invoice has no line items"))?;
        let price_id = line
            .price
            .as_ref()
            .map(|p| p.id.as_str())
            .ok_or_else(|| AppError::bad_request("invoice line has no price"))?;

        let user = self.user_by_email(invoice.customer_email.as_deref())?;
        let plan = self.plan_by_price(price_id)?;
        let period_start = timestamp(line.period.start)?;
        let period_end = timestamp(line.period.end)?;
        let now = Utc::now();

        if let Some(mut current) = self.subscriptions.find_active_by_user_id(user.id, now)? {
            if current.stripe_subscription_id == invoice.subscription && current.plan_id == plan.id {
                current.expired_at = period_end;
                current.updated_at = Some(now);
                self.subscriptions.update(&current)?;
                tracing::info!(subscription_id = %current.id, expired_at = %period_end, "subscription renewed");
                return Ok(());
            }

            current.canceled_at = Some(now);
            current.updated_at = Some(now);
            self.subscriptions.update(&current)?;
        }

        let subscription = Subscription::new(user.id, plan.id, invoice.subscription.clone(), period_start, period_end);
        self.subscriptions.create(&subscription)?;
        tracing::info!(subscription_id = %subscription.id, plan = %plan.name, "paid subscription started");
        Ok(())
    }

    fn invoice_payment_failed(&self, invoice: &Invoice) {
        let email = invoice.customer_email.as_deref().unwrap_or_default();
        tracing::warn!(invoice_id = %invoice.id, email, "invoice payment failed; current access lasts until expiry");
    }

    fn subscription_updated(&self, stripe_sub: &StripeSubscription) -> AppResult<()> {
        let price_id = stripe_sub
            .price_id()
            .ok_or_else(|| AppError::bad_request("subscription has no items"))?;
        let plan = self.plan_by_price(price_id)?;
        let mut subscription = self.by_provider_id(&stripe_sub.id)?;

        subscription.canceled_at = stripe_sub.canceled_at.map(timestamp).transpose()?;
        subscription.plan_id = plan.id;
        subscription.expired_at = timestamp(stripe_sub.current_period_end)?;
        subscription.updated_at = Some(Utc::now());
        self.subscriptions.update(&subscription)?;

        if let Some(canceled_at) = subscription.canceled_at {
            tracing::info!(
                subscription_id = %subscription.id,
                %canceled_at,
                expired_at = %subscription.expired_at,
                "subscription cancelled; access kept until expiry"
            );
        }
        Ok(())
    }

    fn subscription_deleted(&self, stripe_sub: &StripeSubscription) -> AppResult<()> {
        let mut subscription = self.by_provider_id(&stripe_sub.id)?;
        let now = Utc::now();

        subscription.canceled_at = Some(match stripe_sub.canceled_at {
            Some(secs) => timestamp(secs)?,
            None => now,
        });
        subscription.updated_at = Some(now);
        self.subscriptions.update(&subscription)?;

        tracing::info!(subscription_id = %subscription.id, "subscription deleted by provider");
        Ok(())
    }

    fn user(&self, user_id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(user_id)?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))
    }

    fn user_by_email(&self, email: Option<&str>) -> AppResult<User> {
        let email = email.ok_or_else(|| AppError::bad_request("invoice has no customer email"))?;
        self.users
            .find_by_email(&email.to_lowercase())?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))
    }

    fn plan_by_price(&self, price_id: &str) -> AppResult<SubscriptionPlan> {
        self.subscriptions
            .find_plan_by_price_id(price_id)?
            .ok_or_else(|| AppError::new(ErrorCode::PlanNotFound, format!("no plan for price {price_id}")))
    }

    fn by_provider_id(&self, stripe_subscription_id: &str) -> AppResult<Subscription> {
        self.subscriptions
            .find_by_stripe_subscription_id(stripe_subscription_id)?
            .ok_or_else(|| AppError::new(ErrorCode::SubscriptionNotFound, "subscription not found"))
    }
}
