use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use jones_shared::errors::{AppError, AppResult};

use crate::repositories::SubscriptionRepository;

/// Capabilities granted by the plan of an active subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePlan {
    pub plan_id: i32,
    pub plan_name: String,
    pub features: BTreeSet<String>,
}

impl ActivePlan {
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entitlement {
    /// No active subscription.
    Free,
    Active(ActivePlan),
}

#[derive(Clone)]
pub struct EntitlementResolver {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl EntitlementResolver {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }

    /// Resolve what `user_id` is entitled to right now. A missing or lapsed
    /// subscription is `Free`, never an error.
    #[tracing::instrument(skip(self))]
    pub fn current(&self, user_id: Uuid) -> AppResult<Entitlement> {
        let now = Utc::now();

        let subscription = self
            .subscriptions
            .find_active_by_user_id(user_id, now)
            .map_err(|e| lookup_failed("find active subscription", e))?;

        let Some(subscription) = subscription.filter(|s| s.is_active_at(now)) else {
            return Ok(Entitlement::Free);
        };

        let plan = self
            .subscriptions
            .find_plan_by_id(subscription.plan_id)
            .map_err(|e| lookup_failed("find subscription plan", e))?
            .ok_or_else(|| {
                tracing::error!(
                    subscription_id = %subscription.id,
                    plan_id = subscription.plan_id,
                    "active subscription references a missing plan"
                );
                AppError::internal("failed to resolve subscription plan")
            })?;

        Ok(Entitlement::Active(ActivePlan {
            plan_id: plan.id,
            plan_name: plan.name,
            features: plan.features.into_iter().collect(),
        }))
    }
}

fn lookup_failed(op: &str, err: AppError) -> AppError {
    tracing::error!(error = %err, op, "entitlement lookup failed");
    AppError::internal(format!("failed to {op}"))
}
