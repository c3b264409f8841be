//! Persistence gateways.
//!
//! Narrow data-access traits with no business rules. Services hold them as
//! `Arc<dyn …>` so the Postgres implementations can be swapped for the
//! in-memory ones in tests.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use jones_shared::errors::AppResult;

use crate::models::{Gender, Notification, Reaction, Subscription, SubscriptionPlan, User, UserImage};
use crate::services::quota::DayWindow;

pub use postgres::{PgNotificationRepository, PgReactionRepository, PgSubscriptionRepository, PgUserRepository};

pub trait UserRepository: Send + Sync {
    fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    fn create(&self, user: &User, images: &[UserImage]) -> AppResult<()>;
    fn set_stripe_customer_id(&self, user_id: Uuid, customer_id: &str) -> AppResult<()>;
    /// Images of every listed user, ordered by user then gallery position.
    fn find_images(&self, user_ids: &[Uuid]) -> AppResult<Vec<UserImage>>;
    /// Newest-first page of users not in `exclude` whose gender is in
    /// `genders`, plus the total number of such users.
    fn find_candidates(
        &self,
        exclude: &[Uuid],
        genders: &[Gender],
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<User>, i64)>;
}

pub trait ReactionRepository: Send + Sync {
    /// Any reaction from `actor_id` to `target_id`, whatever its type.
    fn find_by_actor_and_target(&self, actor_id: Uuid, target_id: Uuid) -> AppResult<Option<Reaction>>;
    /// A LIKE previously stored by `target_id` towards `actor_id`.
    fn find_reciprocal_like(&self, actor_id: Uuid, target_id: Uuid) -> AppResult<Option<Reaction>>;
    /// Swipes created by `actor_id` inside `today`, bounds inclusive.
    fn count_swipes_today(&self, actor_id: Uuid, today: &DayWindow) -> AppResult<i64>;
    /// Ids of every user `actor_id` has already swiped on.
    fn find_swiped_user_ids(&self, actor_id: Uuid) -> AppResult<Vec<Uuid>>;
    /// LIKEs received by `user_id`, newest first.
    fn find_likes_received(&self, user_id: Uuid) -> AppResult<Vec<Reaction>>;
    fn create(&self, reaction: &Reaction) -> AppResult<()>;
    fn update(&self, reaction: &Reaction) -> AppResult<()>;

    /// Persist a completed match: the stamped reciprocal row first, then the
    /// new reaction. Stores that support transactions override this so both
    /// writes land together.
    fn record_match(&self, reciprocal: &Reaction, reaction: &Reaction) -> AppResult<()> {
        self.update(reciprocal)?;
        self.create(reaction)
    }
}

pub trait SubscriptionRepository: Send + Sync {
    /// Most recent subscription of `user_id` that is uncancelled and expires
    /// after `now`.
    fn find_active_by_user_id(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Subscription>>;
    fn find_by_stripe_subscription_id(&self, stripe_subscription_id: &str) -> AppResult<Option<Subscription>>;
    fn create(&self, subscription: &Subscription) -> AppResult<()>;
    fn update(&self, subscription: &Subscription) -> AppResult<()>;
    fn find_plan_by_id(&self, plan_id: i32) -> AppResult<Option<SubscriptionPlan>>;
    fn find_plan_by_price_id(&self, stripe_price_id: &str) -> AppResult<Option<SubscriptionPlan>>;
    fn find_all_plans(&self) -> AppResult<Vec<SubscriptionPlan>>;
}

pub trait NotificationRepository: Send + Sync {
    fn create(&self, notification: &Notification) -> AppResult<()>;
}
