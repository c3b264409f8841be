//! In-memory repositories for service tests.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use jones_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Gender, Notification, Reaction, ReactionType, Subscription, SubscriptionPlan, User, UserImage};
use crate::services::quota::DayWindow;

use super::{NotificationRepository, ReactionRepository, SubscriptionRepository, UserRepository};

fn storage_down() -> AppError {
    AppError::Database(diesel::result::Error::BrokenTransactionManager)
}

#[derive(Default)]
pub struct MemoryUserRepository {
    pub users: Mutex<Vec<User>>,
    pub images: Mutex<Vec<UserImage>>,
}

impl UserRepository for MemoryUserRepository {
    fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    fn create(&self, user: &User, images: &[UserImage]) -> AppResult<()> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists, "user already exists"));
        }
        users.push(user.clone());
        self.images.lock().unwrap().extend_from_slice(images);
        Ok(())
    }

    fn set_stripe_customer_id(&self, user_id: Uuid, customer_id: &str) -> AppResult<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;
        user.stripe_customer_id = Some(customer_id.to_string());
        Ok(())
    }

    fn find_images(&self, user_ids: &[Uuid]) -> AppResult<Vec<UserImage>> {
        let mut images: Vec<UserImage> = self
            .images
            .lock()
            .unwrap()
            .iter()
            .filter(|i| user_ids.contains(&i.user_id))
            .cloned()
            .collect();
        images.sort_by_key(|i| (i.user_id, i.position));
        Ok(images)
    }

    fn find_candidates(
        &self,
        exclude: &[Uuid],
        genders: &[Gender],
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<User>, i64)> {
        let mut matching: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| !exclude.contains(&u.id) && genders.contains(&u.gender))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }
}

/// Reaction store with a pre-seeded "already swiped today" counter and
/// switchable failures.
#[derive(Default)]
pub struct MemoryReactionRepository {
    pub reactions: Mutex<Vec<Reaction>>,
    pub swipes_today: Mutex<i64>,
    pub fail_reads: Mutex<bool>,
    pub fail_writes: Mutex<bool>,
    /// Successful writes in order, as `("create" | "update", reaction id)`.
    pub writes: Mutex<Vec<(&'static str, Uuid)>>,
}

impl MemoryReactionRepository {
    pub fn with_swipes_today(count: i64) -> Self {
        let repo = Self::default();
        *repo.swipes_today.lock().unwrap() = count;
        repo
    }

    pub fn insert(&self, reaction: Reaction) {
        self.reactions.lock().unwrap().push(reaction);
    }

    pub fn get(&self, id: Uuid) -> Option<Reaction> {
        self.reactions.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }

    fn check_reads(&self) -> AppResult<()> {
        if *self.fail_reads.lock().unwrap() {
            return Err(storage_down());
        }
        Ok(())
    }

    fn check_writes(&self) -> AppResult<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(storage_down());
        }
        Ok(())
    }
}

impl ReactionRepository for MemoryReactionRepository {
    fn find_by_actor_and_target(&self, actor_id: Uuid, target_id: Uuid) -> AppResult<Option<Reaction>> {
        self.check_reads()?;
        Ok(self
            .reactions
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user_id == actor_id && r.matched_user_id == target_id)
            .cloned())
    }

    fn find_reciprocal_like(&self, actor_id: Uuid, target_id: Uuid) -> AppResult<Option<Reaction>> {
        self.check_reads()?;
        Ok(self
            .reactions
            .lock()
            .unwrap()
            .iter()
            .find(|r| {
                r.user_id == target_id && r.matched_user_id == actor_id && r.reaction_type == ReactionType::Like
            })
            .cloned())
    }

    fn count_swipes_today(&self, actor_id: Uuid, today: &DayWindow) -> AppResult<i64> {
        self.check_reads()?;
        let stored = self
            .reactions
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == actor_id && today.contains(r.created_at))
            .count() as i64;
        Ok(stored + *self.swipes_today.lock().unwrap())
    }

    fn find_swiped_user_ids(&self, actor_id: Uuid) -> AppResult<Vec<Uuid>> {
        self.check_reads()?;
        Ok(self
            .reactions
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == actor_id)
            .map(|r| r.matched_user_id)
            .collect())
    }

    fn find_likes_received(&self, user_id: Uuid) -> AppResult<Vec<Reaction>> {
        self.check_reads()?;
        let mut likes: Vec<Reaction> = self
            .reactions
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.matched_user_id == user_id && r.reaction_type == ReactionType::Like)
            .cloned()
            .collect();
        likes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(likes)
    }

    fn create(&self, reaction: &Reaction) -> AppResult<()> {
        self.check_writes()?;
        let mut reactions = self.reactions.lock().unwrap();
        if reactions
            .iter()
            .any(|r| r.user_id == reaction.user_id && r.matched_user_id == reaction.matched_user_id)
        {
            return Err(AppError::new(ErrorCode::AlreadySwiped, "user has already swiped"));
        }
        reactions.push(reaction.clone());
        self.writes.lock().unwrap().push(("create", reaction.id));
        Ok(())
    }

    fn update(&self, reaction: &Reaction) -> AppResult<()> {
        self.check_writes()?;
        let mut reactions = self.reactions.lock().unwrap();
        if let Some(stored) = reactions.iter_mut().find(|r| r.id == reaction.id) {
            *stored = reaction.clone();
        }
        self.writes.lock().unwrap().push(("update", reaction.id));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySubscriptionRepository {
    pub subscriptions: Mutex<Vec<Subscription>>,
    pub plans: Mutex<Vec<SubscriptionPlan>>,
    pub fail_reads: Mutex<bool>,
}

impl MemorySubscriptionRepository {
    /// Catalog matching the seed migration.
    pub fn seeded() -> Self {
        let repo = Self::default();
        *repo.plans.lock().unwrap() = vec![
            plan(1, "BASIC", 999, &["unlimited_likes"], Some("price_basic")),
            plan(2, "PRO", 1999, &["unlimited_likes", "see_likes"], Some("price_pro")),
        ];
        repo
    }

    pub fn subscribe(&self, user_id: Uuid, plan_id: i32) -> Subscription {
        let now = Utc::now();
        let sub = Subscription::new(user_id, plan_id, None, now, now + chrono::Duration::days(30));
        self.subscriptions.lock().unwrap().push(sub.clone());
        sub
    }

    pub fn all_for(&self, user_id: Uuid) -> Vec<Subscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }
}

pub fn plan(id: i32, name: &str, price_cents: i64, features: &[&str], price_id: Option<&str>) -> SubscriptionPlan {
    SubscriptionPlan {
        id,
        name: name.to_string(),
        price_cents,
        features: features.iter().map(|f| f.to_string()).collect(),
        stripe_price_id: price_id.map(str::to_string),
        created_at: Utc::now(),
        updated_at: None,
    }
}

impl SubscriptionRepository for MemorySubscriptionRepository {
    fn find_active_by_user_id(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Subscription>> {
        if *self.fail_reads.lock().unwrap() {
            return Err(storage_down());
        }
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.is_active_at(now))
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    fn find_by_stripe_subscription_id(&self, stripe_subscription_id: &str) -> AppResult<Option<Subscription>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.stripe_subscription_id.as_deref() == Some(stripe_subscription_id))
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    fn create(&self, subscription: &Subscription) -> AppResult<()> {
        self.subscriptions.lock().unwrap().push(subscription.clone());
        Ok(())
    }

    fn update(&self, subscription: &Subscription) -> AppResult<()> {
        let mut subs = self.subscriptions.lock().unwrap();
        if let Some(stored) = subs.iter_mut().find(|s| s.id == subscription.id) {
            *stored = subscription.clone();
        }
        Ok(())
    }

    fn find_plan_by_id(&self, plan_id: i32) -> AppResult<Option<SubscriptionPlan>> {
        Ok(self.plans.lock().unwrap().iter().find(|p| p.id == plan_id).cloned())
    }

    fn find_plan_by_price_id(&self, stripe_price_id: &str) -> AppResult<Option<SubscriptionPlan>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.stripe_price_id.as_deref() == Some(stripe_price_id))
            .cloned())
    }

    fn find_all_plans(&self) -> AppResult<Vec<SubscriptionPlan>> {
        Ok(self.plans.lock().unwrap().clone())
    }
}

/// Records notifications; writes for users in `failing_for` are rejected.
#[derive(Default)]
pub struct MemoryNotificationRepository {
    pub notifications: Mutex<Vec<Notification>>,
    pub attempts: Mutex<Vec<Uuid>>,
    pub failing_for: Mutex<HashSet<Uuid>>,
}

impl MemoryNotificationRepository {
    pub fn failing_for(user_id: Uuid) -> Self {
        let repo = Self::default();
        repo.failing_for.lock().unwrap().insert(user_id);
        repo
    }

    pub fn recipients(&self) -> Vec<Uuid> {
        self.notifications.lock().unwrap().iter().map(|n| n.user_id).collect()
    }
}

impl NotificationRepository for MemoryNotificationRepository {
    fn create(&self, notification: &Notification) -> AppResult<()> {
        let failing = self.failing_for.lock().unwrap().contains(&notification.user_id);
        if !failing {
            self.notifications.lock().unwrap().push(notification.clone());
        }
        // Recorded last so a test that saw the attempt also sees the row.
        self.attempts.lock().unwrap().push(notification.user_id);
        if failing {
            return Err(storage_down());
        }
        Ok(())
    }
}
