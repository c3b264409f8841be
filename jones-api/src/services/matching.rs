//! Swipe handling and mutual-match detection.
//!
//! A swipe runs through a fixed sequence and stops at the first rejection:
//! quota, duplicate guard, construction, reciprocity. Only a LIKE answering
//! a stored LIKE completes a match; both rows then carry the same
//! `matched_at` and each party is notified in the background.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use jones_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Reaction, ReactionType, FEATURE_SEE_LIKES};
use crate::repositories::ReactionRepository;
use crate::services::entitlement::{Entitlement, EntitlementResolver};
use crate::services::notification::NotificationDispatcher;
use crate::services::quota::DayWindow;

#[derive(Clone)]
pub struct MatchingEngine {
    reactions: Arc<dyn ReactionRepository>,
    entitlements: EntitlementResolver,
    notifier: NotificationDispatcher,
    daily_swipe_limit: i64,
}

impl MatchingEngine {
    pub fn new(
        reactions: Arc<dyn ReactionRepository>,
        entitlements: EntitlementResolver,
        notifier: NotificationDispatcher,
        daily_swipe_limit: i64,
    ) -> Self {
        Self {
            reactions,
            entitlements,
            notifier,
            daily_swipe_limit,
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn swipe(&self, actor_id: Uuid, target_id: Uuid, reaction_type: ReactionType) -> AppResult<Reaction> {
        self.check_quota(actor_id).inspect_err(|e| reject(e))?;

        let existing = self
            .reactions
            .find_by_actor_and_target(actor_id, target_id)
            .map_err(storage_failure("look up existing swipe"))?;
        if existing.is_some() {
            let err = AppError::new(ErrorCode::AlreadySwiped, "user has already swiped");
            reject(&err);
            return Err(err);
        }

        let mut reaction = Reaction::new(actor_id, target_id, reaction_type);

        let reciprocal = match reaction_type {
            ReactionType::Like => self
                .reactions
                .find_reciprocal_like(actor_id, target_id)
                .map_err(storage_failure("look up reciprocal like"))?,
            ReactionType::Pass => None,
        };

        let Some(mut reciprocal) = reciprocal else {
            self.reactions
                .create(&reaction)
                .map_err(storage_failure("create reaction"))
                .inspect_err(|e| reject(e))?;
            metrics::counter!("swipes_total", "type" => reaction_type.as_str()).increment(1);
            tracing::info!(reaction_id = %reaction.id, "swipe recorded");
            return Ok(reaction);
        };

        let now = Utc::now();
        reaction.matched_at = Some(now);
        reciprocal.matched_at = Some(now);
        reciprocal.updated_at = Some(now);

        self.reactions
            .record_match(&reciprocal, &reaction)
            .map_err(storage_failure("record match"))
            .inspect_err(|e| reject(e))?;

        metrics::counter!("swipes_total", "type" => reaction_type.as_str()).increment(1);
        metrics::counter!("matches_total").increment(1);
        tracing::info!(reaction_id = %reaction.id, reciprocal_id = %reciprocal.id, "match recorded");

        self.notifier.match_found(&reaction);
        self.notifier.match_found(&reciprocal);

        Ok(reaction)
    }

    /// LIKEs received by `user_id`, for holders of a plan with `see_likes`.
    #[tracing::instrument(skip(self))]
    pub fn see_likes(&self, user_id: Uuid) -> AppResult<Vec<Reaction>> {
        match self.entitlements.current(user_id)? {
            Entitlement::Free => {
                return Err(AppError::new(ErrorCode::NotSubscribed, "you are not subscribed to any plan"));
            }
            Entitlement::Active(plan) if !plan.has_feature(FEATURE_SEE_LIKES) => {
                return Err(AppError::new(ErrorCode::NotProUser, "you are not a pro user"));
            }
            Entitlement::Active(_) => {}
        }

        self.reactions
            .find_likes_received(user_id)
            .map_err(storage_failure("list received likes"))
    }

    fn check_quota(&self, actor_id: Uuid) -> AppResult<()> {
        if let Entitlement::Active(plan) = self.entitlements.current(actor_id)? {
            tracing::debug!(plan_id = plan.plan_id, plan = %plan.plan_name, "paid plan, swipe quota bypassed");
            return Ok(());
        }

        let swipes_today = self
            .reactions
            .count_swipes_today(actor_id, &DayWindow::utc_today())
            .map_err(storage_failure("count today's swipes"))?;

        if swipes_today >= self.daily_swipe_limit {
            return Err(AppError::new(
                ErrorCode::SwipeQuotaExceeded,
                format!(
                    "cannot swipe more than {} times. please try again tomorrow",
                    self.daily_swipe_limit
                ),
            ));
        }
        Ok(())
    }
}

/// Domain errors pass through untouched; anything else is logged with the
/// failing step and replaced by an opaque internal error.
fn storage_failure(op: &'static str) -> impl Fn(AppError) -> AppError {
    move |err| {
        if err.is_domain() {
            return err;
        }
        tracing::error!(error = %err, op, "matching storage failure");
        AppError::internal(format!("failed to {op}"))
    }
}

fn reject(err: &AppError) {
    let reason = match err.code() {
        ErrorCode::SwipeQuotaExceeded => "quota",
        ErrorCode::AlreadySwiped => "duplicate",
        ErrorCode::UserNotFound => "unknown_user",
        _ => return,
    };
    metrics::counter!("swipe_rejections_total", "reason" => reason).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::{
        MemoryNotificationRepository, MemoryReactionRepository, MemorySubscriptionRepository,
    };
    use std::time::Duration;

    struct Fixture {
        engine: MatchingEngine,
        reactions: Arc<MemoryReactionRepository>,
        subscriptions: Arc<MemorySubscriptionRepository>,
        notifications: Arc<MemoryNotificationRepository>,
    }

    fn fixture_with(reactions: MemoryReactionRepository, notifications: MemoryNotificationRepository) -> Fixture {
        let reactions = Arc::new(reactions);
        let subscriptions = Arc::new(MemorySubscriptionRepository::seeded());
        let notifications = Arc::new(notifications);
        let (notifier, _worker) = NotificationDispatcher::spawn(notifications.clone());
        let engine = MatchingEngine::new(
            reactions.clone(),
            EntitlementResolver::new(subscriptions.clone()),
            notifier,
            10,
        );
        Fixture { engine, reactions, subscriptions, notifications }
    }

    fn fixture() -> Fixture {
        fixture_with(MemoryReactionRepository::default(), MemoryNotificationRepository::default())
    }

    async fn wait_for_notifications(repo: &MemoryNotificationRepository, attempts: usize) {
        for _ in 0..100 {
            if repo.attempts.lock().unwrap().len() >= attempts {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("notifications were not attempted in time");
    }

    #[tokio::test]
    async fn first_like_is_recorded_unmatched() {
        let f = fixture();
        let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

        let reaction = f.engine.swipe(u1, u2, ReactionType::Like).unwrap();

        assert_eq!(reaction.user_id, u1);
        assert_eq!(reaction.matched_user_id, u2);
        assert_eq!(reaction.reaction_type, ReactionType::Like);
        assert!(reaction.matched_at.is_none());
        assert_eq!(f.reactions.get(reaction.id), Some(reaction));
    }

    #[tokio::test]
    async fn free_user_is_capped_at_daily_limit() {
        let f = fixture_with(MemoryReactionRepository::with_swipes_today(10), MemoryNotificationRepository::default());
        let err = f.engine.swipe(Uuid::new_v4(), Uuid::new_v4(), ReactionType::Pass).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SwipeQuotaExceeded);

        let f = fixture_with(MemoryReactionRepository::with_swipes_today(9), MemoryNotificationRepository::default());
        assert!(f.engine.swipe(Uuid::new_v4(), Uuid::new_v4(), ReactionType::Pass).is_ok());
    }

    #[tokio::test]
    async fn any_active_plan_lifts_the_cap() {
        let f = fixture_with(MemoryReactionRepository::with_swipes_today(25), MemoryNotificationRepository::default());
        let actor = Uuid::new_v4();
        f.subscriptions.subscribe(actor, 1);

        for _ in 0..3 {
            f.engine.swipe(actor, Uuid::new_v4(), ReactionType::Like).unwrap();
        }
    }

    #[tokio::test]
    async fn second_swipe_on_same_target_is_rejected() {
        let f = fixture();
        let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

        f.engine.swipe(u1, u2, ReactionType::Pass).unwrap();
        let err = f.engine.swipe(u1, u2, ReactionType::Like).unwrap_err();

        assert_eq!(err.code(), ErrorCode::AlreadySwiped);
        assert_eq!(f.reactions.reactions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn quota_is_checked_before_duplicates() {
        let f = fixture_with(MemoryReactionRepository::with_swipes_today(10), MemoryNotificationRepository::default());
        let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());
        f.reactions.insert(Reaction::new(u1, u2, ReactionType::Like));

        let err = f.engine.swipe(u1, u2, ReactionType::Like).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SwipeQuotaExceeded);
    }

    #[tokio::test]
    async fn mutual_like_stamps_both_reactions_and_notifies_both() {
        let f = fixture();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let earlier = Reaction::new(b, a, ReactionType::Like);
        f.reactions.insert(earlier.clone());

        let reaction = f.engine.swipe(a, b, ReactionType::Like).unwrap();

        let matched_at = reaction.matched_at.expect("new reaction should be matched");
        let stored = f.reactions.get(earlier.id).unwrap();
        assert_eq!(stored.matched_at, Some(matched_at));
        assert_eq!(stored.updated_at, Some(matched_at));
        assert!(f.reactions.get(reaction.id).unwrap().is_matched());

        wait_for_notifications(&f.notifications, 2).await;
        let mut recipients = f.notifications.recipients();
        recipients.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(recipients, expected);
    }

    #[tokio::test]
    async fn stored_pass_never_produces_a_match() {
        let f = fixture();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        f.reactions.insert(Reaction::new(b, a, ReactionType::Pass));

        let reaction = f.engine.swipe(a, b, ReactionType::Like).unwrap();
        assert!(reaction.matched_at.is_none());
    }

    #[tokio::test]
    async fn pass_on_someone_who_liked_you_is_not_a_match() {
        let f = fixture();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let earlier = Reaction::new(b, a, ReactionType::Like);
        f.reactions.insert(earlier.clone());

        let reaction = f.engine.swipe(a, b, ReactionType::Pass).unwrap();

        assert!(reaction.matched_at.is_none());
        assert!(f.reactions.get(earlier.id).unwrap().matched_at.is_none());
    }

    #[tokio::test]
    async fn failed_notification_does_not_fail_the_match() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let f = fixture_with(MemoryReactionRepository::default(), MemoryNotificationRepository::failing_for(a));
        f.reactions.insert(Reaction::new(b, a, ReactionType::Like));

        let reaction = f.engine.swipe(a, b, ReactionType::Like).unwrap();
        assert!(reaction.is_matched());

        wait_for_notifications(&f.notifications, 2).await;
        assert_eq!(f.notifications.recipients(), vec![b]);
    }

    #[tokio::test]
    async fn storage_failures_are_opaque() {
        let f = fixture();
        *f.reactions.fail_writes.lock().unwrap() = true;

        let err = f.engine.swipe(Uuid::new_v4(), Uuid::new_v4(), ReactionType::Like).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.to_string(), "failed to create reaction");
    }

    #[tokio::test]
    async fn failed_match_write_aborts_without_notifying() {
        let f = fixture();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let earlier = Reaction::new(b, a, ReactionType::Like);
        f.reactions.insert(earlier.clone());
        *f.reactions.fail_writes.lock().unwrap() = true;

        let err = f.engine.swipe(a, b, ReactionType::Like).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.to_string(), "failed to record match");

        assert!(!f.reactions.get(earlier.id).unwrap().is_matched());
        assert!(f.reactions.find_by_actor_and_target(a, b).unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(f.notifications.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn match_stamps_the_reciprocal_before_creating_the_new_row() {
        let f = fixture();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let earlier = Reaction::new(b, a, ReactionType::Like);
        f.reactions.insert(earlier.clone());

        let reaction = f.engine.swipe(a, b, ReactionType::Like).unwrap();

        assert_eq!(
            *f.reactions.writes.lock().unwrap(),
            vec![("update", earlier.id), ("create", reaction.id)]
        );
    }

    #[tokio::test]
    async fn see_likes_distinguishes_unsubscribed_from_wrong_tier() {
        let f = fixture();
        let (basic, pro, free) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        f.subscriptions.subscribe(basic, 1);
        f.subscriptions.subscribe(pro, 2);
        f.reactions.insert(Reaction::new(Uuid::new_v4(), pro, ReactionType::Like));
        f.reactions.insert(Reaction::new(Uuid::new_v4(), pro, ReactionType::Pass));

        assert_eq!(f.engine.see_likes(free).unwrap_err().code(), ErrorCode::NotSubscribed);
        assert_eq!(f.engine.see_likes(basic).unwrap_err().code(), ErrorCode::NotProUser);

        let likes = f.engine.see_likes(pro).unwrap();
        assert_eq!(likes.len(), 1);
        assert!(likes.iter().all(|r| r.matched_user_id == pro && r.reaction_type == ReactionType::Like));
    }
}
