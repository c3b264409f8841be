use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use jones_shared::clients::db::{checkout, DbPool};
use jones_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Gender, Notification, Reaction, ReactionType, Subscription, SubscriptionPlan, User, UserImage};
use crate::schema::{notifications, reactions, subscription_plans, subscriptions, user_images, users};
use crate::services::quota::DayWindow;

use super::{NotificationRepository, ReactionRepository, SubscriptionRepository, UserRepository};

// --- Users ---

#[derive(Clone)]
pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for PgUserRepository {
    fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let mut conn = checkout(&self.pool)?;
        let user = users::table
            .find(id)
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(user)
    }

    fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let mut conn = checkout(&self.pool)?;
        let user = users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(user)
    }

    fn create(&self, user: &User, images: &[UserImage]) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        conn.transaction::<_, DieselError, _>(|conn| {
            diesel::insert_into(users::table).values(user).execute(conn)?;
            diesel::insert_into(user_images::table).values(images).execute(conn)?;
            Ok(())
        })
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                AppError::new(ErrorCode::EmailAlreadyExists, "user already exists")
            }
            other => AppError::Database(other),
        })
    }

    fn set_stripe_customer_id(&self, user_id: Uuid, customer_id: &str) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        let updated = diesel::update(users::table.find(user_id))
            .set((
                users::stripe_customer_id.eq(customer_id),
                users::updated_at.eq(Some(Utc::now())),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(AppError::new(ErrorCode::UserNotFound, "user not found"));
        }
        Ok(())
    }

    fn find_images(&self, user_ids: &[Uuid]) -> AppResult<Vec<UserImage>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = checkout(&self.pool)?;
        let images = user_images::table
            .filter(user_images::user_id.eq_any(user_ids))
            .order((user_images::user_id, user_images::position))
            .select(UserImage::as_select())
            .load(&mut conn)?;
        Ok(images)
    }

    fn find_candidates(
        &self,
        exclude: &[Uuid],
        genders: &[Gender],
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<User>, i64)> {
        let mut conn = checkout(&self.pool)?;

        let candidates = || -> users::BoxedQuery<'static, Pg> {
            users::table
                .filter(users::id.ne_all(exclude.to_vec()))
                .filter(users::gender.eq_any(genders.to_vec()))
                .into_boxed()
        };

        let total: i64 = candidates().count().get_result(&mut conn)?;
        let items = candidates()
            .order(users::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(User::as_select())
            .load(&mut conn)?;

        Ok((items, total))
    }
}

// --- Reactions ---

#[derive(Clone)]
pub struct PgReactionRepository {
    pool: DbPool,
}

impl PgReactionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// The unique (user_id, matched_user_id) index is the real duplicate guard;
/// surface its violation as the same domain error as the read-side check.
fn reaction_write_error(err: DieselError) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            AppError::new(ErrorCode::AlreadySwiped, "user has already swiped")
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            AppError::new(ErrorCode::UserNotFound, "user not found")
        }
        other => AppError::Database(other),
    }
}

impl ReactionRepository for PgReactionRepository {
    fn find_by_actor_and_target(&self, actor_id: Uuid, target_id: Uuid) -> AppResult<Option<Reaction>> {
        let mut conn = checkout(&self.pool)?;
        let reaction = reactions::table
            .filter(reactions::user_id.eq(actor_id))
            .filter(reactions::matched_user_id.eq(target_id))
            .select(Reaction::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(reaction)
    }

    fn find_reciprocal_like(&self, actor_id: Uuid, target_id: Uuid) -> AppResult<Option<Reaction>> {
        let mut conn = checkout(&self.pool)?;
        let reaction = reactions::table
            .filter(reactions::user_id.eq(target_id))
            .filter(reactions::matched_user_id.eq(actor_id))
            .filter(reactions::reaction_type.eq(ReactionType::Like))
            .select(Reaction::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(reaction)
    }

    fn count_swipes_today(&self, actor_id: Uuid, today: &DayWindow) -> AppResult<i64> {
        let mut conn = checkout(&self.pool)?;
        let count = reactions::table
            .filter(reactions::user_id.eq(actor_id))
            .filter(reactions::created_at.between(today.start, today.end))
            .count()
            .get_result(&mut conn)?;
        Ok(count)
    }

    fn find_swiped_user_ids(&self, actor_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut conn = checkout(&self.pool)?;
        let ids = reactions::table
            .filter(reactions::user_id.eq(actor_id))
            .select(reactions::matched_user_id)
            .load(&mut conn)?;
        Ok(ids)
    }

    fn find_likes_received(&self, user_id: Uuid) -> AppResult<Vec<Reaction>> {
        let mut conn = checkout(&self.pool)?;
        let likes = reactions::table
            .filter(reactions::matched_user_id.eq(user_id))
            .filter(reactions::reaction_type.eq(ReactionType::Like))
            .order(reactions::created_at.desc())
            .select(Reaction::as_select())
            .load(&mut conn)?;
        Ok(likes)
    }

    fn create(&self, reaction: &Reaction) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::insert_into(reactions::table)
            .values(reaction)
            .execute(&mut conn)
            .map_err(reaction_write_error)?;
        Ok(())
    }

    fn update(&self, reaction: &Reaction) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::update(reactions::table.find(reaction.id))
            .set(reaction)
            .execute(&mut conn)?;
        Ok(())
    }

    fn record_match(&self, reciprocal: &Reaction, reaction: &Reaction) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        conn.transaction::<_, DieselError, _>(|conn| {
            diesel::update(reactions::table.find(reciprocal.id))
                .set(reciprocal)
                .execute(conn)?;
            diesel::insert_into(reactions::table).values(reaction).execute(conn)?;
            Ok(())
        })
        .map_err(reaction_write_error)
    }
}

// --- Subscriptions ---

#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: DbPool,
}

impl PgSubscriptionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl SubscriptionRepository for PgSubscriptionRepository {
    fn find_active_by_user_id(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Subscription>> {
        let mut conn = checkout(&self.pool)?;
        let subscription = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::canceled_at.is_null())
            .filter(subscriptions::expired_at.gt(now))
            .order(subscriptions::created_at.desc())
            .select(Subscription::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(subscription)
    }

    fn find_by_stripe_subscription_id(&self, stripe_subscription_id: &str) -> AppResult<Option<Subscription>> {
        let mut conn = checkout(&self.pool)?;
        let subscription = subscriptions::table
            .filter(subscriptions::stripe_subscription_id.eq(stripe_subscription_id))
            .order(subscriptions::created_at.desc())
            .select(Subscription::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(subscription)
    }

    fn create(&self, subscription: &Subscription) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::insert_into(subscriptions::table)
            .values(subscription)
            .execute(&mut conn)?;
        Ok(())
    }

    fn update(&self, subscription: &Subscription) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::update(subscriptions::table.find(subscription.id))
            .set(subscription)
            .execute(&mut conn)?;
        Ok(())
    }

    fn find_plan_by_id(&self, plan_id: i32) -> AppResult<Option<SubscriptionPlan>> {
        let mut conn = checkout(&self.pool)?;
        let plan = subscription_plans::table
            .find(plan_id)
            .select(SubscriptionPlan::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(plan)
    }

    fn find_plan_by_price_id(&self, stripe_price_id: &str) -> AppResult<Option<SubscriptionPlan>> {
        let mut conn = checkout(&self.pool)?;
        let plan = subscription_plans::table
            .filter(subscription_plans::stripe_price_id.eq(stripe_price_id))
            .select(SubscriptionPlan::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(plan)
    }

    fn find_all_plans(&self) -> AppResult<Vec<SubscriptionPlan>> {
        let mut conn = checkout(&self.pool)?;
        let plans = subscription_plans::table
            .order(subscription_plans::price_cents)
            .select(SubscriptionPlan::as_select())
            .load(&mut conn)?;
        Ok(plans)
    }
}

// --- Notifications ---

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: DbPool,
}

impl PgNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl NotificationRepository for PgNotificationRepository {
    fn create(&self, notification: &Notification) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::insert_into(notifications::table)
            .values(notification)
            .execute(&mut conn)?;
        Ok(())
    }
}
