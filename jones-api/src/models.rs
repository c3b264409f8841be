use std::io::Write;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{notifications, reactions, subscription_plans, subscriptions, user_images, users};

/// Plan capability that lifts the daily swipe cap.
pub const FEATURE_UNLIMITED_LIKES: &str = "unlimited_likes";
/// Plan capability that exposes who liked you.
pub const FEATURE_SEE_LIKES: &str = "see_likes";

/// Text-backed enums stored as their upper-case wire name.
macro_rules! text_column_enum {
    ($ty:ty) => {
        impl ToSql<Text, Pg> for $ty {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $ty {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = std::str::from_utf8(bytes.as_bytes())?;
                raw.parse::<$ty>().map_err(Into::into)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReactionType {
    Like,
    Pass,
}

impl ReactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionType::Like => "LIKE",
            ReactionType::Pass => "PASS",
        }
    }
}

impl std::str::FromStr for ReactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIKE" => Ok(ReactionType::Like),
            "PASS" => Ok(ReactionType::Pass),
            _ => Err(format!("unknown reaction type: {s}")),
        }
    }
}

text_column_enum!(ReactionType);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MALE" => Ok(Gender::Male),
            "FEMALE" => Ok(Gender::Female),
            _ => Err(format!("unknown gender: {s}")),
        }
    }
}

text_column_enum!(Gender);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "UPPERCASE")]
pub enum Preference {
    Male,
    Female,
    Both,
}

impl Preference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preference::Male => "MALE",
            Preference::Female => "FEMALE",
            Preference::Both => "BOTH",
        }
    }

    /// Genders a user with this preference is shown in the feed.
    pub fn accepted_genders(&self) -> Vec<Gender> {
        match self {
            Preference::Male => vec![Gender::Male],
            Preference::Female => vec![Gender::Female],
            Preference::Both => vec![Gender::Male, Gender::Female],
        }
    }
}

impl std::str::FromStr for Preference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MALE" => Ok(Preference::Male),
            "FEMALE" => Ok(Preference::Female),
            "BOTH" => Ok(Preference::Both),
            _ => Err(format!("unknown preference: {s}")),
        }
    }
}

text_column_enum!(Preference);

// --- User ---

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable)]
#[diesel(table_name = users, check_for_backend(Pg))]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub bio: String,
    pub gender: Gender,
    pub preference: Preference,
    pub birth_date: NaiveDate,
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        age_on(self.birth_date, today)
    }
}

/// Whole years between `birth_date` and `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Identifiable, Serialize)]
#[diesel(table_name = user_images, check_for_backend(Pg))]
pub struct UserImage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub position: i32,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

impl UserImage {
    /// Builds the ordered gallery for a new profile; the first image is primary.
    pub fn gallery(user_id: Uuid, urls: &[String], now: DateTime<Utc>) -> Vec<Self> {
        urls.iter()
            .enumerate()
            .map(|(i, url)| Self {
                id: Uuid::now_v7(),
                user_id,
                url: url.clone(),
                position: i as i32,
                is_primary: i == 0,
                created_at: now,
            })
            .collect()
    }
}

/// Profile as returned to clients. `email` is only present on the caller's
/// own profile.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub bio: String,
    pub gender: Gender,
    pub preference: Preference,
    pub age: i32,
    pub images: Vec<UserImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn own(user: User, images: Vec<UserImage>, today: NaiveDate) -> Self {
        let email = Some(user.email.clone());
        Self { email, ..Self::public(user, images, today) }
    }

    pub fn public(user: User, images: Vec<UserImage>, today: NaiveDate) -> Self {
        Self {
            age: user.age_on(today),
            id: user.id,
            name: user.name,
            email: None,
            bio: user.bio,
            gender: user.gender,
            preference: user.preference,
            images,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// --- Reaction ---

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Identifiable, AsChangeset, Serialize)]
#[diesel(table_name = reactions, check_for_backend(Pg), treat_none_as_null = true)]
pub struct Reaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub matched_user_id: Uuid,
    #[serde(rename = "type")]
    pub reaction_type: ReactionType,
    pub matched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Reaction {
    pub fn new(user_id: Uuid, matched_user_id: Uuid, reaction_type: ReactionType) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            matched_user_id,
            reaction_type,
            matched_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched_at.is_some()
    }
}

// --- Subscriptions ---

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = subscription_plans, check_for_backend(Pg))]
pub struct SubscriptionPlan {
    pub id: i32,
    pub name: String,
    pub price_cents: i64,
    pub features: Vec<String>,
    #[serde(skip_serializing)]
    pub stripe_price_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SubscriptionPlan {
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Identifiable, AsChangeset, Serialize)]
#[diesel(table_name = subscriptions, check_for_backend(Pg), treat_none_as_null = true)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: i32,
    #[serde(skip_serializing)]
    pub stripe_subscription_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn new(
        user_id: Uuid,
        plan_id: i32,
        stripe_subscription_id: Option<String>,
        started_at: DateTime<Utc>,
        expired_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            plan_id,
            stripe_subscription_id,
            started_at,
            expired_at,
            canceled_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Active means never cancelled and not yet expired.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.canceled_at.is_none() && self.expired_at > now
    }
}

// --- Notification ---

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Identifiable, Serialize)]
#[diesel(table_name = notifications, check_for_backend(Pg))]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            content,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}
