use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use jones_shared::errors::{AppError, AppResult, ErrorCode};
use jones_shared::types::auth::TokenPair;
use jones_shared::types::{Paginated, PaginationParams};

use crate::models::{Gender, Preference, User, UserImage, UserProfile};
use crate::repositories::{ReactionRepository, UserRepository};
use crate::services::password;
use crate::services::token_service::TokenKeys;

/// Registration input after transport-level validation.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub bio: String,
    pub gender: Gender,
    pub preference: Preference,
    pub birth_date: NaiveDate,
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Session {
    pub user: UserProfile,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    reactions: Arc<dyn ReactionRepository>,
    tokens: TokenKeys,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, reactions: Arc<dyn ReactionRepository>, tokens: TokenKeys) -> Self {
        Self { users, reactions, tokens }
    }

    #[tracing::instrument(skip_all, fields(email = %account.email))]
    pub fn register(&self, account: NewAccount) -> AppResult<Session> {
        password::validate_password(&account.password)?;

        let today = Utc::now().date_naive();
        if account.birth_date >= today {
            return Err(AppError::new(ErrorCode::ValidationError, "date_of_birth must be in the past"));
        }

        let email = account.email.trim().to_lowercase();
        if self.users.find_by_email(&email)?.is_some() {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists, "user already exists"));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            name: account.name,
            email,
            password_hash: password::hash_password(&account.password)?,
            bio: account.bio,
            gender: account.gender,
            preference: account.preference,
            birth_date: account.birth_date,
            stripe_customer_id: None,
            created_at: now,
            updated_at: None,
        };
        let images = UserImage::gallery(user.id, &account.images, now);

        self.users.create(&user, &images)?;
        tracing::info!(user_id = %user.id, "user registered");

        let tokens = self.tokens.issue_pair(user.id)?;
        Ok(Session {
            user: UserProfile::own(user, images, today),
            tokens,
        })
    }

    /// Unknown email and wrong password are reported identically.
    #[tracing::instrument(skip_all)]
    pub fn login(&self, email: &str, password: &str) -> AppResult<Session> {
        let invalid = || AppError::new(ErrorCode::InvalidCredentials, "invalid email or password");

        let user = self
            .users
            .find_by_email(&email.trim().to_lowercase())?
            .ok_or_else(invalid)?;
        if !password::verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }

        tracing::info!(user_id = %user.id, "user logged in");
        let tokens = self.tokens.issue_pair(user.id)?;
        let images = self.users.find_images(&[user.id])?;
        Ok(Session {
            user: UserProfile::own(user, images, Utc::now().date_naive()),
            tokens,
        })
    }

    pub fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self.tokens.verify_refresh(refresh_token)?;
        let user = self
            .users
            .find_by_id(claims.sub)?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;
        self.tokens.issue_pair(user.id)
    }

    pub fn profile(&self, user_id: Uuid) -> AppResult<UserProfile> {
        let user = self
            .users
            .find_by_id(user_id)?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;
        let images = self.users.find_images(&[user_id])?;
        Ok(UserProfile::own(user, images, Utc::now().date_naive()))
    }

    /// Candidates the caller has not swiped yet, restricted to the genders
    /// their preference accepts, newest first.
    #[tracing::instrument(skip(self, params))]
    pub fn feed(&self, user_id: Uuid, params: &PaginationParams) -> AppResult<Paginated<UserProfile>> {
        let me = self
            .users
            .find_by_id(user_id)?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;

        let mut exclude = self.reactions.find_swiped_user_ids(user_id)?;
        exclude.push(user_id);

        let (candidates, total) = self.users.find_candidates(
            &exclude,
            &me.preference.accepted_genders(),
            params.limit() as i64,
            params.offset() as i64,
        )?;

        let ids: Vec<Uuid> = candidates.iter().map(|u| u.id).collect();
        let mut galleries: HashMap<Uuid, Vec<UserImage>> = HashMap::new();
        for image in self.users.find_images(&ids)? {
            galleries.entry(image.user_id).or_default().push(image);
        }

        let today = Utc::now().date_naive();
        let items = candidates
            .into_iter()
            .map(|u| {
                let images = galleries.remove(&u.id).unwrap_or_default();
                UserProfile::public(u, images, today)
            })
            .collect();

        Ok(Paginated::new(items, total.max(0) as u64, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReactionType;
    use crate::models::Reaction;
    use crate::repositories::memory::{MemoryReactionRepository, MemoryUserRepository};
    use jones_shared::middleware::JwtSecret;

    struct Fixture {
        service: AccountService,
        reactions: Arc<MemoryReactionRepository>,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(MemoryUserRepository::default());
        let reactions = Arc::new(MemoryReactionRepository::default());
        let keys = TokenKeys::new(JwtSecret::new("a"), JwtSecret::new("r"), 60, 120);
        Fixture {
            service: AccountService::new(users, reactions.clone(), keys),
            reactions,
        }
    }

    fn account(email: &str, gender: Gender, preference: Preference) -> NewAccount {
        NewAccount {
            name: "Sam".into(),
            email: email.into(),
            password: "secret123".into(),
            bio: String::new(),
            gender,
            preference,
            birth_date: NaiveDate::from_ymd_opt(1995, 1, 1).unwrap(),
            images: vec!["https://img/a.jpg".into(), "https://img/b.jpg".into()],
        }
    }

    #[test]
    fn register_normalizes_email_and_marks_first_image_primary() {
        let f = fixture();
        let session = f
            .service
            .register(account("Sam@Example.COM", Gender::Male, Preference::Female))
            .unwrap();

        assert_eq!(session.user.email.as_deref(), Some("sam@example.com"));
        assert!(session.user.images[0].is_primary);
        assert!(!session.user.images[1].is_primary);
        assert!(session.user.age >= 30);
        assert!(!session.tokens.access_token.is_empty());
    }

    #[test]
    fn duplicate_email_is_rejected_case_insensitively() {
        let f = fixture();
        f.service.register(account("sam@example.com", Gender::Male, Preference::Female)).unwrap();
        let err = f
            .service
            .register(account("SAM@example.com", Gender::Male, Preference::Female))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmailAlreadyExists);
    }

    #[test]
    fn login_hides_which_credential_was_wrong() {
        let f = fixture();
        f.service.register(account("sam@example.com", Gender::Male, Preference::Both)).unwrap();

        assert!(f.service.login("SAM@example.com", "secret123").is_ok());
        assert_eq!(
            f.service.login("sam@example.com", "wrong1234").unwrap_err().code(),
            ErrorCode::InvalidCredentials
        );
        assert_eq!(
            f.service.login("nobody@example.com", "secret123").unwrap_err().code(),
            ErrorCode::InvalidCredentials
        );
    }

    #[test]
    fn refresh_requires_a_refresh_token() {
        let f = fixture();
        let session = f.service.register(account("sam@example.com", Gender::Male, Preference::Both)).unwrap();

        assert!(f.service.refresh(&session.tokens.refresh_token).is_ok());
        assert_eq!(
            f.service.refresh(&session.tokens.access_token).unwrap_err().code(),
            ErrorCode::TokenInvalid
        );
    }

    #[test]
    fn feed_past_the_last_page_is_empty() {
        let f = fixture();
        let me = f.service.register(account("me@example.com", Gender::Male, Preference::Both)).unwrap();
        f.service.register(account("a@example.com", Gender::Female, Preference::Both)).unwrap();

        let params = PaginationParams { page: u64::MAX, per_page: 20 };
        let page = f.service.feed(me.user.id, &params).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 1);
    }

    #[test]
    fn feed_excludes_self_swiped_and_unwanted_genders() {
        let f = fixture();
        let me = f.service.register(account("me@example.com", Gender::Male, Preference::Female)).unwrap();
        let swiped = f.service.register(account("a@example.com", Gender::Female, Preference::Male)).unwrap();
        let fresh = f.service.register(account("b@example.com", Gender::Female, Preference::Both)).unwrap();
        f.service.register(account("c@example.com", Gender::Male, Preference::Female)).unwrap();

        f.reactions.insert(Reaction::new(me.user.id, swiped.user.id, ReactionType::Pass));

        let page = f.service.feed(me.user.id, &PaginationParams::default()).unwrap();
        let ids: Vec<Uuid> = page.items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![fresh.user.id]);
        assert_eq!(page.total, 1);
        assert!(page.items[0].email.is_none());
        assert_eq!(page.items[0].images.len(), 2);
    }
}
