use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use jones_shared::errors::{AppError, AppResult};
use jones_shared::middleware::{decode_claims, JwtSecret};
use jones_shared::types::auth::{Claims, TokenKind, TokenPair};

/// Signing material for access and refresh tokens. The two kinds use
/// separate secrets.
#[derive(Clone)]
pub struct TokenKeys {
    access: JwtSecret,
    refresh: JwtSecret,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl TokenKeys {
    pub fn new(access: JwtSecret, refresh: JwtSecret, access_ttl: i64, refresh_ttl: i64) -> Self {
        Self {
            access,
            refresh,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue_pair(&self, user_id: Uuid) -> AppResult<TokenPair> {
        let access_token = sign(&Claims::new(user_id, TokenKind::Access, self.access_ttl), &self.access)?;
        let refresh_token = sign(&Claims::new(user_id, TokenKind::Refresh, self.refresh_ttl), &self.refresh)?;
        Ok(TokenPair::new(access_token, refresh_token, self.access_ttl))
    }

    pub fn verify_access(&self, token: &str) -> AppResult<Claims> {
        decode_claims(token, self.access.as_bytes(), TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> AppResult<Claims> {
        decode_claims(token, self.refresh.as_bytes(), TokenKind::Refresh)
    }
}

fn sign(claims: &Claims, secret: &JwtSecret) -> AppResult<String> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))
}
