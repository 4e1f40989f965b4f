//! Identity resolution: turns a bearer credential into a [`UserIdentity`].
//!
//! Credentials are HS256 JWTs issued by the external identity provider. The
//! subject must name a user row; everything else about the user is read from
//! storage so role changes apply on the next connection.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use parley_config::AuthConfig;
use parley_database::{DatabaseError, Pool as SqlitePool, UserRecord, UserRepository};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Longer lifetimes are clamped to a century.
const MAX_TOKEN_TTL_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,
    #[error("invalid credential: {0}")]
    InvalidToken(String),
    #[error("credential expired")]
    Expired,
    #[error("unknown user {0}")]
    UnknownUser(String),
    #[error("failed to sign credential: {0}")]
    TokenCreation(String),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

/// The authenticated actor behind a connection or request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
}

impl From<UserRecord> for UserIdentity {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            email: user.email,
            avatar_url: user.avatar_url,
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Clone)]
pub struct Authenticator {
    users: UserRepository,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    token_ttl: Duration,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: &AuthConfig) -> Self {
        let ttl_seconds = i64::try_from(config.token_ttl_seconds)
            .unwrap_or(MAX_TOKEN_TTL_SECONDS)
            .min(MAX_TOKEN_TTL_SECONDS);

        Self {
            users: UserRepository::new(pool),
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            token_ttl: Duration::seconds(ttl_seconds),
        }
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Resolve a presented credential to the identity it names.
    pub async fn authenticate(&self, credential: Option<&str>) -> Result<UserIdentity, AuthError> {
        let token = credential
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        let claims = self.validate_token(token)?;

        let user = self
            .users
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| AuthError::UnknownUser(claims.sub.clone()))?;

        debug!(user_id = %user.id, "credential resolved");
        Ok(user.into())
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => {
                    warn!(error = %err, "rejected credential");
                    AuthError::InvalidToken(err.to_string())
                }
            })
    }

    /// Sign a credential for an existing user. Used by dev tooling and tests.
    pub fn issue_token(&self, user: &UserIdentity) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| AuthError::TokenCreation("expiry out of range".to_string()))?;

        let claims = Claims {
            sub: user.id.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            role: if user.is_admin { "admin" } else { "user" }.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| AuthError::TokenCreation(err.to_string()))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
