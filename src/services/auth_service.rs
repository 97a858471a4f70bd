//! Authentication service - registration, login and JWT issuance.
//!
//! Access and refresh tokens are both HS-signed JWTs told apart by their
//! `type` claim; each is only accepted where its kind is expected.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{
    Config, SECONDS_PER_MINUTE, TOKEN_KIND_ACCESS, TOKEN_KIND_REFRESH,
    TOKEN_TYPE_BEARER,
};
use crate::domain::{Password, User};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

/// Argon2 hash that never matches, verified when the email is unknown so
/// both login failures cost the same.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$ZHVtbXlzYWx0MTIzNDU2$3v1bZkS5BCYy7Vn6xPbsBwGkZL6bnjRrMIZqZyQGx1I";

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    /// `access` or `refresh`
    #[serde(rename = "type")]
    pub kind: String,
    pub exp: i64,
    pub iat: i64,
}

/// Token pair returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Access token lifetime in seconds
    #[schema(example = 1800)]
    pub expires_in: i64,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account after enforcing the password rules.
    async fn register(&self, email: String, password: String) -> AppResult<User>;

    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse>;

    /// Exchange a refresh token for a fresh pair.
    async fn refresh(&self, refresh_token: &str) -> AppResult<TokenResponse>;

    /// The active account behind an authenticated request
    async fn current_user(&self, user_id: Uuid) -> AppResult<User>;

    /// Verify an access token and extract its claims.
    fn verify_token(&self, token: &str) -> AppResult<Claims>;
}

/// Signs and checks tokens with the configured secret and algorithm.
struct TokenIssuer<'a> {
    config: &'a Config,
}

impl TokenIssuer<'_> {
    fn sign(&self, user: &User, kind: &str, lifetime: Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role.to_string(),
            kind: kind.to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        };

        Ok(encode(
            &Header::new(self.config.jwt_algorithm),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret_bytes()),
        )?)
    }

    fn pair(&self, user: &User) -> AppResult<TokenResponse> {
        let access_minutes = self.config.access_token_expire_minutes;

        Ok(TokenResponse {
            access_token: self.sign(user, TOKEN_KIND_ACCESS, Duration::minutes(access_minutes))?,
            refresh_token: self.sign(
                user,
                TOKEN_KIND_REFRESH,
                Duration::days(self.config.refresh_token_expire_days),
            )?,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: access_minutes * SECONDS_PER_MINUTE,
        })
    }

    fn verify(&self, token: &str, kind: &str) -> AppResult<Claims> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret_bytes()),
            &Validation::new(self.config.jwt_algorithm),
        )?
        .claims;

        if claims.kind != kind {
            return Err(AppError::Unauthorized);
        }
        Ok(claims)
    }
}

/// [`AuthService`] backed by the user repository.
pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    config: Config,
}

impl<U: UnitOfWork> Authenticator<U> {
    pub fn new(uow: Arc<U>, config: Config) -> Self {
        Self { uow, config }
    }

    fn issuer(&self) -> TokenIssuer<'_> {
        TokenIssuer {
            config: &self.config,
        }
    }

    /// The user a token names. A deleted account no longer authenticates.
    async fn active_user(&self, user_id: Uuid) -> AppResult<User> {
        let user = self
            .uow
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        if !user.is_active {
            return Err(AppError::InactiveUser);
        }
        Ok(user)
    }
}

#[async_trait]
impl<U: UnitOfWork> AuthService for Authenticator<U> {
    async fn register(&self, email: String, password: String) -> AppResult<User> {
        Password::check_strength(&password)?;

        let email = email.trim().to_lowercase();
        if self.uow.users().find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("User"));
        }

        let password_hash = Password::new(&password)?.into_string();
        let user = self.uow.users().create(email, password_hash).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse> {
        let email = email.trim().to_lowercase();
        let user = self.uow.users().find_by_email(&email).await?;

        let hash = user
            .as_ref()
            .map(|u| u.password_hash.clone())
            .unwrap_or_else(|| DUMMY_HASH.to_string());
        let password_valid = Password::from_hash(hash).verify(&password);

        let user = match user {
            Some(user) if password_valid => user,
            _ => return Err(AppError::InvalidCredentials),
        };
        if !user.is_active {
            return Err(AppError::InactiveUser);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.issuer().pair(&user)
    }

    async fn refresh(&self, refresh_token: &str) -> AppResult<TokenResponse> {
        let claims = self.issuer().verify(refresh_token, TOKEN_KIND_REFRESH)?;
        let user = self.active_user(claims.sub).await?;
        self.issuer().pair(&user)
    }

    async fn current_user(&self, user_id: Uuid) -> AppResult<User> {
        self.active_user(user_id).await
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        self.issuer().verify(token, TOKEN_KIND_ACCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{MockUserRepository, StubUnitOfWork};

    fn config() -> Config {
        Config::from_lookup(|_| None).unwrap()
    }

    fn user() -> User {
        User::new(Uuid::new_v4(), "a@b.io".to_string(), "hash".to_string())
    }

    #[test]
    fn test_pair_carries_typed_tokens() {
        let config = config();
        let issuer = TokenIssuer { config: &config };
        let pair = issuer.pair(&user()).unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 30 * 60);
        assert_eq!(issuer.verify(&pair.access_token, TOKEN_KIND_ACCESS).unwrap().kind, "access");
        assert_eq!(issuer.verify(&pair.refresh_token, TOKEN_KIND_REFRESH).unwrap().kind, "refresh");
    }

    #[test]
    fn test_wrong_token_kind_rejected() {
        let config = config();
        let issuer = TokenIssuer { config: &config };
        let pair = issuer.pair(&user()).unwrap();

        assert!(matches!(
            issuer.verify(&pair.refresh_token, TOKEN_KIND_ACCESS),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            issuer.verify(&pair.access_token, TOKEN_KIND_REFRESH),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_garbage_token_is_jwt_error() {
        let config = config();
        let issuer = TokenIssuer { config: &config };
        assert!(matches!(
            issuer.verify("not.a.token", TOKEN_KIND_ACCESS),
            Err(AppError::Jwt(_))
        ));
    }

    fn authenticator(users: MockUserRepository) -> Authenticator<StubUnitOfWork> {
        let uow = StubUnitOfWork {
            users: Arc::new(users),
            ..Default::default()
        };
        Authenticator::new(Arc::new(uow), config())
    }

    #[tokio::test]
    async fn test_deleted_user_is_unauthorized() {
        let gone = user();
        let pair = TokenIssuer { config: &config() }.pair(&gone).unwrap();
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));

        let auth = authenticator(users);
        assert!(matches!(
            auth.current_user(gone.id).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            auth.refresh(&pair.refresh_token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let pair = TokenIssuer { config: &config() }.pair(&user()).unwrap();
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().never();

        let auth = authenticator(users);
        assert!(matches!(
            auth.verify_token(&pair.refresh_token),
            Err(AppError::Unauthorized)
        ));
        assert_eq!(auth.verify_token(&pair.access_token).unwrap().kind, "access");
    }

    #[tokio::test]
    async fn test_register_lowercases_email() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .withf(|email| email == "someone@example.com")
            .returning(|_| Ok(None));
        users
            .expect_create()
            .withf(|email, hash| email == "someone@example.com" && hash.starts_with("$argon2"))
            .returning(|email, hash| Ok(User::new(Uuid::new_v4(), email, hash)));

        let auth = authenticator(users);
        let created = auth
            .register(" Someone@Example.COM ".to_string(), "Password123!".to_string())
            .await
            .unwrap();
        assert_eq!(created.email, "someone@example.com");
    }

    #[tokio::test]
    async fn test_register_existing_email_is_conflict() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(Some(user())));
        users.expect_create().never();

        let auth = authenticator(users);
        let result = auth
            .register("a@b.io".to_string(), "Password123!".to_string())
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
