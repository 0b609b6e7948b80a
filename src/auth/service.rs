//! Signup and login over the user table

use crate::auth::{AuthError, PasswordHasher, TokenIssuer};
use crate::db::{UserRecord, UserStore};
use crate::observability::metrics;
use serde::Serialize;
use tracing::{info, warn};

/// Response body of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct AuthService {
    users: UserStore,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: UserStore, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Register a new account. Duplicates are rejected before hashing or writing.
    pub async fn signup(&self, email: &str, password: &str) -> Result<UserRecord, AuthError> {
        if self.users.find_by_email(email).await?.is_some() {
            warn!(email = %email, "Signup rejected: email already registered");
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let hashed = self.hasher.hash(password).await?;
        let user = self.users.insert(email, &hashed).await?;

        metrics().signup_completed();
        info!(email = %email, user_id = user.id, "User registered");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AccessToken, AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            self.hasher.verify_dummy(password).await;
            metrics().login_attempted(false);
            warn!(email = %email, "Login failed");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.hashed_password).await? {
            metrics().login_attempted(false);
            warn!(email = %email, "Login failed");
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.tokens.create_access_token(&user.email)?;
        metrics().login_attempted(true);
        info!(email = %email, "Login succeeded");
        Ok(AccessToken {
            access_token,
            token_type: "bearer",
        })
    }
}
