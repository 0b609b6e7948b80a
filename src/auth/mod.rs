//! Accounts: password hashing, access tokens and the signup/login flow

pub mod password;
pub mod service;
pub mod token;

pub use password::PasswordHasher;
pub use service::{AccessToken, AuthService};
pub use token::{Claims, TokenIssuer};

use crate::db::DbError;
use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailAlreadyRegistered,

    /// Unknown email and wrong password share this variant
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error(transparent)]
    Database(DbError),
}

impl From<DbError> for AuthError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::DuplicateEmail => AuthError::EmailAlreadyRegistered,
            other => AuthError::Database(other),
        }
    }
}
