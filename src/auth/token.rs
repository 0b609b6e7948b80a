//! HS256 access tokens

use crate::auth::AuthError;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Account email
    pub sub: String,
    /// Expiry, unix seconds
    pub exp: i64,
}

/// Issues and verifies access tokens with a shared secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_minutes", &self.ttl.num_minutes())
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn create_access_token(&self, subject: &str) -> Result<String, AuthError> {
        self.create_token_expiring_at(subject, (Utc::now() + self.ttl).timestamp())
    }

    fn create_token_expiring_at(&self, subject: &str, exp: i64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_claims() {
        let issuer = TokenIssuer::new("secret", 30);
        let token = issuer.create_access_token("a@example.com").unwrap();
        let claims = issuer.verify_access_token(&token).unwrap();

        assert_eq!(claims.sub, "a@example.com");
        let remaining = claims.exp - Utc::now().timestamp();
        assert!((29 * 60..=30 * 60).contains(&remaining), "remaining = {remaining}");
    }

    #[test]
    fn test_expired_token() {
        let issuer = TokenIssuer::new("secret", 30);
        let token = issuer
            .create_token_expiring_at("a@example.com", Utc::now().timestamp() - 600)
            .unwrap();
        assert!(matches!(
            issuer.verify_access_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let token = TokenIssuer::new("one", 30)
            .create_access_token("a@example.com")
            .unwrap();
        assert!(matches!(
            TokenIssuer::new("two", 30).verify_access_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_token() {
        let issuer = TokenIssuer::new("secret", 30);
        assert!(matches!(
            issuer.verify_access_token("not.a.jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_debug_hides_keys() {
        let debug = format!("{:?}", TokenIssuer::new("super-secret", 30));
        assert!(!debug.contains("super-secret"));
    }
}
