//! bcrypt hashing off the async executor

use crate::auth::AuthError;
use tokio::task;

const DUMMY_PASSWORD: &str = "agentqa-timing-equalizer";

/// Hashes and verifies passwords at a fixed bcrypt cost
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: String,
}

impl PasswordHasher {
    /// Builds the hasher and precomputes a dummy hash at the same cost
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        let dummy_hash =
            bcrypt::hash(DUMMY_PASSWORD, cost).map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(Self { cost, dummy_hash })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let cost = self.cost;
        task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// A malformed stored hash verifies as `false`
    pub async fn verify(&self, password: &str, hashed: &str) -> Result<bool, AuthError> {
        let password = password.to_string();
        let hashed = hashed.to_string();
        let outcome = task::spawn_blocking(move || bcrypt::verify(password, &hashed))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(outcome.unwrap_or(false))
    }

    /// Burn one verification so a missing account costs the same as a wrong password
    pub async fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4).unwrap()
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = hasher();
        let hashed = hasher.hash("hunter2").await.unwrap();
        assert_ne!(hashed, "hunter2");
        assert!(hasher.verify("hunter2", &hashed).await.unwrap());
        assert!(!hasher.verify("hunter3", &hashed).await.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let hasher = hasher();
        let a = hasher.hash("same").await.unwrap();
        let b = hasher.hash("same").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_malformed_hash_is_false() {
        assert!(!hasher().verify("pw", "not-a-bcrypt-hash").await.unwrap());
    }

    #[test]
    fn test_invalid_cost() {
        assert!(matches!(PasswordHasher::new(2), Err(AuthError::Hashing(_))));
    }

    #[tokio::test]
    async fn test_verify_dummy_completes() {
        hasher().verify_dummy("anything").await;
    }
}
