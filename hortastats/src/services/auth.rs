//! Authentication service
//!
//! A single administrator credential pair, checked against the
//! configured values. Issued tokens are opaque.

use crate::config::Config;
use crate::database::User;
use crate::error::{AppError, Result};
use uuid::Uuid;

/// Identity of the single administrator
pub fn admin_user(username: &str) -> User {
    User {
        id: 1,
        username: username.to_string(),
        role: "admin".to_string(),
    }
}

/// Service for checking credentials and issuing tokens
#[derive(Clone)]
pub struct AuthService {
    username: String,
    password: String,
}

impl AuthService {
    pub fn new(config: &Config) -> Self {
        Self {
            username: config.admin_username.clone(),
            password: config.admin_password.clone(),
        }
    }

    /// Check a credential pair, returning a fresh token and the identity
    pub fn authenticate(&self, username: &str, password: &str) -> Result<(String, User)> {
        if username != self.username || password != self.password {
            tracing::warn!("Rejected login for user: {}", username);
            return Err(AppError::InvalidCredentials);
        }

        let token = Uuid::new_v4().to_string();
        tracing::info!("Issued token for user: {}", username);

        Ok((token, admin_user(username)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_configured_pair() {
        let service = AuthService::new(&Config::default());

        let (token, user) = service.authenticate("admin", "admin123").unwrap();

        assert!(!token.is_empty());
        assert_eq!(user.role, "admin");
    }

    #[test]
    fn test_rejects_other_pairs() {
        let config = Config {
            admin_password: "s3cret".to_string(),
            ..Config::default()
        };
        let service = AuthService::new(&config);

        assert!(matches!(
            service.authenticate("admin", "admin123"),
            Err(AppError::InvalidCredentials)
        ));
        assert!(service.authenticate("admin", "s3cret").is_ok());
    }
}
