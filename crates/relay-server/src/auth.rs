//! Local email/password authentication.
//!
//! Passwords are checked against Argon2 PHC hashes held by the user service.
//! An unknown email and a wrong password produce the same
//! [`AuthError::InvalidCredentials`].

use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use serde::Deserialize;

use crate::users::{DirectoryError, SharedUserDirectory, User};

/// Login form fields.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Authentication errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// Unknown email or wrong password.
    #[error("Invalid credentials.")]
    InvalidCredentials,

    /// The user service could not be consulted.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Verifies login credentials.
#[async_trait]
pub trait Authenticator: Send + Sync + std::fmt::Debug {
    async fn verify(&self, credentials: &Credentials) -> Result<User, AuthError>;
}

/// Shared authenticator for use across async contexts.
pub type SharedAuthenticator = Arc<dyn Authenticator>;

/// Authenticator that looks users up by email and checks the password hash.
#[derive(Debug, Clone)]
pub struct LocalPasswordAuthenticator {
    users: SharedUserDirectory,
}

impl LocalPasswordAuthenticator {
    pub fn new(users: SharedUserDirectory) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Authenticator for LocalPasswordAuthenticator {
    async fn verify(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let Some(user) = self.users.find_by_email(&credentials.email).await? else {
            // Keep the miss path as slow as a hash check.
            let _ = hash_password(&credentials.password);
            tracing::debug!(email = %credentials.email, "Login for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if verify_password(&credentials.password, &user.password_hash) {
            Ok(user)
        } else {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Hash `password` into an Argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check `password` against a PHC hash. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is not a valid PHC string");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::InMemoryUserDirectory;

    fn authenticator_with(email: &str, password: &str) -> LocalPasswordAuthenticator {
        let user = User {
            id: "1".to_string(),
            email: email.to_string(),
            password_hash: hash_password(password).unwrap(),
        };
        LocalPasswordAuthenticator::new(Arc::new(InMemoryUserDirectory::with_users([user])))
    }

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!verify_password("anything", "plaintext"));
        assert!(!verify_password("", ""));
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let auth = authenticator_with("a@b.com", "pw");
        let user = auth.verify(&creds("a@b.com", "pw")).await.unwrap();
        assert_eq!(user.id, "1");
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
        let auth = authenticator_with("a@b.com", "pw");

        let unknown = auth.verify(&creds("x@b.com", "pw")).await.unwrap_err();
        let wrong = auth.verify(&creds("a@b.com", "nope")).await.unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let debug = format!("{:?}", creds("a@b.com", "topsecret"));
        assert!(debug.contains("a@b.com"));
        assert!(!debug.contains("topsecret"));
    }
}
