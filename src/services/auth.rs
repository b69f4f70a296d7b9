//! Authentication service: configured accounts, password checks and session tokens

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    config::{AuthConfig, UserAccount},
    error::{AppError, AppResult},
    models::user::UserClaims,
};

#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<Vec<UserAccount>>,
    jwt_secret: String,
    session_hours: i64,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        if config.users.is_empty() {
            tracing::warn!("No user accounts configured; protected pages will be unreachable");
        }
        Self {
            accounts: Arc::new(config.users),
            jwt_secret: config.jwt_secret,
            session_hours: config.session_hours,
        }
    }

    /// Check credentials and open a session. Returns the claims and their signed token.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(UserClaims, String)> {
        let invalid = || AppError::Authentication("Invalid username or password".to_string());

        let account = self
            .accounts
            .iter()
            .find(|a| a.username == username)
            .ok_or_else(invalid)?;

        if !verify_password(password, &account.password_hash)? {
            tracing::warn!(username, "Failed login attempt");
            return Err(invalid());
        }

        let claims = UserClaims::new(&account.username, account.role, self.session_hours);
        let token = claims
            .create_token(&self.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))?;

        tracing::info!(username, role = %account.role, "User logged in");
        Ok((claims, token))
    }

    /// Decode and validate a session token
    pub fn decode(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))
    }
}

/// Produce an argon2 PHC string for configuration files
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| AppError::Internal(format!("Invalid stored password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
