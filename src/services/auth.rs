use std::sync::Arc;

use serde::Deserialize;

use super::ServiceError;
use crate::auth::password::verify_password;
use crate::auth::TokenService;
use crate::constants::messages;
use crate::database::UserRepository;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub struct AuthService {
    users: UserRepository,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(users: UserRepository, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    /// Checks the credentials and returns a signed session token.
    pub async fn login(&self, request: &LoginRequest) -> Result<String, ServiceError> {
        let email = request.email.trim();
        if email.is_empty() || request.password.is_empty() {
            return Err(ServiceError::Validation("Email and password are required".to_string()));
        }

        tracing::info!("Login attempt for {}", email);

        let user = self
            .users
            .find_credentials_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::InvalidCredentials(messages::USER_NOT_FOUND.to_string()))?;

        if !user.is_active {
            return Err(ServiceError::InvalidCredentials(messages::USER_INACTIVE.to_string()));
        }

        if !verify_password(request.password.clone(), user.password_hash.clone()).await? {
            tracing::warn!("Invalid password for {}", email);
            return Err(ServiceError::InvalidCredentials(messages::INVALID_CREDENTIALS.to_string()));
        }

        Ok(self.tokens.issue(&user)?)
    }
}
