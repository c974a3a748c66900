pub mod cookies;
pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::UserCredentials;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: Uuid,
    pub name: String,
}

/// JWT payload describing the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub role: NamedRef,
    pub company: NamedRef,
    pub department: NamedRef,
    pub is_active: bool,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn for_user(user: &UserCredentials, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            phone: user.phone.clone(),
            avatar: user.avatar_url.clone(),
            role: NamedRef {
                id: user.role_id,
                name: user.role_name.clone(),
            },
            company: NamedRef {
                id: user.company_id,
                name: user.company_name.clone(),
            },
            department: NamedRef {
                id: user.department_id,
                name: user.department_name.clone(),
            },
            is_active: user.is_active,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT generation error: {0}")]
    Generation(String),

    #[error("Invalid JWT token: {0}")]
    Invalid(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,
}

/// Signs and verifies HS256 session tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(secret: &str, lifetime_hours: u64) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::InvalidSecret);
        }
        let hours = i64::try_from(lifetime_hours).map_err(|_| TokenError::Generation("token lifetime too large".into()))?;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(hours),
        })
    }

    pub fn from_config(config: &SecurityConfig) -> Result<Self, TokenError> {
        Self::new(&config.jwt_secret, config.jwt_expiry_hours)
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, user: &UserCredentials) -> Result<String, TokenError> {
        self.sign(&Claims::for_user(user, self.lifetime))
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::default(), claims, &self.encoding).map_err(|e| TokenError::Generation(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}
