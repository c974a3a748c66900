pub mod auth;
pub mod company;
pub mod user;

pub use auth::{AuthService, LoginRequest};
pub use company::CompanyService;
pub use user::{PasswordChange, UserService};

use crate::auth::password::PasswordError;
use crate::auth::TokenError;
use crate::database::DatabaseError;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("{0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
    #[error("Password error: {0}")]
    Password(#[from] PasswordError),
}
