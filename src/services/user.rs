use std::sync::Arc;

use axum::body::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use super::ServiceError;
use crate::auth::password::{hash_password, verify_password};
use crate::config::SecurityConfig;
use crate::constants::messages;
use crate::database::models::{NewUser, User, UserChanges};
use crate::database::{UserInsert, UserRepository};
use crate::storage::{avatar_key, ObjectStorage};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

pub struct UserService {
    users: UserRepository,
    storage: Arc<dyn ObjectStorage>,
    bcrypt_cost: u32,
    min_password_length: usize,
}

impl UserService {
    pub fn new(users: UserRepository, storage: Arc<dyn ObjectStorage>, security: &SecurityConfig) -> Self {
        Self {
            users,
            storage,
            bcrypt_cost: security.bcrypt_cost,
            min_password_length: security.min_password_length,
        }
    }

    pub async fn list(&self, search: Option<&str>) -> Result<Vec<User>, ServiceError> {
        tracing::debug!("Fetching users (search: {:?})", search);
        Ok(self.users.find_all(search).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<User, ServiceError> {
        self.users.find_by_id(id).await?.ok_or_else(not_found)
    }

    pub async fn create(&self, user: NewUser) -> Result<User, ServiceError> {
        if user.email.trim().is_empty() {
            return Err(ServiceError::Validation("Email is required".to_string()));
        }
        if user.password.is_empty() {
            return Err(ServiceError::Validation("Password is required".to_string()));
        }

        let password_hash = hash_password(user.password, self.bcrypt_cost).await?;
        let insert = UserInsert {
            id: Uuid::new_v4(),
            company_id: user.company_id,
            email: user.email.trim().to_string(),
            password_hash,
            full_name: user.full_name,
            role_id: user.role_id,
            department_id: user.department_id,
            avatar_url: user.avatar_url,
            phone: user.phone,
            is_active: user.is_active,
        };

        let created = self.users.insert(&insert).await?;
        tracing::info!("Created user {}", created.id);
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, ServiceError> {
        if changes.is_empty() {
            return Err(ServiceError::Validation(messages::NOTHING_TO_UPDATE.to_string()));
        }
        self.users.update(id, &changes).await?.ok_or_else(not_found)
    }

    pub async fn update_role(&self, id: Uuid, role_id: Uuid) -> Result<User, ServiceError> {
        if !self.users.role_exists(role_id).await? {
            return Err(ServiceError::NotFound(messages::ROLE_NOT_FOUND.to_string()));
        }
        self.users.update_role(id, role_id).await?.ok_or_else(not_found)
    }

    pub async fn update_activation(&self, id: Uuid, is_active: bool) -> Result<User, ServiceError> {
        self.users.update_is_active(id, is_active).await?.ok_or_else(not_found)
    }

    /// Stores the image under a fresh key and points the user's avatar at it.
    pub async fn update_avatar(
        &self,
        id: Uuid,
        data: Bytes,
        content_type: &str,
        extension: Option<&str>,
    ) -> Result<User, ServiceError> {
        // No upload for users that do not exist.
        self.get(id).await?;

        let url = self.storage.upload(&avatar_key(extension), data, content_type).await?;
        self.users.update_avatar_url(id, &url).await?.ok_or_else(not_found)
    }

    pub async fn update_password(&self, id: Uuid, change: PasswordChange) -> Result<User, ServiceError> {
        let (Some(old_password), Some(new_password)) = (
            change.old_password.filter(|p| !p.is_empty()),
            change.new_password.filter(|p| !p.is_empty()),
        ) else {
            return Err(ServiceError::Validation(messages::PASSWORDS_REQUIRED.to_string()));
        };

        if new_password.chars().count() < self.min_password_length {
            return Err(ServiceError::Validation(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }

        let current = self.users.find_password_hash(id).await?.ok_or_else(not_found)?;
        if !verify_password(old_password, current).await? {
            return Err(ServiceError::Validation(messages::INVALID_CREDENTIALS.to_string()));
        }

        let password_hash = hash_password(new_password, self.bcrypt_cost).await?;
        self.users.update_password(id, &password_hash).await?.ok_or_else(not_found)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        if self.users.delete(id).await? {
            tracing::info!("Deleted user {}", id);
            Ok(())
        } else {
            Err(not_found())
        }
    }
}

fn not_found() -> ServiceError {
    ServiceError::NotFound(messages::USER_NOT_FOUND.to_string())
}
