use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::constants::messages;
use crate::database::models::{NewUser, UserChanges};
use crate::database::UserRepository;
use crate::error::ApiError;
use crate::middleware::{authorization, single_file, UploadedFile};
use crate::routing::{Controller, ControllerBuilder, ControllerDescriptor, HandlerArgs, HandlerResult, InstantiationError};
use crate::services::{PasswordChange, UserService};

#[derive(Debug, Deserialize)]
struct RoleChange {
    role_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ActivationChange {
    is_active: bool,
}

pub struct UserController {
    users: UserService,
}

impl UserController {
    async fn get_all_users(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let users = self.users.list(args.arg(0)).await?;
        Ok(args.response.ok(messages::USERS_FETCHED, users))
    }

    async fn get_user_by_id(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let id: Uuid = args.parse(0, "id")?;
        let user = self.users.get(id).await?;
        Ok(args.response.ok(messages::USER_FETCHED, user))
    }

    async fn create_user(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let user: NewUser = args.request.json()?;
        let created = self.users.create(user).await?;
        Ok(args.response.created(messages::USER_CREATED, created))
    }

    async fn update_user(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let id: Uuid = args.parse(0, "id")?;
        let changes: UserChanges = args.request.json()?;
        let updated = self.users.update(id, changes).await?;
        Ok(args.response.updated(messages::USER_UPDATED, updated))
    }

    async fn update_user_role(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let id: Uuid = args.parse(0, "id")?;
        let change: RoleChange = args.request.json()?;
        let updated = self.users.update_role(id, change.role_id).await?;
        Ok(args.response.updated(messages::USER_UPDATED, updated))
    }

    async fn update_user_status(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let id: Uuid = args.parse(0, "id")?;
        let change: ActivationChange = args.request.json()?;
        let updated = self.users.update_activation(id, change.is_active).await?;
        Ok(args.response.updated(messages::USER_UPDATED, updated))
    }

    async fn update_avatar(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let id: Uuid = args.parse(0, "id")?;
        let Some(file) = args.request.extension::<UploadedFile>().cloned() else {
            return Err(ApiError::bad_request(messages::NO_FILE_UPLOADED));
        };

        let updated = self
            .users
            .update_avatar(id, file.data.clone(), &file.content_type, file.extension())
            .await?;
        Ok(args.response.updated(messages::USER_UPDATED, updated))
    }

    async fn update_password(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let id: Uuid = args.parse(0, "id")?;
        let change: PasswordChange = args.request.json()?;
        let updated = self.users.update_password(id, change).await?;
        Ok(args.response.updated(messages::USER_UPDATED, updated))
    }

    async fn delete_user(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let id: Uuid = args.parse(0, "id")?;
        self.users.delete(id).await?;
        Ok(args.response.deleted(messages::USER_DELETED))
    }
}

impl Controller<AppState> for UserController {
    const NAME: &'static str = "UserController";

    fn describe() -> ControllerDescriptor<Self> {
        ControllerBuilder::new("/users")
            .get("/", "get_all_users", [authorization()], Self::get_all_users)
            .query_param("get_all_users", "search", 0)
            .get("/:id", "get_user_by_id", [authorization()], Self::get_user_by_id)
            .path_param("get_user_by_id", "id", 0)
            .post("/", "create_user", [authorization()], Self::create_user)
            .patch("/:id", "update_user", [authorization()], Self::update_user)
            .path_param("update_user", "id", 0)
            .patch("/:id/role", "update_user_role", [authorization()], Self::update_user_role)
            .path_param("update_user_role", "id", 0)
            .patch("/:id/activation", "update_user_status", [authorization()], Self::update_user_status)
            .path_param("update_user_status", "id", 0)
            .patch("/:id/avatar", "update_avatar", [authorization()], Self::update_avatar)
            .attach("update_avatar", single_file("file"))
            .path_param("update_avatar", "id", 0)
            .patch("/:id/password", "update_password", [authorization()], Self::update_password)
            .path_param("update_password", "id", 0)
            .delete("/:id", "delete_user", [authorization()], Self::delete_user)
            .path_param("delete_user", "id", 0)
            .build()
    }

    fn instantiate(state: &AppState) -> Result<Self, InstantiationError> {
        Ok(Self {
            users: UserService::new(
                UserRepository::new(state.database.clone()),
                state.storage.clone(),
                &state.config.security,
            ),
        })
    }
}
