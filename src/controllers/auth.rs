use std::sync::Arc;

use serde_json::json;

use crate::app::AppState;
use crate::auth::cookies::{CookieOptions, AUTH_COOKIE};
use crate::auth::TokenService;
use crate::config::SecurityConfig;
use crate::constants::messages;
use crate::database::UserRepository;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::routing::{Controller, ControllerBuilder, ControllerDescriptor, HandlerArgs, HandlerResult, InstantiationError};
use crate::services::{AuthService, LoginRequest};

/// Login, logout and the caller's own profile. `/profile` is protected by
/// the route manifest rather than by a declaration here.
pub struct AuthController {
    auth: AuthService,
    tokens: Arc<TokenService>,
    security: SecurityConfig,
}

impl AuthController {
    async fn login(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let request: LoginRequest = args.request.json()?;
        let token = self.auth.login(&request).await?;

        let cookie = CookieOptions::session(&self.security, self.tokens.lifetime().num_seconds())
            .header_value(AUTH_COOKIE, &token)
            .map_err(|_| ApiError::internal_server_error(messages::INTERNAL_SERVER_ERROR))?;

        Ok(args
            .response
            .set_cookie(cookie)
            .ok(messages::USER_LOGGED_IN, json!({ "token": token })))
    }

    async fn get_profile(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let Some(user) = args.request.extension::<AuthUser>().cloned() else {
            tracing::error!("No authenticated user on profile request");
            return Err(ApiError::not_found("User not found in request"));
        };
        Ok(args.response.ok(messages::PROFILE_FETCHED, user))
    }

    async fn logout(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let cookie = CookieOptions::clearing(&self.security)
            .header_value(AUTH_COOKIE, "")
            .map_err(|_| ApiError::internal_server_error(messages::INTERNAL_SERVER_ERROR))?;

        Ok(args.response.set_cookie(cookie).ok(messages::USER_LOGGED_OUT, ()))
    }
}

impl Controller<AppState> for AuthController {
    const NAME: &'static str = "AuthController";

    fn describe() -> ControllerDescriptor<Self> {
        ControllerBuilder::new("/auth")
            .post("/login", "login", [], Self::login)
            .get("/profile", "get_profile", [], Self::get_profile)
            .post("/logout", "logout", [], Self::logout)
            .build()
    }

    fn instantiate(state: &AppState) -> Result<Self, InstantiationError> {
        Ok(Self {
            auth: AuthService::new(UserRepository::new(state.database.clone()), state.tokens.clone()),
            tokens: state.tokens.clone(),
            security: state.config.security.clone(),
        })
    }
}
