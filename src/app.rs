use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{CACHE_CONTROL, EXPIRES, PRAGMA},
        HeaderValue, Method, StatusCode,
    },
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Router,
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::auth::{TokenError, TokenService};
use crate::config::AppConfig;
use crate::constants::messages;
use crate::controllers::{AuthController, CompanyController, UserController};
use crate::database::Database;
use crate::error::ApiError;
use crate::middleware::{access_log, authorization, ResponseEntity};
use crate::routing::{ControllerList, HttpMethod, ProtectedRoutePolicy, Registrar, RegistrationError, RouteTable};
use crate::storage::ObjectStorage;

/// Everything controllers are instantiated from.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub database: Arc<Database>,
    pub tokens: Arc<TokenService>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    pub fn new(config: AppConfig, database: Database, storage: Arc<dyn ObjectStorage>) -> Result<Self, TokenError> {
        let tokens = TokenService::from_config(&config.security)?;
        Ok(Self {
            config: Arc::new(config),
            database: Arc::new(database),
            tokens: Arc::new(tokens),
            storage,
        })
    }
}

/// Compiled-in list of every controller the API serves.
pub fn controllers() -> ControllerList<AppState> {
    ControllerList::new()
        .with::<AuthController>()
        .with::<CompanyController>()
        .with::<UserController>()
}

/// Registers all controllers under the configured prefix and wraps the
/// result in the global layers.
pub fn build_app(state: &AppState, policy: &ProtectedRoutePolicy) -> Result<(Router, RouteTable), RegistrationError> {
    let server = &state.config.server;
    let base = Router::new()
        .route("/", get(root))
        .route("/health", get(health));

    let (router, table) = Registrar::new(server.api_prefix.clone(), policy, authorization())
        .body_limit(server.max_request_size_bytes)
        .reserve(HttpMethod::Get, "/")
        .reserve(HttpMethod::Get, "/health")
        .register_all(base, &controllers(), state)?;

    tracing::info!(
        "{} routes registered ({} skipped)",
        table.len(),
        table.skipped.len()
    );

    let router = router
        .layer(Extension(state.tokens.clone()))
        .layer(Extension(state.database.clone()))
        .layer(Extension(state.config.clone()))
        .layer(Extension(Arc::new(state.config.upload.clone())))
        .layer(DefaultBodyLimit::max(server.max_request_size_bytes))
        .layer(from_fn(access_log))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(PRAGMA, HeaderValue::from_static("no-cache")))
        .layer(SetResponseHeaderLayer::overriding(EXPIRES, HeaderValue::from_static("0")))
        .layer(cors(&state.config))
        .layer(TraceLayer::new_for_http());

    Ok((router, table))
}

/// Credentials are only allowed together with an explicit frontend origin.
fn cors(config: &AppConfig) -> CorsLayer {
    let origin = config
        .server
        .frontend_url
        .as_deref()
        .and_then(|url| HeaderValue::from_str(url.trim_end_matches('/')).ok());

    match origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::AUTHORIZATION,
            ]),
        None => CorsLayer::permissive(),
    }
}

async fn root(Extension(config): Extension<Arc<AppConfig>>) -> Response {
    ResponseEntity::ok(format!("{}{}", config.server.name, messages::SERVICE_RUNNING_SUFFIX), ()).into_response()
}

async fn health(Extension(database): Extension<Arc<Database>>) -> Response {
    match database.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(json!({
                "status": "success",
                "message": "OK",
                "data": { "database": "ok" },
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            ApiError::service_unavailable("Database unavailable").into_response()
        }
    }
}
