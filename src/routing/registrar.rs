use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request},
    response::{IntoResponse, Response},
    routing::{on, MethodRouter},
    Router,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::controller::{ControllerList, InstantiationError, LoadedController};
use super::handler::{bind_arguments, HandlerArgs, RequestContext};
use super::metadata::{HttpMethod, ParamBinding, ParamKind, RouteRecord};
use super::middleware::Middleware;
use super::policy::ProtectedRoutePolicy;

const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("controller {controller} could not be instantiated: {source}")]
    Instantiation {
        controller: &'static str,
        #[source]
        source: InstantiationError,
    },

    #[error("controller {0} is listed more than once")]
    DuplicateController(&'static str),

    #[error("route {method} {path} is declared twice ({first} and {second})")]
    DuplicateRoute {
        method: HttpMethod,
        path: String,
        first: String,
        second: String,
    },

    #[error("route {path} conflicts with {existing}: parameter names differ at the same position ({first} and {second})")]
    ConflictingRoute {
        path: String,
        existing: String,
        first: String,
        second: String,
    },

    #[error("handler {controller}::{handler} binds more than one parameter to argument {index}")]
    SlotConflict {
        controller: &'static str,
        handler: String,
        index: usize,
    },

    #[error("handler {controller}::{handler} binds path parameter '{param}' which its route does not declare")]
    UnknownPathParam {
        controller: &'static str,
        handler: String,
        param: String,
    },

    #[error("handler {controller}::{handler} binds argument {index} but only has {arity} bindings")]
    SlotOutOfRange {
        controller: &'static str,
        handler: String,
        index: usize,
        arity: usize,
    },

    #[error("{kind} parameter '{param}' is bound for {controller}::{handler}, which has no route")]
    DanglingBinding {
        controller: &'static str,
        handler: String,
        kind: ParamKind,
        param: String,
    },

    #[error("middleware '{middleware}' is attached to {controller}::{handler}, which has no route")]
    DanglingMiddleware {
        controller: &'static str,
        handler: String,
        middleware: &'static str,
    },
}

/// A route as it was attached to the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredRoute {
    pub method: HttpMethod,
    pub path: String,
    pub controller: &'static str,
    pub handler_name: String,
    pub middlewares: Vec<&'static str>,
}

/// A declared route the registrar did not attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRoute {
    pub controller: &'static str,
    pub method: String,
    pub path: String,
    pub reason: String,
}

/// Outcome of a registration pass, in registration order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    pub registered: Vec<RegisteredRoute>,
    pub skipped: Vec<SkippedRoute>,
}

impl RouteTable {
    pub fn find(&self, method: HttpMethod, path: &str) -> Option<&RegisteredRoute> {
        self.registered
            .iter()
            .find(|route| route.method == method && route.path == path)
    }

    pub fn pairs(&self) -> BTreeSet<(HttpMethod, String)> {
        self.registered
            .iter()
            .map(|route| (route.method, route.path.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
}

/// Attaches declared controller routes to an axum router.
pub struct Registrar<'a> {
    global_prefix: String,
    policy: &'a ProtectedRoutePolicy,
    authorization: Middleware,
    body_limit: usize,
    reserved: Vec<RouteClaim>,
}

/// A (method, full path) pair already taken on the router, and by whom.
#[derive(Debug, Clone)]
struct RouteClaim {
    method: HttpMethod,
    path: String,
    owner: String,
}

impl<'a> Registrar<'a> {
    pub fn new(global_prefix: impl Into<String>, policy: &'a ProtectedRoutePolicy, authorization: Middleware) -> Self {
        Self {
            global_prefix: global_prefix.into(),
            policy,
            authorization,
            body_limit: DEFAULT_BODY_LIMIT,
            reserved: Vec::new(),
        }
    }

    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Marks a route the incoming router already serves, so a controller
    /// route colliding with it is rejected instead of attached.
    pub fn reserve(mut self, method: HttpMethod, path: impl Into<String>) -> Self {
        self.reserved.push(RouteClaim {
            method,
            path: path.into(),
            owner: "application".to_string(),
        });
        self
    }

    /// Registers every controller in `controllers` onto `router`.
    ///
    /// All controllers are instantiated and every declaration is validated
    /// before the first route is attached, so an error leaves `router`
    /// untouched. Descriptors are rebuilt on each call; running the same list
    /// twice against fresh routers yields the same table.
    pub fn register_all<S>(
        &self,
        router: Router,
        controllers: &ControllerList<S>,
        deps: &S,
    ) -> Result<(Router, RouteTable), RegistrationError> {
        let mut loaded = Vec::with_capacity(controllers.len());
        let mut names = BTreeSet::new();
        for entry in controllers.entries() {
            if !names.insert(entry.name()) {
                return Err(RegistrationError::DuplicateController(entry.name()));
            }
            loaded.push(entry.load(deps)?);
        }

        let mut planned = Vec::new();
        let mut table = RouteTable::default();
        let mut claims = self.reserved.clone();

        for controller in &loaded {
            validate_bindings(controller)?;
            let routes = resolve_attachments(controller)?;

            for (mut route, handler) in routes.into_iter().zip(controller.handlers.iter()) {
                let method = match route.method.parse::<HttpMethod>() {
                    Ok(method) => method,
                    Err(e) => {
                        warn!(
                            "Skipping {} {} on {}: {}",
                            route.method, route.path, controller.name, e
                        );
                        table.skipped.push(SkippedRoute {
                            controller: controller.name,
                            method: route.method.clone(),
                            path: route.path.clone(),
                            reason: e.to_string(),
                        });
                        continue;
                    }
                };

                if self.policy.covers(&controller.metadata.prefix, &route.path) {
                    self.ensure_authorization(&mut route);
                    debug!("Authorization middleware added for route: {}", route.path);
                }

                let full_path = join_path(&[&self.global_prefix, &controller.metadata.prefix, &route.path]);
                let claim = RouteClaim {
                    method,
                    path: full_path.clone(),
                    owner: format!("{}::{}", controller.name, route.handler_name),
                };
                check_claim(&claims, &claim)?;
                claims.push(claim);

                planned.push((controller, method, full_path, route, Arc::clone(handler)));
            }
        }

        let mut router = router;
        for (controller, method, full_path, route, handler) in planned {
            let bindings: Arc<[ParamBinding]> = controller.bindings.for_handler(&route.handler_name).into();
            let mut method_router = adapter(method, bindings, handler, self.body_limit);
            for middleware in route.middlewares.iter().rev() {
                method_router = middleware.wrap(method_router);
            }
            router = router.route(&full_path, method_router);

            info!("Registered [{}] {}", method, full_path);
            table.registered.push(RegisteredRoute {
                method,
                path: full_path,
                controller: controller.name,
                handler_name: route.handler_name.clone(),
                middlewares: route.middleware_names(),
            });
        }

        Ok((router, table))
    }

    fn ensure_authorization(&self, route: &mut RouteRecord) {
        let name = self.authorization.name();
        let mut kept = false;
        route.middlewares.retain(|middleware| {
            if middleware.name() != name {
                return true;
            }
            !std::mem::replace(&mut kept, true)
        });
        if !kept {
            route.middlewares.push(self.authorization.clone());
        }
    }
}

/// Builds the axum handler that turns a request into `HandlerArgs` and
/// forwards the controller's result, success or error, as the response.
fn adapter(
    method: HttpMethod,
    bindings: Arc<[ParamBinding]>,
    handler: super::controller::BoundHandler,
    body_limit: usize,
) -> MethodRouter {
    let adapter = move |path: Option<Path<HashMap<String, String>>>,
                        Query(query): Query<HashMap<String, String>>,
                        request: Request| {
        let bindings = Arc::clone(&bindings);
        let handler = Arc::clone(&handler);
        async move {
            let path = path.map(|Path(values)| values).unwrap_or_default();
            let slots = bind_arguments(&bindings, &path, &query);
            let request = match RequestContext::from_request(request, body_limit).await {
                Ok(request) => request,
                Err(e) => return e.into_response(),
            };
            match handler(HandlerArgs::new(slots, request)).await {
                Ok(response) => response,
                Err(e) => e.into_response(),
            }
        }
    };
    on(method.filter(), adapter)
}

/// Rejects `claim` when axum could not route it next to `claims`: the same
/// method on the same template, or a parameter renamed at a shared position.
fn check_claim(claims: &[RouteClaim], claim: &RouteClaim) -> Result<(), RegistrationError> {
    for existing in claims {
        if let Some((first, second)) = renamed_param(&existing.path, &claim.path) {
            return Err(RegistrationError::ConflictingRoute {
                path: claim.path.clone(),
                existing: existing.path.clone(),
                first: first.to_string(),
                second: second.to_string(),
            });
        }
        if existing.method == claim.method && existing.path == claim.path {
            return Err(RegistrationError::DuplicateRoute {
                method: claim.method,
                path: claim.path.clone(),
                first: existing.owner.clone(),
                second: claim.owner.clone(),
            });
        }
    }
    Ok(())
}

/// First pair of differently named parameters the two templates share a
/// position for, walking segments until the templates diverge.
fn renamed_param<'p>(a: &'p str, b: &'p str) -> Option<(&'p str, &'p str)> {
    let dynamic = |segment: &str| segment.starts_with(':') || segment.starts_with('*');
    for (left, right) in a.split('/').zip(b.split('/')) {
        match (dynamic(left), dynamic(right)) {
            (true, true) if left != right => return Some((left, right)),
            (true, true) => continue,
            (false, false) if left == right => continue,
            _ => return None,
        }
    }
    None
}

fn validate_bindings(controller: &LoadedController) -> Result<(), RegistrationError> {
    for (handler, bindings) in controller.bindings.handlers() {
        let has_route = controller.metadata.routes.iter().any(|r| r.handler_name == handler);
        if let (false, Some(binding)) = (has_route, bindings.first()) {
            return Err(RegistrationError::DanglingBinding {
                controller: controller.name,
                handler: handler.to_string(),
                kind: binding.kind,
                param: binding.source_name.clone(),
            });
        }

        // Slots must be dense, so every index stays below the binding count.
        if let Some(binding) = bindings.iter().find(|b| b.target_index >= bindings.len()) {
            return Err(RegistrationError::SlotOutOfRange {
                controller: controller.name,
                handler: handler.to_string(),
                index: binding.target_index,
                arity: bindings.len(),
            });
        }

        if let Some(index) = controller.bindings.conflicting_slot(handler) {
            return Err(RegistrationError::SlotConflict {
                controller: controller.name,
                handler: handler.to_string(),
                index,
            });
        }

        let declared: BTreeSet<&str> = controller
            .metadata
            .routes
            .iter()
            .filter(|route| route.handler_name == handler)
            .flat_map(|route| route.path_params())
            .collect();

        for binding in bindings.iter().filter(|b| b.kind == ParamKind::Path) {
            if !declared.contains(binding.source_name.as_str()) {
                return Err(RegistrationError::UnknownPathParam {
                    controller: controller.name,
                    handler: handler.to_string(),
                    param: binding.source_name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Copies the controller's routes with deferred attachments appended to the
/// most recently declared route of each named handler.
fn resolve_attachments(controller: &LoadedController) -> Result<Vec<RouteRecord>, RegistrationError> {
    let mut routes = controller.metadata.routes.clone();
    for (handler, middleware) in &controller.attachments {
        let Some(route) = routes.iter_mut().rev().find(|r| &r.handler_name == handler) else {
            return Err(RegistrationError::DanglingMiddleware {
                controller: controller.name,
                handler: handler.clone(),
                middleware: middleware.name(),
            });
        };
        route.middlewares.push(middleware.clone());
    }
    Ok(routes)
}

/// Concatenates path pieces, dropping a trailing slash unless the result is
/// the root.
pub fn join_path(parts: &[&str]) -> String {
    let mut joined: String = parts.concat();
    if !joined.starts_with('/') {
        joined.insert(0, '/');
    }
    while joined.len() > 1 && joined.ends_with('/') {
        joined.pop();
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::routing::controller::{Controller, ControllerBuilder, ControllerDescriptor};
    use crate::routing::handler::HandlerResult;
    use axum::{body::Body, http::StatusCode, middleware::Next};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    #[derive(Clone, Default)]
    struct Trail(Vec<&'static str>);

    fn tracer(name: &'static str) -> Middleware {
        Middleware::new(name, move |mut request: Request, next: Next| {
            let mut trail = request.extensions().get::<Trail>().cloned().unwrap_or_default();
            trail.0.push(name);
            request.extensions_mut().insert(trail);
            next.run(request)
        })
    }

    fn authorization() -> Middleware {
        Middleware::new("authorization", |request: Request, next: Next| async move {
            if request.headers().contains_key("x-allow") {
                next.run(request).await
            } else {
                ApiError::unauthorized("No token provided").into_response()
            }
        })
    }

    struct Widgets;

    impl Widgets {
        async fn list(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
            let trail = args.request.extension::<Trail>().cloned().unwrap_or_default();
            let slots = args.slots().to_vec();
            Ok(args.response.ok("listed", json!({ "slots": slots, "trail": trail.0 })))
        }

        async fn show(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
            let trail = args.request.extension::<Trail>().cloned().unwrap_or_default();
            let slots = args.slots().to_vec();
            Ok(args.response.ok("shown", json!({ "slots": slots, "trail": trail.0 })))
        }

        async fn remove(self: Arc<Self>, _args: HandlerArgs) -> HandlerResult {
            Err(ApiError::conflict("Widget is still in use"))
        }
    }

    impl Controller<()> for Widgets {
        const NAME: &'static str = "WidgetController";

        fn describe() -> ControllerDescriptor<Self> {
            ControllerBuilder::new("/widgets")
                .get("/", "list", [tracer("first"), tracer("second")], Widgets::list)
                .query_param("list", "search", 0)
                .get("/:id", "show", [], Widgets::show)
                .path_param("show", "id", 0)
                .query_param("show", "expand", 1)
                .delete("/:id", "remove", [], Widgets::remove)
                .route("put", "/:id", "replace", [], Widgets::show)
                .attach("list", tracer("third"))
                .build()
        }

        fn instantiate(_: &()) -> Result<Self, InstantiationError> {
            Ok(Widgets)
        }
    }

    fn register(policy: &ProtectedRoutePolicy) -> (Router, RouteTable) {
        let controllers = ControllerList::new().with::<Widgets>();
        Registrar::new("/api", policy, authorization())
            .register_all(Router::new(), &controllers, &())
            .unwrap()
    }

    async fn call(router: &Router, method: &str, uri: &str, allow: bool) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if allow {
            request = request.header("x-allow", "1");
        }
        let response = router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, body)
    }

    #[test]
    fn joins_paths_without_trailing_slash() {
        assert_eq!(join_path(&["/api/v1", "/companies", "/"]), "/api/v1/companies");
        assert_eq!(join_path(&["/api/v1", "/companies", "/:id"]), "/api/v1/companies/:id");
        assert_eq!(join_path(&["", "", "/"]), "/");
        assert_eq!(join_path(&["", "/health", ""]), "/health");
    }

    #[tokio::test]
    async fn registers_each_route_once_under_prefixes() {
        let (_, table) = register(&ProtectedRoutePolicy::default());

        let pairs: Vec<_> = table.registered.iter().map(|r| (r.method, r.path.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                (HttpMethod::Get, "/api/widgets"),
                (HttpMethod::Get, "/api/widgets/:id"),
                (HttpMethod::Delete, "/api/widgets/:id"),
            ]
        );
    }

    #[tokio::test]
    async fn skips_unsupported_verbs() {
        let (router, table) = register(&ProtectedRoutePolicy::default());

        assert_eq!(table.skipped.len(), 1);
        assert_eq!(table.skipped[0].method, "put");
        assert_eq!(table.skipped[0].path, "/:id");

        let (status, _) = call(&router, "PUT", "/api/widgets/1", false).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn binds_path_and_query_parameters() {
        let (router, _) = register(&ProtectedRoutePolicy::default());

        let (status, body) = call(&router, "GET", "/api/widgets/42?expand=parts", false).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["slots"], json!(["42", "parts"]));

        let (_, body) = call(&router, "GET", "/api/widgets/42", false).await;
        assert_eq!(body["data"]["slots"], json!(["42", null]));

        let (_, body) = call(&router, "GET", "/api/widgets?search=bolt", false).await;
        assert_eq!(body["data"]["slots"], json!(["bolt"]));
    }

    #[tokio::test]
    async fn runs_middlewares_in_declaration_order() {
        let (router, table) = register(&ProtectedRoutePolicy::default());

        let list = table.find(HttpMethod::Get, "/api/widgets").unwrap();
        assert_eq!(list.middlewares, vec!["first", "second", "third"]);

        let (_, body) = call(&router, "GET", "/api/widgets", false).await;
        assert_eq!(body["data"]["trail"], json!(["first", "second", "third"]));
    }

    #[tokio::test]
    async fn forwards_handler_errors_unchanged() {
        let (router, _) = register(&ProtectedRoutePolicy::default());

        let (status, body) = call(&router, "DELETE", "/api/widgets/1", false).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Widget is still in use");
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn injects_authorization_for_protected_paths() {
        let policy = ProtectedRoutePolicy::from_paths(["/:id"]);
        let (router, table) = register(&policy);

        let show = table.find(HttpMethod::Get, "/api/widgets/:id").unwrap();
        assert_eq!(show.middlewares, vec!["authorization"]);
        let list = table.find(HttpMethod::Get, "/api/widgets").unwrap();
        assert!(!list.middlewares.contains(&"authorization"));

        let (status, _) = call(&router, "GET", "/api/widgets/7", false).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = call(&router, "GET", "/api/widgets/7", true).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&router, "GET", "/api/widgets", false).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn matches_prefixed_manifest_entries() {
        let policy = ProtectedRoutePolicy::from_paths(["/widgets"]);
        let (_, table) = register(&policy);
        let list = table.find(HttpMethod::Get, "/api/widgets").unwrap();
        assert_eq!(list.middlewares, vec!["first", "second", "third", "authorization"]);
    }

    struct Guarded;

    impl Guarded {
        async fn secret(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
            Ok(args.response.ok("secret", ()))
        }
    }

    impl Controller<()> for Guarded {
        const NAME: &'static str = "GuardedController";

        fn describe() -> ControllerDescriptor<Self> {
            ControllerBuilder::new("/vault")
                .get("/secret", "secret", [authorization(), tracer("audit"), authorization()], Guarded::secret)
                .build()
        }

        fn instantiate(_: &()) -> Result<Self, InstantiationError> {
            Ok(Guarded)
        }
    }

    #[tokio::test]
    async fn authorization_appears_once_when_declared_and_protected() {
        let policy = ProtectedRoutePolicy::from_paths(["/secret"]);
        let controllers = ControllerList::new().with::<Guarded>();
        let (router, table) = Registrar::new("", &policy, authorization())
            .register_all(Router::new(), &controllers, &())
            .unwrap();

        let route = table.find(HttpMethod::Get, "/vault/secret").unwrap();
        assert_eq!(route.middlewares, vec!["authorization", "audit"]);

        let (status, _) = call(&router, "GET", "/vault/secret", false).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn registration_is_repeatable() {
        let policy = ProtectedRoutePolicy::from_paths(["/:id"]);
        let (_, first) = register(&policy);
        let (_, second) = register(&policy);

        assert_eq!(first.pairs(), second.pairs());
        assert_eq!(first.registered, second.registered);
    }

    #[tokio::test]
    async fn registers_controllers_in_name_order() {
        let policy = ProtectedRoutePolicy::default();
        let controllers = ControllerList::new().with::<Widgets>().with::<Guarded>();
        let (_, table) = Registrar::new("", &policy, authorization())
            .register_all(Router::new(), &controllers, &())
            .unwrap();

        assert_eq!(table.registered[0].controller, "GuardedController");
        assert_eq!(table.registered.last().unwrap().controller, "WidgetController");
    }

    struct Clashing;

    impl Clashing {
        async fn noop(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
            Ok(args.response.ok("noop", ()))
        }
    }

    impl Controller<()> for Clashing {
        const NAME: &'static str = "ClashingController";

        fn describe() -> ControllerDescriptor<Self> {
            ControllerBuilder::new("/widgets")
                .get("/:id", "noop", [], Clashing::noop)
                .build()
        }

        fn instantiate(_: &()) -> Result<Self, InstantiationError> {
            Ok(Clashing)
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_routes_across_controllers() {
        let policy = ProtectedRoutePolicy::default();
        let controllers = ControllerList::new().with::<Widgets>().with::<Clashing>();
        let err = Registrar::new("/api", &policy, authorization())
            .register_all(Router::new(), &controllers, &())
            .unwrap_err();

        match err {
            RegistrationError::DuplicateRoute { method, path, .. } => {
                assert_eq!(method, HttpMethod::Get);
                assert_eq!(path, "/api/widgets/:id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn rejects_listing_a_controller_twice() {
        let policy = ProtectedRoutePolicy::default();
        let controllers = ControllerList::new().with::<Widgets>().with::<Widgets>();
        let err = Registrar::new("/api", &policy, authorization())
            .register_all(Router::new(), &controllers, &())
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateController("WidgetController")));
    }

    macro_rules! broken_controller {
        ($name:ident, $describe:block) => {
            struct $name;

            impl $name {
                async fn handle(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
                    Ok(args.response.ok("ok", ()))
                }
            }

            impl Controller<()> for $name {
                const NAME: &'static str = stringify!($name);

                fn describe() -> ControllerDescriptor<Self> $describe

                fn instantiate(_: &()) -> Result<Self, InstantiationError> {
                    Ok($name)
                }
            }
        };
    }

    broken_controller!(SlotClash, {
        ControllerBuilder::new("/clash")
            .get("/:id", "handle", [], SlotClash::handle)
            .path_param("handle", "id", 0)
            .query_param("handle", "q", 0)
            .build()
    });

    broken_controller!(UnknownParam, {
        ControllerBuilder::new("/unknown")
            .get("/:id", "handle", [], UnknownParam::handle)
            .path_param("handle", "slug", 0)
            .build()
    });

    broken_controller!(Dangling, {
        ControllerBuilder::new("/dangling")
            .get("/", "handle", [], Dangling::handle)
            .attach("missing", tracer("orphan"))
            .build()
    });

    broken_controller!(RenamedParam, {
        ControllerBuilder::new("/things")
            .get("/:id", "handle", [], RenamedParam::handle)
            .delete("/:slug", "handle", [], RenamedParam::handle)
            .build()
    });

    broken_controller!(FarSlot, {
        ControllerBuilder::new("/far")
            .get("/", "handle", [], FarSlot::handle)
            .query_param("handle", "q", usize::MAX)
            .build()
    });

    broken_controller!(GappedSlots, {
        ControllerBuilder::new("/gapped")
            .get("/", "handle", [], GappedSlots::handle)
            .query_param("handle", "a", 0)
            .query_param("handle", "b", 5)
            .build()
    });

    broken_controller!(OrphanBinding, {
        ControllerBuilder::new("/orphan")
            .get("/:id", "handle", [], OrphanBinding::handle)
            .path_param("handel", "id", 0)
            .build()
    });

    broken_controller!(RootClaimer, {
        ControllerBuilder::new("")
            .get("/health", "handle", [], RootClaimer::handle)
            .build()
    });

    fn register_one<C: Controller<()>>() -> Result<(Router, RouteTable), RegistrationError> {
        let policy = ProtectedRoutePolicy::default();
        Registrar::new("", &policy, authorization()).register_all(
            Router::new(),
            &ControllerList::new().with::<C>(),
            &(),
        )
    }

    #[tokio::test]
    async fn rejects_conflicting_slots() {
        let err = register_one::<SlotClash>().unwrap_err();
        assert!(matches!(err, RegistrationError::SlotConflict { index: 0, .. }));
    }

    #[tokio::test]
    async fn rejects_path_bindings_missing_from_template() {
        let err = register_one::<UnknownParam>().unwrap_err();
        assert!(matches!(err, RegistrationError::UnknownPathParam { ref param, .. } if param == "slug"));
    }

    #[tokio::test]
    async fn rejects_attachments_without_a_route() {
        let err = register_one::<Dangling>().unwrap_err();
        assert!(matches!(err, RegistrationError::DanglingMiddleware { middleware: "orphan", .. }));
    }

    #[tokio::test]
    async fn rejects_parameters_renamed_at_the_same_position() {
        let err = register_one::<RenamedParam>().unwrap_err();
        match err {
            RegistrationError::ConflictingRoute { path, existing, first, second } => {
                assert_eq!(path, "/things/:slug");
                assert_eq!(existing, "/things/:id");
                assert_eq!((first.as_str(), second.as_str()), (":id", ":slug"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn renamed_params_only_conflict_before_templates_diverge() {
        assert_eq!(renamed_param("/a/:id", "/a/:slug"), Some((":id", ":slug")));
        assert_eq!(renamed_param("/a/:id/b", "/a/*rest"), Some((":id", "*rest")));
        assert_eq!(renamed_param("/a/:id", "/a/:id/avatar"), None);
        assert_eq!(renamed_param("/a/x/:id", "/a/y/:slug"), None);
        assert_eq!(renamed_param("/a", "/a/:id"), None);
    }

    #[tokio::test]
    async fn rejects_routes_already_served_by_the_router() {
        let policy = ProtectedRoutePolicy::default();
        let base = Router::new().route("/health", axum::routing::get(|| async { "ok" }));
        let err = Registrar::new("", &policy, authorization())
            .reserve(HttpMethod::Get, "/health")
            .register_all(base, &ControllerList::new().with::<RootClaimer>(), &())
            .unwrap_err();

        match err {
            RegistrationError::DuplicateRoute { path, first, .. } => {
                assert_eq!(path, "/health");
                assert_eq!(first, "application");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn rejects_slots_beyond_the_binding_count() {
        let err = register_one::<FarSlot>().unwrap_err();
        assert!(matches!(err, RegistrationError::SlotOutOfRange { index: usize::MAX, arity: 1, .. }));

        let err = register_one::<GappedSlots>().unwrap_err();
        assert!(matches!(err, RegistrationError::SlotOutOfRange { index: 5, arity: 2, .. }));
    }

    #[tokio::test]
    async fn rejects_bindings_without_a_route() {
        let err = register_one::<OrphanBinding>().unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::DanglingBinding { ref handler, ref param, kind: ParamKind::Path, .. }
                if handler == "handel" && param == "id"
        ));
    }

    struct Shared;

    impl Shared {
        async fn first(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
            Ok(args.response.ok("first", ()))
        }

        async fn second(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
            Ok(args.response.ok("second", ()))
        }
    }

    impl Controller<()> for Shared {
        const NAME: &'static str = "SharedController";

        fn describe() -> ControllerDescriptor<Self> {
            ControllerBuilder::new("/s")
                .get("/a", "handle", [], Shared::first)
                .post("/b", "handle", [], Shared::second)
                .build()
        }

        fn instantiate(_: &()) -> Result<Self, InstantiationError> {
            Ok(Shared)
        }
    }

    #[tokio::test]
    async fn each_route_runs_its_own_function_when_names_repeat() {
        let (router, table) = register_one::<Shared>().unwrap();
        assert_eq!(table.len(), 2);

        let (status, body) = call(&router, "GET", "/s/a", false).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "first");

        let (status, body) = call(&router, "POST", "/s/b", false).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "second");
    }

    struct Unavailable;

    impl Controller<()> for Unavailable {
        const NAME: &'static str = "UnavailableController";

        fn describe() -> ControllerDescriptor<Self> {
            ControllerBuilder::new("/unavailable").build()
        }

        fn instantiate(_: &()) -> Result<Self, InstantiationError> {
            Err("storage backend offline".into())
        }
    }

    #[tokio::test]
    async fn aborts_when_a_controller_cannot_be_built() {
        let policy = ProtectedRoutePolicy::default();
        let controllers = ControllerList::new().with::<Widgets>().with::<Unavailable>();
        let err = Registrar::new("", &policy, authorization())
            .register_all(Router::new(), &controllers, &())
            .unwrap_err();

        assert!(matches!(err, RegistrationError::Instantiation { controller: "UnavailableController", .. }));
        assert!(err.to_string().contains("storage backend offline"));
    }
}
