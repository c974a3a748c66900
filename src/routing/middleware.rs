use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::Request,
    middleware::{from_fn, Next},
    response::Response,
    routing::MethodRouter,
};
use futures::future::BoxFuture;

type MiddlewareFn = dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync;

/// A named request interceptor.
///
/// Two middlewares are equal when their names are equal; the registrar relies on
/// this to keep the authorization middleware from being attached twice.
#[derive(Clone)]
pub struct Middleware {
    name: &'static str,
    run: Arc<MiddlewareFn>,
}

impl Middleware {
    pub fn new<F, Fut>(name: &'static str, f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            name,
            run: Arc::new(move |request: Request, next: Next| -> BoxFuture<'static, Response> {
                Box::pin(f(request, next))
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wraps the method router so this middleware runs before the handler.
    ///
    /// Route layers wrap from the inside out, so callers apply a chain in
    /// reverse to keep declaration order equal to execution order.
    pub(crate) fn wrap<S>(&self, route: MethodRouter<S>) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let run = Arc::clone(&self.run);
        route.route_layer(from_fn(move |request: Request, next: Next| run(request, next)))
    }
}

impl PartialEq for Middleware {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Middleware {}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Middleware").field(&self.name).finish()
    }
}
