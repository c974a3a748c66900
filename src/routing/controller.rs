use std::future::Future;
use std::sync::Arc;

use super::handler::{HandlerArgs, HandlerFuture, HandlerResult};
use super::metadata::{ControllerMetadata, ParamBinding, ParamBindings, ParamKind, RouteRecord};
use super::middleware::Middleware;
use super::registrar::RegistrationError;

pub type InstantiationError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub(crate) type ControllerHandler<C> = Arc<dyn Fn(Arc<C>, HandlerArgs) -> HandlerFuture + Send + Sync>;
pub(crate) type BoundHandler = Arc<dyn Fn(HandlerArgs) -> HandlerFuture + Send + Sync>;

/// A group of handlers mounted under a common prefix.
///
/// `S` is whatever the application hands the registrar to build controller
/// instances from (shared services, pools).
pub trait Controller<S>: Sized + Send + Sync + 'static {
    const NAME: &'static str;

    fn describe() -> ControllerDescriptor<Self>;

    fn instantiate(deps: &S) -> Result<Self, InstantiationError>;
}

/// Builder that records a controller's routes, bindings and middleware
/// attachments. Every call only appends; nothing is validated until the
/// registrar resolves the finished descriptor.
pub struct ControllerBuilder<C> {
    metadata: ControllerMetadata,
    bindings: ParamBindings,
    attachments: Vec<(String, Middleware)>,
    handlers: Vec<ControllerHandler<C>>,
}

impl<C: Send + Sync + 'static> ControllerBuilder<C> {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            metadata: ControllerMetadata {
                prefix: prefix.into(),
                routes: Vec::new(),
            },
            bindings: ParamBindings::default(),
            attachments: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Declares a route. Each route dispatches to the function given here,
    /// even when several routes share a handler name.
    pub fn route<F, Fut>(
        mut self,
        method: impl Into<String>,
        path: impl Into<String>,
        handler_name: &str,
        middlewares: impl IntoIterator<Item = Middleware>,
        handler: F,
    ) -> Self
    where
        F: Fn(Arc<C>, HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.metadata.routes.push(RouteRecord {
            method: method.into(),
            path: path.into(),
            handler_name: handler_name.to_string(),
            middlewares: middlewares.into_iter().collect(),
        });
        self.handlers.push(Arc::new(move |controller: Arc<C>, args: HandlerArgs| -> HandlerFuture {
            Box::pin(handler(controller, args))
        }));
        self
    }

    pub fn get<F, Fut>(
        self,
        path: impl Into<String>,
        handler_name: &str,
        middlewares: impl IntoIterator<Item = Middleware>,
        handler: F,
    ) -> Self
    where
        F: Fn(Arc<C>, HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route("get", path, handler_name, middlewares, handler)
    }

    pub fn post<F, Fut>(
        self,
        path: impl Into<String>,
        handler_name: &str,
        middlewares: impl IntoIterator<Item = Middleware>,
        handler: F,
    ) -> Self
    where
        F: Fn(Arc<C>, HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route("post", path, handler_name, middlewares, handler)
    }

    pub fn patch<F, Fut>(
        self,
        path: impl Into<String>,
        handler_name: &str,
        middlewares: impl IntoIterator<Item = Middleware>,
        handler: F,
    ) -> Self
    where
        F: Fn(Arc<C>, HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route("patch", path, handler_name, middlewares, handler)
    }

    pub fn delete<F, Fut>(
        self,
        path: impl Into<String>,
        handler_name: &str,
        middlewares: impl IntoIterator<Item = Middleware>,
        handler: F,
    ) -> Self
    where
        F: Fn(Arc<C>, HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route("delete", path, handler_name, middlewares, handler)
    }

    /// Appends a middleware to the chain of the route declared for
    /// `handler_name`. May be called before or after that route is declared.
    pub fn attach(mut self, handler_name: &str, middleware: Middleware) -> Self {
        self.attachments.push((handler_name.to_string(), middleware));
        self
    }

    pub fn param(mut self, handler_name: &str, kind: ParamKind, source_name: &str, target_index: usize) -> Self {
        self.bindings.push(
            handler_name,
            ParamBinding {
                kind,
                source_name: source_name.to_string(),
                target_index,
            },
        );
        self
    }

    pub fn path_param(self, handler_name: &str, source_name: &str, target_index: usize) -> Self {
        self.param(handler_name, ParamKind::Path, source_name, target_index)
    }

    pub fn query_param(self, handler_name: &str, source_name: &str, target_index: usize) -> Self {
        self.param(handler_name, ParamKind::Query, source_name, target_index)
    }

    pub fn build(self) -> ControllerDescriptor<C> {
        ControllerDescriptor {
            metadata: self.metadata,
            bindings: self.bindings,
            attachments: self.attachments,
            handlers: self.handlers,
        }
    }
}

/// Finished, immutable declaration of a controller.
pub struct ControllerDescriptor<C> {
    metadata: ControllerMetadata,
    bindings: ParamBindings,
    attachments: Vec<(String, Middleware)>,
    handlers: Vec<ControllerHandler<C>>,
}

impl<C> ControllerDescriptor<C> {
    pub fn metadata(&self) -> &ControllerMetadata {
        &self.metadata
    }

    pub fn bindings(&self) -> &ParamBindings {
        &self.bindings
    }

    pub fn attachments(&self) -> &[(String, Middleware)] {
        &self.attachments
    }
}

/// A controller instance whose handlers have been bound to it, with its
/// declaration data. Type-erased so controllers of different types can be
/// registered in one pass.
///
/// `handlers[i]` serves `metadata.routes[i]`.
pub(crate) struct LoadedController {
    pub name: &'static str,
    pub metadata: ControllerMetadata,
    pub bindings: ParamBindings,
    pub attachments: Vec<(String, Middleware)>,
    pub handlers: Vec<BoundHandler>,
}

fn load_controller<S, C: Controller<S>>(deps: &S) -> Result<LoadedController, RegistrationError> {
    let instance = C::instantiate(deps).map_err(|source| RegistrationError::Instantiation {
        controller: C::NAME,
        source,
    })?;
    let instance = Arc::new(instance);
    let descriptor = C::describe();

    let handlers = descriptor
        .handlers
        .into_iter()
        .map(|handler| {
            let instance = Arc::clone(&instance);
            let bound: BoundHandler = Arc::new(move |args: HandlerArgs| handler(Arc::clone(&instance), args));
            bound
        })
        .collect();

    Ok(LoadedController {
        name: C::NAME,
        metadata: descriptor.metadata,
        bindings: descriptor.bindings,
        attachments: descriptor.attachments,
        handlers,
    })
}

pub struct ControllerEntry<S> {
    name: &'static str,
    load: fn(&S) -> Result<LoadedController, RegistrationError>,
}

impl<S> ControllerEntry<S> {
    pub fn of<C: Controller<S>>() -> Self {
        Self {
            name: C::NAME,
            load: load_controller::<S, C>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn load(&self, deps: &S) -> Result<LoadedController, RegistrationError> {
        (self.load)(deps)
    }
}

/// The compiled-in set of controllers, kept in lexicographic order of name.
pub struct ControllerList<S> {
    entries: Vec<ControllerEntry<S>>,
}

impl<S> Default for ControllerList<S> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<S> ControllerList<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<C: Controller<S>>(mut self) -> Self {
        let entry = ControllerEntry::of::<C>();
        let at = self.entries.partition_point(|e| e.name <= entry.name);
        self.entries.insert(at, entry);
        self
    }

    pub fn entries(&self) -> &[ControllerEntry<S>] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(ControllerEntry::name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
