//! Declarative controller routing.
//!
//! Controllers describe their routes, parameter bindings and middleware with a
//! [`ControllerBuilder`]; the [`Registrar`] turns a [`ControllerList`] into axum
//! routes, adding the authorization middleware wherever the
//! [`ProtectedRoutePolicy`] asks for it.

pub mod controller;
pub mod handler;
pub mod metadata;
pub mod middleware;
pub mod policy;
pub mod registrar;

pub use controller::{Controller, ControllerBuilder, ControllerDescriptor, ControllerEntry, ControllerList, InstantiationError};
pub use handler::{bind_arguments, HandlerArgs, HandlerFuture, HandlerResult, RequestContext, ResponseContext};
pub use metadata::{ControllerMetadata, HttpMethod, ParamBinding, ParamBindings, ParamKind, RouteRecord};
pub use middleware::Middleware;
pub use policy::{PolicyError, ProtectedRoutePolicy};
pub use registrar::{join_path, RegisteredRoute, Registrar, RegistrationError, RouteTable, SkippedRoute};
