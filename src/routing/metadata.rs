use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use axum::routing::MethodFilter;
use thiserror::Error;

use super::middleware::Middleware;

/// Verbs the registrar knows how to attach to the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported HTTP method '{0}'")]
pub struct UnsupportedMethod(pub String);

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub(crate) fn filter(&self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Patch => MethodFilter::PATCH,
            HttpMethod::Delete => MethodFilter::DELETE,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "patch" => Ok(HttpMethod::Patch),
            "delete" => Ok(HttpMethod::Delete),
            _ => Err(UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared endpoint of a controller.
///
/// `method` keeps the verb exactly as declared; it is only validated when the
/// registrar attaches the route, so an unknown verb is skipped rather than
/// rejected at declaration time.
#[derive(Debug, Clone)]
pub struct RouteRecord {
    pub method: String,
    pub path: String,
    pub handler_name: String,
    pub middlewares: Vec<Middleware>,
}

impl RouteRecord {
    pub fn has_middleware(&self, name: &str) -> bool {
        self.middlewares.iter().any(|m| m.name() == name)
    }

    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(Middleware::name).collect()
    }

    /// Names of the `:param` segments in the path template.
    pub fn path_params(&self) -> impl Iterator<Item = &str> {
        path_params(&self.path)
    }
}

pub(crate) fn path_params(template: &str) -> impl Iterator<Item = &str> {
    template
        .split('/')
        .filter_map(|segment| segment.strip_prefix(':').or_else(|| segment.strip_prefix('*')))
        .filter(|name| !name.is_empty())
}

/// Everything a controller declared about its routes, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ControllerMetadata {
    pub prefix: String,
    pub routes: Vec<RouteRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Path,
    Query,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Path => f.write_str("path"),
            ParamKind::Query => f.write_str("query"),
        }
    }
}

/// Maps a named path segment or query parameter onto a handler argument slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    pub kind: ParamKind,
    pub source_name: String,
    pub target_index: usize,
}

/// Parameter bindings grouped by handler name.
#[derive(Debug, Clone, Default)]
pub struct ParamBindings {
    by_handler: BTreeMap<String, Vec<ParamBinding>>,
}

impl ParamBindings {
    pub fn push(&mut self, handler_name: impl Into<String>, binding: ParamBinding) {
        self.by_handler.entry(handler_name.into()).or_default().push(binding);
    }

    pub fn for_handler(&self, handler_name: &str) -> &[ParamBinding] {
        self.by_handler
            .get(handler_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn handlers(&self) -> impl Iterator<Item = (&str, &[ParamBinding])> {
        self.by_handler
            .iter()
            .map(|(name, bindings)| (name.as_str(), bindings.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.by_handler.is_empty()
    }

    /// First slot index claimed by more than one binding of the handler.
    pub fn conflicting_slot(&self, handler_name: &str) -> Option<usize> {
        let mut seen = std::collections::BTreeSet::new();
        self.for_handler(handler_name)
            .iter()
            .map(|binding| binding.target_index)
            .find(|index| !seen.insert(*index))
    }
}
