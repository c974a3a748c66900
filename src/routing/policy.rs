use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::registrar::join_path;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read protected route manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse protected route manifest {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("protected route manifest entry '{0}' must start with '/'")]
    InvalidEntry(String),
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(rename = "protectedRoutes")]
    protected_routes: Vec<String>,
}

/// Route paths that always require the authorization middleware.
///
/// Loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ProtectedRoutePolicy {
    routes: BTreeSet<String>,
}

impl ProtectedRoutePolicy {
    /// Reads a `{"protectedRoutes": [...]}` manifest. A missing or malformed
    /// file is an error; the caller decides whether that is fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Manifest = serde_json::from_str(&raw).map_err(|source| PolicyError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(bad) = manifest.protected_routes.iter().find(|p| !p.starts_with('/')) {
            return Err(PolicyError::InvalidEntry(bad.clone()));
        }

        Ok(Self::from_paths(manifest.protected_routes))
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            routes: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// True when an entry equals the controller-relative path or the
    /// prefix-joined path of a route.
    pub fn covers(&self, prefix: &str, route_path: &str) -> bool {
        self.routes.contains(route_path) || self.routes.contains(&join_path(&[prefix, route_path]))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.routes.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
