//! Route registry.
//!
//! Populated once at startup, read-only while serving. Patterns are unique
//! keys; a duplicate registration is a startup error, not a silent
//! overwrite.

use std::collections::HashMap;
use std::sync::Arc;

use crate::routing::Route;

/// Error type for route registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate route pattern: {0}")]
    DuplicatePattern(String),

    #[error("route pattern must start with '/': {0}")]
    InvalidPattern(String),
}

/// Holds every registered route, keyed by pattern.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: HashMap<String, Arc<Route>>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route. Fails on a duplicate or malformed pattern.
    pub fn register(&mut self, route: Route) -> Result<(), RegistryError> {
        if !route.pattern.starts_with('/') {
            return Err(RegistryError::InvalidPattern(route.pattern));
        }
        if self.routes.contains_key(&route.pattern) {
            return Err(RegistryError::DuplicatePattern(route.pattern));
        }
        self.routes.insert(route.pattern.clone(), Arc::new(route));
        Ok(())
    }

    /// Look up the route bound to `pattern`.
    pub fn lookup(&self, pattern: &str) -> Option<Arc<Route>> {
        self.routes.get(pattern).cloned()
    }

    /// Iterate all routes, for router assembly.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Route>)> {
        self.routes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{Handler, HandlerPayload};

    fn noop_route(pattern: &str) -> Route {
        Route::new(pattern, Handler::default_fn(|_, _| async { Ok(HandlerPayload::Empty) }))
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = RouteRegistry::new();
        registry.register(noop_route("/a")).unwrap();
        registry.register(noop_route("/b")).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.lookup("/a").is_some());
        assert!(registry.lookup("/missing").is_none());
    }

    #[test]
    fn duplicate_pattern_rejected() {
        let mut registry = RouteRegistry::new();
        registry.register(noop_route("/a")).unwrap();
        let err = registry.register(noop_route("/a")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatePattern(_)));
    }

    #[test]
    fn pattern_must_be_rooted() {
        let mut registry = RouteRegistry::new();
        let err = registry.register(noop_route("echo")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPattern(_)));
    }
}
