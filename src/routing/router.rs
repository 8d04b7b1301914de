//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled templates bound to handler groups
//! - Resolve a path to the first matching mount
//! - Return the match or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (shared via Arc, no locks)
//! - O(n) scan in registration order (route counts are tiny)

use std::sync::Arc;

use thiserror::Error;

use super::template::{RouteMatch, RouteTemplate, TemplateError};
use crate::config::RouteConfig;
use crate::handler::{HandlerGroup, HandlerRegistry};

/// Error building the route table from configuration.
#[derive(Debug, Error)]
pub enum RouteTableError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("route `{pattern}` references unknown handler group `{group}`")]
    UnknownGroup { pattern: String, group: String },
}

/// A template bound to the handler group it forwards to.
pub struct MountedRoute {
    pub template: RouteTemplate,
    pub group: Arc<dyn HandlerGroup>,
}

impl std::fmt::Debug for MountedRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountedRoute")
            .field("template", &self.template.pattern())
            .field("group", &self.group.name())
            .finish()
    }
}

/// Ordered set of mounted routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<MountedRoute>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route; it is tried after every route mounted before it.
    pub fn mount(
        &mut self,
        pattern: &str,
        group: Arc<dyn HandlerGroup>,
    ) -> Result<&mut Self, TemplateError> {
        let template = RouteTemplate::parse(pattern)?;

        if let Some(earlier) = self
            .routes
            .iter()
            .find(|r| !r.template.static_prefix().is_empty() && r.template.static_prefix() == template.static_prefix())
        {
            tracing::warn!(
                pattern = %template,
                earlier = %earlier.template,
                earlier_group = %earlier.group.name(),
                "Route overlaps an earlier mount; earlier registration wins on conflicts"
            );
        }

        tracing::debug!(pattern = %template, group = %group.name(), "Route mounted");
        self.routes.push(MountedRoute { template, group });
        Ok(self)
    }

    /// Build the table from configured routes, in file order.
    pub fn from_config(
        routes: &[RouteConfig],
        groups: &HandlerRegistry,
    ) -> Result<Self, RouteTableError> {
        let mut table = Self::new();
        for route in routes {
            let group = groups
                .get(&route.group)
                .cloned()
                .ok_or_else(|| RouteTableError::UnknownGroup {
                    pattern: route.pattern.clone(),
                    group: route.group.clone(),
                })?;
            table.mount(&route.pattern, group)?;
        }
        Ok(table)
    }

    /// First mounted route whose template matches `path`.
    pub fn resolve(&self, path: &str) -> Option<(&MountedRoute, RouteMatch)> {
        self.routes
            .iter()
            .find_map(|route| route.template.match_path(path).map(|m| (route, m)))
    }

    pub fn routes(&self) -> &[MountedRoute] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
