//! Route table construction.
//!
//! # Responsibilities
//! - Derive `"VERB /path"` keys from resource and method names
//! - Record gap segments per resource for the resolver
//! - Freeze the result as an immutable table
//!
//! # Naming Conventions
//! ```text
//! resource Users,   method ImageUrl      → GET    /users/image_url
//! resource Users,   method PostImageUrl  → POST   /users/image_url
//! resource UsersId, method ImageUrl      → GET    /users/:id/image_url
//! resource Users,   method ImageUrlId    → GET    /users/image_url/:id
//! resource Users,   gap "profile", Name  → GET    /users/profile/name
//! resource UsersId, method Delete        → DELETE /users/:id
//! ```
//!
//! # Design Decisions
//! - Built once at startup; lookups never lock
//! - A later registration of the same key replaces the earlier one unless
//!   duplicates are configured to be rejected
//! - Resources sharing a token must agree on their gap; a mismatch fails the build

use std::collections::HashMap;
use std::fmt;

use axum::http::Method as HttpMethod;
use thiserror::Error;

use crate::error::HandlerResult;
use crate::http::Context;
use crate::routing::naming::{convert_name, split_words, DEFAULT_WORD_SEPARATOR};
use crate::routing::resource::{is_exported_name, Handler, Resource, ResourceDescriptor};

/// Path placeholder for an integer id segment.
pub const ID_PLACEHOLDER: &str = ":id";

/// Verbs a route can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }

    /// Verb named by the first word of a converted method name.
    pub fn from_word(word: &str) -> Option<Verb> {
        match word {
            "get" => Some(Verb::Get),
            "post" => Some(Verb::Post),
            "put" => Some(Verb::Put),
            "delete" => Some(Verb::Delete),
            _ => None,
        }
    }

    /// Verb a request is routed under. Anything but POST, PUT and DELETE
    /// is served by GET routes.
    pub fn for_request(method: &str) -> Verb {
        match method {
            "POST" => Verb::Post,
            "PUT" => Verb::Put,
            "DELETE" => Verb::Delete,
            _ => Verb::Get,
        }
    }
}

impl From<&HttpMethod> for Verb {
    fn from(method: &HttpMethod) -> Self {
        Verb::for_request(method.as_str())
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical `"VERB /path"` route key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey(String);

impl RouteKey {
    /// `path` must start with `/`.
    pub fn new(verb: Verb, path: &str) -> Self {
        Self(format!("{} {}", verb.as_str(), path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn verb(&self) -> &str {
        self.0.split_once(' ').map(|(verb, _)| verb).unwrap_or("")
    }

    pub fn path(&self) -> &str {
        self.0.split_once(' ').map(|(_, path)| path).unwrap_or("")
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for RouteKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A registered handler.
#[derive(Clone)]
pub struct Route {
    pub key: RouteKey,
    /// Resource name as registered.
    pub resource: String,
    /// Method name as registered.
    pub method: String,
    handler: Handler,
}

impl Route {
    pub fn call(&self, ctx: &mut Context) -> HandlerResult {
        (self.handler)(ctx)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("key", &self.key)
            .field("resource", &self.resource)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Route key to handler. Immutable once built.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    routes: HashMap<RouteKey, Route>,
}

impl RouteTable {
    pub fn get(&self, key: &str) -> Option<&Route> {
        self.routes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.routes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RouteKey> {
        self.routes.keys()
    }

    /// Sorted, newline-joined dump of every key, for detecting API drift.
    ///
    /// With a base path, the base path (minus its trailing `/`) is placed in
    /// front of every path.
    pub fn handled_paths(&self, base_path: Option<&str>) -> String {
        let base = base_path.map(|b| b.trim_end_matches('/')).unwrap_or("");
        let mut paths: Vec<String> = self
            .routes
            .keys()
            .map(|key| format!("{} {}{}", key.verb(), base, key.path()))
            .collect();
        paths.sort();
        paths.join("\n")
    }
}

/// Resource token to the literal segments between resource and method.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GapTable {
    gaps: HashMap<String, Vec<String>>,
}

impl GapTable {
    pub fn get(&self, resource: &str) -> Option<&[String]> {
        self.gaps.get(resource).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.gaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }

    fn register(&mut self, resource: &str, segments: Vec<String>) {
        self.gaps.entry(resource.to_string()).or_insert(segments);
    }
}

/// The frozen result of a build.
#[derive(Debug, Default, Clone)]
pub struct Routes {
    pub table: RouteTable,
    pub gaps: GapTable,
}

/// Errors raised while building the route table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("word separator must not be empty")]
    EmptySeparator,

    #[error("invalid resource name {0:?}")]
    InvalidResourceName(String),

    #[error("invalid gap {gap:?} on resource {resource:?}")]
    InvalidGap { resource: String, gap: String },

    #[error("resource path {token:?} given different gaps by {first} and {second}")]
    ConflictingGap {
        token: String,
        first: String,
        second: String,
    },

    #[error("route {key} registered by {first} and {second}")]
    DuplicateRoute {
        key: String,
        first: String,
        second: String,
    },
}

/// Collects resources and derives the route table from their names.
#[derive(Debug)]
pub struct RouteTableBuilder {
    separator: String,
    reject_duplicates: bool,
    resources: Vec<ResourceDescriptor>,
}

impl Default for RouteTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTableBuilder {
    pub fn new() -> Self {
        Self {
            separator: DEFAULT_WORD_SEPARATOR.to_string(),
            reject_duplicates: false,
            resources: Vec::new(),
        }
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn reject_duplicates(mut self, reject: bool) -> Self {
        self.reject_duplicates = reject;
        self
    }

    pub fn resource<R: Resource>(self, resource: R) -> Self {
        self.descriptor(ResourceDescriptor::from_resource(resource))
    }

    pub fn descriptor(mut self, descriptor: ResourceDescriptor) -> Self {
        self.resources.push(descriptor);
        self
    }

    /// Derive every route. Resources are processed in registration order.
    pub fn build(self) -> Result<Routes, BuildError> {
        if self.separator.is_empty() {
            return Err(BuildError::EmptySeparator);
        }

        let mut routes = Routes::default();
        let mut plain = HashMap::new();
        for resource in &self.resources {
            self.register(&mut routes, &mut plain, resource)?;
        }

        tracing::info!(
            routes = routes.table.len(),
            resources = self.resources.len(),
            gaps = routes.gaps.len(),
            "Route table built"
        );
        Ok(routes)
    }

    /// `plain` maps each non-id resource path token to the first resource
    /// that claimed it and that resource's gap segments.
    fn register(
        &self,
        routes: &mut Routes,
        plain: &mut HashMap<String, (String, Option<Vec<String>>)>,
        resource: &ResourceDescriptor,
    ) -> Result<(), BuildError> {
        let sep = self.separator.as_str();
        if !resource.name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(BuildError::InvalidResourceName(resource.name.clone()));
        }

        let converted = convert_name(&resource.name, sep);
        let mut words = split_words(&converted, sep);
        let token = words.join(sep);

        // Resource path: token, then either `/:id` or the gap segments.
        let mut resource_path = token.clone();
        let mut id_resource = false;
        if words.len() > 1 && words.last() == Some(&"id") {
            words.pop();
            resource_path = format!("{}/{}", words.join(sep), ID_PLACEHOLDER);
            id_resource = true;
        } else {
            let segments = match &resource.gap {
                Some(gap) => Some(parse_gap(gap).ok_or_else(|| BuildError::InvalidGap {
                    resource: resource.name.clone(),
                    gap: gap.clone(),
                })?),
                None => None,
            };

            // The resolver keys gaps by token alone, so every resource
            // sharing a token must agree on them.
            match plain.get(&token) {
                Some((first, seen)) if *seen != segments => {
                    return Err(BuildError::ConflictingGap {
                        token,
                        first: first.clone(),
                        second: resource.name.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    plain.insert(token.clone(), (resource.name.clone(), segments.clone()));
                }
            }

            if let Some(segments) = segments {
                resource_path = format!("{}/{}", token, segments.join("/"));
                routes.gaps.register(&token, segments);
            }
        }

        for method in &resource.methods {
            if !is_exported_name(&method.name) {
                tracing::debug!(
                    resource = %resource.name,
                    method = %method.name,
                    "Skipping method that cannot be routed"
                );
                continue;
            }

            let path = method_path(&method.name, &resource_path, id_resource, sep);
            let key = RouteKey::new(path.0, &path.1);

            if let Some(existing) = routes.table.routes.get(key.as_str()) {
                if self.reject_duplicates {
                    return Err(BuildError::DuplicateRoute {
                        key: key.to_string(),
                        first: format!("{}.{}", existing.resource, existing.method),
                        second: format!("{}.{}", resource.name, method.name),
                    });
                }
                tracing::debug!(
                    route = %key,
                    replaced = %existing.resource,
                    by = %resource.name,
                    "Route replaced by later registration"
                );
            }

            routes.table.routes.insert(
                key.clone(),
                Route {
                    key,
                    resource: resource.name.clone(),
                    method: method.name.clone(),
                    handler: method.handler.clone(),
                },
            );
        }
        Ok(())
    }
}

/// Verb and path for one method of a resource whose path is `resource_path`.
fn method_path(name: &str, resource_path: &str, id_resource: bool, sep: &str) -> (Verb, String) {
    let converted = convert_name(name, sep);
    let mut words = split_words(&converted, sep);

    let verb = words.first().and_then(|w| Verb::from_word(w));
    let min_id_words = if verb.is_some() { 3 } else { 2 };
    let id_method = !id_resource && words.len() >= min_id_words && words.last() == Some(&"id");
    if id_method {
        words.pop();
    }
    if verb.is_some() {
        words.remove(0);
    }

    let mut path = String::with_capacity(resource_path.len() + converted.len() + 8);
    path.push('/');
    path.push_str(resource_path);
    if !words.is_empty() {
        if !resource_path.is_empty() {
            path.push('/');
        }
        path.push_str(&words.join(sep));
    }
    if id_method {
        path.push('/');
        path.push_str(ID_PLACEHOLDER);
    }
    (verb.unwrap_or(Verb::Get), path)
}

fn parse_gap(gap: &str) -> Option<Vec<String>> {
    let trimmed = gap.trim_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}
