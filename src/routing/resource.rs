//! Resource registration.
//!
//! A resource is a value whose methods become route handlers. Instead of
//! inspecting types at runtime, a resource lists its methods by their
//! CamelCase names; the route table derives paths from those names.
//!
//! ```rust,ignore
//! struct UsersId;
//!
//! impl UsersId {
//!     fn image_url(&self, ctx: &mut Context) -> HandlerResult { /* ... */ Ok(()) }
//! }
//!
//! impl Resource for UsersId {
//!     fn methods() -> Vec<Method<Self>> {
//!         vec![Method::new("ImageUrl", Self::image_url)]   // GET /users/:id/image_url
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::HandlerResult;
use crate::http::Context;
use crate::routing::naming::short_type_name;

/// A bound route handler.
pub type Handler = Arc<dyn Fn(&mut Context) -> HandlerResult + Send + Sync>;

/// One handler method of a resource type.
pub struct Method<R> {
    name: &'static str,
    call: fn(&R, &mut Context) -> HandlerResult,
}

impl<R> Method<R> {
    pub const fn new(name: &'static str, call: fn(&R, &mut Context) -> HandlerResult) -> Self {
        Self { name, call }
    }
}

/// A value whose methods are exposed as routes.
pub trait Resource: Send + Sync + Sized + 'static {
    /// Handler methods, named by convention (`PostImageUrl`, `FooId`, ...).
    fn methods() -> Vec<Method<Self>>;

    /// Literal `/`-delimited segments placed between the resource name and
    /// the method name.
    fn gap(&self) -> Option<&str> {
        None
    }

    /// Name the path is derived from. Defaults to the bare type name.
    fn resource_name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// A named handler waiting to be placed in the route table.
#[derive(Clone)]
pub struct MethodDescriptor {
    pub name: String,
    pub handler: Handler,
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Everything the route table needs to know about one resource.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub name: String,
    pub gap: Option<String>,
    pub methods: Vec<MethodDescriptor>,
}

impl ResourceDescriptor {
    /// An empty descriptor. An empty name places methods at the root.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gap: None,
            methods: Vec::new(),
        }
    }

    /// Describe a resource, binding every method to one shared instance.
    pub fn from_resource<R: Resource>(resource: R) -> Self {
        let name = resource.resource_name().to_string();
        let gap = resource.gap().map(str::to_string);
        let instance = Arc::new(resource);

        let methods = R::methods()
            .into_iter()
            .map(|method| {
                let instance = Arc::clone(&instance);
                let call = method.call;
                MethodDescriptor {
                    name: method.name.to_string(),
                    handler: Arc::new(move |ctx: &mut Context| call(&instance, ctx)),
                }
            })
            .collect();

        Self { name, gap, methods }
    }

    pub fn with_gap(mut self, gap: impl Into<String>) -> Self {
        self.gap = Some(gap.into());
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.methods.push(MethodDescriptor {
            name: name.into(),
            handler: Arc::new(handler),
        });
        self
    }
}

/// Whether a method name can become a route.
///
/// Names must start with an uppercase ASCII letter and contain only ASCII
/// letters, digits and underscores.
pub fn is_exported_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
