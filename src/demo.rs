//! Sample resources served by the binary.
//!
//! ```text
//! GET    /ping
//! GET    /users                      list
//! POST   /users                      create {"name": ...}
//! GET    /users/:id                  fetch
//! PUT    /users/:id                  rename {"name": ...}
//! DELETE /users/:id                  remove
//! GET    /users/:id/name
//! GET    /docs/static/v2/page/:id    gap resource
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{HandlerResult, InternalError};
use crate::http::Context;
use crate::routing::{Method, Resource, RouteTableBuilder};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct UserInput {
    name: String,
}

/// In-memory user storage shared by the user resources.
#[derive(Debug, Default)]
pub struct UserStore {
    users: Mutex<BTreeMap<i64, User>>,
}

impl UserStore {
    pub fn insert(&self, name: &str) -> User {
        let mut users = self.users.lock();
        let id = users.keys().next_back().copied().unwrap_or(0) + 1;
        let user = User {
            id,
            name: name.to_string(),
        };
        users.insert(id, user.clone());
        user
    }

    pub fn get(&self, id: i64) -> Option<User> {
        self.users.lock().get(&id).cloned()
    }

    pub fn list(&self) -> Vec<User> {
        self.users.lock().values().cloned().collect()
    }

    fn rename(&self, id: i64, name: &str) -> Option<User> {
        let mut users = self.users.lock();
        let user = users.get_mut(&id)?;
        user.name = name.to_string();
        Some(user.clone())
    }

    fn remove(&self, id: i64) -> Option<User> {
        self.users.lock().remove(&id)
    }
}

fn read_name(ctx: &Context) -> Result<String, Box<dyn crate::error::AppError>> {
    let input: UserInput = ctx.json_body()?;
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ctx.request_error("name must not be empty"));
    }
    Ok(name.to_string())
}

/// Root resource.
pub struct Service;

impl Service {
    fn ping(&self, ctx: &mut Context) -> HandlerResult {
        ctx.set_data(&"pong")
    }
}

impl Resource for Service {
    fn methods() -> Vec<Method<Self>> {
        vec![Method::new("Ping", Self::ping)]
    }

    fn resource_name(&self) -> &str {
        ""
    }
}

/// The user collection.
pub struct Users {
    store: Arc<UserStore>,
}

impl Users {
    fn list(&self, ctx: &mut Context) -> HandlerResult {
        ctx.set_data(&self.store.list())
    }

    fn create(&self, ctx: &mut Context) -> HandlerResult {
        let name = read_name(ctx)?;
        let user = self.store.insert(&name);
        ctx.status = 201;
        ctx.set_data(&user)
    }
}

impl Resource for Users {
    fn methods() -> Vec<Method<Self>> {
        vec![Method::new("Get", Self::list), Method::new("Post", Self::create)]
    }
}

/// A single user, addressed by id.
pub struct UsersId {
    store: Arc<UserStore>,
}

impl UsersId {
    fn find(&self, ctx: &Context) -> Result<User, Box<dyn crate::error::AppError>> {
        self.store
            .get(ctx.id)
            .ok_or_else(|| ctx.request_error(format!("user {} does not exist", ctx.id)))
    }

    fn get(&self, ctx: &mut Context) -> HandlerResult {
        let user = self.find(ctx)?;
        ctx.set_data(&user)
    }

    fn name(&self, ctx: &mut Context) -> HandlerResult {
        let user = self.find(ctx)?;
        ctx.set_data(&user.name)
    }

    fn put(&self, ctx: &mut Context) -> HandlerResult {
        let name = read_name(ctx)?;
        match self.store.rename(ctx.id, &name) {
            Some(user) => ctx.set_data(&user),
            None => Err(ctx.request_error(format!("user {} does not exist", ctx.id))),
        }
    }

    fn delete(&self, ctx: &mut Context) -> HandlerResult {
        match self.store.remove(ctx.id) {
            Some(user) => ctx.set_data(&user),
            None => Err(InternalError::from_display(format!("user {} vanished", ctx.id)).into()),
        }
    }
}

impl Resource for UsersId {
    fn methods() -> Vec<Method<Self>> {
        vec![
            Method::new("Get", Self::get),
            Method::new("Name", Self::name),
            Method::new("Put", Self::put),
            Method::new("Delete", Self::delete),
        ]
    }
}

/// Static documentation pages under a fixed gap.
pub struct Docs;

impl Docs {
    fn page(&self, ctx: &mut Context) -> HandlerResult {
        let page = ctx.id;
        if page <= 0 {
            return Err(ctx.request_error("pages start at 1"));
        }
        ctx.set_data(&serde_json::json!({ "page": page, "gaps": ctx.gaps() }))
    }
}

impl Resource for Docs {
    fn methods() -> Vec<Method<Self>> {
        vec![Method::new("PageId", Self::page)]
    }

    fn gap(&self) -> Option<&str> {
        Some("static/v2")
    }
}

/// Register every sample resource on `builder`.
pub fn register(builder: RouteTableBuilder, store: Arc<UserStore>) -> RouteTableBuilder {
    builder
        .resource(Service)
        .resource(Users {
            store: Arc::clone(&store),
        })
        .resource(UsersId { store })
        .resource(Docs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_routes() {
        let routes = register(RouteTableBuilder::new(), Arc::new(UserStore::default()))
            .build()
            .unwrap();
        assert_eq!(
            routes.table.handled_paths(None),
            [
                "DELETE /users/:id",
                "GET /docs/static/v2/page/:id",
                "GET /ping",
                "GET /users",
                "GET /users/:id",
                "GET /users/:id/name",
                "POST /users",
                "PUT /users/:id",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_store_ids_increase() {
        let store = UserStore::default();
        assert_eq!(store.insert("ann").id, 1);
        assert_eq!(store.insert("bob").id, 2);
        assert_eq!(store.rename(2, "rob").unwrap().name, "rob");
        assert_eq!(store.remove(1).unwrap().name, "ann");
        assert_eq!(store.list(), vec![User { id: 2, name: "rob".into() }]);
    }
}
