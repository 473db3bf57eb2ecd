pub mod config;
pub mod error;
pub mod routes;

use db::{DBService, partial_update::UnknownFieldPolicy};
use services::services::{
    roles::RoleService, tags::TagService, tasks::TaskService, users::UserService,
};

/// Everything a handler needs; cloned into each request.
#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskService,
    pub users: UserService,
    pub roles: RoleService,
    pub tags: TagService,
}

impl AppState {
    pub fn new(db: DBService, unknown_fields: UnknownFieldPolicy) -> Self {
        let pool = db.pool.clone();
        Self {
            tasks: TaskService::new(pool.clone(), unknown_fields),
            users: UserService::new(pool.clone(), unknown_fields),
            roles: RoleService::new(pool.clone()),
            tags: TagService::new(pool),
        }
    }
}
