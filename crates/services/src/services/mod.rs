pub mod entity_error;
pub mod roles;
pub mod tags;
pub mod tasks;
pub mod users;
