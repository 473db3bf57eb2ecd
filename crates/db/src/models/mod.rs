pub mod role;
pub mod tag;
pub mod task;
pub mod task_status;
pub mod user;
