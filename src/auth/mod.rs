pub mod forms;
pub mod router;
pub mod user;
