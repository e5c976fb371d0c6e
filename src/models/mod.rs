pub mod auth;
pub mod file;
pub mod report;
pub mod task;
