pub mod auth;
pub mod file;
pub mod health;
pub mod report;
pub mod task;
pub mod user;

pub use auth::auth_config;
pub use file::file_config;
pub use report::report_config;
pub use task::task_config;
pub use user::user_config;
