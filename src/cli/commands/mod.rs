pub mod auth;
pub mod config;

pub use auth::{AuthCommands, auth_command};
pub use config::{ConfigCommands, config_command};
