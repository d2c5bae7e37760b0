//! BDD step definitions for nutrimatic

pub mod access_steps;
pub mod calendar_steps;
pub mod config_steps;
pub mod http_steps;
pub mod proxy_steps;
pub mod webhook_steps;
