pub mod config;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod server;
pub mod services;
