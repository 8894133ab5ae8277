//! Secret lookup contract and the startup resolution policy built on it.

pub mod resolver;
pub mod secret_store;
