//! Adapters to the outside world: ambient identity and Azure Key Vault.

pub mod identity;
pub mod keyvault;
