//! Billgate core: configuration, token verification, audit records and the
//! daily quota policy shared by the gateway server.

pub mod audit;
pub mod auth;
pub mod config;
pub mod database;
pub mod rate_limit;
pub mod types;

#[cfg(test)]
pub mod tests;

pub use audit::*;
pub use auth::*;
pub use config::*;
pub use rate_limit::*;
pub use types::*;
