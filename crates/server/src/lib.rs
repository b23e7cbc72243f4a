//! Billgate Server

pub mod audit;
pub mod error_handler;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod router;

#[cfg(test)]
mod tests;

pub use audit::MemoryAuditSink;
pub use gateway::Gateway;
pub use router::{create_router, with_gateway, AppState};
