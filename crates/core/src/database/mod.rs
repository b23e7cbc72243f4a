mod connection;
mod repository;
pub mod request_log_entity;

pub use connection::{create_connection, run_migrations};
pub use repository::SeaOrmAuditSink;

use crate::config::DatabaseConfig;
use crate::types::Result;

/// Connect, migrate and wrap the connection as an audit sink.
pub async fn connect_audit_sink(config: &DatabaseConfig) -> Result<SeaOrmAuditSink> {
    let db = create_connection(config).await?;
    run_migrations(&db).await?;
    Ok(SeaOrmAuditSink::new(db))
}
