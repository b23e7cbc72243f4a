// Copyright © 2026 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Statement,
};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::types::CoreError;

impl From<DbErr> for CoreError {
    fn from(e: DbErr) -> Self {
        CoreError::DatabaseError(e.to_string())
    }
}

pub async fn create_connection(config: &DatabaseConfig) -> Result<DatabaseConnection, CoreError> {
    if config.url.is_empty() {
        return Err(CoreError::ConfigurationError(
            "Database URL not configured. Set DATABASE_URL environment variable".to_string(),
        ));
    }

    let mut connect_options = ConnectOptions::new(config.url.clone());
    connect_options.sqlx_logging(false);

    if config.is_sqlite() {
        // every pooled connection to `sqlite::memory:` would get its own database
        connect_options.max_connections(1).min_connections(1);
    } else {
        connect_options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(std::time::Duration::from_secs(
                config.acquire_timeout_seconds,
            ))
            .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_seconds));
    }

    info!(
        backend = if config.is_sqlite() { "sqlite" } else { "server" },
        "Connecting to audit database"
    );

    let db = Database::connect(connect_options)
        .await
        .map_err(CoreError::from)?;

    info!("Database connection established successfully");

    Ok(db)
}

fn request_log_ddl(backend: DbBackend) -> Vec<&'static str> {
    match backend {
        DbBackend::Postgres => vec![
            r#"
            CREATE TABLE IF NOT EXISTS request_logs (
                id BIGSERIAL PRIMARY KEY,
                endpoint TEXT NOT NULL,
                method VARCHAR(16) NOT NULL,
                subscriber_no VARCHAR(64),
                status_code INT NOT NULL,
                ip_address VARCHAR(64),
                headers JSONB NOT NULL,
                request_size BIGINT NOT NULL DEFAULT 0,
                response_size BIGINT NOT NULL DEFAULT 0,
                auth_status VARCHAR(32) NOT NULL,
                duration_ms BIGINT NOT NULL DEFAULT 0,
                timestamp TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"CREATE INDEX IF NOT EXISTS idx_request_logs_subscriber_ts ON request_logs (subscriber_no, timestamp)"#,
        ],
        _ => vec![
            r#"
            CREATE TABLE IF NOT EXISTS request_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                endpoint TEXT NOT NULL,
                method TEXT NOT NULL,
                subscriber_no TEXT,
                status_code INTEGER NOT NULL,
                ip_address TEXT,
                headers TEXT NOT NULL,
                request_size INTEGER NOT NULL DEFAULT 0,
                response_size INTEGER NOT NULL DEFAULT 0,
                auth_status TEXT NOT NULL,
                duration_ms INTEGER NOT NULL DEFAULT 0,
                timestamp TEXT NOT NULL
            )
            "#,
            r#"CREATE INDEX IF NOT EXISTS idx_request_logs_subscriber_ts ON request_logs (subscriber_no, timestamp)"#,
        ],
    }
}

/// Create the `request_logs` table and its quota index if missing.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), CoreError> {
    info!("Running database migrations...");

    let backend = db.get_database_backend();
    for sql in request_log_ddl(backend) {
        db.execute(Statement::from_string(backend, sql))
            .await
            .map_err(|e| CoreError::DatabaseError(format!("Failed to create table: {}", e)))?;
    }

    info!("Table created/verified: request_logs");
    Ok(())
}
