//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs and external entity ids are stored as strings.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Audit events (organization scope, append-only)
-- =======================================================================
DEFINE TABLE audit_event SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD organization_id ON TABLE audit_event TYPE string;
DEFINE FIELD object_type ON TABLE audit_event TYPE string;
DEFINE FIELD object_id ON TABLE audit_event TYPE string;
DEFINE FIELD event_type ON TABLE audit_event TYPE string;
DEFINE FIELD version ON TABLE audit_event TYPE int;
-- Serialized JSON; keeps snapshot and delta key order intact.
DEFINE FIELD payload ON TABLE audit_event TYPE string;
DEFINE FIELD date_created ON TABLE audit_event TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_event_org_date ON TABLE audit_event \
    COLUMNS organization_id, date_created;
DEFINE INDEX idx_audit_event_org_type ON TABLE audit_event \
    COLUMNS organization_id, event_type;

-- =======================================================================
-- Event webhooks (organization scope)
-- =======================================================================
DEFINE TABLE event_webhook SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE event_webhook TYPE string;
DEFINE FIELD name ON TABLE event_webhook TYPE string;
DEFINE FIELD url ON TABLE event_webhook TYPE string;
DEFINE FIELD events ON TABLE event_webhook TYPE array;
DEFINE FIELD events.* ON TABLE event_webhook TYPE string;
DEFINE FIELD environments ON TABLE event_webhook TYPE array;
DEFINE FIELD environments.* ON TABLE event_webhook TYPE string;
DEFINE FIELD enabled ON TABLE event_webhook TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE event_webhook TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE event_webhook TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_event_webhook_org ON TABLE event_webhook \
    COLUMNS organization_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(version = migration.version, "Migration applied");
        }
    }

    Ok(())
}
