use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::ingest::{REQUIRED_TABLES, check_schema, count_rows, schema_version};

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = &args.db_path;

    info!(path = %db_path.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    if let Err(err) = check_schema(&conn) {
        warn!(error = %err, "schema incomplete");
        return Ok(());
    }

    let version = schema_version(&conn).unwrap_or_default().unwrap_or_default();
    info!(schema_version = %version, "database schema");

    for table in REQUIRED_TABLES {
        let rows = count_rows(&conn, table)
            .with_context(|| format!("failed to count rows in {table}"))?;
        info!(table, rows, "table status");
    }

    Ok(())
}
