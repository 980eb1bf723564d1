use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::MigrateArgs;
use crate::commands::ingest::{DB_SCHEMA_VERSION, check_schema, migrate_schema, open_connection};

pub fn run(args: MigrateArgs) -> Result<()> {
    info!(db_path = %args.db_path.display(), "migrating database schema");

    let connection = open_connection(&args.db_path, Duration::from_secs(5))?;
    migrate_schema(&connection).context("error migrating database schema")?;
    check_schema(&connection).context("schema incomplete after migration")?;

    info!(schema_version = DB_SCHEMA_VERSION, "schema ready");
    Ok(())
}
