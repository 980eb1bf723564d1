mod db_setup;
mod pipeline;
mod run;
mod source;
mod staleness;
mod topic_locks;
mod writer;

pub use run::run;
pub(crate) use db_setup::{
    DB_SCHEMA_VERSION, REQUIRED_TABLES, check_schema, count_rows, migrate_schema, open_connection,
    schema_version,
};
