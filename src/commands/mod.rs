pub mod ingest;
pub mod migrate;
pub mod status;
