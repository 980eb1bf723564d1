use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use super::db_setup::{DB_SCHEMA_VERSION, check_schema, migrate_schema, open_connection};
use super::pipeline::{DocumentOutcome, Pipeline, PipelineConfig, RunSummary};
use super::source::DirectorySource;
use crate::cli::IngestArgs;
use crate::model::{IngestCounts, IngestPaths, IngestRunReport, OutcomeEntry};
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));
    let busy_timeout = Duration::from_millis(args.busy_timeout_ms);

    let report_path = args.report_path.clone().unwrap_or_else(|| {
        PathBuf::from("manifests").join(format!(
            "ingest_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });

    info!(
        folder = %args.folder.display(),
        db_path = %args.db_path.display(),
        workers = args.workers,
        run_id = %run_id,
        "starting ingest"
    );

    let connection = open_connection(&args.db_path, busy_timeout)?;
    if args.migrate {
        info!("migrating database schema");
        migrate_schema(&connection).context("error migrating database schema")?;
    }
    check_schema(&connection).context("database schema error")?;
    drop(connection);

    let source = DirectorySource::new(&args.folder);
    let references = source
        .discover()
        .context("could not list the JSON documents")?;
    if references.is_empty() {
        warn!(folder = %source.root().display(), "no JSON documents found");
    }

    let mut pipeline = Pipeline::open(&PipelineConfig {
        db_path: args.db_path.clone(),
        workers: usize::from(args.workers),
        busy_timeout,
    })?;

    let mut outcomes = Vec::with_capacity(references.len());
    let summary = pipeline.run(&source, references, |outcome| {
        outcomes.push(outcome_entry(outcome));
    });
    outcomes.sort_by(|a, b| a.reference.cmp(&b.reference));

    let report = IngestRunReport {
        report_version: 1,
        run_id,
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        finished_at: now_utc_string(),
        command: render_ingest_command(&args),
        paths: IngestPaths {
            source_dir: args.folder.display().to_string(),
            db_path: args.db_path.display().to_string(),
        },
        workers: pipeline.workers(),
        counts: counts_from(&summary),
        outcomes,
    };
    write_json_pretty(&report_path, &report)?;

    info!(path = %report_path.display(), "wrote ingest run report");
    info!(
        documents = summary.dispatched,
        processed = summary.processed(),
        created = summary.created,
        updated = summary.updated,
        skipped_equal = summary.skipped_equal,
        skipped_stale = summary.skipped_stale,
        failed = summary.failed,
        "done"
    );

    Ok(())
}

fn outcome_entry(outcome: DocumentOutcome) -> OutcomeEntry {
    OutcomeEntry {
        reference: outcome.reference.to_string(),
        topic_id: outcome.topic_id,
        sha256: outcome.sha256,
        outcome: outcome.outcome.as_str().to_string(),
        error_kind: outcome.error.as_ref().map(|error| error.kind().to_string()),
        error: outcome.error.map(|error| error.to_string()),
    }
}

fn counts_from(summary: &RunSummary) -> IngestCounts {
    IngestCounts {
        documents: summary.dispatched,
        created: summary.created,
        updated: summary.updated,
        skipped_equal: summary.skipped_equal,
        skipped_stale: summary.skipped_stale,
        failed: summary.failed,
    }
}

fn render_ingest_command(args: &IngestArgs) -> String {
    let mut command = format!(
        "topic-loader ingest --folder {} --db-path {} --workers {} --busy-timeout-ms {}",
        args.folder.display(),
        args.db_path.display(),
        args.workers,
        args.busy_timeout_ms
    );
    if args.migrate {
        command.push_str(" --migrate");
    }
    if let Some(path) = &args.report_path {
        command.push_str(&format!(" --report-path {}", path.display()));
    }
    command
}
