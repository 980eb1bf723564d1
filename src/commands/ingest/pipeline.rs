//! Bounded worker pool that loads topic documents into the store.
//!
//! One dispatcher thread hands document references, in input order, to a
//! fixed set of worker threads over a rendezvous channel. Every worker owns
//! its own SQLite connection. For each reference it reads, decodes,
//! resolves staleness and writes while holding the topic's lock, then
//! reports exactly one [`DocumentOutcome`]. Outcomes flow back to the
//! calling thread, which hands them to the caller as they arrive.

use std::fmt;
use std::panic;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use super::db_setup::open_connection;
use super::source::{DocumentRef, DocumentSource, decode_topic};
use super::staleness::{Decision, lookup_topic_version, resolve};
use super::topic_locks::TopicLocks;
use super::writer::write_topic;
use crate::error::{DocumentError, SetupError};
use crate::util::sha256_bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    SkippedEqual,
    SkippedStale,
    Failed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::SkippedEqual => "skipped_equal",
            Self::SkippedStale => "skipped_stale",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fate of one document.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub reference: DocumentRef,
    pub topic_id: Option<i64>,
    pub sha256: Option<String>,
    pub outcome: Outcome,
    pub error: Option<DocumentError>,
}

impl DocumentOutcome {
    fn failed(
        reference: DocumentRef,
        topic_id: Option<i64>,
        sha256: Option<String>,
        error: DocumentError,
    ) -> Self {
        Self {
            reference,
            topic_id,
            sha256,
            outcome: Outcome::Failed,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub created: usize,
    pub updated: usize,
    pub skipped_equal: usize,
    pub skipped_stale: usize,
    pub failed: usize,
}

impl WorkerStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::SkippedEqual => self.skipped_equal += 1,
            Outcome::SkippedStale => self.skipped_stale += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub dispatched: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped_equal: usize,
    pub skipped_stale: usize,
    pub failed: usize,
}

impl RunSummary {
    fn absorb(&mut self, stats: WorkerStats) {
        self.created += stats.created;
        self.updated += stats.updated;
        self.skipped_equal += stats.skipped_equal;
        self.skipped_stale += stats.skipped_stale;
        self.failed += stats.failed;
    }

    pub fn processed(&self) -> usize {
        self.created + self.updated + self.skipped_equal + self.skipped_stale + self.failed
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub db_path: PathBuf,
    pub workers: usize,
    pub busy_timeout: Duration,
}

pub struct Pipeline {
    connections: Vec<Connection>,
    locks: TopicLocks,
}

impl Pipeline {
    /// Opens one connection per worker. Nothing is dispatched if any of
    /// them fails.
    pub fn open(config: &PipelineConfig) -> Result<Self, SetupError> {
        let connections = (0..config.workers.max(1))
            .map(|_| open_connection(&config.db_path, config.busy_timeout))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            connections,
            locks: TopicLocks::new(),
        })
    }

    pub fn workers(&self) -> usize {
        self.connections.len()
    }

    /// Processes every reference exactly once and returns when all workers
    /// are done. `on_outcome` runs on the calling thread, in completion
    /// order.
    pub fn run<S>(
        &mut self,
        source: &S,
        references: Vec<DocumentRef>,
        mut on_outcome: impl FnMut(DocumentOutcome),
    ) -> RunSummary
    where
        S: DocumentSource + ?Sized,
    {
        let locks = &self.locks;
        let connections = &mut self.connections;
        let worker_count = connections.len();

        let summary = thread::scope(move |scope| {
            let (reference_tx, reference_rx) = bounded::<DocumentRef>(0);
            let (outcome_tx, outcome_rx) = unbounded::<DocumentOutcome>();

            let dispatcher = scope.spawn(move || {
                let mut dispatched: usize = 0;
                for reference in references {
                    if reference_tx.send(reference).is_err() {
                        break;
                    }
                    dispatched += 1;
                }
                debug!(dispatched, "dispatcher exhausted input");
                dispatched
            });

            let workers: Vec<_> = connections
                .into_iter()
                .enumerate()
                .map(|(worker_id, connection)| {
                    let reference_rx = reference_rx.clone();
                    let outcome_tx = outcome_tx.clone();
                    scope.spawn(move || {
                        let mut stats = WorkerStats::default();
                        while let Ok(reference) = reference_rx.recv() {
                            let outcome = process_document(connection, source, locks, reference);
                            log_outcome(worker_id, &outcome);
                            stats.record(outcome.outcome);
                            if outcome_tx.send(outcome).is_err() {
                                break;
                            }
                        }
                        stats
                    })
                })
                .collect();

            drop(reference_rx);
            drop(outcome_tx);

            for outcome in outcome_rx.iter() {
                on_outcome(outcome);
            }

            let mut summary = RunSummary {
                dispatched: join_or_resume(dispatcher),
                ..RunSummary::default()
            };
            for worker in workers {
                summary.absorb(join_or_resume(worker));
            }
            summary
        });

        debug!(
            workers = worker_count,
            locks_in_flight = self.locks.in_flight(),
            "pipeline drained"
        );

        summary
    }
}

fn join_or_resume<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(payload) => panic::resume_unwind(payload),
    }
}

/// Runs one document through read, decode, staleness and write. Every
/// failure is folded into the returned outcome.
pub fn process_document<S>(
    connection: &mut Connection,
    source: &S,
    locks: &TopicLocks,
    reference: DocumentRef,
) -> DocumentOutcome
where
    S: DocumentSource + ?Sized,
{
    let raw = match source.read(&reference) {
        Ok(raw) => raw,
        Err(source) => {
            let error = DocumentError::Source {
                reference: reference.to_string(),
                source,
            };
            return DocumentOutcome::failed(reference, None, None, error);
        }
    };
    let sha256 = Some(sha256_bytes(&raw));

    let topic = match decode_topic(&raw) {
        Ok(topic) => topic,
        Err(source) => {
            let error = DocumentError::Decode {
                reference: reference.to_string(),
                source,
            };
            return DocumentOutcome::failed(reference, None, sha256, error);
        }
    };
    let topic_id = topic.id;

    let result = locks.with_topic(topic_id, || -> Result<Outcome, DocumentError> {
        let existing = lookup_topic_version(connection, topic_id)
            .map_err(|source| DocumentError::Lookup { topic_id, source })?;

        let decision = resolve(&topic, existing);
        match decision.write_kind() {
            Some(kind) => Ok(write_topic(connection, &topic, kind)?),
            None if decision == Decision::SkipEqual => Ok(Outcome::SkippedEqual),
            None => Ok(Outcome::SkippedStale),
        }
    });

    match result {
        Ok(outcome) => DocumentOutcome {
            reference,
            topic_id: Some(topic_id),
            sha256,
            outcome,
            error: None,
        },
        Err(error) => DocumentOutcome::failed(reference, Some(topic_id), sha256, error),
    }
}

fn log_outcome(worker: usize, outcome: &DocumentOutcome) {
    let reference = outcome.reference.to_string();
    let topic_id = outcome.topic_id.unwrap_or_default();

    match (&outcome.outcome, &outcome.error) {
        (Outcome::Failed, Some(error)) => warn!(
            worker,
            reference = %reference,
            topic_id,
            kind = error.kind(),
            error = %error,
            "document failed"
        ),
        (Outcome::Created | Outcome::Updated, _) => info!(
            worker,
            reference = %reference,
            topic_id,
            outcome = %outcome.outcome,
            "topic stored"
        ),
        _ => debug!(
            worker,
            reference = %reference,
            topic_id,
            outcome = %outcome.outcome,
            "topic skipped"
        ),
    }
}
