//! Error types for loading topics.
//!
//! [`DocumentError`] covers everything that can go wrong with a single
//! document. The pipeline turns it into a failed outcome and moves on.
//! [`SetupError`] is raised before any worker starts and ends the run.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A step of the cascading topic write, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    Begin,
    Profiles,
    Topic,
    Comments,
    Attachments,
    Poll,
    PollAnswers,
    Commit,
}

impl WriteStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::Profiles => "profiles",
            Self::Topic => "topic",
            Self::Comments => "comments",
            Self::Attachments => "attachments",
            Self::Poll => "poll",
            Self::PollAnswers => "poll_answers",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for WriteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed topic transaction. Nothing from it was committed.
#[derive(Error, Debug)]
#[error("failed to write topic {topic_id} at step {step}: {source}")]
pub struct WriteError {
    pub topic_id: i64,
    pub step: WriteStep,
    #[source]
    pub source: rusqlite::Error,
}

/// Per-document failures.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document could not be read from its source.
    #[error("failed to read {reference}: {source}")]
    Source {
        reference: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not a valid topic.
    #[error("failed to decode {reference}: {source}")]
    Decode {
        reference: String,
        #[source]
        source: serde_json::Error,
    },

    /// The version lookup failed. A missing row is not an error.
    #[error("failed to look up topic {topic_id}: {source}")]
    Lookup {
        topic_id: i64,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Write(#[from] WriteError),
}

impl DocumentError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Source { .. } => "source",
            Self::Decode { .. } => "decode",
            Self::Lookup { .. } => "lookup",
            Self::Write(_) => "write",
        }
    }
}

/// Failures that stop the run before any document is processed.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("failed to open database {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to configure connection ({setting}): {source}")]
    Configure {
        setting: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to apply schema: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("table {0} missing, run with --migrate to create it")]
    MissingTable(&'static str),
}
