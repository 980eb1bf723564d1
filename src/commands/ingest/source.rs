use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::Topic;

/// Points at one document inside a [`DocumentSource`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentRef(PathBuf);

impl DocumentRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Raw document storage shared by all workers.
pub trait DocumentSource: Sync {
    fn read(&self, reference: &DocumentRef) -> io::Result<Vec<u8>>;
}

/// A folder of `*.json` topic exports.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists the JSON files directly under the root, sorted by path.
    pub fn discover(&self) -> Result<Vec<DocumentRef>> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to read {}", self.root.display()))?;

        let mut documents = Vec::new();
        for entry in entries {
            let entry =
                entry.with_context(|| format!("failed to read entry in {}", self.root.display()))?;
            let path = entry.path();

            if !entry
                .file_type()
                .with_context(|| format!("failed to inspect file type: {}", path.display()))?
                .is_file()
            {
                continue;
            }

            let is_json = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false);

            if is_json {
                documents.push(DocumentRef::new(path));
            }
        }

        documents.sort();
        Ok(documents)
    }
}

impl DocumentSource for DirectorySource {
    fn read(&self, reference: &DocumentRef) -> io::Result<Vec<u8>> {
        fs::read(reference.path())
    }
}

/// Decodes one exported topic.
///
/// The exporter writes an absent poll as a zero-valued object, so a poll
/// with id 0 is dropped here.
pub fn decode_topic(raw: &[u8]) -> serde_json::Result<Topic> {
    let mut topic: Topic = serde_json::from_slice(raw)?;
    topic.poll = topic.poll.filter(|poll| poll.id != 0);
    Ok(topic)
}
