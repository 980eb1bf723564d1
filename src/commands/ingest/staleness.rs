use rusqlite::{Connection, OptionalExtension, params};

use crate::model::Topic;

/// The persisted version marker of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicVersion {
    pub id: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Create,
    Update,
    SkipEqual,
    SkipStale,
}

/// How an approved document reaches the store. Both kinds run the same
/// upserts; the kind only decides the reported outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
}

impl Decision {
    pub fn write_kind(self) -> Option<WriteKind> {
        match self {
            Self::Create => Some(WriteKind::Create),
            Self::Update => Some(WriteKind::Update),
            Self::SkipEqual | Self::SkipStale => None,
        }
    }
}

pub fn resolve(incoming: &Topic, existing: Option<TopicVersion>) -> Decision {
    let Some(existing) = existing else {
        return Decision::Create;
    };

    match existing.updated_at.cmp(&incoming.updated_at) {
        std::cmp::Ordering::Equal => Decision::SkipEqual,
        std::cmp::Ordering::Greater => Decision::SkipStale,
        std::cmp::Ordering::Less => Decision::Update,
    }
}

pub fn lookup_topic_version(
    connection: &Connection,
    topic_id: i64,
) -> rusqlite::Result<Option<TopicVersion>> {
    connection
        .query_row(
            "SELECT id, updated_at FROM topics WHERE id = ?1",
            params![topic_id],
            |row| {
                Ok(TopicVersion {
                    id: row.get(0)?,
                    updated_at: row.get(1)?,
                })
            },
        )
        .optional()
}
