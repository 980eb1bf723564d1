use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub screen_name: String,
    #[serde(default)]
    pub photo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub is_fixed: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub created_by: Profile,
    pub updated_by: Profile,
    #[serde(default, deserialize_with = "null_as_default")]
    pub profiles: BTreeMap<i64, Profile>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub poll: Option<Poll>,
}

impl Topic {
    /// Every profile the topic references, with the creator and the last
    /// updater present even when the exporter left them out of `profiles`.
    pub fn participants(&self) -> BTreeMap<i64, &Profile> {
        let mut participants: BTreeMap<i64, &Profile> = self
            .profiles
            .iter()
            .map(|(id, profile)| (*id, profile))
            .collect();
        participants.insert(self.created_by.id, &self.created_by);
        participants.insert(self.updated_by.id, &self.updated_by);
        participants
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub from_id: i64,
    pub date: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub likes: i64,
    #[serde(default, deserialize_with = "zero_as_none")]
    pub reply_to_uid: Option<i64>,
    #[serde(default, deserialize_with = "zero_as_none")]
    pub reply_to_cid: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: i64,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub votes: i64,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub end_date: i64,
    #[serde(default)]
    pub closed: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub answers: Vec<PollAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollAnswer {
    pub id: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub votes: i64,
    #[serde(default)]
    pub rate: f64,
}

// Empty collections come out of the exporter as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// The exporter writes 0 for "not a reply".
fn zero_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<i64>::deserialize(deserializer)?;
    Ok(value.filter(|id| *id != 0))
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestPaths {
    pub source_dir: String,
    pub db_path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestCounts {
    pub documents: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped_equal: usize,
    pub skipped_stale: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeEntry {
    pub reference: String,
    pub topic_id: Option<i64>,
    pub sha256: Option<String>,
    pub outcome: String,
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunReport {
    pub report_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub finished_at: String,
    pub command: String,
    pub paths: IngestPaths,
    pub workers: usize,
    pub counts: IngestCounts,
    pub outcomes: Vec<OutcomeEntry>,
}
