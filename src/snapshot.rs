use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Event;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid json: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("snapshot schema {found} is newer than supported {supported}")]
    Unsupported { found: u32, supported: u32 },
}

/// Everything persisted under the store key.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub schema_version: u32,
    /// Bumped on every write; a stored value ahead of ours means another
    /// writer got there first.
    pub version: u64,
    #[serde(default)]
    pub saved_at: Option<String>,
    pub events: Vec<Event>,
    #[serde(default)]
    pub registrations: BTreeMap<String, Vec<String>>,
}

/// Borrowed twin of `Snapshot` so a write does not clone the event list.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRef<'a> {
    schema_version: u32,
    version: u64,
    saved_at: Option<&'a str>,
    events: &'a [Event],
    registrations: &'a BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Stored {
    Envelope(Snapshot),
    Legacy(Vec<Event>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    #[serde(default)]
    schema_version: u32,
    #[serde(default)]
    version: u64,
}

impl Snapshot {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn encode_parts(
        version: u64,
        saved_at: &str,
        events: &[Event],
        registrations: &BTreeMap<String, Vec<String>>,
    ) -> Result<String, serde_json::Error> {
        serde_json::to_string(&SnapshotRef {
            schema_version: SCHEMA_VERSION,
            version,
            saved_at: Some(saved_at),
            events,
            registrations,
        })
    }

    pub fn decode(raw: &str) -> Result<Self, SnapshotError> {
        // a newer layout must not be mistaken for garbage
        if let Ok(header) = serde_json::from_str::<Header>(raw) {
            if header.schema_version > SCHEMA_VERSION {
                return Err(SnapshotError::Unsupported {
                    found: header.schema_version,
                    supported: SCHEMA_VERSION,
                });
            }
        }

        match serde_json::from_str::<Stored>(raw) {
            Ok(Stored::Envelope(snapshot)) => Ok(snapshot),
            Ok(Stored::Legacy(events)) => Ok(Self {
                schema_version: SCHEMA_VERSION,
                version: 0,
                saved_at: None,
                events,
                registrations: BTreeMap::new(),
            }),
            // re-run the strict parse for a useful error message
            Err(_) => serde_json::from_str::<Snapshot>(raw).map_err(SnapshotError::from),
        }
    }

    /// Reads only the write counter; legacy arrays and garbage count as 0.
    pub fn peek_version(raw: &str) -> u64 {
        serde_json::from_str::<Header>(raw)
            .map(|header| header.version)
            .unwrap_or(0)
    }
}
