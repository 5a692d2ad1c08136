use std::fmt;

use chrono::{DateTime, Utc};
use ingest_config::shared::ViewSelection;
use serde::{Deserialize, Serialize};

use crate::types::Item;

/// Kind of mutation described by a [`ChangeEnvelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventName {
    Insert,
    Modify,
    Remove,
}

/// Portion of the record a change stream carries, as reported by the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamViewType {
    KeysOnly,
    NewImage,
    OldImage,
    NewAndOldImages,
}

impl StreamViewType {
    /// Returns `true` when a stream with this view type can serve `view`.
    ///
    /// A stream serves its own view, every stream carries the keys, and a stream carrying both
    /// images serves any view.
    pub fn serves(&self, view: ViewSelection) -> bool {
        *self == StreamViewType::from(view)
            || view == ViewSelection::KeysOnly
            || *self == StreamViewType::NewAndOldImages
    }
}

impl From<ViewSelection> for StreamViewType {
    fn from(view: ViewSelection) -> Self {
        match view {
            ViewSelection::KeysOnly => StreamViewType::KeysOnly,
            ViewSelection::NewImage => StreamViewType::NewImage,
            ViewSelection::OldImage => StreamViewType::OldImage,
            ViewSelection::AllImages => StreamViewType::NewAndOldImages,
        }
    }
}

impl fmt::Display for StreamViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamViewType::KeysOnly => "KEYS_ONLY",
            StreamViewType::NewImage => "NEW_IMAGE",
            StreamViewType::OldImage => "OLD_IMAGE",
            StreamViewType::NewAndOldImages => "NEW_AND_OLD_IMAGES",
        };
        f.write_str(name)
    }
}

/// The data portion of a change: keys, images and stream bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub approximate_creation_date_time: Option<DateTime<Utc>>,
    pub keys: Item,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_image: Option<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_image: Option<Item>,
    pub sequence_number: String,
    pub size_bytes: u64,
    pub stream_view_type: StreamViewType,
}

/// A change record as delivered by the change stream.
///
/// Table scan entries are normalized into the same shape so that both stages produce
/// structurally equivalent output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEnvelope {
    #[serde(rename = "eventID")]
    pub event_id: String,
    pub event_name: EventName,
    pub event_version: String,
    pub event_source: String,
    pub aws_region: String,
    #[serde(rename = "dynamodb")]
    pub change: StreamRecord,
}
