use std::fmt;

use serde::{Deserialize, Serialize};

/// Which portion of a change record is surfaced downstream.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ViewSelection {
    /// Only the attributes forming the record's key.
    KeysOnly,
    /// The record as it was before the modification.
    OldImage,
    /// The record as it is after the modification.
    NewImage,
    /// Both the before and after images.
    #[serde(rename = "new_and_old_images")]
    AllImages,
}

impl ViewSelection {
    /// Returns the configuration name of the view.
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewSelection::KeysOnly => "keys_only",
            ViewSelection::OldImage => "old_image",
            ViewSelection::NewImage => "new_image",
            ViewSelection::AllImages => "new_and_old_images",
        }
    }
}

impl fmt::Display for ViewSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How attribute value trees are rendered in the emitted payload.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// The whole change envelope, untouched.
    #[default]
    Plain,
    /// The selected view with the typed `{tag: value}` encoding preserved.
    #[serde(rename = "dynamodb")]
    Native,
    /// The selected view as plain JSON, with binary attributes removed.
    JsonDropBinary,
    /// The selected view as plain JSON, with binary attributes as base64 text.
    JsonBinaryAsText,
    /// Like [`OutputFormat::JsonBinaryAsText`], and also able to carry both images.
    Extended,
}

impl OutputFormat {
    /// Returns the configuration name of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Plain => "plain",
            OutputFormat::Native => "dynamodb",
            OutputFormat::JsonDropBinary => "json_drop_binary",
            OutputFormat::JsonBinaryAsText => "json_binary_as_text",
            OutputFormat::Extended => "extended",
        }
    }

    /// Returns `true` when the format can render [`ViewSelection::AllImages`].
    pub fn supports_all_images(&self) -> bool {
        matches!(self, OutputFormat::Plain | OutputFormat::Extended)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
