use thiserror::Error;

use crate::shared::{OutputFormat, ViewSelection};

/// Configuration validation errors.
///
/// Every variant describes a combination that is rejected before any ingestion work starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A table scan cannot produce before-images, so `old_image` rules out the bulk copy.
    #[error("cannot perform scan with view type `{0}`")]
    ScanWithOldImage(ViewSelection),
    /// Both images can only be surfaced by formats that keep the whole record.
    #[error("cannot show view type `{view}` with log format `{format}`")]
    ViewIncompatibleWithFormat {
        view: ViewSelection,
        format: OutputFormat,
    },
    #[error("cannot stream without a configured streams endpoint")]
    MissingStreamsEndpoint,
    #[error("`{0}` is required and cannot be empty")]
    MissingField(&'static str),
    #[error("invalid value for `{field}`: {constraint}")]
    InvalidFieldValue {
        field: &'static str,
        constraint: &'static str,
    },
}
