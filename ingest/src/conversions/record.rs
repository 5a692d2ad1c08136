use ingest_config::shared::{OutputFormat, ViewSelection};
use serde_json::{Map, Value};

use crate::conversions::attribute::render_item;
use crate::conversions::numeric::MAX_NUMBER_OF_BYTES_FOR_NUMBER;
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::types::{ChangeEnvelope, EventName, Item, StreamRecord, StreamViewType, TypedValue};

const SCAN_EVENT_ID: &str = "0";
const SCAN_EVENT_VERSION: &str = "1.0";
const SCAN_SEQUENCE_NUMBER: &str = "0";
const EVENT_SOURCE: &str = "aws:dynamodb";

/// Turns scanned items and change records into the payload emitted downstream.
///
/// Scanned items are first normalized into a [`ChangeEnvelope`] equivalent to the one the change
/// stream would deliver for an insert, so both stages produce the same output for the same row.
#[derive(Debug, Clone)]
pub struct RecordFormatter {
    view: ViewSelection,
    format: OutputFormat,
    key_schema: Vec<String>,
    region: String,
}

impl RecordFormatter {
    pub fn new(
        view: ViewSelection,
        format: OutputFormat,
        key_schema: Vec<String>,
        region: String,
    ) -> Self {
        Self {
            view,
            format,
            key_schema,
            region,
        }
    }

    pub fn key_schema(&self) -> &[String] {
        &self.key_schema
    }

    /// Formats an item read by the table scan.
    ///
    /// `new_image_size_bytes` is the item size reported by the scanner. It is added to the key
    /// size unless only keys are surfaced.
    pub fn format_scan(&self, item: &Item, new_image_size_bytes: u64) -> EtlResult<String> {
        let envelope = self.scan_envelope(item, new_image_size_bytes)?;
        self.format_envelope(&envelope)
    }

    /// Formats a change record delivered by the change stream.
    pub fn format_stream(&self, envelope: &ChangeEnvelope) -> EtlResult<String> {
        self.format_envelope(envelope)
    }

    fn scan_envelope(&self, item: &Item, new_image_size_bytes: u64) -> EtlResult<ChangeEnvelope> {
        let mut keys = Item::with_capacity(self.key_schema.len());
        for name in &self.key_schema {
            let value = item.get(name).ok_or_else(|| {
                etl_error!(
                    ErrorKind::InvalidData,
                    "Scanned item is missing a key attribute",
                    format!("key attribute `{name}` is not present in the scanned item")
                )
            })?;
            keys.insert(name.clone(), value.clone());
        }

        let mut size_bytes = key_size_in_bytes(&self.key_schema, item)?;
        let new_image = if self.view == ViewSelection::KeysOnly {
            None
        } else {
            size_bytes += new_image_size_bytes;
            Some(item.clone())
        };

        Ok(ChangeEnvelope {
            event_id: SCAN_EVENT_ID.to_owned(),
            event_name: EventName::Insert,
            event_version: SCAN_EVENT_VERSION.to_owned(),
            event_source: EVENT_SOURCE.to_owned(),
            aws_region: self.region.clone(),
            change: StreamRecord {
                approximate_creation_date_time: None,
                keys,
                new_image,
                old_image: None,
                sequence_number: SCAN_SEQUENCE_NUMBER.to_owned(),
                size_bytes,
                stream_view_type: StreamViewType::from(self.view),
            },
        })
    }

    fn format_envelope(&self, envelope: &ChangeEnvelope) -> EtlResult<String> {
        if self.format == OutputFormat::Plain {
            return to_json_string(envelope);
        }

        let record = &envelope.change;
        let narrowed = match self.view {
            ViewSelection::KeysOnly => self.render_image(Some(&record.keys))?,
            ViewSelection::OldImage => self.render_image(record.old_image.as_ref())?,
            ViewSelection::NewImage => self.render_image(record.new_image.as_ref())?,
            ViewSelection::AllImages => {
                let mut images = Map::with_capacity(2);
                if let Some(old_image) = &record.old_image {
                    images.insert("oldImage".to_owned(), render_item(old_image, self.format)?);
                }
                if let Some(new_image) = &record.new_image {
                    images.insert("newImage".to_owned(), render_item(new_image, self.format)?);
                }
                Value::Object(images)
            }
        };

        to_json_string(&narrowed)
    }

    fn render_image(&self, image: Option<&Item>) -> EtlResult<Value> {
        match image {
            Some(image) => render_item(image, self.format),
            None => Ok(Value::Null),
        }
    }
}

/// Returns the size the key attributes of `item` account for.
///
/// Each key counts its name length plus: the decoded length for binaries, the character count
/// for strings, [`MAX_NUMBER_OF_BYTES_FOR_NUMBER`] for numbers and nothing for other types.
pub fn key_size_in_bytes(key_schema: &[String], item: &Item) -> EtlResult<u64> {
    let mut size = 0u64;
    for name in key_schema {
        let value = item.get(name).ok_or_else(|| {
            etl_error!(
                ErrorKind::InvalidData,
                "Scanned item is missing a key attribute",
                format!("key attribute `{name}` is not present in the scanned item")
            )
        })?;

        size += name.chars().count() as u64;
        size += match value {
            TypedValue::Binary(bytes) => bytes.len() as u64,
            TypedValue::String(value) => value.chars().count() as u64,
            TypedValue::Number(_) => MAX_NUMBER_OF_BYTES_FOR_NUMBER,
            _ => 0,
        };
    }

    Ok(size)
}

fn to_json_string<T: serde::Serialize>(value: &T) -> EtlResult<String> {
    serde_json::to_string(value).map_err(|err| {
        etl_error!(
            ErrorKind::SerializationError,
            "Record serialization failed",
            source: err
        )
    })
}
