//! Conversions from the table's typed attribute encoding into emitted payloads.

pub mod attribute;
pub mod numeric;
pub mod record;

pub use record::RecordFormatter;
