use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Envelope settings applied to every emitted event.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmitterConfig {
    /// Origin host written on every event. Defaults to the system hostname.
    #[serde(default)]
    pub host: Option<String>,
    /// Extra fields added to every event, unless the event already has a field with that name.
    #[serde(default)]
    pub add_fields: BTreeMap<String, String>,
    /// Tags appended to every event.
    #[serde(default)]
    pub tags: Vec<String>,
}
