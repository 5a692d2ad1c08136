use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::{EmitterConfig, PipelineConfig, ValidationError};

/// Top-level configuration of an ingestion process.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub emitter: EmitterConfig,
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.pipeline.validate()
    }
}

impl Config for IngestConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["emitter.tags"];
}
