//! Seam to the external analysis pipeline.
//!
//! The pipeline turns a teaching-session video (or an arbitrary payload) into
//! a raw report mapping. Nothing here analyzes anything: implementations only
//! know how to reach a pipeline and hand back what it printed or returned.

mod command;
mod http;

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

pub use command::CommandPipeline;
pub use http::HttpPipeline;

use crate::error::{NetraError, Result};

#[async_trait]
pub trait Pipeline: Send + Sync {
    fn name(&self) -> &str;

    /// Analyze one video for `topic`. `Ok(None)` means no report was produced.
    async fn process_session(&self, video: &Path, topic: &str) -> Result<Option<Value>>;

    /// Forward a payload verbatim and return the pipeline's mapping.
    async fn process_payload(&self, payload: Value) -> Result<Option<Value>>;
}

/// Interpret pipeline output: blank or `null` is "no report".
pub(crate) fn parse_output(stage: &str, stdout: &[u8]) -> Result<Option<Value>> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(NetraError::InvalidPipelineOutput {
            stage: stage.to_string(),
            reason: e.to_string(),
        }),
    }
}
