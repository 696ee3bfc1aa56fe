//! Base trait for model clients.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::types::ModelReply;
use crate::{ConcordError, ConcordResult};

/// Capability to query a remote model.
///
/// Implementations make exactly one call per invocation; retries, timeouts
/// and circuit breaking are layered above by the dispatcher.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Returns the client name.
    fn name(&self) -> &str;

    /// Checks whether the backend can be reached at all.
    async fn is_available(&self) -> bool {
        true
    }

    /// Returns the backend version.
    async fn version(&self) -> ConcordResult<String> {
        Ok("unknown".to_string())
    }

    /// Sends `prompt` to `model`.
    ///
    /// # Arguments
    ///
    /// * `model` - Model identifier
    /// * `prompt` - Full prompt text
    /// * `json_mode` - Hint that the caller expects a JSON object back
    async fn query(&self, model: &str, prompt: &str, json_mode: bool) -> ConcordResult<ModelReply>;
}

/// Slice of `output` from the first `{` to the last `}`, if any.
pub fn extract_json_object(output: &str) -> Option<&str> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    (start < end).then(|| &output[start..=end])
}

/// Parses the first JSON object embedded in a model's output.
pub fn parse_json_output<T: DeserializeOwned>(output: &str, source: &str) -> ConcordResult<T> {
    match extract_json_object(output) {
        Some(json_str) => serde_json::from_str(json_str).map_err(|e| {
            ConcordError::MalformedJudgeOutput {
                judge: source.to_string(),
                reason: format!("invalid JSON: {}", e),
            }
        }),
        None => Err(ConcordError::MalformedJudgeOutput {
            judge: source.to_string(),
            reason: "output contains no JSON object".to_string(),
        }),
    }
}
