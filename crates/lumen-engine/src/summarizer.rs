//! Model-backed summarizer for the memory manager.

use std::sync::Arc;

use async_trait::async_trait;
use lumen_core::messages::ChatMessage;
use lumen_memory::{MemoryError, Summarizer};
use tokio_stream::StreamExt;

use crate::provider::{ChatRequest, ModelProvider};

const SUMMARY_INSTRUCTIONS: &str = "Compress the following coaching \
conversation into JSON with exactly these fields: \"text\" (a short prose \
synopsis), \"keyThemes\" (array of strings), \"unresolvedTopics\" (array of \
strings), \"emotionalArc\" ({\"startMood\", \"currentMood\", \"trajectory\": \
one of improving|stable|declining|fluctuating}), \"breakthroughs\" (array of \
strings). Respond with the JSON object only.";

/// Summarizes a history span through the model provider.
///
/// Returns whatever the model produced; the memory manager parses and
/// validates it, and drops the pass if it isn't usable.
pub struct ModelSummarizer {
    provider: Arc<dyn ModelProvider>,
}

impl ModelSummarizer {
    /// Create a summarizer over a shared provider.
    #[must_use]
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Summarizer for ModelSummarizer {
    async fn summarize(&self, messages: &[ChatMessage]) -> lumen_memory::Result<String> {
        let request = ChatRequest {
            system_prompt: SUMMARY_INSTRUCTIONS.to_owned(),
            messages: messages.to_vec(),
        };
        let mut stream = self
            .provider
            .stream_completion(&request)
            .await
            .map_err(|e| MemoryError::Summarization(e.to_string()))?;

        let mut raw = String::new();
        while let Some(item) = stream.next().await {
            let delta = item.map_err(|e| MemoryError::Summarization(e.to_string()))?;
            raw.push_str(&delta);
        }
        Ok(raw)
    }
}

impl std::fmt::Debug for ModelSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSummarizer").finish_non_exhaustive()
    }
}
