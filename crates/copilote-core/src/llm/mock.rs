use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LLMClient, LLMError};

/// Queue-backed test double for [`LLMClient`].
#[derive(Debug, Default, Clone)]
pub struct MockLLMClient {
    responses: Arc<Mutex<VecDeque<Result<CompletionResponse, LLMError>>>>,
    call_count: Arc<AtomicUsize>,
}

impl MockLLMClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_response(&self, response: Result<CompletionResponse, LLMError>) {
        let mut guard = self.responses.lock().expect("lock responses");
        guard.push_back(response);
    }

    /// Enqueue a successful completion whose content is the given raw text.
    pub fn enqueue_text(&self, content: &str) {
        self.enqueue_response(Ok(CompletionResponse {
            content: content.to_string(),
            model: "mock".to_string(),
            input_tokens: 0,
            output_tokens: 0,
            latency_ms: 0,
        }));
    }

    /// Enqueue a successful completion whose content is the serialized value.
    pub fn enqueue_json(&self, value: serde_json::Value) {
        self.enqueue_text(&value.to_string());
    }

    /// Returns the number of times `complete` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn complete(
        &self,
        _request: CompletionRequest,
        _user_id: i64,
    ) -> Result<CompletionResponse, LLMError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.responses.lock().expect("lock responses");
        guard.pop_front().unwrap_or_else(|| {
            Err(LLMError::ProviderError(
                "mock response not provided".to_string(),
            ))
        })
    }
}
