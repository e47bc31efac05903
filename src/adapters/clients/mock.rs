//! Mock model client for testing and offline dry runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::errors::ModelCallError;
use crate::domain::models::ModelRequest;
use crate::domain::ports::ModelClient;

/// Mock response configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Return this text.
    Text(String),
    /// Echo the request input back, prefixed.
    Echo,
    /// Fail with an API error carrying this message.
    Fail(String),
}

impl MockResponse {
    pub fn text(output: impl Into<String>) -> Self {
        Self::Text(output.into())
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}

/// Scripted model client.
///
/// Queued responses are consumed first, in order; afterwards every call
/// gets the default response. All requests are recorded.
pub struct MockModelClient {
    default_response: MockResponse,
    queue: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl MockModelClient {
    pub fn new() -> Self {
        Self::with_default_response(MockResponse::Echo)
    }

    pub fn with_default_response(response: MockResponse) -> Self {
        Self {
            default_response: response,
            queue: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response for the next unanswered call.
    pub fn push_response(&self, response: MockResponse) {
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(response);
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    fn provider(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelCallError> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request.clone());

        let response = self
            .queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone());

        match response {
            MockResponse::Text(text) => Ok(text),
            MockResponse::Echo => Ok(format!("[mock] {}", request.input.trim())),
            MockResponse::Fail(message) => Err(ModelCallError::Api {
                status: 500,
                body: message,
            }),
        }
    }
}
