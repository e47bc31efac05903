//! Model client port - interface for LLM backends.

use async_trait::async_trait;

use crate::domain::errors::ModelCallError;
use crate::domain::models::ModelRequest;

/// A backend that turns instructions + input into generated text.
///
/// Implementations own their transport concerns (timeouts, throttling,
/// rate-limit retries); callers only see the final text or a failure.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Backend name, e.g. `anthropic` or `mock`.
    fn provider(&self) -> &'static str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelCallError>;
}
