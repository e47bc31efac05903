//! Model client adapters.

pub mod anthropic_api;
pub mod mock;
pub mod registry;
pub mod retry;

pub use anthropic_api::{AnthropicApiClient, AnthropicApiConfig};
pub use mock::{MockModelClient, MockResponse};
pub use registry::ClientRegistry;
pub use retry::RetryPolicy;
