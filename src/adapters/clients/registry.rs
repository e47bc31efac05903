//! Client registry: the service and target model clients for one run.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::anthropic_api::{AnthropicApiClient, AnthropicApiConfig};
use super::mock::MockModelClient;
use super::retry::RetryPolicy;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ClientName, ClientsConfig, ModelRequest, ProviderKind, RetryConfig};
use crate::domain::ports::ModelClient;

/// Model clients keyed by role, plus the batch width each role allows.
///
/// Built once per process and shared by reference; there is no global
/// client state.
pub struct ClientRegistry {
    clients: HashMap<ClientName, Arc<dyn ModelClient>>,
    parallelism: HashMap<ClientName, usize>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            parallelism: HashMap::new(),
        }
    }

    /// Build both clients from configuration.
    pub fn from_config(clients: &ClientsConfig, retry: &RetryConfig) -> DomainResult<Self> {
        let mut registry = Self::new();
        for name in [ClientName::Service, ClientName::Target] {
            let config = clients.get(name);
            let client: Arc<dyn ModelClient> = match config.provider {
                ProviderKind::Anthropic => {
                    let api_config = AnthropicApiConfig::from(config);
                    if api_config.get_api_key().is_none() {
                        warn!(client = %name, env = %config.api_key_env, "API key not set; calls will fail");
                    }
                    Arc::new(AnthropicApiClient::new(api_config, RetryPolicy::from(retry))?)
                }
                ProviderKind::Mock => Arc::new(MockModelClient::new()),
            };
            debug!(client = %name, provider = client.provider(), model = client.model(), "registered client");
            registry = registry.with_client(name, client, config.parallelism);
        }
        Ok(registry)
    }

    #[must_use]
    pub fn with_client(
        mut self,
        name: ClientName,
        client: Arc<dyn ModelClient>,
        parallelism: usize,
    ) -> Self {
        self.clients.insert(name, client);
        self.parallelism.insert(name, parallelism);
        self
    }

    pub fn client(&self, name: ClientName) -> DomainResult<&Arc<dyn ModelClient>> {
        self.clients
            .get(&name)
            .ok_or_else(|| DomainError::Configuration(format!("no {name} client registered")))
    }

    /// Batch width for units driven by this client.
    pub fn parallelism(&self, name: ClientName) -> usize {
        self.parallelism
            .get(&name)
            .copied()
            .unwrap_or(crate::domain::models::config::DEFAULT_PARALLELISM)
    }

    /// Send instructions + input to the named client.
    pub async fn call(
        &self,
        instructions: &str,
        input: &str,
        name: ClientName,
        temperature: Option<f32>,
    ) -> DomainResult<String> {
        let client = self.client(name)?;
        let request = ModelRequest {
            instructions: instructions.to_string(),
            input: input.to_string(),
            temperature,
        };
        client
            .complete(&request)
            .await
            .map_err(|source| DomainError::ModelCall {
                client: name,
                source,
            })
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clients::mock::MockResponse;
    use crate::domain::models::ClientConfig;

    #[tokio::test]
    async fn test_call_routes_by_name() {
        let service = Arc::new(MockModelClient::with_default_response(MockResponse::text("svc")));
        let target = Arc::new(MockModelClient::with_default_response(MockResponse::text("tgt")));
        let registry = ClientRegistry::new()
            .with_client(ClientName::Service, service.clone(), 2)
            .with_client(ClientName::Target, target.clone(), 5);

        let out = registry
            .call("inst", "in", ClientName::Target, Some(0.2))
            .await
            .unwrap();
        assert_eq!(out, "tgt");
        assert_eq!(target.requests()[0].temperature, Some(0.2));
        assert_eq!(service.call_count(), 0);
        assert_eq!(registry.parallelism(ClientName::Service), 2);
        assert_eq!(registry.parallelism(ClientName::Target), 5);
    }

    #[tokio::test]
    async fn test_failure_names_client() {
        let registry = ClientRegistry::new().with_client(
            ClientName::Service,
            Arc::new(MockModelClient::with_default_response(MockResponse::failure("down"))),
            1,
        );
        let err = registry
            .call("", "x", ClientName::Service, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::ModelCall {
                client: ClientName::Service,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_client_is_configuration_error() {
        let registry = ClientRegistry::new();
        let err = registry.call("", "x", ClientName::Target, None).await.unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
    }

    #[test]
    fn test_from_config_with_mock_provider() {
        let mut clients = ClientsConfig::default();
        clients.service = ClientConfig {
            provider: ProviderKind::Mock,
            parallelism: 4,
            ..Default::default()
        };
        clients.target.provider = ProviderKind::Mock;

        let registry = ClientRegistry::from_config(&clients, &RetryConfig::default()).unwrap();
        assert_eq!(registry.client(ClientName::Service).unwrap().provider(), "mock");
        assert_eq!(registry.parallelism(ClientName::Service), 4);
        assert_eq!(registry.parallelism(ClientName::Target), 3);
    }
}
