//! reqwest-backed [`GraphqlExecutor`] talking to a Hasura endpoint.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, error};

use super::{GraphqlExecutor, GraphqlRequest};
use crate::config::GraphqlSettings;
use crate::error::{AppError, AppResult};

/// HTTP connect timeout for GraphQL calls.
const HTTP_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
/// HTTP total timeout for GraphQL calls.
const HTTP_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

pub struct HasuraClient {
    http_client: reqwest::Client,
    url: String,
    admin_secret: SecretString,
    default_role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    data: Option<JsonValue>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
    path: Option<JsonValue>,
    extensions: Option<JsonValue>,
}

impl GraphqlErrorEntry {
    fn describe(&self) -> String {
        let mut details = Vec::new();
        if let Some(path) = &self.path {
            details.push(format!("path: {}", path));
        }
        if let Some(extensions) = &self.extensions {
            details.push(format!("extensions: {}", extensions));
        }
        if details.is_empty() {
            self.message.clone()
        } else {
            format!("{} ({})", self.message, details.join(", "))
        }
    }
}

impl HasuraClient {
    pub fn new(settings: &GraphqlSettings) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: settings.url.clone(),
            admin_secret: settings.admin_secret.clone(),
            default_role: settings.default_role.clone(),
        })
    }
}

#[async_trait]
impl GraphqlExecutor for HasuraClient {
    async fn execute(&self, request: GraphqlRequest) -> AppResult<JsonValue> {
        debug!("GraphQL operation {}", request.operation_name);

        let mut builder = self
            .http_client
            .post(&self.url)
            .header("x-hasura-admin-secret", self.admin_secret.expose_secret());

        if let Some(role) = request.role.as_ref().or(self.default_role.as_ref()) {
            builder = builder.header("x-hasura-role", role);
        }

        let response = builder.json(&request).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Graphql(format!(
                "Hasura request failed: {}",
                response.status()
            )));
        }

        let envelope: GraphqlEnvelope = response.json().await?;
        graphql_data(request.operation_name, envelope)
    }
}

fn graphql_data(operation: &str, envelope: GraphqlEnvelope) -> AppResult<JsonValue> {
    if !envelope.errors.is_empty() {
        let messages = envelope
            .errors
            .iter()
            .map(GraphqlErrorEntry::describe)
            .collect::<Vec<_>>()
            .join(", ");
        error!("Hasura GraphQL errors in {}: {}", operation, messages);
        return Err(AppError::Graphql(format!(
            "Hasura GraphQL errors: {}",
            messages
        )));
    }

    envelope
        .data
        .ok_or_else(|| AppError::Graphql(format!("{} returned no data", operation)))
}
