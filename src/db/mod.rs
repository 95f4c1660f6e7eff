//! Data access over the Hasura GraphQL API.
//!
//! Every query text lives in one of the repository modules below. They talk to the
//! backend through [`DataLayer`], which hides the transport behind [`GraphqlExecutor`].

pub mod courses;
pub mod departments;
pub mod hasura;
pub mod memberships;
pub mod sessions;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::AppResult;

pub use hasura::HasuraClient;

/// A single GraphQL operation.
#[derive(Debug, Clone, Serialize)]
pub struct GraphqlRequest {
    #[serde(rename = "operationName")]
    pub operation_name: &'static str,
    pub query: &'static str,
    pub variables: JsonValue,
    /// Role forwarded as `x-hasura-role`
    #[serde(skip)]
    pub role: Option<String>,
}

/// Executes GraphQL operations and returns the `data` object.
#[async_trait]
pub trait GraphqlExecutor: Send + Sync {
    async fn execute(&self, request: GraphqlRequest) -> AppResult<JsonValue>;
}

/// Shared handle to the GraphQL backend.
#[derive(Clone)]
pub struct DataLayer {
    executor: Arc<dyn GraphqlExecutor>,
}

impl DataLayer {
    pub fn new(executor: Arc<dyn GraphqlExecutor>) -> Self {
        Self { executor }
    }

    /// Run an operation with the default role and decode its `data`.
    pub async fn run<T: DeserializeOwned>(
        &self,
        operation_name: &'static str,
        query: &'static str,
        variables: JsonValue,
    ) -> AppResult<T> {
        self.run_as(operation_name, query, variables, None).await
    }

    /// Run an operation as an explicit Hasura role.
    pub async fn run_as<T: DeserializeOwned>(
        &self,
        operation_name: &'static str,
        query: &'static str,
        variables: JsonValue,
        role: Option<&str>,
    ) -> AppResult<T> {
        let data = self
            .executor
            .execute(GraphqlRequest {
                operation_name,
                query,
                variables,
                role: role.map(str::to_string),
            })
            .await?;

        Ok(serde_json::from_value(data)?)
    }
}

/// `affected_rows` wrapper returned by update/delete mutations.
#[derive(Debug, serde::Deserialize)]
pub struct Affected {
    pub affected_rows: i64,
}

/// Mutation response carrying `returning` rows.
#[derive(Debug, serde::Deserialize)]
pub struct Returning<T> {
    #[serde(default)]
    pub affected_rows: i64,
    #[serde(default = "Vec::new")]
    pub returning: Vec<T>,
}

/// Row carrying only its primary key.
#[derive(Debug, serde::Deserialize)]
pub struct RowId {
    pub id: i64,
}

/// Current time as an RFC 3339 string, the format stored in timestamp columns.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
