//! In-memory GraphQL backend keyed by operation name.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use course_admin_lib::db::{GraphqlExecutor, GraphqlRequest};
use course_admin_lib::error::{AppError, AppResult};
use serde_json::Value;

type Handler = Box<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// One recorded operation.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: String,
    pub query: String,
    pub variables: Value,
    pub role: Option<String>,
}

/// Answers each operation with a canned `data` object or a handler result.
///
/// Operations without a registered answer fail with a GraphQL error.
#[derive(Default)]
pub struct MockGraphql {
    handlers: Mutex<HashMap<&'static str, Arc<Handler>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockGraphql {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Always answer `operation` with `data`.
    pub fn on(&self, operation: &'static str, data: Value) -> &Self {
        self.on_fn(operation, move |_| Ok(data.clone()))
    }

    /// Answer `operation` by calling `handler` with the request variables.
    pub fn on_fn<F>(&self, operation: &'static str, handler: F) -> &Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap()
            .insert(operation, Arc::new(Box::new(handler)));
        self
    }

    /// Fail `operation` with a GraphQL error.
    pub fn fail(&self, operation: &'static str, message: &'static str) -> &Self {
        self.on_fn(operation, move |_| Err(message.to_string()))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded calls of one operation.
    pub fn calls_to(&self, operation: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation == operation)
            .collect()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls_to(operation).len()
    }
}

#[async_trait]
impl GraphqlExecutor for MockGraphql {
    async fn execute(&self, request: GraphqlRequest) -> AppResult<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            operation: request.operation_name.to_string(),
            query: request.query.to_string(),
            variables: request.variables.clone(),
            role: request.role.clone(),
        });

        let handler = self
            .handlers
            .lock()
            .unwrap()
            .get(request.operation_name)
            .cloned();

        match handler {
            Some(handler) => handler(&request.variables).map_err(AppError::Graphql),
            None => Err(AppError::Graphql(format!(
                "no mock response for {}",
                request.operation_name
            ))),
        }
    }
}
