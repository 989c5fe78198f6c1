//! Adapter from cloud service calls to operation handlers.

use std::sync::Arc;

use opslib_json::{EngineConfig, OpsError};
use serde_json::{Map, Value};
use tracing::debug;

use crate::dispatch::Handler;

/// A remote API client. Failures are [`OpsError::Service`].
pub trait ServiceClient: Send + Sync {
    fn invoke(&self, service: &str, operation: &str, payload: &Value) -> Result<Value, OpsError>;
}

/// Runs one fixed service operation with the call payload.
pub struct ServiceHandler {
    client: Arc<dyn ServiceClient>,
    service: String,
    operation: String,
}

impl ServiceHandler {
    pub fn new(
        client: Arc<dyn ServiceClient>,
        service: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        ServiceHandler { client, service: service.into(), operation: operation.into() }
    }
}

impl Handler for ServiceHandler {
    fn call(&self, payload: &Value, _config: &EngineConfig) -> Result<Value, OpsError> {
        let request = drop_empty_fields(payload);
        debug!(service = %self.service, operation = %self.operation, "invoking service");
        self.client.invoke(&self.service, &self.operation, &request)
    }
}

/// Remove top-level fields that are null, empty strings, empty lists or
/// empty objects. Services treat a present-but-empty field differently from
/// an absent one. `false` and `0` are kept.
pub fn drop_empty_fields(payload: &Value) -> Value {
    match payload {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !is_empty(v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<_, _>>(),
        ),
        other => other.clone(),
    }
}

fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
