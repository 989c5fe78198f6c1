//! Payload validation and handler invocation.

use std::panic::{catch_unwind, AssertUnwindSafe};

use opslib_json::{EngineConfig, OpsError};
use serde_json::Value;
use tracing::{debug, warn};

use crate::descriptor::Descriptor;

/// The code behind an operation.
///
/// Closures taking just the payload implement this directly; handlers that
/// need the engine configuration implement [`Handler::call`] themselves.
pub trait Handler: Send + Sync {
    fn call(&self, payload: &Value, config: &EngineConfig) -> Result<Value, OpsError>;
}

impl<F> Handler for F
where
    F: Fn(&Value) -> Result<Value, OpsError> + Send + Sync,
{
    fn call(&self, payload: &Value, _config: &EngineConfig) -> Result<Value, OpsError> {
        self(payload)
    }
}

/// A handler that also receives the configuration.
pub struct WithConfig<F>(pub F);

impl<F> Handler for WithConfig<F>
where
    F: Fn(&Value, &EngineConfig) -> Result<Value, OpsError> + Send + Sync,
{
    fn call(&self, payload: &Value, config: &EngineConfig) -> Result<Value, OpsError> {
        (self.0)(payload, config)
    }
}

/// Check a payload against the descriptor: no unknown keys, every required
/// parameter present, every value of its declared type.
pub fn validate_payload(descriptor: &Descriptor, payload: &Value) -> Result<(), OpsError> {
    let Value::Object(map) = payload else {
        let message = "payload must be an object".into();
        return Err(OpsError::Argument { flag: None, message });
    };
    if let Some(unknown) = map.keys().find(|k| descriptor.parameter(k).is_none()) {
        return Err(OpsError::argument(unknown, "unknown parameter"));
    }
    for p in descriptor.parameters() {
        match map.get(&p.name) {
            Some(value) => p.check(value).map_err(|e| OpsError::argument(&p.name, e))?,
            None if p.required => {
                return Err(OpsError::argument(&p.name, "required parameter is missing"));
            }
            None => {}
        }
    }
    Ok(())
}

/// Validate `payload` and run `handler` with the default configuration.
pub fn dispatch(
    descriptor: &Descriptor,
    payload: &Value,
    handler: &dyn Handler,
) -> Result<Value, OpsError> {
    dispatch_with(descriptor, payload, handler, &EngineConfig::default())
}

/// Validate `payload` and run `handler`.
///
/// Validation errors are returned as they are. Anything the handler raises,
/// including a panic, comes back as [`OpsError::HandlerFailure`].
pub fn dispatch_with(
    descriptor: &Descriptor,
    payload: &Value,
    handler: &dyn Handler,
    config: &EngineConfig,
) -> Result<Value, OpsError> {
    validate_payload(descriptor, payload)?;
    debug!(operation = descriptor.name(), "dispatching");

    let outcome = catch_unwind(AssertUnwindSafe(|| handler.call(payload, config)));
    let cause = match outcome {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(e)) => e,
        Err(panic) => {
            OpsError::Internal(format!("handler panicked: {}", panic_message(panic.as_ref())))
        }
    };
    warn!(operation = descriptor.name(), error = %cause, "handler failed");
    Err(OpsError::HandlerFailure {
        operation: descriptor.name().to_string(),
        cause: Box::new(cause),
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
