//! JSON descriptor documents.
//!
//! ```json
//! {"name": "create-lb", "help": "...", "parameters": [
//!     {"name": "region", "type": "string", "required": true}
//! ]}
//! ```
//!
//! `name` defaults to `main` for single-operation tools.

use opslib_json::{parse, OpsError};
use serde::Deserialize;
use serde_json::Value;

use crate::descriptor::{Descriptor, Parameter};

const DEFAULT_NAME: &str = "main";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DescriptorDoc {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default)]
    help: String,
    #[serde(default)]
    parameters: Vec<Parameter>,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

pub fn from_json_str(text: &str) -> Result<Descriptor, OpsError> {
    from_json_value(&parse(text)?)
}

pub fn from_json_value(value: &Value) -> Result<Descriptor, OpsError> {
    let doc = DescriptorDoc::deserialize(value).map_err(|e| OpsError::Descriptor {
        name: value.get("name").and_then(Value::as_str).unwrap_or(DEFAULT_NAME).to_string(),
        message: e.to_string(),
    })?;
    Descriptor::new(doc.name, doc.help, doc.parameters)
}
