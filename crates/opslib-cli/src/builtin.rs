//! The operations behind the `opsjson` binary.
//!
//! Each is an ordinary descriptor plus handler, so the generated flags,
//! validation and exit codes are the same as for any user-registered
//! operation. Documents are read from the file paths given as parameters.

use std::fs;

use opslib_json::json_patch::{from_patch_document, to_patch_document, to_patch_document_with};
use opslib_json::{
    apply_patch, change_report, diff_with, parse_with, plan, DiffOptions, EncodeOptions,
    EngineConfig, FunctionRegistry, ListAlign, OpsError, PlaceholderPolicy, Renderer,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::app::App;
use crate::descriptor::{Descriptor, ParamType, Parameter};
use crate::dispatch::WithConfig;

/// An `opsjson` app with every built-in registered.
pub fn app(config: EngineConfig) -> Result<App, OpsError> {
    let mut app = App::new("opsjson")
        .about("Structural diff, patch and templating for JSON documents")
        .with_config(config);
    register_builtins(&mut app)?;
    Ok(app)
}

pub fn register_builtins(app: &mut App) -> Result<(), OpsError> {
    app.register(diff_descriptor()?, WithConfig(diff_op))?;
    app.register(apply_descriptor()?, WithConfig(apply_op))?;
    app.register(render_descriptor()?, WithConfig(render_op))?;
    app.register(report_descriptor()?, WithConfig(report_op))?;
    app.register(plan_descriptor()?, WithConfig(plan_op))?;
    Ok(())
}

// ── Descriptors ───────────────────────────────────────────────────────────

fn file(name: &str, help: &str) -> Parameter {
    Parameter::new(name, ParamType::String).required().with_help(help)
}

fn exclude() -> Parameter {
    Parameter::new("exclude", ParamType::List)
        .with_items(ParamType::String)
        .with_help("Object keys to skip at any depth, as a JSON list")
}

fn ignore_additions() -> Parameter {
    Parameter::new("ignore-additions", ParamType::Bool)
        .with_help("Do not report keys present only in the target")
}

fn diff_descriptor() -> Result<Descriptor, OpsError> {
    Descriptor::builder("diff")
        .help("Print the patch document that turns SOURCE into TARGET")
        .param(file("source", "Source document"))
        .param(file("target", "Target document"))
        .param(exclude())
        .param(ignore_additions())
        .param(
            Parameter::new("align-key", ParamType::String)
                .with_help("Match list elements by this object field"),
        )
        .param(
            Parameter::new("old-values", ParamType::Bool)
                .with_help("Record replaced and removed values"),
        )
        .build()
}

fn apply_descriptor() -> Result<Descriptor, OpsError> {
    Descriptor::builder("apply")
        .help("Apply a patch document to a document")
        .param(file("document", "Document to patch"))
        .param(file("patch", "Patch document"))
        .build()
}

fn render_descriptor() -> Result<Descriptor, OpsError> {
    Descriptor::builder("render")
        .help("Substitute ${...} placeholders in a template")
        .param(file("template", "Template document"))
        .param(
            Parameter::new("context", ParamType::List)
                .with_items(ParamType::String)
                .with_default(json!([]))
                .with_help("Context files, searched in order, as a JSON list"),
        )
        .param(
            Parameter::new("policy", ParamType::String)
                .with_choices(["strict", "keep", "blank"])
                .with_help("Unresolved placeholder handling"),
        )
        .param(
            Parameter::new("functions", ParamType::Bool)
                .with_help("Evaluate {\"$<Name>\": args} objects"),
        )
        .build()
}

fn report_descriptor() -> Result<Descriptor, OpsError> {
    Descriptor::builder("report")
        .help("Print a readable change report from SOURCE to TARGET")
        .param(file("source", "Old document"))
        .param(file("target", "New document"))
        .param(exclude())
        .param(ignore_additions())
        .build()
}

fn plan_descriptor() -> Result<Descriptor, OpsError> {
    Descriptor::builder("plan")
        .help("Compare desired and observed state")
        .param(file("desired", "Desired state"))
        .param(file("observed", "Observed state"))
        .param(exclude())
        .build()
}

// ── Handlers ──────────────────────────────────────────────────────────────

fn diff_op(payload: &Value, config: &EngineConfig) -> Result<Value, OpsError> {
    let source = load(payload, "source", config)?;
    let target = load(payload, "target", config)?;
    let ops = diff_with(&source, &target, &diff_options(payload, config));
    debug!(ops = ops.len(), "diff computed");
    let encode = EncodeOptions { include_old_values: flag(payload, "old-values") };
    Ok(to_patch_document_with(&ops, &encode))
}

fn apply_op(payload: &Value, config: &EngineConfig) -> Result<Value, OpsError> {
    let document = load(payload, "document", config)?;
    let ops = from_patch_document(&load(payload, "patch", config)?)?;
    Ok(apply_patch(&document, &ops)?)
}

fn render_op(payload: &Value, config: &EngineConfig) -> Result<Value, OpsError> {
    let template = load(payload, "template", config)?;
    let contexts = strings(payload, "context")
        .iter()
        .map(|path| load_path(path, "context", config))
        .collect::<Result<Vec<_>, _>>()?;
    let policy = match payload.get("policy").and_then(Value::as_str) {
        Some(p) => p.parse::<PlaceholderPolicy>()?,
        None => config.placeholder_policy,
    };
    let functions = FunctionRegistry::with_builtins();
    let mut renderer = Renderer::new(&contexts).with_policy(policy);
    if flag(payload, "functions") {
        renderer = renderer.with_functions(&functions);
    }
    renderer.render(&template)
}

fn report_op(payload: &Value, config: &EngineConfig) -> Result<Value, OpsError> {
    let source = load(payload, "source", config)?;
    let target = load(payload, "target", config)?;
    Ok(change_report(&source, &target, &diff_options(payload, config)))
}

fn plan_op(payload: &Value, config: &EngineConfig) -> Result<Value, OpsError> {
    let desired = load(payload, "desired", config)?;
    let observed = load(payload, "observed", config)?;
    let r = plan(&desired, &observed, &diff_options(payload, config));
    Ok(json!({ "in_sync": r.in_sync, "patch": to_patch_document(&r.patch) }))
}

// ── Payload helpers ───────────────────────────────────────────────────────

fn flag(payload: &Value, name: &str) -> bool {
    payload.get(name).and_then(Value::as_bool).unwrap_or(false)
}

fn strings(payload: &Value, name: &str) -> Vec<String> {
    payload
        .get(name)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default()
}

fn diff_options(payload: &Value, config: &EngineConfig) -> DiffOptions {
    let mut options = config.diff_options();
    options.exclude = strings(payload, "exclude");
    options.ignore_additions = flag(payload, "ignore-additions");
    if let Some(key) = payload.get("align-key").and_then(Value::as_str) {
        options.list_align = ListAlign::ByKey(key.to_string());
    }
    options
}

fn load(payload: &Value, param: &str, config: &EngineConfig) -> Result<Value, OpsError> {
    let path = payload
        .get(param)
        .and_then(Value::as_str)
        .ok_or_else(|| OpsError::argument(param, "required parameter is missing"))?;
    load_path(path, param, config)
}

/// Read and parse one document. Parse errors are prefixed with the path.
fn load_path(path: &str, param: &str, config: &EngineConfig) -> Result<Value, OpsError> {
    let text = fs::read_to_string(path)
        .map_err(|e| OpsError::argument(param, format!("cannot read {path}: {e}")))?;
    parse_with(&text, &config.parse_options()).map_err(|e| match e {
        OpsError::Parse { message, line, column } => {
            OpsError::Parse { message: format!("{path}: {message}"), line, column }
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_register() {
        let app = app(EngineConfig::default()).unwrap();
        let names: Vec<_> = app.descriptors().map(Descriptor::name).collect();
        assert_eq!(names, ["diff", "apply", "render", "report", "plan"]);
    }

    #[test]
    fn payload_overrides_config_alignment() {
        let config = EngineConfig {
            list_align: opslib_json::ListAlignConfig::ByKey("id".into()),
            ..Default::default()
        };
        assert!(matches!(
            diff_options(&json!({}), &config).list_align,
            ListAlign::ByKey(ref k) if k == "id"
        ));
        let payload = json!({"align-key": "name", "exclude": ["etag"], "ignore-additions": true});
        let o = diff_options(&payload, &config);
        assert!(matches!(o.list_align, ListAlign::ByKey(ref k) if k == "name"));
        assert_eq!(o.exclude, ["etag"]);
        assert!(o.ignore_additions);
    }

    #[test]
    fn unreadable_files_name_the_parameter() {
        let payload = json!({"source": "/nonexistent/opsjson/a.json"});
        let e = load(&payload, "source", &EngineConfig::default()).unwrap_err();
        assert!(matches!(e, OpsError::Argument { flag: Some(ref f), .. } if f == "source"));
    }

    #[test]
    fn parse_errors_carry_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{\"a\": }").unwrap();
        let path = path.to_string_lossy().into_owned();
        match load_path(&path, "source", &EngineConfig::default()).unwrap_err() {
            OpsError::Parse { message, line, .. } => {
                assert!(message.starts_with(&path), "{message}");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
