//! The application runner: a registry of operations behind one command line.
//!
//! [`App::run`] never touches the process. It returns an [`Outcome`] with
//! the exit status and the text for stdout and stderr, and the binary does
//! the printing. Results go to stdout as JSON. Errors go to stderr as the
//! structured `{kind, message, cause?}` form.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{Arg, ArgMatches, Command};
use indexmap::IndexMap;
use opslib_json::{serialize, EngineConfig, OpsError, OutputFormat};
use serde_json::json;
use tracing::{debug, info};

use crate::descriptor::Descriptor;
use crate::dispatch::{dispatch_with, Handler};
use crate::parse::{from_clap_error, payload_from_matches, to_command};
use crate::sink::{AlertLevel, AlertSink, TracingSink};

/// Global flags, unavailable as parameter names.
const GLOBAL_FLAGS: [&str; 2] = ["output", "config"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Outcome {
    fn success(stdout: String) -> Self {
        Outcome { exit_code: 0, stdout, stderr: String::new() }
    }

    fn failure(err: &OpsError, output: OutputFormat) -> Self {
        Outcome {
            exit_code: err.exit_code(),
            stdout: String::new(),
            stderr: format!("{}\n", serialize(&err.to_value(), output.is_pretty())),
        }
    }
}

struct Operation {
    descriptor: Descriptor,
    handler: Box<dyn Handler>,
}

pub struct App {
    name: String,
    about: String,
    operations: IndexMap<String, Operation>,
    config: EngineConfig,
    sink: Arc<dyn AlertSink>,
}

impl App {
    pub fn new(name: impl Into<String>) -> Self {
        App {
            name: name.into(),
            about: String::new(),
            operations: IndexMap::new(),
            config: EngineConfig::default(),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = about.into();
        self
    }

    /// Base configuration; `--config` and `--output` override it per run.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn register(
        &mut self,
        descriptor: Descriptor,
        handler: impl Handler + 'static,
    ) -> Result<(), OpsError> {
        let invalid =
            |message: String| OpsError::Descriptor { name: descriptor.name().to_string(), message };
        if descriptor.name() == "help" {
            return Err(invalid("operation name 'help' is reserved".into()));
        }
        if self.operations.contains_key(descriptor.name()) {
            return Err(invalid("operation already registered".into()));
        }
        let params = descriptor.parameters();
        if let Some(p) = params.iter().find(|p| GLOBAL_FLAGS.contains(&p.name.as_str())) {
            return Err(invalid(format!("parameter '{}' clashes with a global flag", p.name)));
        }
        debug!(operation = descriptor.name(), "registered");
        let name = descriptor.name().to_string();
        self.operations.insert(name, Operation { descriptor, handler: Box::new(handler) });
        Ok(())
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &Descriptor> {
        self.operations.values().map(|op| &op.descriptor)
    }

    /// The full command tree, one subcommand per operation.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(self.name.clone())
            .no_binary_name(true)
            .subcommand_required(true)
            .arg(
                Arg::new("output")
                    .long("output")
                    .global(true)
                    .value_parser(["json", "pretty"])
                    .help("Result format"),
            )
            .arg(
                Arg::new("config")
                    .long("config")
                    .global(true)
                    .value_name("FILE")
                    .help("Engine configuration file"),
            );
        if !self.about.is_empty() {
            cmd = cmd.about(self.about.clone());
        }
        for op in self.operations.values() {
            cmd = cmd.subcommand(to_command(&op.descriptor));
        }
        cmd
    }

    /// Run one command line (without the program name).
    pub fn run<I, S>(&self, argv: I) -> Outcome
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString> + Clone,
    {
        let matches = match self.command().try_get_matches_from(argv) {
            Ok(m) => m,
            Err(e)
                if matches!(e.kind(), ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion) =>
            {
                return Outcome::success(e.render().to_string());
            }
            Err(e) => return Outcome::failure(&from_clap_error(&e), self.config.output),
        };
        let Some((name, sub)) = matches.subcommand() else {
            let e = OpsError::Argument { flag: None, message: "no operation given".into() };
            return Outcome::failure(&e, self.config.output);
        };
        let config = match self.resolve_config(&matches, sub) {
            Ok(c) => c,
            Err(e) => return Outcome::failure(&e, self.config.output),
        };
        let Some(op) = self.operations.get(name) else {
            let e = OpsError::Internal(format!("no handler for '{name}'"));
            return Outcome::failure(&e, config.output);
        };

        let result = payload_from_matches(&op.descriptor, sub).and_then(|payload| {
            dispatch_with(&op.descriptor, &payload, op.handler.as_ref(), &config)
        });
        match result {
            Ok(value) => {
                info!(operation = name, "operation succeeded");
                Outcome::success(format!("{}\n", serialize(&value, config.output.is_pretty())))
            }
            Err(e) => {
                if let OpsError::HandlerFailure { operation, .. } = &e {
                    self.sink.emit(
                        AlertLevel::Error,
                        &e.to_string(),
                        &json!({ "operation": operation, "error": e.to_value() }),
                    );
                }
                Outcome::failure(&e, config.output)
            }
        }
    }

    fn resolve_config(&self, top: &ArgMatches, sub: &ArgMatches) -> Result<EngineConfig, OpsError> {
        let mut config = match global(top, sub, "config") {
            Some(path) => EngineConfig::load(Path::new(path))?,
            None => self.config.clone(),
        };
        if let Some(output) = global(top, sub, "output") {
            config.output = output.parse()?;
        }
        Ok(config)
    }
}

/// A global flag may be given before or after the operation name.
fn global<'a>(top: &'a ArgMatches, sub: &'a ArgMatches, id: &str) -> Option<&'a String> {
    sub.get_one::<String>(id).or_else(|| top.get_one::<String>(id))
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("name", &self.name)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ParamType, Parameter};
    use serde_json::Value;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<(AlertLevel, String, Value)>>);

    impl AlertSink for Recording {
        fn emit(&self, level: AlertLevel, message: &str, context: &Value) {
            self.0.lock().unwrap().push((level, message.to_string(), context.clone()));
        }
    }

    fn app(sink: Arc<Recording>) -> App {
        let mut app = App::new("ops").with_sink(sink);
        let greet = Descriptor::builder("greet")
            .help("Say hello")
            .param(Parameter::new("name", ParamType::String).required())
            .param(Parameter::new("loud", ParamType::Bool))
            .build()
            .unwrap();
        app.register(greet, |p: &Value| -> Result<Value, OpsError> {
            let name = p["name"].as_str().unwrap_or_default();
            Ok(json!({ "greeting": format!("hello {name}"), "loud": p["loud"] }))
        })
        .unwrap();
        let fail = Descriptor::builder("fail").build().unwrap();
        app.register(fail, |_: &Value| -> Result<Value, OpsError> {
            Err(OpsError::service("Denied", "no access"))
        })
        .unwrap();
        app
    }

    fn stderr_kind(out: &Outcome) -> String {
        let v: Value = serde_json::from_str(&out.stderr).unwrap();
        v["kind"].as_str().unwrap().to_string()
    }

    #[test]
    fn success_prints_the_result() {
        let out = app(Arc::default()).run(["greet", "--name", "ops"]);
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout, "{\"greeting\":\"hello ops\",\"loud\":false}\n");
        assert!(out.stderr.is_empty());
    }

    #[test]
    fn output_flag_before_or_after_the_operation() {
        let a = app(Arc::default()).run(["--output", "pretty", "greet", "--name", "x"]);
        let b = app(Arc::default()).run(["greet", "--name", "x", "--output", "pretty"]);
        assert_eq!(a, b);
        assert!(a.stdout.contains("\n  \"greeting\""), "{}", a.stdout);
    }

    #[test]
    fn argument_errors_exit_1() {
        let out = app(Arc::default()).run(["greet"]);
        assert_eq!(out.exit_code, 1);
        assert_eq!(stderr_kind(&out), "ArgumentError");

        let out = app(Arc::default()).run(["greet", "--name", "x", "--output", "yaml"]);
        assert_eq!(out.exit_code, 1);
        assert_eq!(app(Arc::default()).run(["launch"]).exit_code, 1);
        assert_eq!(app(Arc::default()).run(Vec::<String>::new()).exit_code, 1);
    }

    #[test]
    fn handler_failure_exits_2_and_alerts() {
        let sink = Arc::new(Recording::default());
        let out = app(sink.clone()).run(["fail"]);
        assert_eq!(out.exit_code, 2);
        let err: Value = serde_json::from_str(&out.stderr).unwrap();
        assert_eq!(err["kind"], "HandlerFailure");
        assert_eq!(err["cause"]["kind"], "ServiceError");

        let alerts = sink.0.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].0, AlertLevel::Error);
        assert_eq!(alerts[0].2["operation"], "fail");
    }

    #[test]
    fn help_exits_0() {
        let out = app(Arc::default()).run(["--help"]);
        assert_eq!(out.exit_code, 0);
        assert!(out.stdout.contains("greet"), "{}", out.stdout);
        let out = app(Arc::default()).run(["greet", "--help"]);
        assert_eq!(out.exit_code, 0);
        assert!(out.stdout.contains("--name"), "{}", out.stdout);
    }

    fn noop(_: &Value) -> Result<Value, OpsError> {
        Ok(Value::Null)
    }

    #[test]
    fn registration_conflicts() {
        let mut app = app(Arc::default());
        let dup = Descriptor::builder("greet").build().unwrap();
        assert!(matches!(app.register(dup, noop), Err(OpsError::Descriptor { .. })));
        let clash = Descriptor::builder("show")
            .param(Parameter::new("output", ParamType::String))
            .build()
            .unwrap();
        let e = app.register(clash, noop).unwrap_err();
        assert_eq!(e.exit_code(), 3);
        let names: Vec<_> = app.descriptors().map(Descriptor::name).collect();
        assert_eq!(names, ["greet", "fail"]);
    }
}
