//! Descriptor to `clap::Command`, and argv to call payload.
//!
//! Each parameter becomes a `--<name>` flag. Bools are presence flags, the
//! rest take one value (`--name v` or `--name=v`) coerced to the declared
//! type. Required parameters are checked after parsing rather than by clap,
//! so the error names the parameter the same way every other argument error
//! does.

use clap::error::{ContextKind, ContextValue, ErrorKind as ClapErrorKind};
use clap::{Arg, ArgAction, ArgMatches, Command};
use opslib_json::OpsError;
use serde_json::{Map, Value};
use tracing::debug;

use crate::descriptor::{Descriptor, ParamType, Parameter};

/// The subcommand for one descriptor.
pub fn to_command(descriptor: &Descriptor) -> Command {
    let mut cmd = Command::new(descriptor.name().to_string());
    if !descriptor.help().is_empty() {
        cmd = cmd.about(descriptor.help().to_string());
    }
    for p in descriptor.parameters() {
        cmd = cmd.arg(to_arg(p));
    }
    cmd
}

fn to_arg(p: &Parameter) -> Arg {
    let arg = Arg::new(p.name.clone()).long(p.name.clone());
    let arg = match p.ty {
        ParamType::Bool => arg.action(ArgAction::SetTrue),
        ty => arg
            .action(ArgAction::Set)
            .value_name(ty.as_str().to_ascii_uppercase())
            .allow_negative_numbers(matches!(ty, ParamType::Int | ParamType::Float)),
    };
    let help = help_text(p);
    if help.is_empty() {
        arg
    } else {
        arg.help(help)
    }
}

/// Choices are checked with the other payload rules, so they only show here.
fn help_text(p: &Parameter) -> String {
    let mut help = p.help.clone();
    if !p.choices.is_empty() {
        help = format!("{help} [one of: {}]", p.choices_text());
    }
    if let (Some(default), false) = (&p.default, p.ty == ParamType::Bool) {
        help = format!("{help} [default: {default}]");
    }
    help.trim_start().to_string()
}

/// Parse `argv` (without the program or operation name) into the payload.
pub fn parse_args<I, S>(descriptor: &Descriptor, argv: I) -> Result<Value, OpsError>
where
    I: IntoIterator<Item = S>,
    S: Into<std::ffi::OsString> + Clone,
{
    let matches = to_command(descriptor)
        .no_binary_name(true)
        .disable_help_flag(true)
        .try_get_matches_from(argv)
        .map_err(|e| from_clap_error(&e))?;
    payload_from_matches(descriptor, &matches)
}

/// Build the payload from already-parsed matches, in descriptor order.
pub fn payload_from_matches(
    descriptor: &Descriptor,
    matches: &ArgMatches,
) -> Result<Value, OpsError> {
    let mut payload = Map::new();
    for p in descriptor.parameters() {
        let value = match p.ty {
            ParamType::Bool => {
                if matches.get_flag(&p.name) {
                    Some(Value::Bool(true))
                } else {
                    Some(p.default.clone().unwrap_or(Value::Bool(false)))
                }
            }
            ty => match matches.get_one::<String>(&p.name) {
                Some(raw) => {
                    let value = ty.coerce(raw).map_err(|e| OpsError::argument(&p.name, e))?;
                    p.check(&value).map_err(|e| OpsError::argument(&p.name, e))?;
                    Some(value)
                }
                None if p.required => {
                    return Err(OpsError::argument(&p.name, "required parameter is missing"));
                }
                None => p.default.clone(),
            },
        };
        if let Some(value) = value {
            payload.insert(p.name.clone(), value);
        }
    }
    debug!(operation = descriptor.name(), params = payload.len(), "payload parsed");
    Ok(Value::Object(payload))
}

/// Map a clap error to an argument error naming the flag when clap knows it.
pub fn from_clap_error(e: &clap::Error) -> OpsError {
    let flag = match e.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(s)) => Some(flag_name(s)),
        Some(ContextValue::Strings(v)) => v.first().map(|s| flag_name(s)),
        _ => None,
    };
    let message = match e.kind() {
        ClapErrorKind::UnknownArgument => "unknown flag".to_string(),
        ClapErrorKind::NoEquals | ClapErrorKind::InvalidValue => {
            "missing or invalid value".to_string()
        }
        ClapErrorKind::ArgumentConflict => "given more than once".to_string(),
        _ => first_line(&e.to_string()),
    };
    OpsError::Argument { flag, message }
}

/// `--port <INT>` to `port`.
fn flag_name(s: &str) -> String {
    let s = s.trim_start_matches('-');
    s.split(|c: char| c == ' ' || c == '=').next().unwrap_or(s).to_string()
}

fn first_line(s: &str) -> String {
    s.lines().next().unwrap_or_default().trim_start_matches("error: ").to_string()
}
