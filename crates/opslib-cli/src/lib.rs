//! opslib-cli: command lines generated from operation descriptors.
//!
//! A [`Descriptor`] declares an operation and its typed parameters. The
//! generator turns it into `--flag` parsing ([`parse_args`]) and validated
//! dispatch to a [`Handler`]; [`App`] puts many operations behind one
//! command and maps every failure onto an exit status.
//!
//! ```
//! use opslib_cli::{parse_args, source};
//!
//! let d = source::from_json_str(
//!     r#"{"name": "scale", "parameters": [{"name": "count", "type": "int", "required": true}]}"#,
//! ).unwrap();
//! let payload = parse_args(&d, ["--count", "3"]).unwrap();
//! assert_eq!(payload["count"], 3);
//! ```

pub mod app;
pub mod builtin;
pub mod descriptor;
pub mod dispatch;
pub mod parse;
pub mod service;
pub mod sink;
pub mod source;

pub use app::{App, Outcome};
pub use descriptor::{Descriptor, DescriptorBuilder, ParamType, Parameter};
pub use dispatch::{dispatch, dispatch_with, validate_payload, Handler, WithConfig};
pub use parse::{parse_args, to_command};
pub use service::{ServiceClient, ServiceHandler};
pub use sink::{AlertLevel, AlertSink, NullSink, TracingSink};
