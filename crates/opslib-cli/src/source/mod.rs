//! Ways to obtain a [`Descriptor`](crate::Descriptor) other than declaring it
//! in code.

pub mod docstring;
pub mod json;
pub mod schema;

pub use docstring::from_doc_comment;
pub use json::{from_json_str, from_json_value};
pub use schema::from_json_schema;
