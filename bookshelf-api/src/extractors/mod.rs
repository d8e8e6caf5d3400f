//! Request extractors with JSON error responses.

mod json_body;

pub use json_body::JsonBody;
