//! The small slice of HTTP/1.1 the control page needs: one request line,
//! an optional query string, an optional flat JSON object, and responses
//! that always close the connection.

pub mod json;
pub mod request;
pub mod response;

pub use json::{JsonBody, JsonValue};
pub use request::{parse, Method, ParseOptions, Request};
pub use response::Response;
