use std::fmt::Display;

/// Everything that can go wrong while the lights are running. None of these
/// stop the process; they are contained to the tick or the connection that
/// raised them. The one exception is `AssociationFailure` at startup, which
/// keeps the server from ever binding.
#[derive(Debug, Clone, PartialEq)]
pub enum NeopixelError {
    /// Unparseable request line, query value or JSON body
    MalformedRequest(String),
    /// No route for this method and path
    UnknownRoute { method: String, path: String },
    /// The pixel driver refused a frame
    ActuationWriteFailure(String),
    /// Accept, read or write on a connection failed
    NetworkAcceptFailure(String),
    /// No address could be obtained at startup
    AssociationFailure(String),
}

impl NeopixelError {
    /// HTTP status used when this error ends a request.
    pub fn status_code(&self) -> u16 {
        match self {
            NeopixelError::MalformedRequest(_) => 400,
            NeopixelError::UnknownRoute { .. } => 404,
            NeopixelError::ActuationWriteFailure(_) => 500,
            NeopixelError::NetworkAcceptFailure(_) => 500,
            NeopixelError::AssociationFailure(_) => 503,
        }
    }
}

impl Display for NeopixelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NeopixelError::MalformedRequest(reason) => write!(f, "malformed request: {}", reason),
            NeopixelError::UnknownRoute { method, path } => {
                write!(f, "no route for {} {}", method, path)
            }
            NeopixelError::ActuationWriteFailure(reason) => {
                write!(f, "pixel write failed: {}", reason)
            }
            NeopixelError::NetworkAcceptFailure(reason) => {
                write!(f, "connection failed: {}", reason)
            }
            NeopixelError::AssociationFailure(reason) => {
                write!(f, "network association failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for NeopixelError {}

impl From<std::io::Error> for NeopixelError {
    fn from(e: std::io::Error) -> Self {
        NeopixelError::NetworkAcceptFailure(e.to_string())
    }
}
