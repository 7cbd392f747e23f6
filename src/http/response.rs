use crate::error::NeopixelError;

/// A complete response. Every response closes the connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    pub fn html(body: String) -> Self {
        Response {
            status: 200,
            content_type: "text/html",
            body,
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Response {
            status,
            content_type: "text/plain",
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Response::text(404, "Not Found")
    }

    pub fn error(e: &NeopixelError) -> Self {
        match e {
            NeopixelError::UnknownRoute { .. } => Response::not_found(),
            e => Response::text(e.status_code(), e.to_string()),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        let mut bytes = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            reason(self.status),
            self.content_type,
            self.body.len()
        )
        .into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
