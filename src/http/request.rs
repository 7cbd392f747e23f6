use std::collections::HashMap;
use std::fmt::Display;

use super::json::{extract_body, JsonBody};
use crate::error::NeopixelError;

/// Request methods the routes distinguish between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        match s {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Other(m) => write!(f, "{}", m),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Decode `%XX` escapes and `+` in query keys and values. Off by default
    /// so literal values reach the routes untouched.
    pub percent_decode: bool,
}

/// One request, parsed from whatever bytes arrived on the connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Last value wins on duplicate keys
    pub query: HashMap<String, String>,
    pub body: JsonBody,
}

impl Request {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

#[derive(Clone, Copy)]
enum QueryState {
    Key,
    Value,
}

/// Parse one request out of a raw buffer.
///
/// Total over arbitrary input: bytes that are not UTF-8 are replaced, and
/// anything without a usable request line comes back as
/// `MalformedRequest`. A body that does not parse is reported through
/// `Request::body` instead of failing the whole request.
pub fn parse(raw: &[u8], options: ParseOptions) -> Result<Request, NeopixelError> {
    let text = String::from_utf8_lossy(raw);

    let line = text.split('\n').next().unwrap_or_default().trim_end_matches('\r');
    let mut tokens = line.split_ascii_whitespace();

    let method = tokens
        .next()
        .ok_or_else(|| NeopixelError::MalformedRequest("empty request line".to_string()))?;
    if !method.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(NeopixelError::MalformedRequest(format!(
            "bad method {:?}",
            truncate(method)
        )));
    }

    let target = tokens
        .next()
        .ok_or_else(|| NeopixelError::MalformedRequest("missing request target".to_string()))?;
    if !target.starts_with('/') {
        return Err(NeopixelError::MalformedRequest(format!(
            "bad request target {:?}",
            truncate(target)
        )));
    }

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, parse_query(query, options)),
        None => (target, HashMap::new()),
    };

    Ok(Request {
        method: method.into(),
        path: path.to_string(),
        query,
        body: body(&text),
    })
}

/// Only what follows the header block can carry JSON
fn body(text: &str) -> JsonBody {
    match text.split_once("\r\n\r\n") {
        Some((_, body)) => extract_body(body),
        None => JsonBody::Absent,
    }
}

/// Split `a=1&b=2` into pairs. A pair without `=` gets an empty value,
/// and everything after the first `=` belongs to the value.
pub fn parse_query(query: &str, options: ParseOptions) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut state = QueryState::Key;
    let mut key = String::new();
    let mut value = String::new();

    let mut emit = |key: &mut String, value: &mut String| {
        if !key.is_empty() {
            let (k, v) = if options.percent_decode {
                (percent_decode(key), percent_decode(value))
            } else {
                (key.clone(), value.clone())
            };
            params.insert(k, v);
        }
        key.clear();
        value.clear();
    };

    for c in query.chars() {
        if c == '&' {
            emit(&mut key, &mut value);
            state = QueryState::Key;
            continue;
        }

        match state {
            QueryState::Key if c == '=' => state = QueryState::Value,
            QueryState::Key => key.push(c),
            QueryState::Value => value.push(c),
        }
    }
    emit(&mut key, &mut value);

    params
}

/// Decode `%XX` escapes and `+`. Escapes that are cut short or not hex are
/// kept literally.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// Keep error messages short when the input is garbage
fn truncate(s: &str) -> String {
    s.chars().take(32).collect()
}

/// Whether `raw` holds a complete request: the header block has ended and
/// at least `Content-Length` bytes of body have arrived.
pub fn is_complete(raw: &[u8]) -> bool {
    let Some(header_end) = find(raw, b"\r\n\r\n") else {
        return false;
    };

    let headers = String::from_utf8_lossy(&raw[..header_end]);
    let content_length = headers
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    raw.len() - (header_end + 4) >= content_length
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
