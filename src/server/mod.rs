//! The control page's HTTP front end.
//!
//! One connection is served at a time: read a request, route it, write the
//! response, close. Nothing a single client does can stop the accept loop.

use std::{net::SocketAddr, time::Duration};

use anyhow::Error;
use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::timeout,
};

use crate::{
    config::ServerConfig,
    control::SharedControl,
    error::NeopixelError,
    http::{parse, request::is_complete, ParseOptions, Response},
};

pub mod page;
pub mod routes;

const DRAIN_TIMEOUT: Duration = Duration::from_millis(50);

/// What came off the wire for one connection
enum Incoming {
    Request(Vec<u8>),
    /// More than `buffer_size` bytes
    TooLarge,
    /// Closed before sending anything
    Empty,
}

pub struct Server {
    control: SharedControl,
    options: ParseOptions,
    read_timeout: Duration,
    buffer_size: usize,
}

impl Server {
    pub fn new(control: SharedControl, config: &ServerConfig) -> Self {
        Self {
            control,
            options: ParseOptions {
                percent_decode: config.percent_decode,
            },
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            buffer_size: config.buffer_size,
        }
    }

    pub async fn bind(config: &ServerConfig) -> Result<TcpListener, Error> {
        let addr = SocketAddr::new(config.bind, config.port);
        let listener = TcpListener::bind(addr).await?;
        info!("Server: listening on http://{}", listener.local_addr()?);
        Ok(listener)
    }

    /// Accept connections forever
    pub async fn serve(self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("Server: connection from {}", peer);
                    if let Err(e) = self.handle(stream).await {
                        error!("Server: {}: {}", peer, e);
                    }
                }
                Err(e) => {
                    error!("Server: {}", NeopixelError::from(e));
                    // Usually out of file descriptors; give them a moment
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
        }
    }

    async fn handle(&self, mut stream: TcpStream) -> Result<(), NeopixelError> {
        let response = match self.read_request(&mut stream).await? {
            Incoming::Empty => return Ok(()),
            Incoming::TooLarge => Response::error(&NeopixelError::MalformedRequest(format!(
                "request larger than {} bytes",
                self.buffer_size
            ))),
            Incoming::Request(raw) => self.respond(&raw).await,
        };

        stream.write_all(&response.into_bytes()).await?;
        stream.shutdown().await?;
        Ok(())
    }

    /// Turn raw request bytes into a response. Never fails: anything that
    /// goes wrong becomes an error status.
    pub async fn respond(&self, raw: &[u8]) -> Response {
        let request = match parse(raw, self.options) {
            Ok(request) => request,
            Err(e) => {
                warn!("Server: {}", e);
                return Response::error(&e);
            }
        };

        // Routes run in their own task so a panic costs one 500, not the loop
        let control = self.control.clone();
        let routed = tokio::spawn(async move { routes::dispatch(&control, &request).await }).await;

        match routed {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("Server: {}", e);
                Response::error(&e)
            }
            Err(e) => {
                error!("Server: route failed: {}", e);
                Response::text(500, "Internal Server Error")
            }
        }
    }

    /// Read until the request is complete, the client stops sending, or the
    /// buffer is full.
    async fn read_request(&self, stream: &mut TcpStream) -> Result<Incoming, NeopixelError> {
        let mut raw = Vec::with_capacity(self.buffer_size);
        let mut chunk = [0u8; 512];

        loop {
            let n = match timeout(self.read_timeout, stream.read(&mut chunk)).await {
                Ok(read) => read?,
                Err(_) if raw.is_empty() => {
                    return Err(NeopixelError::NetworkAcceptFailure(
                        "timed out waiting for a request".to_string(),
                    ))
                }
                // Make do with what arrived
                Err(_) => break,
            };
            if n == 0 {
                break;
            }

            raw.extend_from_slice(&chunk[..n]);
            if raw.len() > self.buffer_size {
                self.discard(stream).await;
                return Ok(Incoming::TooLarge);
            }
            if is_complete(&raw) {
                break;
            }
        }

        if raw.is_empty() {
            Ok(Incoming::Empty)
        } else {
            Ok(Incoming::Request(raw))
        }
    }

    /// Swallow the rest of an oversized request. Closing with unread input
    /// resets the connection before the client sees the 400.
    async fn discard(&self, stream: &mut TcpStream) {
        let mut chunk = [0u8; 512];
        let mut left = self.buffer_size * 16;

        while left > 0 {
            match timeout(DRAIN_TIMEOUT, stream.read(&mut chunk)).await {
                Ok(Ok(n)) if n > 0 => left = left.saturating_sub(n),
                _ => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlState;

    fn server() -> Server {
        Server::new(
            SharedControl::new(ControlState::default(), Duration::from_millis(5)),
            &ServerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_respond_statuses() {
        let server = server();
        assert_eq!(server.respond(b"GET / HTTP/1.1\r\n\r\n").await.status, 200);
        assert_eq!(server.respond(b"GET /nope HTTP/1.1\r\n\r\n").await.status, 200);
        assert_eq!(server.respond(b"POST /nope HTTP/1.1\r\n\r\n").await.status, 404);
        assert_eq!(server.respond(b"\x00\x01garbage").await.status, 400);
        assert_eq!(
            server.respond(b"GET /color?value=xyz HTTP/1.1\r\n\r\n").await.status,
            400
        );
    }

    #[tokio::test]
    async fn test_percent_decode_option() {
        let mut config = ServerConfig::default();
        config.percent_decode = true;
        let control = SharedControl::new(ControlState::default(), Duration::from_millis(5));
        let server = Server::new(control.clone(), &config);

        let response = server
            .respond(b"GET /update?static_color=%5B1,2,3%5D HTTP/1.1\r\n\r\n")
            .await;
        assert_eq!(response.status, 200);
        assert_eq!(control.snapshot().await.static_color, smart_leds::RGB8::new(1, 2, 3));
    }
}
