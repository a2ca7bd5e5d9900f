use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tungstenite::client::IntoClientRequest;
use tungstenite::handshake::HandshakeRole;
use tungstenite::http::header::ORIGIN;
use tungstenite::http::HeaderValue;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{HandshakeError, Message, WebSocket};

use crate::config::FeedConfig;
use crate::error::{AppError, Context, Result};

/// A connected, blocking text channel to the feed.
pub trait FeedTransport {
    fn send_text(&mut self, text: &str) -> Result<()>;

    /// Block until the next text message arrives or the read timeout elapses.
    fn recv_text(&mut self) -> Result<String>;

    fn close(&mut self) {}
}

/// Opens a fresh [`FeedTransport`] for one fetch.
pub trait Connector {
    type Transport: FeedTransport;

    fn connect(&self, config: &FeedConfig) -> Result<Self::Transport>;
}

/// Connects over TLS websockets with the configured `Origin` and timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl Connector for WsConnector {
    type Transport = WsTransport;

    fn connect(&self, config: &FeedConfig) -> Result<WsTransport> {
        let _ = rustls::crypto::ring::default_provider().install_default();

        let mut request = config
            .websocket_url
            .as_str()
            .into_client_request()?;
        let origin = HeaderValue::from_str(&config.origin)
            .with_context(|| format!("Invalid Origin header value {}", config.origin))?;
        request.headers_mut().insert(ORIGIN, origin);

        let host = request
            .uri()
            .host()
            .ok_or_else(|| AppError::message("websocket URL has no host"))?
            .to_string();
        let port = request.uri().port_u16().unwrap_or(443);

        let stream = connect_tcp(&host, port, config.timeout)?;
        stream.set_read_timeout(Some(config.timeout))?;
        stream.set_write_timeout(Some(config.timeout))?;

        let (socket, _response) = tungstenite::client_tls(request, stream).map_err(|err| {
            log::debug!("websocket handshake with {host} failed: {err}");
            map_handshake_error(err)
        })?;

        Ok(WsTransport { socket })
    }
}

fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addrs = (host, port)
        .to_socket_addrs()
        .with_context(|| format!("Failed to resolve {host}"))?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_error = Some(err),
        }
    }

    Err(match last_error {
        Some(err) if is_timeout(err.kind()) => AppError::Timeout,
        Some(err) => AppError::Io(err),
        None => AppError::message(format!("{host} resolved to no addresses")),
    })
}

fn is_timeout(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

pub struct WsTransport {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl FeedTransport for WsTransport {
    fn send_text(&mut self, text: &str) -> Result<()> {
        self.socket
            .send(Message::text(text.to_owned()))
            .map_err(map_ws_error)
    }

    fn recv_text(&mut self) -> Result<String> {
        loop {
            match self.socket.read().map_err(map_ws_error)? {
                Message::Text(text) => return Ok(text.as_str().to_owned()),
                Message::Binary(bytes) => return Ok(String::from_utf8_lossy(&bytes).into_owned()),
                Message::Close(_) => return Err(AppError::ConnectionClosed),
                // Protocol pings are answered by tungstenite on the next write.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    fn close(&mut self) {
        let _ = self.socket.close(None);
        let _ = self.socket.flush();
    }
}

fn map_ws_error(err: tungstenite::Error) -> AppError {
    match err {
        tungstenite::Error::Io(io) if is_timeout(io.kind()) => AppError::Timeout,
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            AppError::ConnectionClosed
        }
        other => AppError::WebSocket(other),
    }
}

/// A handshake left mid-way only happens when the blocking socket hit its timeout.
fn map_handshake_error<R: HandshakeRole>(err: HandshakeError<R>) -> AppError {
    match err {
        HandshakeError::Interrupted(_) => AppError::Timeout,
        HandshakeError::Failure(err) => map_ws_error(err),
    }
}
