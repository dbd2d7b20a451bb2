use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{PageConfig, ServerConfig};
use crate::gpio::PinRegistry;
use crate::http::reader::{read_request, RequestError};
use crate::http::request::RequestHead;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::page;

/// How long a rejected connection keeps draining input before it is dropped.
const LINGER: Duration = Duration::from_millis(500);
const LINGER_MAX_BYTES: usize = 16 * 1024;

/// Per-connection limits, shared by every connection a server accepts.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub max_line_bytes: usize,
    pub max_lines: usize,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub title: String,
}

impl ConnectionSettings {
    pub fn new(server: &ServerConfig, page: &PageConfig) -> Self {
        Self {
            max_line_bytes: server.max_line_bytes,
            max_lines: server.max_lines,
            read_timeout: server.read_timeout(),
            write_timeout: server.write_timeout(),
            title: page.title.clone(),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::new(&ServerConfig::default(), &PageConfig::default())
    }
}

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The pin page was written in full
    Served,
    /// The request was malformed and a 400 was sent
    Rejected,
    /// I/O failed or timed out; nothing more could be sent
    Aborted,
}

pub enum ConnectionState {
    Reading,
    Rendering(RequestHead),
    Writing(ResponseWriter, Outcome),
    Closed(Outcome),
}

/// One client connection, owned from accept until close.
pub struct Connection<S> {
    stream: BufReader<S>,
    registry: PinRegistry,
    settings: ConnectionSettings,
    state: ConnectionState,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, registry: PinRegistry, settings: ConnectionSettings) -> Self {
        Self {
            stream: BufReader::new(stream),
            registry,
            settings,
            state: ConnectionState::Reading,
        }
    }

    /// Serve the connection to completion.
    ///
    /// Consumes the connection; the stream is shut down and dropped on every
    /// path, so no failure leaves it half-open.
    pub async fn handle(mut self) -> Outcome {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed(Outcome::Aborted));

            self.state = match state {
                ConnectionState::Reading => self.read_head().await,

                ConnectionState::Rendering(head) => {
                    if let Some(line) = head.request_line() {
                        debug!(
                            method = ?line.method,
                            path = %line.path,
                            host = head.header("Host").unwrap_or("-"),
                            "Request"
                        );
                    }
                    self.registry.refresh_inputs().await;
                    let snapshot = self.registry.snapshot().await;
                    let body = page::render_titled(&self.settings.title, &snapshot);
                    let writer = ResponseWriter::new(&Response::html(body));
                    ConnectionState::Writing(writer, Outcome::Served)
                }

                ConnectionState::Writing(mut writer, outcome) => {
                    let write = writer.write_to_stream(self.stream.get_mut());
                    match timeout(self.settings.write_timeout, write).await {
                        Ok(Ok(())) => ConnectionState::Closed(outcome),
                        Ok(Err(e)) => {
                            warn!(error = %e, unsent = writer.remaining(), "Write failed");
                            ConnectionState::Closed(Outcome::Aborted)
                        }
                        Err(_) => {
                            warn!(unsent = writer.remaining(), "Write timed out");
                            ConnectionState::Closed(Outcome::Aborted)
                        }
                    }
                }

                ConnectionState::Closed(outcome) => {
                    self.close(outcome).await;
                    info!(?outcome, "Connection closed");
                    return outcome;
                }
            };
        }
    }

    async fn read_head(&mut self) -> ConnectionState {
        let read = read_request(
            &mut self.stream,
            self.settings.max_line_bytes,
            self.settings.max_lines,
        );

        match timeout(self.settings.read_timeout, read).await {
            Ok(Ok(head)) => ConnectionState::Rendering(head),
            Ok(Err(RequestError::Malformed(reason))) => {
                warn!(reason, "Rejecting malformed request");
                ConnectionState::Writing(
                    ResponseWriter::new(&Response::bad_request()),
                    Outcome::Rejected,
                )
            }
            Ok(Err(RequestError::Io(e))) => {
                warn!(error = %e, "Read failed");
                ConnectionState::Closed(Outcome::Aborted)
            }
            Err(_) => {
                warn!("Read timed out");
                ConnectionState::Closed(Outcome::Aborted)
            }
        }
    }

    async fn close(&mut self, outcome: Outcome) {
        let stream = self.stream.get_mut();
        let _ = timeout(self.settings.write_timeout, stream.shutdown()).await;

        // Unread request bytes would turn the close into a reset and could
        // discard the 400 before the peer reads it.
        if outcome == Outcome::Rejected {
            let _ = timeout(LINGER, drain(&mut self.stream)).await;
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(reader: &mut R) {
    let mut buf = [0u8; 512];
    let mut total = 0;

    while total < LINGER_MAX_BYTES {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => total += n,
        }
    }
}
