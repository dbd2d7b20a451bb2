use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::{ConfigError, PageConfig, ServerConfig, ShutdownTrigger};
use crate::gpio::{Direction, PinRegistry};
use crate::http::connection::{Connection, ConnectionSettings};

/// Lifecycle of the accept loop. Variants are ordered by progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServerState {
    /// Bound, loop not yet running
    Starting,
    Listening,
    /// No longer accepting; waiting for in-flight connections
    Draining,
    Stopped,
}

/// Fatal startup errors.
#[derive(Debug)]
pub enum ServerError {
    Bind {
        addr: String,
        source: std::io::Error,
    },
    /// The shutdown trigger does not name an input pin of the registry
    Config(ConfigError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Bind { addr, source } => write!(f, "cannot bind {}: {}", addr, source),
            ServerError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Bind { source, .. } => Some(source),
            ServerError::Config(e) => Some(e),
        }
    }
}

/// Remote control for a running [`Server`].
#[derive(Debug, Clone)]
pub struct ServerHandle {
    stop_tx: Arc<watch::Sender<bool>>,
    state_rx: watch::Receiver<ServerState>,
}

impl ServerHandle {
    /// Ask the loop to stop. Connections already accepted still complete.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn state(&self) -> ServerState {
        *self.state_rx.borrow()
    }

    /// Resolves once the loop has reached `state` or any later state.
    pub async fn wait_for(&self, state: ServerState) {
        let mut rx = self.state_rx.clone();
        let _ = rx.wait_for(|s| *s >= state).await;
    }

    pub async fn stopped(&self) {
        self.wait_for(ServerState::Stopped).await
    }
}

pub struct Server {
    listener: TcpListener,
    registry: PinRegistry,
    config: ServerConfig,
    settings: ConnectionSettings,
    stop_tx: Arc<watch::Sender<bool>>,
    state_tx: watch::Sender<ServerState>,
}

impl Server {
    /// Bind the listening socket. A failure here is a misconfiguration and is
    /// not retried.
    pub async fn bind(config: ServerConfig, registry: PinRegistry) -> Result<Self, ServerError> {
        if let Some(trigger) = config.shutdown {
            let pin = registry
                .get(trigger.pin)
                .await
                .map_err(|_| ServerError::Config(ConfigError::UnknownShutdownPin(trigger.pin)))?;
            if pin.direction != Direction::Input {
                return Err(ServerError::Config(ConfigError::ShutdownPinNotInput(pin.id)));
            }
        }

        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.listen_addr.clone(),
                source,
            })?;

        let (stop_tx, _) = watch::channel(false);
        let (state_tx, _) = watch::channel(ServerState::Starting);

        Ok(Self {
            settings: ConnectionSettings::new(&config, &PageConfig::default()),
            listener,
            registry,
            config,
            stop_tx: Arc::new(stop_tx),
            state_tx,
        })
    }

    /// Use `title` for the served page.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.settings.title = title.into();
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            stop_tx: self.stop_tx.clone(),
            state_rx: self.state_tx.subscribe(),
        }
    }

    /// Accept and serve clients until a shutdown is observed, then wait for
    /// in-flight connections and return.
    pub async fn run(self) {
        let addr = self
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| self.config.listen_addr.clone());
        self.state_tx.send_replace(ServerState::Listening);
        info!("Listening on {}", addr);

        let pool = (self.config.workers > 1).then(|| Arc::new(Semaphore::new(self.config.workers)));
        let mut tasks = JoinSet::new();
        let mut stop_rx = self.stop_tx.subscribe();

        loop {
            if let Some(reason) = self.shutdown_reason(&stop_rx).await {
                info!(reason, "Shutdown requested");
                break;
            }

            while let Some(res) = tasks.try_join_next() {
                if let Err(e) = res {
                    error!("Connection task failed: {}", e);
                }
            }

            let permit = match &pool {
                Some(pool) => match pool.clone().acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => break,
                },
                None => None,
            };

            let (socket, peer) = tokio::select! {
                res = self.listener.accept() => match res {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Accept failed: {}", e);
                        tokio::time::sleep(self.config.poll_interval()).await;
                        continue;
                    }
                },
                _ = tokio::time::sleep(self.config.poll_interval()) => continue,
                _ = stop_rx.changed() => continue,
            };

            info!("Accepted connection from {}", peer);

            let conn = Connection::new(socket, self.registry.clone(), self.settings.clone());
            let span = info_span!("conn", peer = %peer);

            match permit {
                Some(permit) => {
                    tasks.spawn(
                        async move {
                            conn.handle().await;
                            drop(permit);
                        }
                        .instrument(span),
                    );
                }
                None => {
                    conn.handle().instrument(span).await;
                }
            }
        }

        self.state_tx.send_replace(ServerState::Draining);
        if !tasks.is_empty() {
            info!(in_flight = tasks.len(), "Draining connections");
        }
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                error!("Connection task failed: {}", e);
            }
        }

        self.state_tx.send_replace(ServerState::Stopped);
        info!("Server stopped");
    }

    async fn shutdown_reason(&self, stop_rx: &watch::Receiver<bool>) -> Option<&'static str> {
        if *stop_rx.borrow() {
            return Some("stop requested");
        }

        let ShutdownTrigger { pin, trigger_level } = self.config.shutdown?;
        if let Err(e) = self.registry.refresh_input(pin).await {
            warn!(pin, error = %e, "Cannot sample shutdown pin");
        }
        match self.registry.get(pin).await {
            Ok(p) if p.value == trigger_level => Some("shutdown pin at trigger level"),
            _ => None,
        }
    }
}
