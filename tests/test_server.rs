//! End-to-end tests over real loopback sockets

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pinpage::config::{ConfigError, ServerConfig, ShutdownTrigger};
use pinpage::gpio::{Direction, Pin, PinDriver, PinId, PinRegistry};
use pinpage::server::{Server, ServerError, ServerHandle, ServerState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

const BUTTON: u8 = 0;

/// Push button wired to pin 0; every other pin is unreadable.
#[derive(Debug)]
struct Button {
    high: AtomicBool,
}

impl PinDriver for Button {
    fn is_high(&self, id: PinId) -> Option<bool> {
        (id == BUTTON).then(|| self.high.load(Ordering::SeqCst))
    }

    fn set_state(&self, _id: PinId, _high: bool) -> std::io::Result<()> {
        Ok(())
    }
}

fn config() -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        shutdown: Some(ShutdownTrigger {
            pin: BUTTON,
            trigger_level: 0,
        }),
        read_timeout_ms: 500,
        write_timeout_ms: 500,
        max_line_bytes: 64,
        max_lines: 16,
        poll_interval_ms: 20,
        workers: 1,
    }
}

fn board() -> PinRegistry {
    PinRegistry::configure(vec![
        Pin::new(0, Direction::Output, 0),
        Pin::new(2, Direction::Output, 1),
    ])
    .unwrap()
}

fn board_with_button() -> PinRegistry {
    PinRegistry::configure(vec![
        Pin::new(BUTTON, Direction::Input, 1),
        Pin::new(2, Direction::Output, 1),
    ])
    .unwrap()
}

async fn start(config: ServerConfig, registry: PinRegistry) -> (SocketAddr, ServerHandle, JoinHandle<()>) {
    let server = Server::bind(config, registry).await.unwrap();
    let addr = server.local_addr().unwrap();
    let handle = server.handle();
    let task = tokio::spawn(server.run());
    handle.wait_for(ServerState::Listening).await;
    (addr, handle, task)
}

async fn request(addr: SocketAddr, bytes: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(bytes).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8(response).unwrap()
}

async fn finish(handle: &ServerHandle, task: JoinHandle<()>) {
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("server did not stop")
        .unwrap();
    assert_eq!(handle.state(), ServerState::Stopped);
}

#[tokio::test]
async fn test_serves_two_pin_table() {
    let mut cfg = config();
    cfg.shutdown = None;
    let (addr, handle, task) = start(cfg, board()).await;

    let response = request(addr, b"\r\n").await;

    let (head, body) = response.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("HTTP/1.0 200 OK"));
    assert!(head.contains("Content-Type: text/html"));
    assert!(head.contains(&format!("Content-Length: {}", body.len())));

    let rows: Vec<&str> = body.matches("<tr><td>").collect();
    assert_eq!(rows.len(), 2);
    let zero = body.find("<tr><td>0</td><td>0</td></tr>").unwrap();
    let two = body.find("<tr><td>2</td><td>1</td></tr>").unwrap();
    assert!(zero < two);

    handle.stop();
    finish(&handle, task).await;
}

#[tokio::test]
async fn test_long_line_rejected_then_next_client_served() {
    let mut cfg = config();
    cfg.shutdown = None;
    let (addr, handle, task) = start(cfg, board()).await;

    let mut long = vec![b'a'; 500];
    long.extend_from_slice(b"\r\n\r\n");
    let response = request(addr, &long).await;
    assert_eq!(response, "HTTP/1.0 400 Bad Request\r\n\r\n");

    let response = request(addr, b"GET / HTTP/1.0\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.0 200 OK"));

    handle.stop();
    finish(&handle, task).await;
}

#[tokio::test]
async fn test_shutdown_pin_stops_loop() {
    let registry = board_with_button();
    let (addr, handle, task) = start(config(), registry.clone()).await;

    let response = request(addr, b"\r\n").await;
    assert!(response.starts_with("HTTP/1.0 200 OK"));

    registry.sample(BUTTON, 0).await.unwrap();
    finish(&handle, task).await;

    // Listener is gone
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_released_button_stops_loop_through_driver() {
    let button = Arc::new(Button {
        high: AtomicBool::new(true),
    });
    let registry = board_with_button().with_driver(button.clone());
    let (addr, handle, task) = start(config(), registry.clone()).await;

    // Still high after a few polls: keeps serving
    tokio::time::sleep(Duration::from_millis(60)).await;
    let response = request(addr, b"\r\n").await;
    assert!(response.contains("<tr><td>0</td><td>1</td></tr>"));
    assert_eq!(handle.state(), ServerState::Listening);

    button.high.store(false, Ordering::SeqCst);
    finish(&handle, task).await;
    assert_eq!(registry.get(BUTTON).await.unwrap().value, 0);
}

#[tokio::test]
async fn test_page_samples_inputs_per_request() {
    let button = Arc::new(Button {
        high: AtomicBool::new(true),
    });
    let registry = board_with_button().with_driver(button.clone());
    let mut cfg = config();
    cfg.shutdown = None;
    let (addr, handle, task) = start(cfg, registry).await;

    let response = request(addr, b"\r\n").await;
    assert!(response.contains("<tr><td>0</td><td>1</td></tr>"));

    button.high.store(false, Ordering::SeqCst);
    let response = request(addr, b"\r\n").await;
    assert!(response.contains("<tr><td>0</td><td>0</td></tr>"));

    handle.stop();
    finish(&handle, task).await;
}

#[tokio::test]
async fn test_in_flight_connection_completes_before_stop() {
    let registry = board_with_button();
    let (addr, handle, task) = start(config(), registry.clone()).await;

    // Connect and send half a request so the handler is mid-read
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"GET / HTTP/1.0\r\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    registry.sample(BUTTON, 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_ne!(handle.state(), ServerState::Stopped);

    stream.write_all(b"\r\n").await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.0 200 OK"));

    finish(&handle, task).await;
}

#[tokio::test]
async fn test_stop_handle_with_idle_listener() {
    let mut cfg = config();
    cfg.shutdown = None;
    let (_addr, handle, task) = start(cfg, board()).await;

    assert_eq!(handle.state(), ServerState::Listening);
    handle.stop();
    handle.stopped().await;
    finish(&handle, task).await;
}

#[tokio::test]
async fn test_worker_pool_serves_concurrent_clients() {
    let mut cfg = config();
    cfg.shutdown = None;
    cfg.workers = 4;
    cfg.read_timeout_ms = 2000;
    let (addr, handle, task) = start(cfg, board()).await;

    // A stalled client must not block the others
    let mut stalled = TcpStream::connect(addr).await.unwrap();
    stalled.write_all(b"GET / HTTP/1.0\r\n").await.unwrap();

    let clients: Vec<_> = (0..3)
        .map(|_| tokio::spawn(async move { request(addr, b"\r\n").await }))
        .collect();
    for client in clients {
        let response = client.await.unwrap();
        assert!(response.starts_with("HTTP/1.0 200 OK"));
    }

    stalled.write_all(b"\r\n").await.unwrap();
    let mut response = String::new();
    stalled.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.0 200 OK"));

    handle.stop();
    finish(&handle, task).await;
}

#[tokio::test]
async fn test_state_starts_before_run() {
    let mut cfg = config();
    cfg.shutdown = None;
    let server = Server::bind(cfg, board()).await.unwrap();
    let handle = server.handle();

    assert_eq!(handle.state(), ServerState::Starting);

    handle.stop();
    server.run().await;
    assert_eq!(handle.state(), ServerState::Stopped);
}

#[tokio::test]
async fn test_bind_error_on_port_in_use() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut cfg = config();
    cfg.shutdown = None;
    cfg.listen_addr = taken.local_addr().unwrap().to_string();

    let result = Server::bind(cfg, board()).await;
    assert!(matches!(result, Err(ServerError::Bind { .. })));
}

#[tokio::test]
async fn test_bind_rejects_unusable_shutdown_pin() {
    // Pin 0 is an output on this board
    let result = Server::bind(config(), board()).await;
    assert!(matches!(
        result,
        Err(ServerError::Config(ConfigError::ShutdownPinNotInput(0)))
    ));

    let mut cfg = config();
    cfg.shutdown = Some(ShutdownTrigger {
        pin: 9,
        trigger_level: 0,
    });
    let result = Server::bind(cfg, board()).await;
    assert!(matches!(
        result,
        Err(ServerError::Config(ConfigError::UnknownShutdownPin(9)))
    ));
}

#[tokio::test]
async fn test_custom_title() {
    let mut cfg = config();
    cfg.shutdown = None;
    let server = Server::bind(cfg, board()).await.unwrap().with_title("Greenhouse");
    let addr = server.local_addr().unwrap();
    let handle = server.handle();
    let task = tokio::spawn(server.run());

    let response = request(addr, b"\r\n").await;
    assert!(response.contains("<h1>Greenhouse</h1>"));

    handle.stop();
    finish(&handle, task).await;
}
