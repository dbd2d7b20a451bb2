use pinpage::http::reader::{read_request, RequestError};
use tokio::io::{AsyncWriteExt, BufReader};

#[tokio::test]
async fn test_read_simple_request() {
    let mut input: &[u8] = b"GET / HTTP/1.0\r\n\r\n";
    let head = read_request(&mut input, 256, 16).await.unwrap();

    assert_eq!(head.lines, vec!["GET / HTTP/1.0".to_string()]);
    assert!(!head.truncated);
}

#[tokio::test]
async fn test_read_stops_at_blank_line() {
    let mut input: &[u8] = b"GET / HTTP/1.1\r\nHost: a\r\n\r\nleftover body";
    let head = read_request(&mut input, 256, 16).await.unwrap();

    assert_eq!(head.len(), 2);
    assert_eq!(head.header("Host"), Some("a"));
    assert_eq!(input, b"leftover body");
}

#[tokio::test]
async fn test_read_blank_line_only() {
    let mut input: &[u8] = b"\r\n";
    let head = read_request(&mut input, 256, 16).await.unwrap();

    assert!(head.is_empty());
    assert!(!head.truncated);
}

#[tokio::test]
async fn test_read_accepts_bare_newlines() {
    let mut input: &[u8] = b"GET / HTTP/1.0\nHost: a\n\n";
    let head = read_request(&mut input, 256, 16).await.unwrap();

    assert_eq!(head.lines, vec!["GET / HTTP/1.0".to_string(), "Host: a".to_string()]);
}

#[tokio::test]
async fn test_read_eof_without_terminator() {
    let mut input: &[u8] = b"GET / HTTP/1.0\r\nHost: a\r\n";
    let head = read_request(&mut input, 256, 16).await.unwrap();

    assert_eq!(head.len(), 2);
    assert!(head.truncated);
}

#[tokio::test]
async fn test_read_eof_mid_line() {
    let mut input: &[u8] = b"GET / HTT";
    let head = read_request(&mut input, 256, 16).await.unwrap();

    assert_eq!(head.lines, vec!["GET / HTT".to_string()]);
    assert!(head.truncated);
}

#[tokio::test]
async fn test_read_empty_stream() {
    let mut input: &[u8] = b"";
    let head = read_request(&mut input, 256, 16).await.unwrap();

    assert!(head.is_empty());
    assert!(head.truncated);
}

#[tokio::test]
async fn test_read_line_too_long() {
    let mut request = vec![b'a'; 100];
    request.extend_from_slice(b"\r\n\r\n");
    let mut input: &[u8] = &request;

    let result = read_request(&mut input, 64, 16).await;
    assert!(matches!(result, Err(RequestError::Malformed(_))));
}

#[tokio::test]
async fn test_read_long_line_is_not_buffered_whole() {
    let request = vec![b'a'; 10_000];
    let mut input: &[u8] = &request;

    let result = read_request(&mut input, 64, 16).await;
    assert!(matches!(result, Err(RequestError::Malformed(_))));
    // Only the limit plus the terminator allowance was consumed
    assert_eq!(input.len(), 10_000 - 66);
}

#[tokio::test]
async fn test_read_too_many_lines() {
    let mut request = String::from("GET / HTTP/1.0\r\n");
    for i in 0..5 {
        request.push_str(&format!("X-Header-{}: v\r\n", i));
    }
    request.push_str("\r\n");
    let mut input = request.as_bytes();

    let result = read_request(&mut input, 256, 4).await;
    assert!(matches!(result, Err(RequestError::Malformed(_))));
}

#[tokio::test]
async fn test_read_exactly_max_lines() {
    let mut input: &[u8] = b"GET / HTTP/1.0\r\nA: 1\r\nB: 2\r\n\r\n";
    let head = read_request(&mut input, 256, 3).await.unwrap();

    assert_eq!(head.len(), 3);
}

#[tokio::test]
async fn test_read_tolerates_partial_writes() {
    let (client, server) = tokio::io::duplex(8);
    let mut server = BufReader::new(server);

    let writer = tokio::spawn(async move {
        let mut client = client;
        for chunk in [&b"GE"[..], b"T / HT", b"TP/1.0\r", b"\nHost: x\r\n", b"\r", b"\n"] {
            client.write_all(chunk).await.unwrap();
            tokio::task::yield_now().await;
        }
        client
    });

    let head = read_request(&mut server, 256, 16).await.unwrap();
    assert_eq!(head.lines, vec!["GET / HTTP/1.0".to_string(), "Host: x".to_string()]);
    assert!(!head.truncated);

    writer.await.unwrap();
}

#[tokio::test]
async fn test_read_closed_stream_returns_without_hanging() {
    let (mut client, server) = tokio::io::duplex(64);
    let mut server = BufReader::new(server);

    client.write_all(b"GET / HTTP/1.0\r\n").await.unwrap();
    drop(client);

    let head = tokio::time::timeout(
        std::time::Duration::from_secs(1),
        read_request(&mut server, 256, 16),
    )
    .await
    .expect("reader hung on a closed stream")
    .unwrap();

    assert_eq!(head.len(), 1);
    assert!(head.truncated);
}
