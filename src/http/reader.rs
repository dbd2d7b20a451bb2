use crate::http::request::RequestHead;
use std::fmt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Failure to read a request head.
#[derive(Debug)]
pub enum RequestError {
    /// The head broke a size limit; the peer gets a 400
    Malformed(&'static str),
    /// The connection failed or timed out
    Io(std::io::Error),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Malformed(reason) => write!(f, "malformed request: {}", reason),
            RequestError::Io(e) => write!(f, "I/O error while reading request: {}", e),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::Io(e) => Some(e),
            RequestError::Malformed(_) => None,
        }
    }
}

impl From<std::io::Error> for RequestError {
    fn from(e: std::io::Error) -> Self {
        RequestError::Io(e)
    }
}

/// Reads one request head, line by line, up to the blank line.
///
/// At most `max_line_bytes + 2` bytes of a single line are ever buffered, so a
/// peer that never sends a newline cannot grow memory. A stream that ends
/// before the blank line returns what was read so far, with
/// [`RequestHead::truncated`] set.
pub async fn read_request<R>(
    reader: &mut R,
    max_line_bytes: usize,
    max_lines: usize,
) -> Result<RequestHead, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = RequestHead::default();
    let mut line = Vec::with_capacity(max_line_bytes.min(1024) + 2);

    loop {
        line.clear();

        // Room for the content plus CRLF; one more byte means the line is too long.
        let limit = max_line_bytes.saturating_add(2) as u64;
        let n = (&mut *reader).take(limit).read_until(b'\n', &mut line).await?;

        if n == 0 {
            head.truncated = true;
            return Ok(head);
        }

        let terminated = line.last() == Some(&b'\n');
        let content = strip_terminator(&line);

        if content.len() > max_line_bytes || (!terminated && n as u64 == limit) {
            return Err(RequestError::Malformed("request line too long"));
        }

        if terminated && content.is_empty() {
            return Ok(head);
        }

        head.lines.push(String::from_utf8_lossy(content).into_owned());

        if head.lines.len() > max_lines {
            return Err(RequestError::Malformed("too many header lines"));
        }

        if !terminated {
            // Stream ended mid-line
            head.truncated = true;
            return Ok(head);
        }
    }
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
