/// HTTP request methods.
///
/// The server answers every request with the same page, so the method is only
/// recorded for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    OPTIONS,
    PATCH,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// Case-sensitive, as on the wire.
    ///
    /// # Example
    ///
    /// ```
    /// # use pinpage::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }
}

/// The first line of a request, when it has the usual three-part shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub path: String,
    pub version: String,
}

impl RequestLine {
    /// Parses `METHOD PATH VERSION`. Anything else yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();

        let method = Method::from_str(parts.next()?)?;
        let path = parts.next()?;
        let version = parts.next()?;

        if parts.next().is_some() || !version.starts_with("HTTP/") {
            return None;
        }

        Some(Self {
            method,
            path: path.to_string(),
            version: version.to_string(),
        })
    }
}

/// Request line plus header lines, up to but excluding the blank terminator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHead {
    /// Raw lines with their line terminators stripped
    pub lines: Vec<String>,
    /// Set when the peer closed the stream before sending the blank line
    pub truncated: bool,
}

impl RequestHead {
    /// Defensively parsed first line.
    pub fn request_line(&self) -> Option<RequestLine> {
        self.lines.first().and_then(|l| RequestLine::parse(l))
    }

    /// Looks up a header value by name, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .skip(1)
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
            .map(|(_, v)| v.trim())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
