// src/checker/http.rs
// =============================================================================
// This module fetches a single crawl target over HTTP and classifies the
// outcome.
//
// Key functionality:
// - Makes HTTP GET requests (HEAD is often refused, and we need the body)
// - Sends a browser User-Agent, since some sites block unknown clients
// - Decompresses gzip bodies itself and decodes them as lossy UTF-8
// - Turns every failure into a FetchError, never a panic
//
// The possible outcomes are a closed set:
//   Ok(FetchResult)              - 2xx response with a decoded body
//   Err(FetchError::Http)        - the server answered with an error status
//   Err(FetchError::Timeout)     - no complete answer within the timeout
//   Err(FetchError::Transport)   - connection refused/reset, DNS, bad body...
//   Err(FetchError::InvalidUrl)  - the link could not even be parsed
//   Err(FetchError::UnsupportedEncoding / Decompress)
//
// Only Http carries a real status code. Everything else is reported with
// status code 0, meaning "no HTTP status was ever obtained".
//
// Rust concepts:
// - async/await: For network I/O
// - Result<T, E>: Every outcome is a value the caller must look at
// - thiserror: Display messages for the error enum come from #[error(...)]
// =============================================================================

use crate::crawl::CrawlTarget;
use flate2::read::GzDecoder;
use hyper::ext::ReasonPhrase;
use reqwest::header::{HeaderName, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::Serialize;
use std::error::Error as StdError;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

// Firefox on Linux. Plenty of sites answer 403 to the reqwest default agent.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:72.0) Gecko/20100101 Firefox/72.0";

// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The URL that was requested
    pub url: String,
    /// The page that linked to it
    pub parent: String,
    /// The decoded body
    pub body: String,
    /// True for text/html and text/plain responses
    pub is_text_like: bool,
}

// A link that could not be fetched successfully
//
// The field names in JSON match the text report ("code", "error").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenEntry {
    /// HTTP status, or 0 when no response was obtained
    #[serde(rename = "code")]
    pub status_code: u16,
    pub url: String,
    pub parent: String,
    #[serde(rename = "error")]
    pub reason: String,
}

// Why a fetch failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status
    #[error("{reason}")]
    Http { status: u16, reason: String },

    /// The request or the body download took longer than the timeout
    #[error("timed out: {0}")]
    Timeout(String),

    /// Connection refused/reset, DNS failure, truncated body, redirect loop...
    #[error("{0}")]
    Transport(String),

    /// The link is not a valid absolute URL
    #[error("malformed URL: {0}")]
    InvalidUrl(String),

    /// Content-Encoding other than gzip
    #[error("unsupported content encoding '{0}'")]
    UnsupportedEncoding(String),

    /// Content-Encoding said gzip but the body wasn't
    #[error("failed to decompress gzip body: {0}")]
    Decompress(String),
}

impl FetchError {
    // The code that goes into the report (0 = no HTTP status)
    pub fn status_code(&self) -> u16 {
        match self {
            FetchError::Http { status, .. } => *status,
            _ => 0,
        }
    }

    // Turns the error into a report entry for the target that caused it
    pub fn into_broken(self, target: &CrawlTarget) -> BrokenEntry {
        BrokenEntry {
            status_code: self.status_code(),
            url: target.url.clone(),
            parent: target.parent.clone(),
            reason: self.to_string(),
        }
    }

    // Categorizes the different reqwest failures
    //
    // reqwest errors can happen for many reasons:
    // - Network timeout
    // - DNS resolution failure / connection refused
    // - Too many redirects
    // - The connection dropped while reading the body
    fn from_reqwest(error: reqwest::Error) -> Self {
        let details = describe(&error);

        if error.is_timeout() {
            FetchError::Timeout(details)
        } else if error.is_redirect() {
            FetchError::Transport(format!("too many redirects: {}", details))
        } else if error.is_connect() {
            FetchError::Transport(format!("connection failed: {}", details))
        } else if error.is_body() || error.is_decode() {
            FetchError::Transport(format!("failed to read body: {}", details))
        } else if error.is_builder() {
            FetchError::InvalidUrl(details)
        } else {
            FetchError::Transport(details)
        }
    }
}

// Builds the HTTP client shared by all workers
//
// The client keeps a connection pool internally, so cloning it or sharing
// one reference between tasks is cheap.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

// Fetches one crawl target
//
// Parameters:
//   client: shared reqwest client (timeout is configured on it)
//   target: the URL to fetch and the page it came from
//
// Returns: the decoded page, or the reason it could not be fetched
pub async fn fetch_page(client: &Client, target: &CrawlTarget) -> Result<FetchResult, FetchError> {
    let url = Url::parse(&target.url)
        .map_err(|e| FetchError::InvalidUrl(format!("{} ({})", target.url, e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(FetchError::from_reqwest)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http {
            status: status.as_u16(),
            reason: reason_phrase(&response),
        });
    }

    let encoding = header_value(&response, CONTENT_ENCODING);
    let content_type = header_value(&response, CONTENT_TYPE).unwrap_or_default();

    // Refuse before downloading a body we won't be able to decode
    if let Some(encoding) = encoding.as_deref() {
        if !is_supported_encoding(encoding) {
            return Err(FetchError::UnsupportedEncoding(encoding.to_string()));
        }
    }

    let bytes = response.bytes().await.map_err(FetchError::from_reqwest)?;
    let body = decode_body(&bytes, encoding.as_deref())?;

    debug!(url = %target.url, bytes = bytes.len(), content_type = %content_type, "fetched");

    Ok(FetchResult {
        url: target.url.clone(),
        parent: target.parent.clone(),
        body,
        is_text_like: is_text_like(&content_type),
    })
}

// Only these content types are mined for more links
pub fn is_text_like(content_type: &str) -> bool {
    content_type.contains("text/html") || content_type.contains("text/plain")
}

fn is_gzip(encoding: &str) -> bool {
    encoding.to_ascii_lowercase().contains("gzip")
}

fn is_supported_encoding(encoding: &str) -> bool {
    is_gzip(encoding) || encoding.trim().eq_ignore_ascii_case("identity")
}

// Turns raw body bytes into text
//
// Invalid UTF-8 is replaced with U+FFFD instead of failing: a page with one
// bad byte still has perfectly good links in it.
fn decode_body(bytes: &[u8], encoding: Option<&str>) -> Result<String, FetchError> {
    match encoding {
        None => Ok(String::from_utf8_lossy(bytes).into_owned()),
        Some(encoding) if is_gzip(encoding) => {
            let mut decoded = Vec::new();
            GzDecoder::new(bytes)
                .read_to_end(&mut decoded)
                .map_err(|e| FetchError::Decompress(e.to_string()))?;
            Ok(String::from_utf8_lossy(&decoded).into_owned())
        }
        Some(encoding) if is_supported_encoding(encoding) => {
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
        Some(encoding) => Err(FetchError::UnsupportedEncoding(encoding.to_string())),
    }
}

// The reason phrase from the status line, as the server sent it
//
// hyper only keeps the phrase when it differs from the standard one, so a
// missing extension means "use the standard phrase". Statuses without a
// standard phrase and servers that sent none end up as "Unknown".
fn reason_phrase(response: &Response) -> String {
    response
        .extensions()
        .get::<ReasonPhrase>()
        .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).trim().to_string())
        .filter(|phrase| !phrase.is_empty())
        .or_else(|| response.status().canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "Unknown".to_string())
}

fn header_value(response: &Response, name: HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

// reqwest's Display only shows the outermost layer ("error sending request"),
// the useful part (connection refused, dns error...) is in the source chain
fn describe(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = StdError::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why not let reqwest decompress gzip for us?
//    - reqwest can, with its 'gzip' feature, but then it hides the
//      Content-Encoding header
//    - We want to refuse encodings we don't understand (br, deflate...)
//      instead of handing garbage to the HTML parser
//
// 2. What is String::from_utf8_lossy?
//    - Converts bytes to text, replacing invalid sequences with '�'
//    - It returns a Cow<str>: borrowed if the bytes were already valid,
//      owned if something had to be replaced. into_owned() gives a String
//
// 3. Why does `status_code()` return 0 for most errors?
//    - Only an HTTP response carries a status code
//    - A refused connection or a timeout never got that far
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn target(url: &str) -> CrawlTarget {
        CrawlTarget::new(url, "https://example.com")
    }

    fn client() -> Client {
        build_client(Duration::from_secs(5)).unwrap()
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[tokio::test]
    async fn test_fetch_html_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .match_header("user-agent", USER_AGENT)
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<a href=\"/next\">next</a>")
            .create_async()
            .await;

        let url = format!("{}/page", server.url());
        let page = fetch_page(&client(), &target(&url)).await.unwrap();

        assert_eq!(page.url, url);
        assert_eq!(page.parent, "https://example.com");
        assert!(page.is_text_like);
        assert!(page.body.contains("/next"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let url = format!("{}/missing", server.url());
        let err = fetch_page(&client(), &target(&url)).await.unwrap_err();

        assert_eq!(
            err,
            FetchError::Http {
                status: 404,
                reason: "Not Found".to_string()
            }
        );
        let entry = err.into_broken(&target(&url));
        assert_eq!(entry.status_code, 404);
        assert_eq!(entry.reason, "Not Found");
        assert_eq!(entry.url, url);
    }

    #[tokio::test]
    async fn test_gzip_body_is_decompressed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_header("content-encoding", "gzip")
            .with_body(gzip(b"<a href=\"/zipped\">z</a>"))
            .create_async()
            .await;

        let page = fetch_page(&client(), &target(&server.url())).await.unwrap();
        assert_eq!(page.body, "<a href=\"/zipped\">z</a>");
    }

    #[tokio::test]
    async fn test_unsupported_encoding_fails_closed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_header("content-encoding", "br")
            .with_body("not really brotli")
            .create_async()
            .await;

        let err = fetch_page(&client(), &target(&server.url())).await.unwrap_err();
        assert_eq!(err, FetchError::UnsupportedEncoding("br".to_string()));
        assert_eq!(err.status_code(), 0);
    }

    #[tokio::test]
    async fn test_pdf_is_not_text_like() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/doc.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("%PDF-1.4")
            .create_async()
            .await;

        let url = format!("{}/doc.pdf", server.url());
        let page = fetch_page(&client(), &target(&url)).await.unwrap();
        assert!(!page.is_text_like);
    }

    #[tokio::test]
    async fn test_malformed_url() {
        let err = fetch_page(&client(), &target("www.example.com/no-scheme"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
        assert_eq!(err.status_code(), 0);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Grab a free port, then close it so nothing is listening
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let url = format!("http://127.0.0.1:{}/", port);
        let err = fetch_page(&client(), &target(&url)).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
        assert_eq!(err.status_code(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_distinguishable() {
        // Accepts the TCP connection (via the backlog) but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());

        let client = build_client(Duration::from_millis(200)).unwrap();
        let err = fetch_page(&client, &target(&url)).await.unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)));
        assert_eq!(err.status_code(), 0);
        assert!(err.to_string().starts_with("timed out"));
        drop(listener);
    }

    // Answers one request with a hand-written status line
    async fn raw_status_server(status_line: &'static str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let response = format!("{}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n", status_line);
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        url
    }

    #[tokio::test]
    async fn test_server_reason_phrase_is_kept() {
        let url = raw_status_server("HTTP/1.1 404 Gone Fishing").await;
        let err = fetch_page(&client(), &target(&url)).await.unwrap_err();

        assert_eq!(
            err,
            FetchError::Http {
                status: 404,
                reason: "Gone Fishing".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_nonstandard_status_reason() {
        let url = raw_status_server("HTTP/1.1 520 Web Server Returned an Unknown Error").await;
        let err = fetch_page(&client(), &target(&url)).await.unwrap_err();
        assert_eq!(err.status_code(), 520);
        assert_eq!(err.to_string(), "Web Server Returned an Unknown Error");

        let url = raw_status_server("HTTP/1.1 520 ").await;
        let err = fetch_page(&client(), &target(&url)).await.unwrap_err();
        assert_eq!(err.status_code(), 520);
        assert_eq!(err.to_string(), "Unknown");
    }

    #[test]
    fn test_decode_replaces_invalid_utf8() {
        let body = decode_body(b"ok \xff\xfe ok", None).unwrap();
        assert_eq!(body, "ok \u{FFFD}\u{FFFD} ok");
    }

    #[test]
    fn test_decode_bad_gzip() {
        let err = decode_body(b"definitely not gzip", Some("gzip")).unwrap_err();
        assert!(matches!(err, FetchError::Decompress(_)));
    }

    #[test]
    fn test_identity_encoding_is_plain() {
        assert_eq!(decode_body(b"plain", Some("identity")).unwrap(), "plain");
    }

    #[test]
    fn test_text_like_content_types() {
        assert!(is_text_like("text/html; charset=utf-8"));
        assert!(is_text_like("text/plain"));
        assert!(!is_text_like("application/pdf"));
        assert!(!is_text_like("image/png"));
        assert!(!is_text_like(""));
    }
}
