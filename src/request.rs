use crate::error::Error;
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout, Duration};
use url::Url;

const HTTP_REQUEST_DELIMITER: &[u8] = b"\r\n\r\n";
const MAX_HEADER_BYTES: usize = 16 * 1024;

/// A parsed HTTP/1.1 upgrade request, as sent by the client during the
/// handshake. There is no body in a WebSocket upgrade request, so only the
/// request line and headers are kept.
#[derive(Debug)]
pub(crate) struct HttpRequest {
    pub path: String,
    pub headers: HashMap<String, String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Reads bytes off `reader` until the blank line terminating the
    /// headers, bounded by `timeout_after` so a peer that opens a TCP
    /// connection and never sends a handshake can't tie up the accept loop,
    /// then parses the buffered bytes with `httparse`.
    pub async fn parse<R: AsyncRead + Unpin>(
        reader: &mut R,
        timeout_after: Duration,
    ) -> Result<Self, Error> {
        let mut buf = Vec::with_capacity(1024);
        let mut chunk = [0u8; 1024];

        let read_headers = async {
            loop {
                if buf.windows(HTTP_REQUEST_DELIMITER.len()).any(|w| w == HTTP_REQUEST_DELIMITER) {
                    return Ok(());
                }
                if buf.len() > MAX_HEADER_BYTES {
                    return Err(Error::InvalidHTTPHandshake);
                }
                let n = reader.read(&mut chunk).await?;
                if n == 0 {
                    return Err(Error::InvalidHTTPHandshake);
                }
                buf.extend_from_slice(&chunk[..n]);
            }
        };

        timeout(timeout_after, read_headers)
            .await
            .map_err(|_| Error::InvalidHTTPHandshake)??;

        let mut header_storage = [httparse::EMPTY_HEADER; 32];
        let mut request = httparse::Request::new(&mut header_storage);
        let status = request.parse(&buf)?;
        if status.is_partial() {
            return Err(Error::InvalidHTTPHandshake);
        }

        let path = request.path.ok_or(Error::InvalidHTTPHandshake)?.to_string();

        let mut headers = HashMap::new();
        for header in request.headers.iter() {
            headers.insert(
                header.name.to_ascii_lowercase(),
                String::from_utf8_lossy(header.value).trim().to_string(),
            );
        }

        Ok(HttpRequest { path, headers })
    }
}

/// Parses the ws/wss URL the client is connecting to and builds the HTTP
/// GET upgrade request text, the `host:port` string needed to open the TCP
/// connection, and whether the scheme calls for TLS. `key` is the
/// already-generated `Sec-WebSocket-Key` value.
pub(crate) fn construct_http_request(
    ws_url: &str,
    key: &str,
    subprotocols: &[String],
) -> Result<(String, String, bool), Error> {
    let parsed_url = Url::parse(ws_url)?;

    let use_tls = match parsed_url.scheme() {
        "ws" => false,
        "wss" => true,
        _ => return Err(Error::InvalidSchemeURL),
    };
    let default_port = if use_tls { 443 } else { 80 };

    let host = parsed_url.host_str().ok_or(Error::URLNoHost)?;
    let port = parsed_url.port().unwrap_or(default_port);
    let host_with_port = format!("{}:{}", host, port);

    let request_path = match parsed_url.query() {
        Some(query) => format!("{}?{}", parsed_url.path(), query),
        None => parsed_url.path().to_string(),
    };

    let mut request = format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host_with_port}\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: 13\r\n",
        path = request_path,
        host_with_port = host_with_port,
        key = key,
    );

    if !subprotocols.is_empty() {
        request.push_str(&format!("Sec-WebSocket-Protocol: {}\r\n", subprotocols.join(", ")));
    }
    request.push_str("\r\n");

    Ok((request, host_with_port, use_tls))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_request_with_default_port() {
        let (request, host_with_port, use_tls) =
            construct_http_request("ws://localhost/chat", "dGhlIHNhbXBsZSBub25jZQ==", &[]).unwrap();
        assert_eq!(host_with_port, "localhost:80");
        assert!(!use_tls);
        assert!(request.starts_with("GET /chat HTTP/1.1"));
        assert!(request.contains("Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ=="));
    }

    #[test]
    fn wss_scheme_defaults_to_443_and_tls() {
        let (_, host_with_port, use_tls) =
            construct_http_request("wss://example.com", "key", &[]).unwrap();
        assert_eq!(host_with_port, "example.com:443");
        assert!(use_tls);
    }

    #[test]
    fn rejects_non_ws_scheme() {
        assert!(construct_http_request("http://localhost", "key", &[]).is_err());
    }

    #[test]
    fn includes_subprotocols_when_present() {
        let (request, _, _) = construct_http_request(
            "ws://localhost",
            "key",
            &["chat".to_string(), "superchat".to_string()],
        )
        .unwrap();
        assert!(request.contains("Sec-WebSocket-Protocol: chat, superchat"));
    }

    #[tokio::test]
    async fn parses_minimal_upgrade_request() {
        let raw = b"GET /socket HTTP/1.1\r\nHost: example.com\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\r\n";
        let mut cursor = std::io::Cursor::new(raw.to_vec());
        let request = HttpRequest::parse(&mut cursor, Duration::from_secs(1)).await.unwrap();
        assert_eq!(request.path, "/socket");
        assert_eq!(request.header("sec-websocket-key"), Some("dGhlIHNhbXBsZSBub25jZQ=="));
    }

    #[tokio::test]
    async fn times_out_on_incomplete_request() {
        let raw = b"GET /socket HTTP/1.1\r\nHost: example.com\r\n";
        let mut cursor = std::io::Cursor::new(raw.to_vec());
        let err = HttpRequest::parse(&mut cursor, Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidHTTPHandshake));
    }
}
