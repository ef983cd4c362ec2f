use crate::config::{ClientConfig, Role, ServerConfig};
use crate::connection::Connection;
use crate::error::Error;
use crate::request::{construct_http_request, HttpRequest};
use crate::stream::SocketFlowStream;
use crate::utils::{generate_websocket_accept_value, generate_websocket_key};
use log::{debug, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::{TlsConnector, TlsStream};

const HTTP_101_PREFIX: &str = "HTTP/1.1 101";

/// Accepts an already-upgraded-to-TLS-if-needed stream as a server,
/// performing the HTTP/1.1 handshake with `ServerConfig::default()`.
pub async fn accept(stream: SocketFlowStream) -> Result<Connection, Error> {
    accept_with_config(stream, ServerConfig::default()).await
}

/// Same as `accept`, with caller-supplied framing limits, TLS config (used
/// only by `server::start_server_with_config`, which terminates TLS before
/// calling into this module) and subprotocols this server is willing to
/// speak (echoed back if the client offered one the server listed).
pub async fn accept_with_config(mut stream: SocketFlowStream, config: ServerConfig) -> Result<Connection, Error> {
    let web_socket_config = config.web_socket_config;

    let request = match HttpRequest::parse(&mut stream, web_socket_config.handshake_timeout).await {
        Ok(request) => request,
        Err(err) => {
            write_400(&mut stream).await;
            return Err(err);
        }
    };

    match validate_and_accept(&mut stream, &request, &config.subprotocols).await {
        Ok(()) => {
            debug!("server handshake completed for {}", request.path);
            Ok(Connection::new(stream, Role::Server, web_socket_config))
        }
        Err(err) => {
            warn!("server handshake rejected: {}", err);
            write_400(&mut stream).await;
            Err(err)
        }
    }
}

async fn validate_and_accept(
    stream: &mut SocketFlowStream,
    request: &HttpRequest,
    subprotocols: &[String],
) -> Result<(), Error> {
    request.header("host").ok_or(Error::NoHostHeaderPresent)?;

    let upgrade = request.header("upgrade").ok_or(Error::NoUpgradeHeaderPresent)?;
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return Err(Error::NoUpgradeHeaderPresent);
    }

    let connection_header = request.header("connection").ok_or(Error::NoConnectionHeaderPresent)?;
    if !connection_header.to_ascii_lowercase().contains("upgrade") {
        return Err(Error::NoConnectionHeaderPresent);
    }

    let version = request.header("sec-websocket-version").ok_or(Error::UnsupportedVersion)?;
    if version != "13" {
        return Err(Error::UnsupportedVersion);
    }

    let key = request.header("sec-websocket-key").ok_or(Error::NoSecWebsocketKey)?;
    let accept_value = generate_websocket_accept_value(key.to_string());

    let offered_subprotocol = request
        .header("sec-websocket-protocol")
        .and_then(|offered| {
            offered
                .split(',')
                .map(str::trim)
                .find(|candidate| subprotocols.iter().any(|p| p == candidate))
        })
        .map(str::to_string);

    let mut response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Accept: {accept_value}\r\n",
        accept_value = accept_value,
    );
    if let Some(subprotocol) = offered_subprotocol {
        response.push_str(&format!("Sec-WebSocket-Protocol: {}\r\n", subprotocol));
    }
    response.push_str("\r\n");

    stream.write_all(response.as_bytes()).await?;
    Ok(())
}

async fn write_400(stream: &mut SocketFlowStream) {
    let _ = stream
        .write_all(b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\n\r\n")
        .await;
}

/// Connects to a `ws://`/`wss://` URL as a client, using
/// `ClientConfig::default()`.
pub async fn connect(url: &str) -> Result<Connection, Error> {
    connect_with_config(url, ClientConfig::default()).await
}

/// Same as `connect`, with caller-supplied framing limits, TLS config, and
/// offered subprotocols.
pub async fn connect_with_config(url: &str, config: ClientConfig) -> Result<Connection, Error> {
    let key = generate_websocket_key();
    let (request, host_with_port, use_tls) = construct_http_request(url, &key, &config.subprotocols)?;

    let tcp_stream = TcpStream::connect(&host_with_port).await?;

    let mut stream = if use_tls {
        let domain = host_with_port
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(&host_with_port);
        let server_name = pki_types::ServerName::try_from(domain.to_string())?;
        let connector = match &config.tls_config {
            Some(tls_config) => TlsConnector::from(tls_config.clone()),
            None => TlsConnector::from(std::sync::Arc::new(default_client_tls_config())),
        };
        let tls_stream = connector.connect(server_name, tcp_stream).await?;
        SocketFlowStream::Secure(TlsStream::from(tls_stream))
    } else {
        SocketFlowStream::Plain(tcp_stream)
    };

    stream.write_all(request.as_bytes()).await?;

    let response = read_http_response(&mut stream, config.web_socket_config.handshake_timeout).await?;
    verify_handshake_response(&response, &key)?;

    Ok(Connection::new(stream, Role::Client, config.web_socket_config))
}

fn default_client_tls_config() -> rustls::ClientConfig {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth()
}

async fn read_http_response(
    stream: &mut SocketFlowStream,
    timeout_after: tokio::time::Duration,
) -> Result<String, Error> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    let read_headers = async {
        loop {
            if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                return Ok(());
            }
            if buf.len() > 16 * 1024 {
                return Err(Error::InvalidHTTPHandshake);
            }
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(Error::InvalidHTTPHandshake);
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    };

    tokio::time::timeout(timeout_after, read_headers)
        .await
        .map_err(|_| Error::InvalidHTTPHandshake)??;

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn verify_handshake_response(response: &str, key: &str) -> Result<(), Error> {
    if !response.starts_with(HTTP_101_PREFIX) {
        return Err(Error::NoUpgrade);
    }

    let expected_accept = generate_websocket_accept_value(key.to_string());
    let accept_header = response
        .lines()
        .find_map(|line| line.strip_prefix("Sec-WebSocket-Accept:"))
        .map(str::trim);

    match accept_header {
        Some(value) if value == expected_accept => Ok(()),
        _ => Err(Error::InvalidAcceptKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_matching_accept_key() {
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        let accept = generate_websocket_accept_value(key.to_string());
        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\nSec-WebSocket-Accept: {}\r\n\r\n",
            accept
        );
        assert!(verify_handshake_response(&response, key).is_ok());
    }

    #[test]
    fn rejects_mismatched_accept_key() {
        let response = "HTTP/1.1 101 Switching Protocols\r\nSec-WebSocket-Accept: wrong\r\n\r\n";
        assert!(verify_handshake_response(response, "some-key").is_err());
    }

    #[test]
    fn rejects_non_101_status() {
        let response = "HTTP/1.1 200 OK\r\n\r\n";
        assert!(verify_handshake_response(response, "some-key").is_err());
    }
}
