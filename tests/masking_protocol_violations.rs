use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};
use socket_flow_core::{accept, connect, Error, SocketFlowStream};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

fn accept_value(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(GUID.as_bytes());
    BASE64_STANDARD.encode(sha1.finalize())
}

async fn read_until_double_crlf(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    loop {
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            return buf;
        }
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "peer closed before sending a complete HTTP message");
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn header_value<'a>(request: &'a str, name: &str) -> &'a str {
    request
        .lines()
        .find_map(|line| line.strip_prefix(&format!("{}: ", name)))
        .unwrap_or_else(|| panic!("missing {} header in request:\n{}", name, request))
        .trim()
}

/// A server must reject an inbound data frame that isn't masked: the check
/// happens immediately after the frame header is decoded, before the
/// (attacker-controlled-length) payload is even read.
#[tokio::test]
async fn server_rejects_unmasked_frame_from_fake_client() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut connection = accept(SocketFlowStream::Plain(stream)).await.unwrap();
        connection.receive_message().await
    });

    let mut fake_client = TcpStream::connect(addr).await.unwrap();
    let request = "GET / HTTP/1.1\r\n\
         Host: localhost\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n";
    fake_client.write_all(request.as_bytes()).await.unwrap();
    read_until_double_crlf(&mut fake_client).await;

    // fin=1, opcode=Text(0x1); mask bit clear, len=5 ("hello", unmasked)
    fake_client.write_all(&[0x81, 0x05]).await.unwrap();
    fake_client.write_all(b"hello").await.unwrap();

    let result = server.await.unwrap();
    assert!(matches!(result, Err(Error::InvalidMaskState)));
}

/// A client must reject an inbound data frame that is masked: RFC 6455
/// requires servers never mask outbound frames.
#[tokio::test]
async fn client_rejects_masked_frame_from_fake_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let fake_server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let raw = read_until_double_crlf(&mut stream).await;
        let request = String::from_utf8_lossy(&raw).into_owned();
        let key = header_value(&request, "Sec-WebSocket-Key");

        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Connection: Upgrade\r\n\
             Upgrade: websocket\r\n\
             Sec-WebSocket-Accept: {}\r\n\r\n",
            accept_value(key)
        );
        stream.write_all(response.as_bytes()).await.unwrap();

        // fin=1, opcode=Text(0x1); mask bit set, len=5, mask key, masked "hello"
        let mask_key = [0x11u8, 0x22, 0x33, 0x44];
        let mut masked = *b"hello";
        for (i, byte) in masked.iter_mut().enumerate() {
            *byte ^= mask_key[i % 4];
        }
        stream.write_all(&[0x81, 0x85]).await.unwrap();
        stream.write_all(&mask_key).await.unwrap();
        stream.write_all(&masked).await.unwrap();
    });

    let mut client = connect(&format!("ws://{}", addr)).await.unwrap();
    let result = client.receive_message().await;
    assert!(matches!(result, Err(Error::InvalidMaskState)));

    fake_server.await.unwrap();
}
