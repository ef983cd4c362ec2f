use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{self, AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsStream;

#[cfg(feature = "feature-native-tls")]
use tokio_native_tls::TlsStream as NativeTlsStream;

/// Unifies a plain TCP stream and a TLS-wrapped stream behind one
/// `AsyncRead + AsyncWrite` type, so the rest of the crate never needs to
/// know which transport a given `Connection` is running over. The
/// `native-tls` variant is gated by the `feature-native-tls` Cargo feature
/// for callers who'd rather not pull in `rustls`.
pub enum SocketFlowStream {
    Plain(TcpStream),
    Secure(TlsStream<TcpStream>),
    #[cfg(feature = "feature-native-tls")]
    SecureNativeTls(NativeTlsStream<TcpStream>),
}

impl AsyncRead for SocketFlowStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SocketFlowStream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            SocketFlowStream::Secure(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(feature = "feature-native-tls")]
            SocketFlowStream::SecureNativeTls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SocketFlowStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            SocketFlowStream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            SocketFlowStream::Secure(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(feature = "feature-native-tls")]
            SocketFlowStream::SecureNativeTls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SocketFlowStream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            SocketFlowStream::Secure(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(feature = "feature-native-tls")]
            SocketFlowStream::SecureNativeTls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SocketFlowStream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            SocketFlowStream::Secure(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(feature = "feature-native-tls")]
            SocketFlowStream::SecureNativeTls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}
