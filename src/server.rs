use crate::config::ServerConfig;
use crate::event::{generate_new_uuid, Event, EventStream};
use crate::handshake::accept_with_config;
use crate::stream::SocketFlowStream;
use futures::StreamExt;
use log::{error, info};
use std::io::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::{TlsAcceptor, TlsStream};

/// A ready-to-use WebSockets server.
///
/// Spawns a background task accepting connections on `port` and returns an
/// `EventStream`, which implements `Stream`, notifying the caller about new
/// client connections, messages, disconnections and errors as they happen.
pub async fn start_server_with_config(
    port: u16,
    config: Option<ServerConfig>,
) -> Result<EventStream, Error> {
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    let (tx, rx) = mpsc::channel(1000);
    let config = config.unwrap_or_default();
    let tls_config = config.tls_config.clone();

    tokio::spawn(async move {
        loop {
            let uuid = generate_new_uuid();
            match listener.accept().await {
                Ok((stream, _)) => {
                    let socket_stream = if let Some(tls_config) = tls_config.clone() {
                        let acceptor = TlsAcceptor::from(tls_config);
                        match acceptor.accept(stream).await {
                            Ok(tls_stream) => SocketFlowStream::Secure(TlsStream::from(tls_stream)),
                            Err(err) => {
                                let _ = tx.send(Event::Error(uuid, err.into())).await;
                                continue;
                            }
                        }
                    } else {
                        SocketFlowStream::Plain(stream)
                    };

                    let connection = match accept_with_config(socket_stream, config.clone()).await {
                        Ok(conn) => conn,
                        Err(err) => {
                            error!("handshake failed for {}: {}", uuid, err);
                            let _ = tx.send(Event::Error(uuid, err)).await;
                            continue;
                        }
                    };
                    info!("new client connected: {}", uuid);

                    // split so the reader can run in its own task while the
                    // writer is handed over to the caller via the event.
                    let (mut ws_reader, ws_writer) = connection.split();

                    if tx.send(Event::NewClient(uuid, ws_writer)).await.is_err() {
                        break;
                    }

                    let tx_task = tx.clone();
                    tokio::spawn(async move {
                        while let Some(result) = ws_reader.next().await {
                            match result {
                                Ok(message) => {
                                    if tx_task.send(Event::NewMessage(uuid, message)).await.is_err() {
                                        break;
                                    }
                                }
                                Err(err) => {
                                    let _ = tx_task.send(Event::Error(uuid, err)).await;
                                    break;
                                }
                            }
                        }

                        let _ = tx_task.send(Event::Disconnect(uuid)).await;
                    });
                }
                Err(err) => {
                    let _ = tx.send(Event::Error(uuid, err.into())).await;
                    continue;
                }
            }
        }
    });

    Ok(EventStream::new(rx))
}

pub async fn start_server(port: u16) -> Result<EventStream, Error> {
    start_server_with_config(port, None).await
}
