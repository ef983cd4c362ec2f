use log::*;
use socket_flow_core::{accept, SocketFlowStream};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

async fn handle_connection(peer: SocketAddr, stream: TcpStream) {
    match accept(SocketFlowStream::Plain(stream)).await {
        Ok(mut connection) => loop {
            match connection.receive_message().await {
                Ok(message) => {
                    if connection.send_message(message).await.is_err() {
                        error!("failed to echo message back to {}", peer);
                        break;
                    }
                }
                Err(err) => {
                    error!("error reading from {}: {}", peer, err);
                    break;
                }
            }
        },
        Err(err) => error!("handshake with {} failed: {}", peer, err),
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let addr = "127.0.0.1:9002";
    let listener = TcpListener::bind(&addr).await.expect("can't listen");
    info!("listening on: {}", addr);

    while let Ok((stream, peer)) = listener.accept().await {
        info!("peer address: {}", peer);
        tokio::spawn(handle_connection(peer, stream));
    }

    Ok(())
}
