//! A simple async WebSockets implementation for the Tokio stack.
//!
//! Implements [RFC 6455](https://datatracker.ietf.org/doc/html/rfc6455) frame
//! parsing/serialization, message reassembly, and the HTTP/1.1 upgrade
//! handshake for both server and client roles, on top of a plain or
//! TLS-wrapped `tokio::net::TcpStream`.
//!
//! The typical entry points are [`handshake::accept`]/[`handshake::connect`]
//! for a single connection, or [`server::start_server`] for a ready-to-run
//! server that hands back a stream of [`event::Event`]s.

mod config;
mod connection;
mod error;
mod event;
mod frame;
mod handshake;
mod mask;
mod message;
mod read;
mod request;
mod server;
mod split;
mod stream;
mod utils;
mod write;

pub use config::{ClientConfig, Role, ServerConfig, WebSocketConfig};
pub use connection::Connection;
pub use error::Error;
pub use event::{generate_new_uuid, Event, EventStream, ID};
pub use handshake::{accept, accept_with_config, connect, connect_with_config};
pub use message::Message;
pub use server::{start_server, start_server_with_config};
pub use split::{WSReader, WSWriter};
pub use stream::SocketFlowStream;
