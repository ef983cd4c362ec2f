use log::*;
use rand::distr::Alphanumeric;
use rand::{thread_rng, Rng};
use rustls_pemfile::certs;
use socket_flow_core::{connect_with_config, ClientConfig, Message};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tokio::select;
use tokio::time::{interval, Duration};

fn client_config_with_ca(ca_path: &str) -> ClientConfig {
    let mut roots = rustls::RootCertStore::empty();
    for cert in certs(&mut BufReader::new(File::open(ca_path).expect("can't open CA file"))) {
        roots.add(cert.expect("invalid certificate in CA file")).expect("can't add root cert");
    }

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut config = ClientConfig::default();
    config.tls_config = Some(Arc::new(tls_config));
    config
}

async fn run(addr: &str) {
    let client_config = client_config_with_ca("ca.crt");

    match connect_with_config(addr, client_config).await {
        Ok(mut connection) => {
            let mut ticker = interval(Duration::from_secs(5));
            let mut received = 0;

            loop {
                select! {
                    result = connection.receive_message() => {
                        match result {
                            Ok(message) => {
                                info!("received message: {:?}", message);
                                received += 1;
                                if received >= 3 {
                                    if connection.close(1000, "done").await.is_err() {
                                        error!("error occurred when closing connection");
                                    }
                                    break;
                                }
                            }
                            Err(err) => {
                                error!("received error from the stream: {}", err);
                                break;
                            }
                        }
                    }
                    _ = ticker.tick() => {
                        let data = Message::Text(generate_random_string());
                        if connection.send_message(data).await.is_err() {
                            error!("failed to send message");
                            break;
                        }
                    }
                }
            }
        }
        Err(err) => error!("error when performing handshake: {}", err),
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    run("wss://localhost:9002").await;
}

fn generate_random_string() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(30).map(char::from).collect()
}
