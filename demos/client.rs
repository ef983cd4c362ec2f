use log::*;
use rand::distr::Alphanumeric;
use rand::{thread_rng, Rng};
use socket_flow_core::{connect, Message};
use tokio::select;
use tokio::time::{interval, Duration};

async fn run(addr: &str) {
    match connect(addr).await {
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
    run("ws://127.0.0.1:9002").await;
}

fn generate_random_string() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(30).map(char::from).collect()
}
