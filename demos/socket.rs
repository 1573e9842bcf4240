use std::{
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use sockstate::{
    driver::Transport,
    socket::{ConnectionConf, ConnectionInfo, NetworkError, NetworkErrorKind, User},
    Client, Config,
};

/// Fails the first two attempts, then connects
#[derive(Debug, Default)]
struct FlakyTransport {
    attempts: AtomicU32,
}

#[async_trait::async_trait]
impl Transport for FlakyTransport {
    async fn open(&self, conf: &ConnectionConf) -> Result<ConnectionInfo, NetworkError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(100)).await;

        log::info!("Open {} attempt {}", conf.connect_url(Some("demo-token")), attempt);

        if attempt <= 2 {
            return Err(NetworkError::new(
                NetworkErrorKind::SocketFailure,
                "connection reset by peer",
            ));
        }

        Ok(ConnectionInfo {
            connection_id: format!("demo-{}", attempt),
            user: User::new(conf.id()),
        })
    }

    async fn close(&self) {
        log::info!("Close transport");
    }
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let config = Config {
        heartbeat_timeout: Duration::from_secs(3),
        ..Config::default()
    };

    let client = Client::new(FlakyTransport::default(), config).unwrap();

    let _subscription = client
        .service()
        .observe_states(|state| println!("state: {}", state));

    client
        .connect_user("ws://127.0.0.1:7777", "demo-key", User::new("demo"))
        .unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;

    client.service().notify_network_unavailable();
    tokio::time::sleep(Duration::from_millis(500)).await;
    client.service().notify_network_available();

    // no heartbeat acks, the watchdog reconnects after 3s
    tokio::time::sleep(Duration::from_secs(5)).await;

    client.disconnect();
    client.shutdown().await;
}
