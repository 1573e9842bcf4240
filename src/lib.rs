//! # Sockstate
//!
//! Connection lifecycle state machine for reconnecting chat sockets.
//!
//! [socket::SocketStateService] owns the authoritative connection state and
//! serializes every input into it, [driver::Driver] turns committed states
//! into transport side effects, and [Client] wires both together.

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(missing_debug_implementations, missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod driver;
pub mod socket;

mod error;
pub use config::Config;
pub use error::{Error, Result};

use std::sync::Arc;

use snafu::prelude::*;

use driver::{Driver, DriverHandle, HeartbeatHandle, HeartbeatWatchdog, Transport};
use socket::{ConnectionConf, SocketStateService, State, User};

/// Socket client: a state service, its driver and heartbeat watchdog
#[derive(Debug)]
pub struct Client {
    service: SocketStateService,
    watchdog: HeartbeatWatchdog,
    driver: DriverHandle,
}

impl Client {
    /// Validate config and start driving `transport`, must be called within a tokio runtime
    pub fn new<T>(transport: T, config: Config) -> Result<Self>
    where
        T: Transport + 'static,
    {
        config.validate().context(error::InvalidConfig)?;

        let service = SocketStateService::with_config(&config);
        let watchdog = HeartbeatWatchdog::spawn(service.clone(), config.heartbeat_timeout);
        let driver = Driver::new(
            service.clone(),
            Arc::new(transport),
            watchdog.handle(),
            &config,
        )
        .spawn();

        log::info!("Create socket state service and driver success");

        Ok(Self {
            service,
            watchdog,
            driver,
        })
    }

    /// The state service, clone it to hand it to the transport or network monitor
    pub fn service(&self) -> &SocketStateService {
        &self.service
    }

    /// Handle the transport acks liveness signals on
    pub fn heartbeat(&self) -> HeartbeatHandle {
        self.watchdog.handle()
    }

    /// Latest committed state
    pub fn state(&self) -> State {
        self.service.current_state()
    }

    /// Connect with given configuration
    pub fn connect(&self, conf: ConnectionConf) {
        self.service.request_connect(conf)
    }

    /// Connect as `user`
    pub fn connect_user(&self, endpoint: &str, api_key: &str, user: User) -> Result<()> {
        let id = user.id.clone();
        let conf = ConnectionConf::user(endpoint, api_key, user)
            .context(error::InvalidConnectionConf { id })?;

        self.connect(conf);

        Ok(())
    }

    /// Disconnect on user request, automatic reconnection is suppressed until
    /// the next [connect](Self::connect)
    pub fn disconnect(&self) {
        self.service.request_disconnect()
    }

    /// Stop the connection and the driver
    pub async fn shutdown(self) {
        let Self {
            service,
            watchdog,
            driver,
        } = self;

        service.stop();
        driver.shutdown().await;
        drop(watchdog);

        log::info!("Socket client shutdown");
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::socket::{ConnectionInfo, Disconnected, NetworkError};

    #[derive(Debug)]
    struct EchoTransport;

    #[async_trait::async_trait]
    impl Transport for EchoTransport {
        async fn open(&self, conf: &ConnectionConf) -> std::result::Result<ConnectionInfo, NetworkError> {
            Ok(ConnectionInfo {
                connection_id: format!("{}-conn", conf.id()),
                user: User::new(conf.id()),
            })
        }

        async fn close(&self) {}
    }

    #[tokio::test]
    async fn test_client_rejects_invalid_config() {
        let config = Config {
            heartbeat_timeout: Duration::ZERO,
            ..Config::default()
        };

        let err = Client::new(EchoTransport, config).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_connect_and_disconnect() {
        let client = Client::new(EchoTransport, Config::default()).unwrap();

        let err = client
            .connect_user("http://chat.example.com", "key", User::new("alice"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid connection config for alice: the url http://chat.example.com has invalid schema http, only ws or wss is ok"
        );

        client
            .connect_user("wss://chat.example.com", "key", User::new("alice"))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(client.state().connection_id(), Some("alice-conn"));

        client.disconnect();
        assert_eq!(client.state(), State::Disconnected(Disconnected::ByRequest));

        client.shutdown().await;
    }
}
