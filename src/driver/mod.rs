//! Drives a transport from the committed state stream

mod backoff;
mod directive;
mod watchdog;

pub use backoff::Backoff;
pub use directive::{plan, Directive};
pub use watchdog::{HeartbeatHandle, HeartbeatWatchdog};

use std::sync::Arc;

use tokio::{sync::oneshot, task::JoinHandle};

use crate::{
    config::Config,
    socket::{
        ConnectionConf, ConnectionInfo, Event, NetworkError, SocketStateService, State, StateStream,
    },
};

/// The physical connection, implemented outside this crate.
///
/// Failures of a live connection and liveness signals are reported by the
/// implementation itself through a [SocketStateService] clone and a
/// [HeartbeatHandle].
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection and wait for the server's connected event
    async fn open(&self, conf: &ConnectionConf) -> Result<ConnectionInfo, NetworkError>;
    /// Close the connection if any, must be safe to call when nothing is open
    async fn close(&self);
}

/// Executes the [Directive] of every committed state against a [Transport].
///
/// States may be replaced before the driver gets to them, so every event it
/// feeds back is applied only if the state it was decided from is still the
/// current one.
#[derive(Debug)]
pub struct Driver<T> {
    service: SocketStateService,
    transport: Arc<T>,
    heartbeat: HeartbeatHandle,
    backoff: Backoff,
    conf: Option<ConnectionConf>,
    attempt: Option<JoinHandle<()>>,
    retry: Option<JoinHandle<()>>,
}

impl<T> Driver<T>
where
    T: Transport + 'static,
{
    /// Create a driver for `service`
    pub fn new(
        service: SocketStateService,
        transport: Arc<T>,
        heartbeat: HeartbeatHandle,
        config: &Config,
    ) -> Self {
        Self {
            service,
            transport,
            heartbeat,
            backoff: Backoff::new(config.reconnect_delay_start, config.reconnect_delay_max),
            conf: None,
            attempt: None,
            retry: None,
        }
    }

    /// Start the driver in background, it reacts to every state committed
    /// from now on, beginning with the current one
    pub fn spawn(self) -> DriverHandle {
        let states = self.service.subscribe();
        let (shutdown_notifier, shutdown_watcher) = oneshot::channel();

        let task = tokio::spawn(self.run(states, shutdown_watcher));

        DriverHandle {
            shutdown_notifier: Some(shutdown_notifier),
            task: Some(task),
        }
    }

    async fn run(mut self, mut states: StateStream, mut shutdown_watcher: oneshot::Receiver<()>) {
        log::debug!("Driver start");

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown_watcher => {
                    log::debug!("Driver shutdown requested");
                    self.cancel_pending();
                    self.heartbeat.disarm();
                    self.transport.close().await;
                    break;
                }

                state = states.recv() => {
                    match state {
                        Some(state) => self.react(&state).await,
                        None => {
                            log::debug!("State stream closed, stop");
                            break;
                        }
                    }
                }
            }
        }

        log::debug!("Driver stopped");
    }

    async fn react(&mut self, state: &State) {
        let directive = plan(state);

        log::debug!("State {} needs {}", state, directive.name());

        match directive {
            Directive::Open {
                conf,
                is_reconnection,
            } => {
                self.cancel_pending();
                self.conf.replace(conf.clone());
                self.open(state, conf, is_reconnection);
            }
            Directive::Arm => {
                log::trace!("Reset reconnect backoff and arm heartbeat watchdog");
                self.backoff.reset();
                self.heartbeat.ack();
            }
            Directive::Reconnect => self.reconnect(state),
            Directive::CloseAndReconnect => {
                self.cancel_pending();
                self.heartbeat.disarm();
                self.transport.close().await;
                self.reconnect(state);
            }
            Directive::ScheduleReconnect => {
                self.heartbeat.disarm();
                self.schedule_reconnect(state);
            }
            Directive::Close => {
                self.cancel_pending();
                self.heartbeat.disarm();
                self.transport.close().await;
            }
        }
    }

    fn open(&mut self, from: &State, conf: ConnectionConf, is_reconnection: bool) {
        log::debug!(
            "Open transport for {}, reconnection: {}",
            conf.id(),
            is_reconnection
        );

        let service = self.service.clone();
        let transport = self.transport.clone();
        let from = from.clone();

        let attempt = tokio::spawn(async move {
            let event = match transport.open(&conf).await {
                Ok(info) => {
                    log::info!(
                        "Transport opened, user: {}, connection id: {}",
                        info.user.id,
                        info.connection_id
                    );
                    Event::ConnectionEstablished(info)
                }
                Err(err) if err.is_recoverable() => {
                    log::warn!("Open transport failed: {}", err);
                    Event::RecoverableError(err)
                }
                Err(err) => {
                    log::error!("Open transport failed permanently: {}", err);
                    Event::UnrecoverableError(err)
                }
            };

            if !service.submit_if(&from, event) {
                log::debug!("Connection attempt outdated, result dropped");
            }
        });

        self.attempt.replace(attempt);
    }

    fn reconnect(&self, from: &State) {
        match self.conf {
            Some(ref conf) => {
                if !self.service.request_reconnect_from(from, conf.clone()) {
                    log::debug!("State moved on from {}, skip reconnect", from);
                }
            }
            None => log::warn!("No connection config known, can not reconnect"),
        }
    }

    fn schedule_reconnect(&mut self, from: &State) {
        self.cancel_retry();

        let conf = match self.conf {
            Some(ref conf) => conf.clone(),
            None => {
                log::warn!("No connection config known, can not schedule reconnect");
                return;
            }
        };

        let delay = self.backoff.next_delay();
        log::info!("Reconnect in {:?}", delay);

        let service = self.service.clone();
        let from = from.clone();
        let retry = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !service.request_reconnect_from(&from, conf) {
                log::debug!("State moved on from {}, skip scheduled reconnect", from);
            }
        });

        self.retry.replace(retry);
    }

    fn cancel_retry(&mut self) {
        if let Some(retry) = self.retry.take() {
            log::trace!("Cancel scheduled reconnect");
            retry.abort();
        }
    }

    fn cancel_pending(&mut self) {
        self.cancel_retry();
        if let Some(attempt) = self.attempt.take() {
            log::trace!("Cancel in flight connection attempt");
            attempt.abort();
        }
    }
}

/// Handle of a spawned [Driver], aborts it when dropped
#[derive(Debug)]
pub struct DriverHandle {
    shutdown_notifier: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl DriverHandle {
    /// Cancel pending work, close the transport and wait for the driver to stop
    pub async fn shutdown(mut self) {
        drop(self.shutdown_notifier.take());

        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                log::warn!("Driver task failed: {}", err);
            }
        }
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
