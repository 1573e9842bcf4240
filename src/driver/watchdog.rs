use std::{sync::Arc, time::Duration};

use futures_util::{future, FutureExt};
use tokio::{sync::watch, task::JoinHandle, time::Instant};

use crate::socket::SocketStateService;

/// Feeds liveness signals to a [HeartbeatWatchdog]
#[derive(Debug, Clone)]
pub struct HeartbeatHandle {
    deadline_notifier: Arc<watch::Sender<Option<Instant>>>,
    timeout: Duration,
}

impl HeartbeatHandle {
    /// A liveness signal arrived, push the deadline forward and arm the watchdog
    pub fn ack(&self) {
        let deadline = Instant::now() + self.timeout;
        if self.deadline_notifier.send(Some(deadline)).is_err() {
            log::debug!("Heartbeat watchdog stopped, ack dropped");
        }
    }

    /// Stop watching until the next [ack](Self::ack)
    pub fn disarm(&self) {
        if self.deadline_notifier.send(None).is_err() {
            log::debug!("Heartbeat watchdog stopped, disarm dropped");
        }
    }
}

/// Raises `HeartbeatLost` when no liveness signal arrives within the timeout.
///
/// Starts disarmed. Fires at most once per arming.
#[derive(Debug)]
pub struct HeartbeatWatchdog {
    handle: HeartbeatHandle,
    task: JoinHandle<()>,
}

impl HeartbeatWatchdog {
    /// Start the watchdog background task
    pub fn spawn(service: SocketStateService, timeout: Duration) -> Self {
        let (deadline_notifier, deadline_watcher) = watch::channel(None);

        let task = tokio::spawn(Self::background(service, deadline_watcher));

        Self {
            handle: HeartbeatHandle {
                deadline_notifier: Arc::new(deadline_notifier),
                timeout,
            },
            task,
        }
    }

    /// Handle to ack or disarm this watchdog
    pub fn handle(&self) -> HeartbeatHandle {
        self.handle.clone()
    }

    async fn background(
        service: SocketStateService,
        mut deadline_watcher: watch::Receiver<Option<Instant>>,
    ) {
        log::debug!("Heartbeat watchdog start");

        let mut deadline: Option<Instant> = None;

        loop {
            let expired = if let Some(tick) = deadline {
                tokio::time::sleep_until(tick).boxed()
            } else {
                future::pending().boxed()
            };

            tokio::select! {
                biased;

                watch_result = deadline_watcher.changed() => {
                    if let Err(err) = watch_result {
                        log::debug!("Find all heartbeat handles dropped due to watcher returning error: {}", err);
                        break;
                    }

                    deadline = *deadline_watcher.borrow();

                    log::trace!("Next heartbeat deadline: {:?}", deadline);
                }

                _ = expired => {
                    log::warn!("No liveness signal before deadline");

                    log::trace!("Reset heartbeat deadline to inf");
                    deadline = None;

                    service.notify_heartbeat_lost();
                }
            }
        }
    }
}

impl Drop for HeartbeatWatchdog {
    fn drop(&mut self) {
        self.task.abort();
    }
}
