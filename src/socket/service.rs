use std::sync::Arc;

use super::{
    store::StateStore, ConnectionConf, ConnectionInfo, Event, NetworkError, State, StateStream,
    Subscription,
};
use crate::config::Config;

/// Authoritative connection state of one chat socket.
///
/// Every method translates an intent or a collaborator signal into an
/// [Event] and applies it right away: events from any number of threads are
/// evaluated one at a time in arrival order, and each resulting state change
/// is published to all observers before the next event is looked at.
///
/// The handle is cheap to clone, all clones share the same state.
#[derive(Debug, Clone)]
pub struct SocketStateService {
    store: Arc<StateStore>,
}

impl Default for SocketStateService {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketStateService {
    /// Create a service at `Disconnected.Stopped` with default config
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Create a service at `Disconnected.Stopped`
    pub fn with_config(config: &Config) -> Self {
        Self::with_state(config, State::default())
    }

    /// Create a service starting from given state
    pub fn with_state(config: &Config, initial: State) -> Self {
        log::debug!("Socket state service start at {}", initial);

        Self {
            store: Arc::new(StateStore::new(initial, config.anomaly_alarm_threshold)),
        }
    }

    /// Apply an event
    pub fn submit(&self, event: Event) {
        self.store.dispatch(event)
    }

    /// Apply an event decided from `expected`, dropped if the state moved on
    /// meanwhile. Returns whether the event was applied.
    pub fn submit_if(&self, expected: &State, event: Event) -> bool {
        self.store.dispatch_if(expected, event)
    }

    /// Require a connection initiated by the user
    pub fn request_connect(&self, conf: ConnectionConf) {
        log::debug!("Request connect, id: {}", conf.id());
        self.submit(Event::Connect {
            conf,
            is_reconnection: false,
        });
    }

    /// Require an automatic reconnection
    pub fn request_reconnect(&self, conf: ConnectionConf) {
        log::debug!("Request reconnect, id: {}", conf.id());
        self.submit(Self::reconnect_event(conf));
    }

    /// Require an automatic reconnection only while still in `expected`.
    /// Returns whether the request was applied.
    pub fn request_reconnect_from(&self, expected: &State, conf: ConnectionConf) -> bool {
        log::debug!("Request reconnect from {}, id: {}", expected, conf.id());
        self.submit_if(expected, Self::reconnect_event(conf))
    }

    fn reconnect_event(conf: ConnectionConf) -> Event {
        Event::Connect {
            conf: conf.as_reconnection(),
            is_reconnection: true,
        }
    }

    /// The user wants the connection closed
    pub fn request_disconnect(&self) {
        log::info!("Request disconnect");
        self.submit(Event::DisconnectRequested);
    }

    /// Stop the connection
    pub fn stop(&self) {
        log::info!("Request stop");
        self.submit(Event::Stop);
    }

    /// Resume a stopped connection
    pub fn resume(&self) {
        log::debug!("Request resume");
        self.submit(Event::Resume);
    }

    /// The transport finished the handshake
    pub fn notify_connection_established(&self, info: ConnectionInfo) {
        log::info!(
            "Connection established, user: {}, connection id: {}",
            info.user.id,
            info.connection_id
        );
        self.submit(Event::ConnectionEstablished(info));
    }

    /// No liveness signal arrived in time
    pub fn notify_heartbeat_lost(&self) {
        log::warn!("Heartbeat lost");
        self.submit(Event::HeartbeatLost);
    }

    /// The OS got network back
    pub fn notify_network_available(&self) {
        log::info!("Network available");
        self.submit(Event::NetworkAvailable);
    }

    /// The OS lost network
    pub fn notify_network_unavailable(&self) {
        log::warn!("Network unavailable");
        self.submit(Event::NetworkUnavailable);
    }

    /// A failure that may be retried
    pub fn notify_recoverable_error(&self, err: NetworkError) {
        log::warn!("Recoverable error: {}", err);
        self.submit(Event::RecoverableError(err));
    }

    /// A failure that must not be retried automatically
    pub fn notify_unrecoverable_error(&self, err: NetworkError) {
        log::error!("Unrecoverable error: {}", err);
        self.submit(Event::UnrecoverableError(err));
    }

    /// Report an error, routed by [NetworkError::is_recoverable]
    pub fn notify_error(&self, err: NetworkError) {
        if err.is_recoverable() {
            self.notify_recoverable_error(err)
        } else {
            self.notify_unrecoverable_error(err)
        }
    }

    /// Latest committed state
    pub fn current_state(&self) -> State {
        self.store.current()
    }

    /// Subscribe to the ordered state stream
    pub fn subscribe(&self) -> StateStream {
        StateStream::new(&self.store)
    }

    /// Call `callback` with every committed state, in order, starting with the
    /// current one. Must be called within a tokio runtime.
    pub fn observe_states<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(State) + Send + 'static,
    {
        Subscription::spawn(&self.store, callback)
    }

    /// Events evaluated so far, including unhandled ones
    pub fn events_processed(&self) -> u64 {
        self.store.events_processed()
    }

    /// Events that had no rule in the state they arrived in
    pub fn anomalies(&self) -> u64 {
        self.store.anomalies()
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread, time::Duration};

    use futures_util::StreamExt;
    use parking_lot::Mutex;

    use super::*;
    use crate::socket::{apply, Disconnected, NetworkErrorKind, User};

    fn conf() -> ConnectionConf {
        ConnectionConf::user("wss://chat.example.com", "key", User::new("alice")).unwrap()
    }

    fn info(id: &str) -> ConnectionInfo {
        ConnectionInfo {
            connection_id: id.to_string(),
            user: User::new("alice"),
        }
    }

    #[tokio::test]
    async fn test_lifecycle_sequence_is_observed_in_order() {
        let _ = pretty_env_logger::try_init();

        let service = SocketStateService::new();
        let mut states = service.subscribe();

        service.request_connect(conf());
        service.notify_connection_established(info("conn-1"));
        service.notify_network_unavailable();
        service.notify_network_available();

        let seen: Vec<State> = (&mut states).take(5).collect().await;

        assert_eq!(
            seen,
            vec![
                State::Disconnected(Disconnected::Stopped),
                State::Connecting {
                    conf: conf(),
                    is_reconnection: false,
                },
                State::Connected(info("conn-1")),
                State::Disconnected(Disconnected::NetworkUnavailable),
                State::RestartConnection,
            ]
        );
        assert_eq!(service.current_state(), State::RestartConnection);
    }

    #[test]
    fn test_reconnect_never_overrides_user_disconnect() {
        let service = SocketStateService::new();

        service.request_connect(conf());
        service.request_disconnect();
        service.request_reconnect(conf());
        assert_eq!(
            service.current_state(),
            State::Disconnected(Disconnected::ByRequest)
        );
        assert_eq!(service.anomalies(), 0);

        service.request_connect(conf());
        assert!(service.current_state().as_connecting().is_some());
    }

    #[test]
    fn test_reconnect_from_outdated_state_is_dropped() {
        let service = SocketStateService::new();

        service.resume();
        service.stop();
        assert!(!service.request_reconnect_from(&State::RestartConnection, conf()));
        assert_eq!(
            service.current_state(),
            State::Disconnected(Disconnected::Stopped)
        );
        assert_eq!(service.events_processed(), 2);

        service.resume();
        assert!(service.request_reconnect_from(&State::RestartConnection, conf()));
        assert_eq!(
            service.current_state(),
            State::Connecting {
                conf: conf().as_reconnection(),
                is_reconnection: true,
            }
        );
    }

    #[test]
    fn test_notify_error_routes_by_kind() {
        let service = SocketStateService::new();
        service.request_connect(conf());

        let temporary = NetworkError::new(NetworkErrorKind::SocketClosed, "eof");
        service.notify_error(temporary.clone());
        assert_eq!(
            service.current_state(),
            State::Disconnected(Disconnected::Temporary(temporary))
        );

        let permanent = NetworkError::new(NetworkErrorKind::InvalidToken, "bad signature");
        service.notify_error(permanent.clone());
        assert_eq!(
            service.current_state(),
            State::Disconnected(Disconnected::Permanent(permanent))
        );

        service.request_reconnect(conf());
        assert!(service.current_state().as_disconnected().is_some());
    }

    #[tokio::test]
    async fn test_reaffirmed_connection_is_not_republished() {
        let service = SocketStateService::new();
        service.request_connect(conf());
        service.notify_connection_established(info("conn-1"));

        let mut states = service.subscribe();
        service.notify_connection_established(info("conn-1"));
        service.notify_heartbeat_lost();

        assert_eq!(states.recv().await, Some(State::Connected(info("conn-1"))));
        assert_eq!(
            states.recv().await,
            Some(State::Disconnected(Disconnected::HeartbeatLost))
        );
    }

    #[tokio::test]
    async fn test_late_subscriber_starts_at_current_state() {
        let service = SocketStateService::new();
        let mut early = service.subscribe();

        service.resume();
        let mut late = service.subscribe();
        service.request_connect(conf());

        assert_eq!(early.recv().await, Some(State::default()));
        assert_eq!(early.recv().await, Some(State::RestartConnection));
        assert!(early.recv().await.unwrap().as_connecting().is_some());

        assert_eq!(late.recv().await, Some(State::RestartConnection));
        assert!(late.recv().await.unwrap().as_connecting().is_some());
    }

    #[tokio::test]
    async fn test_observer_unsubscribe_stops_only_itself() {
        let service = SocketStateService::new();

        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        let sink = first.clone();
        let first_sub = service.observe_states(move |s| sink.lock().push(s.name()));
        let sink = second.clone();
        let _second_sub = service.observe_states(move |s| sink.lock().push(s.name()));

        service.resume();
        tokio::time::sleep(Duration::from_millis(20)).await;

        first_sub.unsubscribe();
        service.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(
            *first.lock(),
            vec!["Disconnected.Stopped", "RestartConnection"]
        );
        assert_eq!(
            *second.lock(),
            vec![
                "Disconnected.Stopped",
                "RestartConnection",
                "Disconnected.Stopped"
            ]
        );
    }

    #[test]
    fn test_concurrent_producers_fold_in_some_order() {
        const PRODUCERS: usize = 8;
        const EVENTS_EACH: usize = 200;

        let service = SocketStateService::new();
        let (_, mut rx) = service.store.subscribe();

        let event_kinds = |i: usize| -> Event {
            match i % 6 {
                0 => Event::Connect {
                    conf: conf(),
                    is_reconnection: i % 4 == 0,
                },
                1 => Event::ConnectionEstablished(info("conn-1")),
                2 => Event::NetworkUnavailable,
                3 => Event::NetworkAvailable,
                4 => Event::Resume,
                _ => Event::Stop,
            }
        };

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let service = service.clone();
                thread::spawn(move || {
                    for i in 0..EVENTS_EACH {
                        service.submit(event_kinds(p + i));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            service.events_processed(),
            (PRODUCERS * EVENTS_EACH) as u64
        );

        let mut committed = Vec::new();
        while let Ok(state) = rx.try_recv() {
            committed.push(state);
        }

        assert_eq!(committed.first(), Some(&State::default()));
        assert_eq!(committed.last(), Some(&service.current_state()));

        // every published step must be one table transition away from the previous
        for pair in committed.windows(2) {
            let reachable = (0..12).any(|i| apply(&pair[0], event_kinds(i)) == pair[1]);
            assert!(reachable, "{} -> {} is not a transition", pair[0], pair[1]);
            assert_ne!(pair[0], pair[1]);
        }
    }
}
