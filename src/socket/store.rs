use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{
    transition::{transition, Transition},
    Event, State,
};

pub(crate) type SubscriberId = u64;

#[derive(Debug)]
struct Inner {
    state: State,
    subscribers: Vec<(SubscriberId, mpsc::UnboundedSender<State>)>,
    next_id: SubscriberId,
    events_processed: u64,
    anomalies: u64,
    anomaly_streak: u32,
    alarms: u64,
}

impl Inner {
    fn publish(&mut self) {
        let state = &self.state;
        self.subscribers
            .retain(|(id, tx)| Self::send(*id, tx, state.clone()));
    }

    fn send(id: SubscriberId, tx: &mpsc::UnboundedSender<State>, state: State) -> bool {
        if tx.send(state).is_ok() {
            true
        } else {
            log::debug!("Subscriber {} receive side dropped, remove it", id);
            false
        }
    }
}

/// Owner of the current state. Events are evaluated, committed and published
/// to subscribers while holding one lock, so they never interleave.
#[derive(Debug)]
pub(crate) struct StateStore {
    inner: Mutex<Inner>,
    alarm_threshold: u32,
}

impl StateStore {
    pub fn new(initial: State, alarm_threshold: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: initial,
                subscribers: Vec::new(),
                next_id: 0,
                events_processed: 0,
                anomalies: 0,
                anomaly_streak: 0,
                alarms: 0,
            }),
            alarm_threshold,
        }
    }

    pub fn current(&self) -> State {
        self.inner.lock().state.clone()
    }

    pub fn events_processed(&self) -> u64 {
        self.inner.lock().events_processed
    }

    pub fn anomalies(&self) -> u64 {
        self.inner.lock().anomalies
    }

    pub fn dispatch(&self, event: Event) {
        let mut inner = self.inner.lock();
        self.evaluate(&mut inner, event);
    }

    /// Apply `event` only if the current state is still `expected`, check and
    /// apply happen under the same lock
    pub fn dispatch_if(&self, expected: &State, event: Event) -> bool {
        let mut inner = self.inner.lock();

        if inner.state != *expected {
            log::debug!(
                "Drop event {} meant for state {}, now in {}",
                event.name(),
                expected,
                inner.state
            );
            return false;
        }

        self.evaluate(&mut inner, event);

        true
    }

    fn evaluate(&self, inner: &mut Inner, event: Event) {
        inner.events_processed += 1;

        let name = event.name();

        match transition(&inner.state, event) {
            Transition::Moved(next) => {
                inner.anomaly_streak = 0;

                if next == inner.state {
                    log::trace!("Event {} keeps state {}", name, inner.state);
                    return;
                }

                log::debug!("Move from {} to {} on {}", inner.state, next, name);

                inner.state = next;
                inner.publish();
            }
            Transition::Ignored => {
                inner.anomaly_streak = 0;
                log::debug!("Event {} ignored in state {}", name, inner.state);
            }
            Transition::Unhandled => {
                inner.anomalies += 1;
                inner.anomaly_streak += 1;

                log::warn!(
                    "Cannot handle event {} while being in inappropriate state {}",
                    name,
                    inner.state
                );

                if self.alarm_threshold > 0 && inner.anomaly_streak == self.alarm_threshold {
                    inner.alarms += 1;
                    log::error!(
                        "{} unhandled events in a row, last one {} in state {}",
                        inner.anomaly_streak,
                        name,
                        inner.state
                    );
                }
            }
        }
    }

    /// Register a subscriber, its channel starts with the current state
    pub fn subscribe(&self) -> (SubscriberId, mpsc::UnboundedReceiver<State>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut inner = self.inner.lock();

        let id = inner.next_id;
        inner.next_id += 1;

        if Inner::send(id, &tx, inner.state.clone()) {
            inner.subscribers.push((id, tx));
        }

        log::trace!("Subscriber {} registered at state {}", id, inner.state);

        (id, rx)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|(sid, _)| *sid != id);

        log::trace!("Subscriber {} removed", id);
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    #[cfg(test)]
    pub fn anomaly_streak(&self) -> u32 {
        self.inner.lock().anomaly_streak
    }

    #[cfg(test)]
    pub fn alarms(&self) -> u64 {
        self.inner.lock().alarms
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::socket::{ConnectionConf, Disconnected, User};

    #[test]
    fn test_unhandled_events_are_counted() {
        let store = StateStore::new(State::default(), 2);

        store.dispatch(Event::HeartbeatLost);
        store.dispatch(Event::NetworkAvailable);
        store.dispatch(Event::Stop);

        assert_eq!(store.anomalies(), 3);
        assert_eq!(store.events_processed(), 3);
        assert_eq!(store.current(), State::Disconnected(Disconnected::Stopped));
    }

    #[test]
    fn test_alarm_fires_once_per_streak() {
        let store = StateStore::new(State::default(), 3);

        for _ in 0..5 {
            store.dispatch(Event::NetworkAvailable);
        }
        assert_eq!(store.anomaly_streak(), 5);
        assert_eq!(store.alarms(), 1);

        // handled, streak starts over
        store.dispatch(Event::Resume);
        assert_eq!(store.anomaly_streak(), 0);

        store.dispatch(Event::NetworkAvailable);
        store.dispatch(Event::NetworkAvailable);
        assert_eq!(store.alarms(), 1);
        store.dispatch(Event::NetworkAvailable);
        assert_eq!(store.alarms(), 2);
        assert_eq!(store.anomalies(), 8);
    }

    #[test]
    fn test_ignored_event_resets_streak() {
        let store = StateStore::new(State::Disconnected(Disconnected::ByRequest), 3);
        let conf = ConnectionConf::user("wss://chat.example.com", "key", User::new("alice")).unwrap();

        store.dispatch(Event::HeartbeatLost);
        store.dispatch(Event::HeartbeatLost);
        assert_eq!(store.anomaly_streak(), 2);

        store.dispatch(Event::Connect {
            conf: conf.as_reconnection(),
            is_reconnection: true,
        });
        assert_eq!(store.anomaly_streak(), 0);
        assert_eq!(store.anomalies(), 2);

        store.dispatch(Event::HeartbeatLost);
        store.dispatch(Event::HeartbeatLost);
        assert_eq!(store.alarms(), 0);
        assert_eq!(store.current(), State::Disconnected(Disconnected::ByRequest));
    }

    #[test]
    fn test_zero_threshold_disables_alarm() {
        let store = StateStore::new(State::default(), 0);

        for _ in 0..20 {
            store.dispatch(Event::HeartbeatLost);
        }

        assert_eq!(store.anomaly_streak(), 20);
        assert_eq!(store.anomalies(), 20);
        assert_eq!(store.alarms(), 0);
    }

    #[test]
    fn test_dispatch_if_checks_state_first() {
        let store = StateStore::new(State::default(), 0);
        let (_, mut rx) = store.subscribe();
        assert_eq!(rx.try_recv().unwrap(), State::default());

        assert!(!store.dispatch_if(&State::RestartConnection, Event::Stop));
        assert_eq!(store.events_processed(), 0);

        assert!(store.dispatch_if(&State::default(), Event::Resume));
        assert_eq!(store.current(), State::RestartConnection);
        assert_eq!(rx.try_recv().unwrap(), State::RestartConnection);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_subscriber_gets_current_then_changes() {
        let store = StateStore::new(State::default(), 0);
        let (_, mut rx) = store.subscribe();

        store.dispatch(Event::Resume);
        store.dispatch(Event::Resume);
        store.dispatch(Event::Stop);

        assert_eq!(rx.try_recv().unwrap(), State::default());
        assert_eq!(rx.try_recv().unwrap(), State::RestartConnection);
        assert_eq!(rx.try_recv().unwrap(), State::default());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let store = StateStore::new(State::default(), 0);
        let (_, rx) = store.subscribe();
        let (id, _rx) = store.subscribe();
        assert_eq!(store.subscriber_count(), 2);

        drop(rx);
        store.dispatch(Event::Resume);
        assert_eq!(store.subscriber_count(), 1);

        store.unsubscribe(id);
        assert_eq!(store.subscriber_count(), 0);
    }
}
