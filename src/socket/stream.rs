use std::{
    sync::{Arc, Weak},
    task::Poll,
};

use futures_util::Stream;
use tokio::{sync::mpsc, task::JoinHandle};

use super::{
    store::{StateStore, SubscriberId},
    State,
};

/// Ordered stream of committed states, starting with the state current at
/// subscription time. Dropping it unsubscribes.
#[derive(Debug)]
pub struct StateStream {
    id: SubscriberId,
    rx: mpsc::UnboundedReceiver<State>,
    store: Weak<StateStore>,
}

impl StateStream {
    pub(crate) fn new(store: &Arc<StateStore>) -> Self {
        let (id, rx) = store.subscribe();
        Self {
            id,
            rx,
            store: Arc::downgrade(store),
        }
    }

    /// Wait for next state, `None` when the service is gone
    pub async fn recv(&mut self) -> Option<State> {
        self.rx.recv().await
    }
}

impl Stream for StateStream {
    type Item = State;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for StateStream {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.unsubscribe(self.id);
        }
    }
}

/// Handle of a callback registered by
/// [observe_states](super::SocketStateService::observe_states).
///
/// Delivery stops when it is dropped or [unsubscribe](Self::unsubscribe)d,
/// other subscribers are not affected.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    store: Weak<StateStore>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn spawn<F>(store: &Arc<StateStore>, mut callback: F) -> Self
    where
        F: FnMut(State) + Send + 'static,
    {
        let (id, mut rx) = store.subscribe();

        let task = tokio::spawn(async move {
            while let Some(state) = rx.recv().await {
                callback(state);
            }
            log::trace!("Observer {} channel closed, stop", id);
        });

        Self {
            id,
            store: Arc::downgrade(store),
            task,
        }
    }

    /// Stop further delivery
    pub fn unsubscribe(self) {
        drop(self)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.unsubscribe(self.id);
        }
        self.task.abort();
    }
}
