use shared::cursor::{UrlState, UrlUpdate};
use tokio::sync::watch;
use tracing::debug;

/// Holder of the current URL state. Subscribers are woken on every effective change.
pub struct UrlStateStore {
    tx: watch::Sender<UrlState>,
}

impl UrlStateStore {
    pub fn new(initial: UrlState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> UrlState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UrlState> {
        self.tx.subscribe()
    }

    /// Applies `update`; returns whether the state changed.
    pub fn push_url(&self, update: &UrlUpdate) -> bool {
        let changed = self.tx.send_if_modified(|state| {
            let before = state.clone();
            state.apply(update);
            *state != before
        });
        if changed {
            debug!(state = ?self.tx.borrow().clone(), "url: state updated");
        }
        changed
    }

    /// Replaces the whole state, as when the location changes outside the app.
    pub fn set(&self, state: UrlState) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        })
    }
}

impl Default for UrlStateStore {
    fn default() -> Self {
        Self::new(UrlState::default())
    }
}

#[cfg(test)]
#[path = "tests/url_state_tests.rs"]
mod tests;
