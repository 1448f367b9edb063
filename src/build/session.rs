//! Session bookkeeping: one active build per app, cooperative cancellation.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// App ids with a running session.
#[derive(Debug, Default, Clone)]
pub(crate) struct SessionRegistry {
    active: Arc<Mutex<HashSet<String>>>,
}

impl SessionRegistry {
    /// Claim `app_id`; `None` while another session holds it.
    pub(crate) fn acquire(&self, app_id: &str) -> Option<SessionGuard> {
        let mut active = self.active.lock();
        if !active.insert(app_id.to_string()) {
            return None;
        }
        Some(SessionGuard {
            registry: self.clone(),
            app_id: app_id.to_string(),
        })
    }

    pub(crate) fn is_active(&self, app_id: &str) -> bool {
        self.active.lock().contains(app_id)
    }
}

/// Releases the app id on drop.
#[derive(Debug)]
pub(crate) struct SessionGuard {
    registry: SessionRegistry,
    app_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.active.lock().remove(&self.app_id);
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cancellation signal shared between a session task and its handle.
#[derive(Debug, Default, Clone)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
