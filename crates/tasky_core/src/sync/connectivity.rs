//! Connectivity signal consumed by the sync processor and scheduler.

use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Readable online/offline state.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Returns `false` once it has nobody left to notify.
type OnlineListener = Box<dyn Fn() -> bool + Send + Sync>;

/// Connectivity state fed by the host platform.
///
/// Listeners registered with [`NetworkMonitor::on_online`] fire once per
/// offline-to-online transition, on the thread that reported it. A listener
/// that returns `false` is removed after that call.
pub struct NetworkMonitor {
    online: AtomicBool,
    listeners: Mutex<Vec<OnlineListener>>,
}

impl NetworkMonitor {
    pub fn new(initially_online: bool) -> Self {
        Self {
            online: AtomicBool::new(initially_online),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Records the current state; notifies listeners on offline -> online.
    pub fn set_online(&self, online: bool) {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if was_online == online {
            return;
        }
        info!(
            "event=connectivity_change module=sync status=ok online={}",
            online
        );
        if online {
            let mut listeners = self
                .listeners
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            listeners.retain(|listener| listener());
        }
    }

    pub fn on_online(&self, listener: impl Fn() -> bool + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Box::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for NetworkMonitor {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::{Connectivity, NetworkMonitor};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn listeners_fire_only_on_offline_to_online() {
        let monitor = NetworkMonitor::new(true);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        monitor.on_online(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        monitor.set_online(true);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        monitor.set_online(false);
        assert!(!monitor.is_online());
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        monitor.set_online(true);
        monitor.set_online(true);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.listener_count(), 1);
    }

    #[test]
    fn finished_listeners_are_dropped_after_their_last_call() {
        let monitor = NetworkMonitor::new(false);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        monitor.on_online(move || counter.fetch_add(1, Ordering::SeqCst) == 0);
        monitor.on_online(|| true);

        monitor.set_online(true);
        assert_eq!(monitor.listener_count(), 2);

        monitor.set_online(false);
        monitor.set_online(true);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(monitor.listener_count(), 1);

        monitor.set_online(false);
        monitor.set_online(true);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
