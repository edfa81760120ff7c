//! Hot-swappable logger handle.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::logger::active::ActiveLogger;

/// Atomically published [`ActiveLogger`] snapshot.
///
/// Reads are lock-free loads. Writers either publish a whole snapshot or
/// derive one from the current value with read-copy-update, which retries
/// when another writer got there first.
#[derive(Debug, Default)]
pub struct LoggerHandle {
    current: ArcSwapOption<ActiveLogger>,
}

impl LoggerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, if one is published.
    #[inline]
    pub fn load(&self) -> Option<Arc<ActiveLogger>> {
        self.current.load_full()
    }

    pub fn is_published(&self) -> bool {
        self.current.load().is_some()
    }

    /// Replace whatever is published.
    pub fn publish(&self, logger: Arc<ActiveLogger>) {
        self.current.store(Some(logger));
    }

    /// Unpublish, returning the snapshot that was current.
    pub fn take(&self) -> Option<Arc<ActiveLogger>> {
        self.current.swap(None)
    }

    /// Derive and swap in a new snapshot from the current one.
    ///
    /// Returns `false` if nothing is published. Under contention `derive`
    /// may run more than once; no concurrent update is lost.
    pub fn update<F>(&self, derive: F) -> bool
    where
        F: Fn(&ActiveLogger) -> ActiveLogger,
    {
        if !self.is_published() {
            return false;
        }
        let previous = self
            .current
            .rcu(|current| current.as_ref().map(|logger| Arc::new(derive(logger))));
        previous.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::record::Record;
    use std::thread;

    #[test]
    fn test_publish_and_take() {
        let handle = LoggerHandle::new();
        assert!(handle.load().is_none());
        assert!(!handle.update(|l| l.clone()));

        handle.publish(Arc::new(ActiveLogger::new(Level::Info)));
        assert!(handle.is_published());
        assert_eq!(handle.load().unwrap().level(), Level::Info);

        let taken = handle.take().unwrap();
        assert_eq!(taken.level(), Level::Info);
        assert!(handle.load().is_none());
    }

    #[test]
    fn test_update_after_take_stays_unpublished() {
        let handle = LoggerHandle::new();
        handle.publish(Arc::new(ActiveLogger::new(Level::Debug)));
        assert!(handle.update(|l| l.with_hook(Arc::new(|_: &mut Record| {}))));
        assert_eq!(handle.load().unwrap().hook_count(), 1);

        handle.take();
        assert!(!handle.update(|l| l.with_hook(Arc::new(|_: &mut Record| {}))));
        assert!(!handle.is_published());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let handle = Arc::new(LoggerHandle::new());
        handle.publish(Arc::new(ActiveLogger::new(Level::Info)));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        assert!(handle.update(|l| {
                            l.with_hook(Arc::new(|_: &mut Record| {}))
                        }));
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        assert_eq!(handle.load().unwrap().hook_count(), 200);
    }
}
