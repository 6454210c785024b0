//! Hot, replaying, conflating value streams.
//!
//! A [`Signal`] always holds a current value. New observers see it right away,
//! and a slow observer only ever sees the latest value, never a backlog. An
//! optional activity hook fires when the first observer arrives and when the
//! last one leaves, which is where native listeners get attached and detached.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::Stream;
use tokio::sync::watch;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Write side of a [`Signal`]. Cheap to clone and safe to use from vendor threads.
pub struct Publisher<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: PartialEq> Publisher<T> {
    /// Replace the current value. Returns `false` (and wakes nobody) when the
    /// value is unchanged.
    pub fn publish(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }
}

type ActivityHook<T> = Box<dyn Fn(bool, &Publisher<T>) + Send + Sync>;

struct Shared<T> {
    publisher: Publisher<T>,
    observers: Mutex<usize>,
    activity: Option<ActivityHook<T>>,
}

pub struct Signal<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Signal<T> {
    pub fn new(initial: T) -> Self {
        Self::build(initial, None)
    }

    /// A signal whose `activity` hook runs with `true` when the observer count
    /// goes from zero to one and with `false` when it drops back to zero.
    pub fn gated<F>(initial: T, activity: F) -> Self
    where
        F: Fn(bool, &Publisher<T>) + Send + Sync + 'static,
    {
        Self::build(initial, Some(Box::new(activity)))
    }

    fn build(initial: T, activity: Option<ActivityHook<T>>) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            shared: Arc::new(Shared {
                publisher: Publisher { tx: Arc::new(tx) },
                observers: Mutex::new(0),
                activity,
            }),
        }
    }

    pub fn publisher(&self) -> Publisher<T> {
        self.shared.publisher.clone()
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.shared.publisher.tx.borrow().clone()
    }

    pub fn observers(&self) -> usize {
        *lock(&self.shared.observers)
    }

    pub fn subscribe(&self) -> Observer<T> {
        let mut count = lock(&self.shared.observers);
        let rx = self.shared.publisher.tx.subscribe();
        *count += 1;
        if *count == 1 {
            if let Some(activity) = &self.shared.activity {
                activity(true, &self.shared.publisher);
            }
        }
        Observer {
            rx,
            shared: self.shared.clone(),
        }
    }
}

/// Read side of a [`Signal`]. Dropping the last observer detaches the source.
pub struct Observer<T> {
    rx: watch::Receiver<T>,
    shared: Arc<Shared<T>>,
}

impl<T: Clone> Observer<T> {
    /// Current value, marking it as seen.
    pub fn latest(&mut self) -> T {
        self.rx.borrow_and_update().clone()
    }

    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait until a value newer than the last one seen is published.
    pub async fn changed(&mut self) {
        // The sender lives in `shared`, which this observer keeps alive.
        let _ = self.rx.changed().await;
    }

    /// Wait for a value matching `predicate`, checking the current one first.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&T) -> bool) -> T {
        loop {
            let current = self.latest();
            if predicate(&current) {
                return current;
            }
            self.changed().await;
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Observer<T> {
    /// Stream of values: the current one first, then each newer one.
    pub fn into_stream(self) -> impl Stream<Item = T> {
        futures::stream::unfold((self, true), |(mut observer, first)| async move {
            if !first {
                observer.changed().await;
            }
            let value = observer.latest();
            Some((value, (observer, false)))
        })
    }
}

impl<T> Drop for Observer<T> {
    fn drop(&mut self) {
        let mut count = lock(&self.shared.observers);
        *count = count.saturating_sub(1);
        if *count == 0 {
            if let Some(activity) = &self.shared.activity {
                activity(false, &self.shared.publisher);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_late_subscriber_sees_current_value() {
        let signal = Signal::new(1);
        signal.publisher().publish(5);
        let mut observer = signal.subscribe();
        assert_eq!(observer.latest(), 5);
    }

    #[test]
    fn test_publish_skips_unchanged_values() {
        let signal = Signal::new("idle");
        let observer = signal.subscribe();
        assert!(!signal.publisher().publish("idle"));
        assert!(!observer.has_changed());
        assert!(signal.publisher().publish("busy"));
        assert!(observer.has_changed());
    }

    #[tokio::test]
    async fn test_slow_observer_only_sees_latest() {
        let signal = Signal::new(0u64);
        let mut observer = signal.subscribe();
        let publisher = signal.publisher();
        publisher.publish(1);
        publisher.publish(2);
        publisher.publish(3);
        observer.changed().await;
        assert_eq!(observer.latest(), 3);
        assert!(!observer.has_changed());
    }

    #[test]
    fn test_activity_hook_follows_observer_count() {
        let attached = Arc::new(AtomicUsize::new(0));
        let detached = Arc::new(AtomicUsize::new(0));
        let (a, d) = (attached.clone(), detached.clone());
        let signal = Signal::gated(0, move |active, _| {
            if active {
                a.fetch_add(1, Ordering::SeqCst);
            } else {
                d.fetch_add(1, Ordering::SeqCst);
            }
        });

        let first = signal.subscribe();
        let second = signal.subscribe();
        assert_eq!(attached.load(Ordering::SeqCst), 1);
        assert_eq!(signal.observers(), 2);

        drop(first);
        assert_eq!(detached.load(Ordering::SeqCst), 0);
        drop(second);
        assert_eq!(detached.load(Ordering::SeqCst), 1);

        let _third = signal.subscribe();
        assert_eq!(attached.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_activity_hook_can_publish() {
        let signal = Signal::gated(None, |active, publisher: &Publisher<Option<u8>>| {
            if active {
                publisher.publish(Some(7));
            }
        });
        let mut observer = signal.subscribe();
        assert!(observer.has_changed());
        assert_eq!(observer.latest(), Some(7));
    }

    #[tokio::test]
    async fn test_stream_starts_with_current_value() {
        use futures::StreamExt;

        let signal = Signal::new(10);
        let mut stream = Box::pin(signal.subscribe().into_stream());
        assert_eq!(stream.next().await, Some(10));
        signal.publisher().publish(11);
        assert_eq!(stream.next().await, Some(11));
    }
}
