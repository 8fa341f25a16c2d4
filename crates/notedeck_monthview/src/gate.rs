//! Change gating for pipeline stages.
//!
//! [`Memo`] skips recomputing a stage whose inputs did not change, and
//! [`Published`] only notifies subscribers when a stage's output actually
//! differs from what they last saw.

use tokio::sync::watch;

/// Caches the output of a stage keyed on its inputs.
#[derive(Debug)]
pub struct Memo<K, V> {
    entry: Option<(K, V)>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<K: PartialEq, V> Memo<K, V> {
    /// Returns the cached value for `key`, computing it first if the key
    /// differs from the last one. The flag is true when `compute` ran.
    pub fn get_or_compute(&mut self, key: K, compute: impl FnOnce(&K) -> V) -> (&V, bool) {
        let (entry, ran) = match self.entry.take() {
            Some((cached, value)) if cached == key => ((cached, value), false),
            _ => {
                let value = compute(&key);
                ((key, value), true)
            }
        };

        let (_, value) = self.entry.insert(entry);
        (&*value, ran)
    }
}

/// An output stream that replays its latest value to new subscribers and
/// only publishes values that differ from the current one.
#[derive(Debug)]
pub struct Published<T> {
    tx: watch::Sender<T>,
    emissions: u64,
}

impl<T: PartialEq> Published<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx, emissions: 0 }
    }

    /// Replaces the current value if it differs. Returns whether subscribers
    /// were notified.
    pub fn publish(&mut self, value: T) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });

        if changed {
            self.emissions += 1;
        }

        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn borrow(&self) -> watch::Ref<'_, T> {
        self.tx.borrow()
    }

    /// Number of values published since creation.
    pub fn emissions(&self) -> u64 {
        self.emissions
    }
}
