//! Controllable collaborators for driving a month view in tests.

use notedeck_monthview::events::{FetchFuture, FetchResult};
use notedeck_monthview::{CalendarService, DateRange, FetchError};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, oneshot};

struct PendingFetch {
    range: DateRange,
    calendars: Vec<String>,
    tx: Option<oneshot::Sender<FetchResult>>,
}

/// A calendar source whose fetches only finish when the test says so.
///
/// Fetches are numbered in the order they were requested, starting at 0.
pub struct ManualCalendarService {
    fetches: Mutex<Vec<PendingFetch>>,
    changes: broadcast::Sender<()>,
}

impl Default for ManualCalendarService {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualCalendarService {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            fetches: Mutex::new(Vec::new()),
            changes,
        }
    }

    fn fetches(&self) -> MutexGuard<'_, Vec<PendingFetch>> {
        self.fetches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total number of fetches requested so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches().len()
    }

    /// Number of requested fetches not yet completed.
    pub fn pending(&self) -> usize {
        self.fetches().iter().filter(|f| f.tx.is_some()).count()
    }

    /// Range and calendars of fetch `index`.
    pub fn request(&self, index: usize) -> Option<(DateRange, Vec<String>)> {
        self.fetches()
            .get(index)
            .map(|f| (f.range, f.calendars.clone()))
    }

    /// Finishes fetch `index`. Returns false if it was already finished or
    /// its requester has gone away.
    pub fn complete(&self, index: usize, result: FetchResult) -> bool {
        let tx = self.fetches().get_mut(index).and_then(|f| f.tx.take());
        match tx {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    /// Finishes the oldest unfinished fetch.
    pub fn complete_next(&self, result: FetchResult) -> bool {
        let tx = self.fetches().iter_mut().find_map(|f| f.tx.take());
        match tx {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    /// Finishes the most recent fetch.
    pub fn complete_latest(&self, result: FetchResult) -> bool {
        let tx = self.fetches().last_mut().and_then(|f| f.tx.take());
        match tx {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    /// Signals that the underlying event data changed.
    pub fn notify_changed(&self) {
        let _ = self.changes.send(());
    }
}

impl CalendarService for ManualCalendarService {
    fn fetch_events(&self, range: DateRange, calendars: &[String]) -> FetchFuture {
        let (tx, rx) = oneshot::channel();
        self.fetches().push(PendingFetch {
            range,
            calendars: calendars.to_vec(),
            tx: Some(tx),
        });

        Box::pin(async move { rx.await.unwrap_or(Err(FetchError::Cancelled)) })
    }

    fn change_notifications(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}
