//! Event loading for the visible grid.
//!
//! Fetches go through [`EventFetcher`], which keeps at most one request in
//! flight: starting a new fetch aborts the previous task and bumps the
//! generation, and any completion carrying an older generation is dropped
//! on receipt.

use crate::error::FetchError;
use crate::model::EventModel;
use crate::time::DateRange;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::broadcast;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::debug;

pub type FetchResult = std::result::Result<Vec<EventModel>, FetchError>;
pub type FetchFuture = Pin<Box<dyn Future<Output = FetchResult> + Send + 'static>>;

/// The calendar/event data source.
pub trait CalendarService: Send + Sync {
    /// Events overlapping `range` from the given calendars.
    fn fetch_events(&self, range: DateRange, calendars: &[String]) -> FetchFuture;

    /// Fires whenever the underlying event data changes.
    fn change_notifications(&self) -> broadcast::Receiver<()>;
}

/// Keeps events that pass the declined and search filters.
#[profiling::function]
pub fn filter_events(events: &[EventModel], show_declined: bool, search: &str) -> Vec<EventModel> {
    events
        .iter()
        .filter(|event| show_declined || event.status != crate::EventStatus::Declined)
        .filter(|event| event.matches_search(search))
        .cloned()
        .collect()
}

/// A finished fetch as delivered back to the pipeline.
#[derive(Debug)]
pub struct FetchOutcome {
    pub generation: u64,
    pub range: DateRange,
    pub result: FetchResult,
}

/// Latest-wins runner for event fetches.
pub struct EventFetcher {
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    tx: UnboundedSender<FetchOutcome>,
    rx: UnboundedReceiver<FetchOutcome>,
}

impl Default for EventFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFetcher {
    pub fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            generation: 0,
            in_flight: None,
            tx,
            rx,
        }
    }

    /// Generation of the most recently started fetch, 0 before the first.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts a fetch, superseding any fetch still in flight. Must be called
    /// from within a tokio runtime.
    pub fn start(
        &mut self,
        service: &dyn CalendarService,
        range: DateRange,
        calendars: &[String],
    ) -> u64 {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let fetch = service.fetch_events(range, calendars);
        let tx = self.tx.clone();

        debug!(
            "fetching events {} .. {} from {} calendars (generation {generation})",
            range.start,
            range.end,
            calendars.len()
        );

        self.in_flight = Some(tokio::spawn(async move {
            let result = fetch.await;
            let _ = tx.send(FetchOutcome {
                generation,
                range,
                result,
            });
        }));

        generation
    }

    /// Aborts the in-flight fetch, if any. Its result will never be
    /// delivered.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    fn accept(&mut self, outcome: FetchOutcome) -> Option<FetchOutcome> {
        if outcome.generation != self.generation {
            debug!(
                "discarding stale fetch (generation {}, current {})",
                outcome.generation, self.generation
            );
            return None;
        }

        self.in_flight = None;
        Some(outcome)
    }

    /// Next completion of the current generation, without waiting.
    pub fn try_recv(&mut self) -> Option<FetchOutcome> {
        while let Ok(outcome) = self.rx.try_recv() {
            if let Some(outcome) = self.accept(outcome) {
                return Some(outcome);
            }
        }

        None
    }

    /// Waits for the next completion of the current generation.
    pub async fn recv(&mut self) -> Option<FetchOutcome> {
        loop {
            let outcome = self.rx.recv().await?;
            if let Some(outcome) = self.accept(outcome) {
                return Some(outcome);
            }
        }
    }
}

impl Drop for EventFetcher {
    fn drop(&mut self) {
        self.cancel();
    }
}
