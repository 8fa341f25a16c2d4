//! The month view pipeline.
//!
//! [`MonthView`] owns every stage and runs them in dependency order on each
//! input:
//!
//! ```text
//! selected date ─► month ─► base grid ─┬─► title / weekdays / week numbers
//!                                      ├─► event fetch ─► filter ─┐
//!                        today, hover, video dates ───────────────┴─► annotated grid ─► focus
//! ```
//!
//! Each stage is memoized on its inputs and each output is equality gated,
//! so feeding the same state twice never produces a new emission.

use crate::annotate::{annotate_cells, TodayTracker};
use crate::events::{filter_events, CalendarService, EventFetcher, FetchOutcome};
use crate::focus::resolve_focus;
use crate::gate::{Memo, Published};
use crate::grid::build_month_grid;
use crate::metrics;
use crate::model::{EventModel, FocusedSelection, MonthGrid, WeekDay};
use crate::settings::CalendarSettings;
use crate::time::{CalendarRules, DateProvider, DateRange, MonthInterval};
use crate::video::VideoIndex;
use crate::week;
use chrono::{Locale, NaiveDate};
use hashbrown::HashSet;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

pub const DEFAULT_TODAY_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_LOCALE: Locale = Locale::en_US;

/// Discrete inputs from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    SelectDate(NaiveDate),
    Hover(Option<NaiveDate>),
    Search(String),
    EnabledCalendars(Vec<String>),
    Locale(Locale),
    RefreshVideoDates,
    /// Re-sample the clock
    Tick,
}

/// External collaborators of a [`MonthView`].
pub struct MonthViewDeps {
    pub date_provider: Arc<dyn DateProvider>,
    pub calendar_service: Arc<dyn CalendarService>,
    pub video_index: Arc<dyn VideoIndex>,
    pub settings: watch::Receiver<CalendarSettings>,
}

/// Replaying receivers for everything the view publishes.
#[derive(Clone)]
pub struct MonthViewOutputs {
    pub title: watch::Receiver<String>,
    pub weekdays: watch::Receiver<Vec<WeekDay>>,
    pub week_numbers: watch::Receiver<Option<Vec<u32>>>,
    pub grid: watch::Receiver<MonthGrid>,
    pub focused: watch::Receiver<Option<FocusedSelection>>,
    pub cell_size: watch::Receiver<f64>,
    pub week_numbers_width: watch::Receiver<f64>,
}

struct Outputs {
    title: Published<String>,
    weekdays: Published<Vec<WeekDay>>,
    week_numbers: Published<Option<Vec<u32>>>,
    grid: Published<MonthGrid>,
    focused: Published<Option<FocusedSelection>>,
    cell_size: Published<f64>,
    week_numbers_width: Published<f64>,
}

impl Default for Outputs {
    fn default() -> Self {
        Self {
            title: Published::new(String::new()),
            weekdays: Published::new(Vec::new()),
            week_numbers: Published::new(None),
            grid: Published::new(MonthGrid::default()),
            focused: Published::new(None),
            cell_size: Published::new(0.0),
            week_numbers_width: Published::new(0.0),
        }
    }
}

type GridKey = (MonthInterval, u8, CalendarRules);
type WeekdaysKey = (Locale, u8, BTreeSet<u8>);
type FetchKey = (DateRange, Vec<String>);
type FilterKey = (u64, bool, String);

pub struct MonthView {
    date_provider: Arc<dyn DateProvider>,
    calendar_service: Arc<dyn CalendarService>,
    video_index: Arc<dyn VideoIndex>,
    settings_rx: watch::Receiver<CalendarSettings>,
    settings_closed: bool,
    change_rx: broadcast::Receiver<()>,
    changes_closed: bool,
    today_poll_interval: Duration,

    selected: NaiveDate,
    hovered: Option<NaiveDate>,
    search: String,
    enabled_calendars: Vec<String>,
    locale: Locale,
    settings: CalendarSettings,
    video_dates: HashSet<NaiveDate>,

    month: Option<MonthInterval>,
    base_grid: Memo<GridKey, Option<MonthGrid>>,
    title: Memo<(Locale, NaiveDate), String>,
    weekdays: Memo<WeekdaysKey, Vec<WeekDay>>,
    fetch_key: Option<FetchKey>,
    fetcher: EventFetcher,
    events: Option<Vec<EventModel>>,
    events_version: u64,
    filtered: Memo<FilterKey, Vec<EventModel>>,
    today: TodayTracker,

    outputs: Outputs,
}

impl MonthView {
    /// Builds the view and runs the first pass, which also starts the first
    /// event fetch. Must be called from within a tokio runtime.
    pub fn new(deps: MonthViewDeps, selected: NaiveDate) -> Self {
        let MonthViewDeps {
            date_provider,
            calendar_service,
            video_index,
            mut settings,
        } = deps;

        let initial_settings = settings.borrow_and_update().clone();
        let change_rx = calendar_service.change_notifications();

        let mut view = Self {
            date_provider,
            calendar_service,
            video_index,
            settings_rx: settings,
            settings_closed: false,
            change_rx,
            changes_closed: false,
            today_poll_interval: DEFAULT_TODAY_POLL_INTERVAL,

            selected,
            hovered: None,
            search: String::new(),
            enabled_calendars: Vec::new(),
            locale: DEFAULT_LOCALE,
            settings: initial_settings,
            video_dates: HashSet::new(),

            month: None,
            base_grid: Memo::default(),
            title: Memo::default(),
            weekdays: Memo::default(),
            fetch_key: None,
            fetcher: EventFetcher::new(),
            events: None,
            events_version: 0,
            filtered: Memo::default(),
            today: TodayTracker::default(),

            outputs: Outputs::default(),
        };

        view.refresh();
        view
    }

    pub fn with_today_poll_interval(mut self, interval: Duration) -> Self {
        self.today_poll_interval = interval;
        self
    }

    pub fn outputs(&self) -> MonthViewOutputs {
        MonthViewOutputs {
            title: self.outputs.title.subscribe(),
            weekdays: self.outputs.weekdays.subscribe(),
            week_numbers: self.outputs.week_numbers.subscribe(),
            grid: self.outputs.grid.subscribe(),
            focused: self.outputs.focused.subscribe(),
            cell_size: self.outputs.cell_size.subscribe(),
            week_numbers_width: self.outputs.week_numbers_width.subscribe(),
        }
    }

    pub fn selected(&self) -> NaiveDate {
        self.selected
    }

    pub fn hovered(&self) -> Option<NaiveDate> {
        self.hovered
    }

    /// Generation of the latest event fetch that was started.
    pub fn fetch_generation(&self) -> u64 {
        self.fetcher.generation()
    }

    /// Number of times the annotated grid has been republished.
    pub fn grid_emissions(&self) -> u64 {
        self.outputs.grid.emissions()
    }

    pub fn video_for_date(&self, date: NaiveDate) -> Option<PathBuf> {
        self.video_index.video_for_date(date)
    }

    pub fn handle(&mut self, input: Input) {
        match input {
            Input::SelectDate(date) => self.select_date(date),
            Input::Hover(date) => self.hover(date),
            Input::Search(term) => self.set_search(term),
            Input::EnabledCalendars(calendars) => self.set_enabled_calendars(calendars),
            Input::Locale(locale) => self.set_locale(locale),
            Input::RefreshVideoDates => self.refresh_video_dates(),
            Input::Tick => self.tick(),
        }
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected = date;
        self.refresh();
    }

    pub fn hover(&mut self, date: Option<NaiveDate>) {
        self.hovered = date;
        self.refresh();
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
        self.refresh();
    }

    /// Calendars are a set: order and duplicates are ignored.
    pub fn set_enabled_calendars(&mut self, mut calendars: Vec<String>) {
        calendars.sort_unstable();
        calendars.dedup();
        self.enabled_calendars = calendars;
        self.refresh();
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
        self.refresh();
    }

    pub fn refresh_video_dates(&mut self) {
        self.video_dates = self.video_index.dates_with_video();
        self.refresh();
    }

    pub fn tick(&mut self) {
        self.refresh();
    }

    /// Applies everything that arrived since the last call without waiting:
    /// settings changes, change notifications and finished fetches. Returns
    /// whether anything was applied.
    pub fn process_events(&mut self) -> bool {
        let mut applied = false;

        if !self.settings_closed {
            match self.settings_rx.has_changed() {
                Ok(true) => {
                    let settings = self.settings_rx.borrow_and_update().clone();
                    self.apply_settings(settings);
                    applied = true;
                }
                Ok(false) => {}
                Err(_) => self.settings_closed = true,
            }
        }

        let mut calendar_changed = false;
        while !self.changes_closed {
            match self.change_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Lagged(_)) => calendar_changed = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => self.changes_closed = true,
            }
        }
        if calendar_changed {
            self.on_calendar_changed();
            applied = true;
        }

        while let Some(outcome) = self.fetcher.try_recv() {
            self.apply_fetch(outcome);
            applied = true;
        }

        applied
    }

    /// Drives the view until `inputs` closes. All stages run on this task;
    /// only event fetches run elsewhere.
    pub async fn run(mut self, mut inputs: UnboundedReceiver<Input>) {
        let mut ticker = tokio::time::interval(self.today_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(input) => self.handle(input),
                    None => break,
                },

                Some(outcome) = self.fetcher.recv() => self.apply_fetch(outcome),

                changed = self.settings_rx.changed(), if !self.settings_closed => match changed {
                    Ok(()) => {
                        let settings = self.settings_rx.borrow_and_update().clone();
                        self.apply_settings(settings);
                    }
                    Err(_) => self.settings_closed = true,
                },

                notification = self.change_rx.recv(), if !self.changes_closed => match notification {
                    Ok(()) | Err(RecvError::Lagged(_)) => self.on_calendar_changed(),
                    Err(RecvError::Closed) => self.changes_closed = true,
                },

                _ = ticker.tick() => self.tick(),
            }
        }

        self.fetcher.cancel();
        debug!("month view inputs closed");
    }

    fn apply_settings(&mut self, settings: CalendarSettings) {
        if let Err(err) = settings.validate() {
            warn!("ignoring settings update: {err}");
            return;
        }

        self.settings = settings;
        self.refresh();
    }

    fn on_calendar_changed(&mut self) {
        debug!("calendar data changed, refetching");
        self.fetch_key = None;
        self.refresh();
    }

    fn apply_fetch(&mut self, outcome: FetchOutcome) {
        match outcome.result {
            Ok(events) => {
                if self.events.as_ref() != Some(&events) {
                    self.events = Some(events);
                    self.events_version += 1;
                }
            }
            Err(err) => {
                warn!(
                    "event fetch for {} .. {} failed, keeping previous events: {err}",
                    outcome.range.start, outcome.range.end
                );
            }
        }

        self.refresh();
    }

    /// One full pass over every stage, in dependency order.
    fn refresh(&mut self) {
        let rules = self.date_provider.calendar();
        let now = self.date_provider.now();

        let Some(month) = rules.month_interval(self.selected) else {
            warn!("no month for {}, skipping update", self.selected);
            return;
        };

        if self.month.is_some_and(|current| current != month) {
            debug!("displayed month changed to {}", month.start);
            self.hovered = None;
        }
        self.month = Some(month);

        let first_weekday = self.settings.first_weekday;
        let (base, rebuilt) = self
            .base_grid
            .get_or_compute((month, first_weekday, rules), |(month, first_weekday, _)| {
                build_month_grid(month, *first_weekday)
            });
        let Some(base) = base.clone() else {
            warn!("could not build grid for {}, skipping update", month.start);
            return;
        };
        if rebuilt {
            debug!("rebuilt grid for {}", month.start);
            self.video_dates = self.video_index.dates_with_video();
        }

        self.publish_headers(month, &base);
        self.request_events(&base, &rules);

        let filtered = self.filtered_events();

        self.today.observe(now, &rules);
        let today = self.today.today().unwrap_or_else(|| rules.day_of(now));

        let grid = annotate_cells(
            &base,
            filtered.as_deref(),
            today,
            self.selected,
            self.hovered,
            &self.video_dates,
            &rules,
        );

        if self.outputs.grid.publish(grid) {
            let focused = resolve_focus(&self.outputs.grid.borrow(), today);
            if let Some(focused) = focused {
                self.outputs.focused.publish(Some(focused));
            }
        }
    }

    fn publish_headers(&mut self, month: MonthInterval, base: &MonthGrid) {
        let locale = self.locale;

        let (title, _) = self
            .title
            .get_or_compute((locale, month.start), |(locale, start)| {
                week::month_title(*start, *locale)
            });
        self.outputs.title.publish(title.clone());

        let key = (
            locale,
            self.settings.first_weekday,
            self.settings.highlighted_weekdays.clone(),
        );
        let (weekdays, _) = self
            .weekdays
            .get_or_compute(key, |(locale, first_weekday, highlighted)| {
                week::weekday_headers(*first_weekday, highlighted, *locale)
            });
        self.outputs.weekdays.publish(weekdays.clone());

        let week_numbers = week::week_numbers(self.settings.show_week_numbers, base);
        let shown = week_numbers.is_some();
        self.outputs.week_numbers.publish(week_numbers);

        let cell_size = metrics::cell_size(self.settings.calendar_scaling);
        self.outputs.cell_size.publish(cell_size);
        self.outputs
            .week_numbers_width
            .publish(metrics::week_numbers_width(shown, cell_size));
    }

    /// Starts a fetch when the grid span or the calendar set changed since
    /// the last request, or when a refetch was forced.
    fn request_events(&mut self, base: &MonthGrid, rules: &CalendarRules) {
        let (Some(first), Some(last)) = (base.first_date(), base.last_date()) else {
            return;
        };

        let Some(range) = rules.day_range(first, last) else {
            warn!("no instant range for {first} .. {last}, skipping fetch");
            return;
        };

        let key = (range, self.enabled_calendars.clone());
        if self.fetch_key.as_ref() == Some(&key) {
            return;
        }

        self.fetcher
            .start(self.calendar_service.as_ref(), range, &self.enabled_calendars);
        self.fetch_key = Some(key);
    }

    fn filtered_events(&mut self) -> Option<Vec<EventModel>> {
        let events = self.events.as_ref()?;
        let show_declined = self.settings.show_declined_events;
        let key = (self.events_version, show_declined, self.search.clone());

        let (filtered, _) = self
            .filtered
            .get_or_compute(key, |(_, show_declined, search)| {
                filter_events(events, *show_declined, search)
            });

        Some(filtered.clone())
    }
}
