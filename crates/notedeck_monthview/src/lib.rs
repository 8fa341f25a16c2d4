//! View model for the calendar month grid.
//!
//! [`MonthView`] turns a selected date, user interaction, settings and event
//! data into the values a month grid renders: the title, weekday headers,
//! week numbers, the 42 annotated day cells and the focused day.

mod annotate;
mod error;
pub mod events;
mod focus;
pub mod gate;
mod grid;
pub mod metrics;
mod model;
mod result;
mod settings;
mod time;
mod video;
mod view;
pub mod week;

pub use annotate::{annotate_cells, TodayTracker};
pub use error::{Error, FetchError};
pub use events::{filter_events, CalendarService, EventFetcher, FetchOutcome};
pub use focus::resolve_focus;
pub use gate::{Memo, Published};
pub use grid::{build_month_grid, grid_start};
pub use model::{
    CalendarCell, EventKind, EventModel, EventStatus, FocusedSelection, MonthGrid, Participant,
    WeekDay,
};
pub use result::Result;
pub use settings::{weekday_from_index, CalendarSettings, SettingsStore, SETTINGS_FILE};
pub use time::{
    detect_local_timezone, CalendarRules, DateProvider, DateRange, ManualDateProvider,
    MonthInterval, SystemDateProvider,
};
pub use video::{StaticVideoIndex, VideoIndex};
pub use view::{
    Input, MonthView, MonthViewDeps, MonthViewOutputs, DEFAULT_LOCALE,
    DEFAULT_TODAY_POLL_INTERVAL,
};

pub use chrono::Locale;
pub use chrono_tz::Tz;
