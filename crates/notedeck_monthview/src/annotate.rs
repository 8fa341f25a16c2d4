use crate::model::{CalendarCell, EventModel, MonthGrid};
use crate::time::CalendarRules;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use hashbrown::HashSet;
use tracing::info;

/// Fills in the per-cell flags, events and video markers of `grid`.
///
/// When `filtered` is `None` (no fetch has completed yet) each cell keeps the
/// events it already carries.
#[profiling::function]
pub fn annotate_cells(
    grid: &MonthGrid,
    filtered: Option<&[EventModel]>,
    today: NaiveDate,
    selected: NaiveDate,
    hovered: Option<NaiveDate>,
    video_dates: &HashSet<NaiveDate>,
    rules: &CalendarRules,
) -> MonthGrid {
    let spans: Option<Vec<(NaiveDate, NaiveDate, &EventModel)>> = filtered.map(|events| {
        events
            .iter()
            .map(|event| {
                let (first, last) = rules.covered_days(event.start, event.end);
                (first, last, event)
            })
            .collect()
    });

    let cells = grid
        .cells()
        .iter()
        .map(|cell| {
            let events = match &spans {
                Some(spans) => spans
                    .iter()
                    .filter(|(first, last, _)| *first <= cell.date && cell.date <= *last)
                    .map(|(_, _, event)| (*event).clone())
                    .collect(),
                None => cell.events.clone(),
            };

            CalendarCell {
                date: cell.date,
                in_month: cell.in_month,
                is_today: cell.date == today,
                is_selected: cell.date == selected,
                is_hovered: hovered == Some(cell.date),
                events,
                has_video: video_dates.contains(&cell.date),
            }
        })
        .collect();

    MonthGrid::from_cells(cells)
}

/// Tracks the current day so "today" is only re-announced when the wall
/// clock crosses midnight or the timezone changes.
#[derive(Debug, Default)]
pub struct TodayTracker {
    last: Option<(NaiveDate, Tz)>,
}

impl TodayTracker {
    /// Samples `now`. Returns the new day when it differs from the last
    /// sample at day granularity, or when the timezone changed.
    pub fn observe(&mut self, now: DateTime<Utc>, rules: &CalendarRules) -> Option<NaiveDate> {
        let sample = (rules.day_of(now), rules.timezone());

        match self.last {
            Some(last) if last == sample => None,
            previous => {
                if let Some((day, tz)) = previous {
                    if tz != sample.1 {
                        info!("timezone changed from {} to {}", tz.name(), sample.1.name());
                    } else {
                        info!("day rolled over from {day} to {}", sample.0);
                    }
                }
                self.last = Some(sample);
                Some(sample.0)
            }
        }
    }

    pub fn today(&self) -> Option<NaiveDate> {
        self.last.map(|(day, _)| day)
    }
}
