use crate::model::{FocusedSelection, MonthGrid};
use chrono::NaiveDate;

/// Picks the day shown in the side panel and its events.
///
/// A hovered cell wins over the selected one. When the focused day is today,
/// reminders from earlier days of the grid (relative to `today`) are carried
/// forward ahead of the day's own events.
#[profiling::function]
pub fn resolve_focus(grid: &MonthGrid, today: NaiveDate) -> Option<FocusedSelection> {
    let cells = grid.cells();
    let focused = cells
        .iter()
        .find(|cell| cell.is_hovered)
        .or_else(|| cells.iter().find(|cell| cell.is_selected))?;

    if !focused.is_today {
        return Some(FocusedSelection {
            date: focused.date,
            events: focused.events.clone(),
        });
    }

    let events = cells
        .iter()
        .filter(|cell| cell.date < today)
        .flat_map(|cell| cell.events.iter())
        .filter(|event| event.kind.is_reminder())
        .chain(focused.events.iter())
        .cloned()
        .collect();

    Some(FocusedSelection {
        date: focused.date,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::annotate_cells;
    use crate::grid::build_month_grid;
    use crate::model::fixtures::event;
    use crate::time::{CalendarRules, MonthInterval};
    use crate::EventKind;
    use hashbrown::HashSet;
    use pretty_assertions::assert_eq;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn grid(
        events: &[crate::EventModel],
        today: u32,
        selected: u32,
        hovered: Option<u32>,
    ) -> MonthGrid {
        let month = MonthInterval::containing(date(1)).unwrap();
        let base = build_month_grid(&month, 0).unwrap();
        annotate_cells(
            &base,
            Some(events),
            date(today),
            date(selected),
            hovered.map(date),
            &HashSet::new(),
            &CalendarRules::default(),
        )
    }

    #[test]
    fn test_hover_wins_over_selection() {
        let g = grid(&[], 10, 14, Some(20));
        assert_eq!(resolve_focus(&g, date(10)).unwrap().date, date(20));

        let g = grid(&[], 10, 14, None);
        assert_eq!(resolve_focus(&g, date(10)).unwrap().date, date(14));
    }

    #[test]
    fn test_reminders_carry_forward_to_today() {
        let mut reminder = event("r", "Pay rent", (2026, 10, 8, 9), 0);
        reminder.kind = EventKind::Reminder;
        let old_event = event("o", "Old meeting", (2026, 10, 9, 9), 1);
        let today_event = event("t", "Standup", (2026, 10, 10, 9), 1);

        let events = vec![today_event.clone(), reminder.clone(), old_event];
        let focus = resolve_focus(&grid(&events, 10, 10, None), date(10)).unwrap();

        assert_eq!(
            focus,
            FocusedSelection {
                date: date(10),
                events: vec![reminder, today_event],
            }
        );
    }

    #[test]
    fn test_no_carry_forward_on_other_days() {
        let mut reminder = event("r", "Pay rent", (2026, 10, 8, 9), 0);
        reminder.kind = EventKind::Reminder;
        let tomorrow = event("t", "Dentist", (2026, 10, 11, 9), 1);

        let events = vec![reminder, tomorrow.clone()];
        let focus = resolve_focus(&grid(&events, 10, 11, None), date(10)).unwrap();

        assert_eq!(focus.events, vec![tomorrow]);
    }

    #[test]
    fn test_nothing_focused() {
        assert_eq!(resolve_focus(&MonthGrid::default(), date(10)), None);
    }
}
