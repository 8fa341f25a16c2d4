use crate::model::{CalendarCell, MonthGrid};
use crate::settings::weekday_from_index;
use crate::time::MonthInterval;
use chrono::{Datelike, Duration, NaiveDate};

/// First day shown in the grid for `month`: the latest `first_weekday` on or
/// before the first of the month.
pub fn grid_start(month: &MonthInterval, first_weekday: u8) -> Option<NaiveDate> {
    let month_start_weekday = month.start.weekday().num_days_from_sunday();
    let first_weekday = weekday_from_index(first_weekday).num_days_from_sunday();
    let offset = (month_start_weekday + 7 - first_weekday) % 7;

    month
        .start
        .checked_sub_signed(Duration::days(i64::from(offset)))
}

/// Builds the six weeks of cells displayed for `month`, with every flag
/// cleared and no events.
///
/// Returns `None` only when the grid would leave chrono's date range.
#[profiling::function]
pub fn build_month_grid(month: &MonthInterval, first_weekday: u8) -> Option<MonthGrid> {
    let start = grid_start(month, first_weekday)?;

    let cells = start
        .iter_days()
        .take(MonthGrid::CELLS)
        .map(|date| CalendarCell::blank(date, month.contains(date)))
        .collect::<Vec<_>>();

    if cells.len() != MonthGrid::CELLS {
        return None;
    }

    Some(MonthGrid::from_cells(cells))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn month(y: i32, m: u32) -> MonthInterval {
        MonthInterval::containing(NaiveDate::from_ymd_opt(y, m, 1).unwrap()).unwrap()
    }

    #[test]
    fn test_starts_on_first_weekday() {
        // October 2026 starts on a Thursday
        let grid = build_month_grid(&month(2026, 10), 0).unwrap();
        assert_eq!(grid.first_date(), NaiveDate::from_ymd_opt(2026, 9, 27));
        assert_eq!(grid.cells()[0].date.weekday(), Weekday::Sun);

        let grid = build_month_grid(&month(2026, 10), 1).unwrap();
        assert_eq!(grid.first_date(), NaiveDate::from_ymd_opt(2026, 9, 28));
    }

    #[test]
    fn test_month_starting_on_first_weekday_starts_there() {
        // February 2026 starts on a Sunday
        let grid = build_month_grid(&month(2026, 2), 0).unwrap();
        assert_eq!(grid.first_date(), NaiveDate::from_ymd_opt(2026, 2, 1));
        assert!(grid.cells()[0].in_month);
    }

    #[test]
    fn test_grid_shape_for_every_month_and_weekday() {
        for year in [2023, 2024, 2026] {
            for m in 1..=12 {
                let interval = month(year, m);
                for first_weekday in 0..7u8 {
                    let grid = build_month_grid(&interval, first_weekday).unwrap();
                    let cells = grid.cells();
                    assert_eq!(cells.len(), MonthGrid::CELLS);

                    let start = cells[0].date;
                    assert_eq!(
                        start.weekday().num_days_from_sunday(),
                        u32::from(first_weekday)
                    );
                    for (i, cell) in cells.iter().enumerate() {
                        assert_eq!(cell.date, start + Duration::days(i as i64));
                    }

                    let in_month: Vec<usize> = cells
                        .iter()
                        .enumerate()
                        .filter(|(_, c)| c.in_month)
                        .map(|(i, _)| i)
                        .collect();
                    assert_eq!(in_month.len() as i64, interval.days());
                    assert_eq!(
                        in_month.last().unwrap() - in_month.first().unwrap() + 1,
                        in_month.len(),
                        "in-month run must be contiguous"
                    );
                    assert_eq!(cells[in_month[0]].date, interval.start);
                }
            }
        }
    }

    #[test]
    fn test_is_deterministic() {
        let a = build_month_grid(&month(2026, 3), 3);
        let b = build_month_grid(&month(2026, 3), 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fails_closed_at_end_of_time() {
        let last = MonthInterval {
            start: NaiveDate::MAX.with_day(1).unwrap(),
            end: NaiveDate::MAX,
        };
        assert!(build_month_grid(&last, 0).is_none());
    }
}
