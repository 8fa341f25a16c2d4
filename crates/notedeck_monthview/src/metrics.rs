//! Layout sizes derived from the calendar scaling setting.

const CELL_SIZE: f64 = 25.0;
const WEEK_NUMBER_CELL_RATIO: f64 = 0.85;

/// Side length of a day cell at `scaling`.
pub fn cell_size(scaling: f64) -> f64 {
    CELL_SIZE * scaling + 10.0 * (scaling - 1.0)
}

/// Width of the week number column, zero when it is hidden.
pub fn week_numbers_width(week_numbers_shown: bool, cell_size: f64) -> f64 {
    if week_numbers_shown {
        cell_size * WEEK_NUMBER_CELL_RATIO
    } else {
        0.0
    }
}
