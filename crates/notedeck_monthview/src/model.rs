use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Event,
    Reminder,
    Birthday,
}

impl EventKind {
    pub fn is_reminder(&self) -> bool {
        matches!(self, EventKind::Reminder)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Participant {
    pub name: String,
    pub email: Option<String>,
}

/// An event as delivered by the calendar source. Treated as immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventModel {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: EventStatus,
    pub kind: EventKind,
    pub location: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub participants: Vec<Participant>,
}

impl EventModel {
    /// Case-insensitive substring match against title, location, url,
    /// notes and the space-joined participant names.
    pub fn matches_search(&self, term: &str) -> bool {
        if term.is_empty() {
            return true;
        }

        let needle = term.to_lowercase();
        let participants = self
            .participants
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let fields = [
            Some(self.title.as_str()),
            self.location.as_deref(),
            self.url.as_deref(),
            self.notes.as_deref(),
            Some(participants.as_str()),
        ];

        let found = fields
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle));
        found
    }
}

/// One weekday column header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekDay {
    pub title: String,
    pub is_highlighted: bool,
    /// 0 = Sunday .. 6 = Saturday
    pub index: u8,
}

/// One day slot of the month grid. Replaced, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub in_month: bool,
    pub is_today: bool,
    pub is_selected: bool,
    pub is_hovered: bool,
    pub events: Vec<EventModel>,
    pub has_video: bool,
}

impl CalendarCell {
    /// A cell with only its date information filled in.
    pub fn blank(date: NaiveDate, in_month: bool) -> Self {
        Self {
            date,
            in_month,
            is_today: false,
            is_selected: false,
            is_hovered: false,
            events: Vec::new(),
            has_video: false,
        }
    }
}

/// The six displayed weeks of a month.
///
/// Cells are consecutive days; a grid built by [`crate::build_month_grid`]
/// always holds exactly [`MonthGrid::CELLS`] of them. The default grid is
/// empty and only exists before the first pass of a view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MonthGrid {
    cells: Vec<CalendarCell>,
}

impl MonthGrid {
    pub const WEEKS: usize = 6;
    pub const CELLS: usize = Self::WEEKS * 7;

    pub(crate) fn from_cells(cells: Vec<CalendarCell>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[CalendarCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.cells.first().map(|cell| cell.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.cells.last().map(|cell| cell.date)
    }

    pub fn cell(&self, date: NaiveDate) -> Option<&CalendarCell> {
        let first = self.first_date()?;
        let idx = usize::try_from((date - first).num_days()).ok()?;
        self.cells.get(idx)
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarCell]> {
        self.cells.chunks(7)
    }
}

/// The day whose events are shown in the side panel, and those events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusedSelection {
    pub date: NaiveDate,
    pub events: Vec<EventModel>,
}


#[cfg(test)]
mod tests {
    use super::fixtures::event;
    use super::*;

    #[test]
    fn test_search_is_case_insensitive() {
        let ev = event("1", "Dentist", (2026, 10, 5, 9), 1);
        assert!(ev.matches_search("den"));
        assert!(ev.matches_search("DENT"));
        assert!(!ev.matches_search("sync"));
        assert!(ev.matches_search(""));
    }

    #[test]
    fn test_search_covers_optional_fields() {
        let mut ev = event("1", "Standup", (2026, 10, 5, 9), 1);
        ev.location = Some("Room Saturn".to_string());
        ev.url = Some("https://meet.example.com/abc".to_string());
        ev.notes = Some("bring slides".to_string());
        ev.participants = vec![
            Participant {
                name: "Ada Lovelace".to_string(),
                email: None,
            },
            Participant {
                name: "Alan Turing".to_string(),
                email: Some("alan@example.com".to_string()),
            },
        ];

        assert!(ev.matches_search("saturn"));
        assert!(ev.matches_search("meet.example"));
        assert!(ev.matches_search("SLIDES"));
        // participant names are joined with a space
        assert!(ev.matches_search("lovelace alan"));
        // emails are not searched
        assert!(!ev.matches_search("alan@"));
    }
}
