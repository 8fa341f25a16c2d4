//! Timezone-bound calendar arithmetic.
//!
//! Every stage of the month view works on [`NaiveDate`] calendar days. The
//! mapping between those days and absolute instants is owned by
//! [`CalendarRules`], which is handed out by a [`DateProvider`] so the
//! timezone can change underneath a running view.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::{Arc, RwLock};

/// Source of "now" and of the calendar the view should use.
pub trait DateProvider: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn calendar(&self) -> CalendarRules;
}

/// An inclusive span of instants, as handed to the event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A calendar month, `start` is the first day and `end` the first day of
/// the following month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthInterval {
    /// The month containing `date`. `None` only at the edges of chrono's
    /// representable range.
    pub fn containing(date: NaiveDate) -> Option<Self> {
        let start = date.with_day(1)?;
        let (year, month) = if start.month() == 12 {
            (start.year() + 1, 1)
        } else {
            (start.year(), start.month() + 1)
        };
        let end = NaiveDate::from_ymd_opt(year, month, 1)?;

        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Day and month arithmetic in a specific timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarRules {
    timezone: Tz,
}

impl Default for CalendarRules {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl CalendarRules {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The calendar day an instant falls on.
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    pub fn is_same_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.day_of(a) == self.day_of(b)
    }

    /// First instant of `day`.
    ///
    /// Local midnight does not exist in zones that switch DST at 00:00, in
    /// which case the first valid hour of the day is used.
    pub fn start_of_day(&self, day: NaiveDate) -> Option<DateTime<Utc>> {
        (0..24)
            .find_map(|hour| {
                let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
                self.timezone
                    .from_local_datetime(&day.and_time(time))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Last instant of `day`.
    pub fn end_of_day(&self, day: NaiveDate) -> Option<DateTime<Utc>> {
        let next = day.succ_opt()?;
        self.start_of_day(next)?
            .checked_sub_signed(Duration::nanoseconds(1))
    }

    /// Inclusive instant range spanning the days `first..=last`.
    pub fn day_range(&self, first: NaiveDate, last: NaiveDate) -> Option<DateRange> {
        Some(DateRange {
            start: self.start_of_day(first)?,
            end: self.end_of_day(last)?,
        })
    }

    pub fn month_interval(&self, containing: NaiveDate) -> Option<MonthInterval> {
        MonthInterval::containing(containing)
    }

    /// First and last calendar day touched by the half open span
    /// `[start, end)`. Zero length spans cover the day they start on.
    pub fn covered_days(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
        let first = self.day_of(start);
        if end <= start {
            return (first, first);
        }

        let last = end
            .checked_sub_signed(Duration::nanoseconds(1))
            .map(|last_instant| self.day_of(last_instant))
            .unwrap_or(first);

        (first, last.max(first))
    }
}

/// Wall clock backed provider with a switchable timezone.
#[derive(Clone)]
pub struct SystemDateProvider {
    timezone: Arc<RwLock<Tz>>,
}

impl SystemDateProvider {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone: Arc::new(RwLock::new(timezone)),
        }
    }

    /// Provider using [`detect_local_timezone`].
    pub fn detect() -> Self {
        Self::new(detect_local_timezone())
    }

    pub fn set_timezone(&self, timezone: Tz) {
        match self.timezone.write() {
            Ok(mut tz) => *tz = timezone,
            Err(poisoned) => *poisoned.into_inner() = timezone,
        }
    }
}

impl DateProvider for SystemDateProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn calendar(&self) -> CalendarRules {
        let tz = match self.timezone.read() {
            Ok(tz) => *tz,
            Err(poisoned) => *poisoned.into_inner(),
        };
        CalendarRules::new(tz)
    }
}

/// Provider whose clock only moves when told to. Handy for driving the view
/// deterministically.
#[derive(Clone)]
pub struct ManualDateProvider {
    state: Arc<RwLock<(DateTime<Utc>, Tz)>>,
}

impl ManualDateProvider {
    pub fn new(now: DateTime<Utc>, timezone: Tz) -> Self {
        Self {
            state: Arc::new(RwLock::new((now, timezone))),
        }
    }

    pub fn set_now(&self, now: DateTime<Utc>) {
        match self.state.write() {
            Ok(mut state) => state.0 = now,
            Err(poisoned) => poisoned.into_inner().0 = now,
        }
    }

    pub fn set_timezone(&self, timezone: Tz) {
        match self.state.write() {
            Ok(mut state) => state.1 = timezone,
            Err(poisoned) => poisoned.into_inner().1 = timezone,
        }
    }

    fn snapshot(&self) -> (DateTime<Utc>, Tz) {
        match self.state.read() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl DateProvider for ManualDateProvider {
    fn now(&self) -> DateTime<Utc> {
        self.snapshot().0
    }

    fn calendar(&self) -> CalendarRules {
        CalendarRules::new(self.snapshot().1)
    }
}

/// Detects the user's local timezone.
///
/// Prefers an IANA name in `TZ`, otherwise guesses from the current UTC
/// offset.
pub fn detect_local_timezone() -> Tz {
    if let Ok(tz) = std::env::var("TZ") {
        if let Ok(tz) = tz.parse::<Tz>() {
            return tz;
        }
    }

    let offset_hours = Local::now().offset().local_minus_utc() / 3600;

    match offset_hours {
        -8 => Tz::America__Los_Angeles,
        -7 => Tz::America__Denver,
        -6 => Tz::America__Chicago,
        -5 => Tz::America__New_York,
        -4 => Tz::America__Halifax,
        0 => Tz::Europe__London,
        1 => Tz::Europe__Paris,
        2 => Tz::Europe__Helsinki,
        3 => Tz::Europe__Moscow,
        8 => Tz::Asia__Shanghai,
        9 => Tz::Asia__Tokyo,
        _ => Tz::UTC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_interval_wraps_year() {
        let month = MonthInterval::containing(date(2026, 12, 17)).unwrap();
        assert_eq!(month.start, date(2026, 12, 1));
        assert_eq!(month.end, date(2027, 1, 1));
        assert_eq!(month.days(), 31);
        assert!(month.contains(date(2026, 12, 31)));
        assert!(!month.contains(date(2027, 1, 1)));
    }

    #[test]
    fn test_february_leap_year() {
        let month = MonthInterval::containing(date(2024, 2, 10)).unwrap();
        assert_eq!(month.days(), 29);
    }

    #[test]
    fn test_day_of_respects_timezone() {
        let rules = CalendarRules::new(Tz::America__New_York);
        // 02:00 UTC is still the previous evening in New York
        let instant = Utc.with_ymd_and_hms(2026, 3, 10, 2, 0, 0).unwrap();
        assert_eq!(rules.day_of(instant), date(2026, 3, 9));
        assert_eq!(CalendarRules::default().day_of(instant), date(2026, 3, 10));
    }

    #[test]
    fn test_start_and_end_of_day() {
        let rules = CalendarRules::new(Tz::Europe__Berlin);
        let start = rules.start_of_day(date(2026, 7, 1)).unwrap();
        let end = rules.end_of_day(date(2026, 7, 1)).unwrap();

        assert_eq!(start, Utc.with_ymd_and_hms(2026, 6, 30, 22, 0, 0).unwrap());
        assert_eq!(end.hour(), 21);
        assert_eq!(rules.day_of(end), date(2026, 7, 1));
        assert_eq!(rules.day_of(end + Duration::nanoseconds(1)), date(2026, 7, 2));
    }

    #[test]
    fn test_start_of_day_in_midnight_dst_gap() {
        // Santiago springs forward at local midnight
        let rules = CalendarRules::new(Tz::America__Santiago);
        let start = rules.start_of_day(date(2026, 9, 6));
        assert!(start.is_some());
        assert_eq!(rules.day_of(start.unwrap()), date(2026, 9, 6));
    }

    #[test]
    fn test_covered_days() {
        let rules = CalendarRules::default();
        let start = Utc.with_ymd_and_hms(2026, 5, 3, 0, 0, 0).unwrap();

        // all day event ending at the next midnight only covers one day
        let end = Utc.with_ymd_and_hms(2026, 5, 4, 0, 0, 0).unwrap();
        assert_eq!(rules.covered_days(start, end), (date(2026, 5, 3), date(2026, 5, 3)));

        let end = Utc.with_ymd_and_hms(2026, 5, 5, 9, 0, 0).unwrap();
        assert_eq!(rules.covered_days(start, end), (date(2026, 5, 3), date(2026, 5, 5)));

        assert_eq!(rules.covered_days(start, start), (date(2026, 5, 3), date(2026, 5, 3)));
    }

    #[test]
    fn test_manual_provider() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let provider = ManualDateProvider::new(now, Tz::UTC);
        assert_eq!(provider.now(), now);

        provider.set_timezone(Tz::Asia__Tokyo);
        assert_eq!(provider.calendar().timezone(), Tz::Asia__Tokyo);
    }

    #[test]
    fn test_detect_local_timezone() {
        let tz = detect_local_timezone();
        assert!(!tz.name().is_empty());
        assert_eq!(tz.name().parse::<Tz>().ok(), Some(tz));
    }

    #[test]
    fn test_system_provider() {
        let provider = SystemDateProvider::new(Tz::UTC);
        let before = Utc::now();
        let now = provider.now();
        assert!(now >= before);
        assert!(now - before < Duration::seconds(5));
        assert_eq!(provider.calendar(), CalendarRules::default());

        // clones share the timezone
        let shared = provider.clone();
        provider.set_timezone(Tz::Europe__Berlin);
        assert_eq!(shared.calendar().timezone(), Tz::Europe__Berlin);

        let detected = SystemDateProvider::detect();
        assert_eq!(detected.calendar().timezone(), detect_local_timezone());
    }
}
