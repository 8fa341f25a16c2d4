use crate::{Error, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{error, info};

pub const SETTINGS_FILE: &str = "settings.json";

const DEFAULT_FIRST_WEEKDAY: u8 = 0;
const DEFAULT_SHOW_WEEK_NUMBERS: bool = false;
const DEFAULT_SHOW_DECLINED_EVENTS: bool = false;
const DEFAULT_CALENDAR_SCALING: f64 = 1.0;

fn default_highlighted_weekdays() -> BTreeSet<u8> {
    BTreeSet::from([0, 6])
}

/// User facing settings the month view observes.
///
/// Weekdays are numbered 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(default)]
pub struct CalendarSettings {
    pub first_weekday: u8,
    pub highlighted_weekdays: BTreeSet<u8>,
    pub show_week_numbers: bool,
    pub show_declined_events: bool,
    /// Display only, feeds the layout metrics
    pub calendar_scaling: f64,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            first_weekday: DEFAULT_FIRST_WEEKDAY,
            highlighted_weekdays: default_highlighted_weekdays(),
            show_week_numbers: DEFAULT_SHOW_WEEK_NUMBERS,
            show_declined_events: DEFAULT_SHOW_DECLINED_EVENTS,
            calendar_scaling: DEFAULT_CALENDAR_SCALING,
        }
    }
}

impl CalendarSettings {
    pub fn validate(&self) -> Result<()> {
        if self.first_weekday > 6 {
            return Err(Error::invalid_setting(format!(
                "first_weekday out of range: {}",
                self.first_weekday
            )));
        }

        if let Some(day) = self.highlighted_weekdays.iter().find(|day| **day > 6) {
            return Err(Error::invalid_setting(format!(
                "highlighted weekday out of range: {day}"
            )));
        }

        if !self.calendar_scaling.is_finite() || self.calendar_scaling <= 0.0 {
            return Err(Error::invalid_setting(format!(
                "calendar_scaling must be positive: {}",
                self.calendar_scaling
            )));
        }

        Ok(())
    }

    pub fn first_weekday(&self) -> Weekday {
        weekday_from_index(self.first_weekday)
    }
}

/// Maps 0 = Sunday .. 6 = Saturday onto chrono's [`Weekday`]. Out of range
/// values wrap.
pub fn weekday_from_index(index: u8) -> Weekday {
    match index % 7 {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        _ => Weekday::Sat,
    }
}

/// Observable settings, optionally backed by a json file.
pub struct SettingsStore {
    path: Option<PathBuf>,
    tx: watch::Sender<CalendarSettings>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(CalendarSettings::default())
    }
}

impl SettingsStore {
    /// An in-memory store, never persisted.
    pub fn new(settings: CalendarSettings) -> Self {
        let (tx, _rx) = watch::channel(settings);
        Self { path: None, tx }
    }

    /// Loads `settings.json` from `dir`. Missing or invalid files fall back
    /// to the defaults.
    pub fn load(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(SETTINGS_FILE);

        let settings = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<CalendarSettings>(&contents) {
                Ok(settings) => match settings.validate() {
                    Ok(()) => settings,
                    Err(err) => {
                        error!("{err}. Using defaults");
                        CalendarSettings::default()
                    }
                },
                Err(err) => {
                    error!("Invalid settings format ({err}). Using defaults");
                    CalendarSettings::default()
                }
            },
            Err(_) => {
                info!("Could not read {}. Using defaults", path.display());
                CalendarSettings::default()
            }
        };

        let (tx, _rx) = watch::channel(settings);
        Self {
            path: Some(path),
            tx,
        }
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let serialized = serde_json::to_string_pretty(&*self.tx.borrow())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serialized)?;
        info!("wrote settings to {}", path.display());

        Ok(())
    }

    pub fn get(&self) -> CalendarSettings {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CalendarSettings> {
        self.tx.subscribe()
    }

    /// Applies `update_fn` and notifies subscribers if the result differs.
    /// Invalid results are rejected and leave the settings untouched.
    pub fn update<F>(&self, update_fn: F) -> Result<bool>
    where
        F: FnOnce(&mut CalendarSettings),
    {
        let mut next = self.get();
        update_fn(&mut next);
        next.validate()?;

        let changed = self.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });

        if changed {
            if let Err(err) = self.save() {
                error!("failed to save settings: {err}");
            }
        }

        Ok(changed)
    }

    pub fn set_first_weekday(&self, weekday: u8) -> Result<bool> {
        self.update(|s| s.first_weekday = weekday)
    }

    pub fn set_highlighted_weekdays(&self, weekdays: BTreeSet<u8>) -> Result<bool> {
        self.update(|s| s.highlighted_weekdays = weekdays)
    }

    pub fn set_show_week_numbers(&self, value: bool) -> Result<bool> {
        self.update(|s| s.show_week_numbers = value)
    }

    pub fn set_show_declined_events(&self, value: bool) -> Result<bool> {
        self.update(|s| s.show_declined_events = value)
    }

    pub fn set_calendar_scaling(&self, value: f64) -> Result<bool> {
        self.update(|s| s.calendar_scaling = value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_for_missing_fields() {
        let settings: CalendarSettings =
            serde_json::from_str(r#"{"first_weekday": 1, "show_week_numbers": true}"#).unwrap();

        assert_eq!(
            settings,
            CalendarSettings {
                first_weekday: 1,
                show_week_numbers: true,
                ..CalendarSettings::default()
            }
        );
        assert_eq!(settings.first_weekday(), Weekday::Mon);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let settings = CalendarSettings {
            first_weekday: 7,
            ..CalendarSettings::default()
        };
        assert!(matches!(settings.validate(), Err(Error::InvalidSetting(_))));

        let settings = CalendarSettings {
            highlighted_weekdays: BTreeSet::from([2, 9]),
            ..CalendarSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = CalendarSettings {
            calendar_scaling: 0.0,
            ..CalendarSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_update_only_notifies_on_change() {
        let store = SettingsStore::default();
        let mut rx = store.subscribe();

        assert!(!store.set_show_week_numbers(false).unwrap());
        assert!(!rx.has_changed().unwrap());

        assert!(store.set_show_week_numbers(true).unwrap());
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().show_week_numbers);

        assert!(store.set_first_weekday(8).is_err());
        assert_eq!(store.get().first_weekday, 0);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_load_and_save_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();

        let store = SettingsStore::load(dir.path());
        assert_eq!(store.get(), CalendarSettings::default());

        store.set_first_weekday(1).unwrap();
        store.set_show_declined_events(true).unwrap();

        let reloaded = SettingsStore::load(dir.path());
        assert_eq!(reloaded.get().first_weekday, 1);
        assert!(reloaded.get().show_declined_events);
    }

    #[test]
    fn test_load_invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();
        assert_eq!(SettingsStore::load(dir.path()).get(), CalendarSettings::default());

        fs::write(dir.path().join(SETTINGS_FILE), r#"{"first_weekday": 12}"#).unwrap();
        assert_eq!(SettingsStore::load(dir.path()).get(), CalendarSettings::default());
    }
}
