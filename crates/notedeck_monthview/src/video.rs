use chrono::NaiveDate;
use hashbrown::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

/// Index of days that have a recorded video. Polled on demand.
pub trait VideoIndex: Send + Sync {
    fn dates_with_video(&self) -> HashSet<NaiveDate>;

    fn video_for_date(&self, date: NaiveDate) -> Option<PathBuf>;
}

/// An in-memory [`VideoIndex`] that can be updated while a view is running.
#[derive(Default)]
pub struct StaticVideoIndex {
    videos: RwLock<HashMap<NaiveDate, PathBuf>>,
}

impl StaticVideoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn videos(&self) -> RwLockReadGuard<'_, HashMap<NaiveDate, PathBuf>> {
        self.videos.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, date: NaiveDate, path: impl Into<PathBuf>) {
        self.videos
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(date, path.into());
    }

    pub fn remove(&self, date: NaiveDate) -> Option<PathBuf> {
        self.videos
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&date)
    }
}

impl VideoIndex for StaticVideoIndex {
    fn dates_with_video(&self) -> HashSet<NaiveDate> {
        self.videos().keys().copied().collect()
    }

    fn video_for_date(&self, date: NaiveDate) -> Option<PathBuf> {
        self.videos().get(&date).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_index() {
        let index = StaticVideoIndex::new();
        let day = NaiveDate::from_ymd_opt(2026, 10, 3).unwrap();
        assert!(index.dates_with_video().is_empty());

        index.insert(day, "/videos/2026/10/10-03-2026.mov");
        assert!(index.dates_with_video().contains(&day));
        assert_eq!(
            index.video_for_date(day),
            Some(PathBuf::from("/videos/2026/10/10-03-2026.mov"))
        );

        index.remove(day);
        assert_eq!(index.video_for_date(day), None);
    }
}
