#![forbid(unsafe_code)]

//! Timed, once-a-day overlay prompts.
//!
//! Whether a prompt was already shown today lives in a [`SeenStore`] owned
//! by the caller (local storage, a cookie, a file); the engine never keeps
//! it itself. An [`AutoOpenTimer`] accumulates frame time and fires once,
//! after its delay, unless the store already records the key for today.

use std::time::Duration;

use ahash::AHashMap;

const SECS_PER_DAY: u64 = 86_400;

/// A calendar day, counted in whole UTC days since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "state-persistence", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "state-persistence", serde(transparent))]
pub struct DayStamp(pub u32);

impl DayStamp {
    pub fn from_unix_secs(secs: u64) -> Self {
        Self(u32::try_from(secs / SECS_PER_DAY).unwrap_or(u32::MAX))
    }

    /// The current day from the system clock.
    pub fn today() -> Self {
        let secs = web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self::from_unix_secs(secs)
    }
}

/// Persisted "last shown" days, keyed by prompt.
pub trait SeenStore {
    fn last_seen(&self, key: &str) -> Option<DayStamp>;
    fn mark_seen(&mut self, key: &str, day: DayStamp);
}

/// One persisted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "state-persistence", derive(serde::Serialize, serde::Deserialize))]
pub struct SeenRecord {
    pub key: String,
    pub day: DayStamp,
}

/// In-memory [`SeenStore`].
#[derive(Debug, Clone, Default)]
pub struct MemorySeenStore {
    seen: AHashMap<String, DayStamp>,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = SeenRecord>) -> Self {
        Self {
            seen: records.into_iter().map(|r| (r.key, r.day)).collect(),
        }
    }

    /// Entries sorted by key, for persisting.
    pub fn records(&self) -> Vec<SeenRecord> {
        let mut out: Vec<SeenRecord> = self
            .seen
            .iter()
            .map(|(key, &day)| SeenRecord {
                key: key.clone(),
                day,
            })
            .collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }
}

impl SeenStore for MemorySeenStore {
    fn last_seen(&self, key: &str) -> Option<DayStamp> {
        self.seen.get(key).copied()
    }

    fn mark_seen(&mut self, key: &str, day: DayStamp) {
        self.seen.insert(key.to_owned(), day);
    }
}

/// Which prompt to show and how long to wait first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoOpenPolicy {
    pub key: String,
    pub delay: Duration,
}

impl AutoOpenPolicy {
    pub fn new(key: impl Into<String>, delay: Duration) -> Self {
        Self {
            key: key.into(),
            delay,
        }
    }

    /// Whether the prompt is still due on `today`.
    pub fn is_due(&self, store: &dyn SeenStore, today: DayStamp) -> bool {
        store.last_seen(&self.key) != Some(today)
    }

    /// A timer for `today`; disarmed if the prompt was already shown.
    pub fn timer(&self, store: &dyn SeenStore, today: DayStamp) -> AutoOpenTimer {
        AutoOpenTimer {
            key: self.key.clone(),
            remaining: self.delay,
            today,
            armed: self.is_due(store, today),
        }
    }
}

/// Countdown for one auto-open prompt.
#[derive(Debug, Clone)]
pub struct AutoOpenTimer {
    key: String,
    remaining: Duration,
    today: DayStamp,
    armed: bool,
}

impl AutoOpenTimer {
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Cancel without firing (the user opened the dialog manually, or the
    /// page is going away).
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Advance by `delta`. Returns `true` exactly once, when the delay has
    /// elapsed and the store still does not record the key for today; the
    /// key is marked seen at that moment.
    pub fn tick(&mut self, delta: Duration, store: &mut dyn SeenStore) -> bool {
        if !self.armed {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(delta);
        if !self.remaining.is_zero() {
            return false;
        }
        self.armed = false;
        if store.last_seen(&self.key) == Some(self.today) {
            tracing::debug!(key = %self.key, "auto-open skipped; already seen today");
            return false;
        }
        store.mark_seen(&self.key, self.today);
        tracing::debug!(key = %self.key, day = self.today.0, "auto-open fired");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: DayStamp = DayStamp(20_000);
    const SEC: Duration = Duration::from_secs(1);

    fn policy() -> AutoOpenPolicy {
        AutoOpenPolicy::new("workforce", Duration::from_secs(3))
    }

    #[test]
    fn day_stamp_from_seconds() {
        assert_eq!(DayStamp::from_unix_secs(0), DayStamp(0));
        assert_eq!(DayStamp::from_unix_secs(86_399), DayStamp(0));
        assert_eq!(DayStamp::from_unix_secs(86_400), DayStamp(1));
        assert!(DayStamp::today() > DayStamp(19_000));
    }

    #[test]
    fn fires_once_after_delay() {
        let mut store = MemorySeenStore::new();
        let mut timer = policy().timer(&store, DAY);
        assert!(timer.is_armed());

        assert!(!timer.tick(SEC, &mut store));
        assert!(!timer.tick(SEC, &mut store));
        assert!(timer.tick(SEC, &mut store));
        assert!(!timer.tick(SEC, &mut store));
        assert_eq!(store.last_seen("workforce"), Some(DAY));
    }

    #[test]
    fn seen_today_is_disarmed() {
        let mut store = MemorySeenStore::new();
        store.mark_seen("workforce", DAY);
        let mut timer = policy().timer(&store, DAY);
        assert!(!timer.is_armed());
        assert!(!timer.tick(Duration::from_secs(10), &mut store));
    }

    #[test]
    fn seen_yesterday_fires_again() {
        let mut store = MemorySeenStore::new();
        store.mark_seen("workforce", DayStamp(DAY.0 - 1));
        let mut timer = policy().timer(&store, DAY);
        assert!(timer.tick(Duration::from_secs(3), &mut store));
    }

    #[test]
    fn marked_elsewhere_while_counting_down() {
        let mut store = MemorySeenStore::new();
        let mut timer = policy().timer(&store, DAY);
        timer.tick(SEC, &mut store);
        store.mark_seen("workforce", DAY);
        assert!(!timer.tick(Duration::from_secs(5), &mut store));
        assert!(!timer.is_armed());
    }

    #[test]
    fn disarm_prevents_firing() {
        let mut store = MemorySeenStore::new();
        let mut timer = policy().timer(&store, DAY);
        timer.disarm();
        assert!(!timer.tick(Duration::from_secs(5), &mut store));
        assert_eq!(store.last_seen("workforce"), None);
    }

    #[test]
    fn records_round_trip_through_store() {
        let mut store = MemorySeenStore::new();
        store.mark_seen("b", DayStamp(2));
        store.mark_seen("a", DayStamp(1));
        let records = store.records();
        assert_eq!(records[0].key, "a");
        let restored = MemorySeenStore::from_records(records);
        assert_eq!(restored.last_seen("b"), Some(DayStamp(2)));
    }

    #[cfg(feature = "state-persistence")]
    #[test]
    fn records_serialize_as_json() {
        let record = SeenRecord {
            key: "workforce".into(),
            day: DayStamp(20_100),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"key":"workforce","day":20100}"#);
        let back: SeenRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
