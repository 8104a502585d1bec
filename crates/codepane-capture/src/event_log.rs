//! Bounded, filterable event log owned by one widget

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::events::{LogEvent, LogLevel};

/// Number of entries a log retains before evicting the oldest
pub const MAX_CONSOLE_ENTRIES: usize = 500;

/// Suggested file name when the host offers the log as a download
pub const DEFAULT_DOWNLOAD_NAME: &str = "console-output.txt";

/// Per-level visibility switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelFilters {
    pub log: bool,
    pub info: bool,
    pub warn: bool,
    pub error: bool,
}

impl Default for LevelFilters {
    fn default() -> Self {
        Self {
            log: true,
            info: true,
            warn: true,
            error: true,
        }
    }
}

impl LevelFilters {
    pub fn get(&self, level: LogLevel) -> bool {
        match level {
            LogLevel::Log => self.log,
            LogLevel::Info => self.info,
            LogLevel::Warn => self.warn,
            LogLevel::Error => self.error,
        }
    }

    pub fn set(&mut self, level: LogLevel, visible: bool) {
        let slot = match level {
            LogLevel::Log => &mut self.log,
            LogLevel::Info => &mut self.info,
            LogLevel::Warn => &mut self.warn,
            LogLevel::Error => &mut self.error,
        };
        *slot = visible;
    }
}

/// FIFO log capped at [`MAX_CONSOLE_ENTRIES`], with pause buffering
///
/// While paused, events accumulate in an unbounded pending buffer. Resuming replays
/// them through [`record_event`](Self::record_event) in arrival order, so the final
/// contents are identical to recording the same events without pausing.
#[derive(Debug, Clone)]
pub struct BoundedEventLog {
    entries: VecDeque<LogEvent>,
    pending: Vec<LogEvent>,
    filters: LevelFilters,
    paused: bool,
}

impl Default for BoundedEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundedEventLog {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(MAX_CONSOLE_ENTRIES),
            pending: Vec::new(),
            filters: LevelFilters::default(),
            paused: false,
        }
    }

    pub fn with_filters(filters: LevelFilters) -> Self {
        Self {
            filters,
            ..Self::new()
        }
    }

    /// Record already-serialized arguments; `timestamp` defaults to now
    pub fn record(
        &mut self,
        level: LogLevel,
        arguments: Vec<String>,
        timestamp: Option<DateTime<Local>>,
    ) {
        let event = LogEvent::new(level, arguments, timestamp.unwrap_or_else(Local::now));
        self.record_event(event);
    }

    pub fn record_event(&mut self, event: LogEvent) {
        if self.paused {
            self.pending.push(event);
            return;
        }
        if self.entries.len() >= MAX_CONSOLE_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        if !paused {
            for event in std::mem::take(&mut self.pending) {
                self.record_event(event);
            }
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_filter(&mut self, level: LogLevel, visible: bool) {
        self.filters.set(level, visible);
    }

    pub fn filter(&self, level: LogLevel) -> bool {
        self.filters.get(level)
    }

    pub fn filters(&self) -> LevelFilters {
        self.filters
    }

    /// Drop stored and pending entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }

    /// One `[HH:MM:SS] LEVEL args` line per stored entry, ignoring filters
    pub fn to_plain_text(&self) -> String {
        self.entries
            .iter()
            .map(LogEvent::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEvent> + '_ {
        self.entries.iter()
    }

    /// Stored entries whose level is currently visible
    pub fn visible_entries(&self) -> impl Iterator<Item = &LogEvent> + '_ {
        self.entries
            .iter()
            .filter(move |event| self.filters.get(event.level()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn capacity(&self) -> usize {
        MAX_CONSOLE_ENTRIES
    }

    pub fn download_name(&self) -> &'static str {
        DEFAULT_DOWNLOAD_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> Option<DateTime<Local>> {
        Local.with_ymd_and_hms(2024, 5, 1, h, m, s).single()
    }

    #[test]
    fn test_eviction_keeps_most_recent() {
        let mut log = BoundedEventLog::new();
        for i in 0..(MAX_CONSOLE_ENTRIES + 3) {
            log.record(LogLevel::Log, vec![i.to_string()], None);
        }
        assert_eq!(log.len(), MAX_CONSOLE_ENTRIES);
        assert_eq!(log.entries().next().unwrap().arguments(), ["3"]);
        assert_eq!(
            log.entries().last().unwrap().arguments(),
            [(MAX_CONSOLE_ENTRIES + 2).to_string()]
        );
    }

    #[test]
    fn test_pause_buffers_then_replays() {
        let mut log = BoundedEventLog::new();
        log.record(LogLevel::Info, vec!["a".into()], None);
        log.set_paused(true);
        log.record(LogLevel::Warn, vec!["b".into()], None);
        log.record(LogLevel::Error, vec!["c".into()], None);
        assert_eq!(log.len(), 1);
        assert_eq!(log.pending_len(), 2);

        log.set_paused(true);
        assert_eq!(log.pending_len(), 2);

        log.set_paused(false);
        let args: Vec<_> = log.entries().map(|e| e.arguments()[0].clone()).collect();
        assert_eq!(args, vec!["a", "b", "c"]);
        assert_eq!(log.pending_len(), 0);
    }

    #[test]
    fn test_filters_only_affect_view() {
        let mut log = BoundedEventLog::new();
        log.record(LogLevel::Info, vec!["shown".into()], None);
        log.record(LogLevel::Error, vec!["hidden".into()], None);
        log.set_filter(LogLevel::Error, false);

        assert!(!log.filter(LogLevel::Error));
        assert!(log.filter(LogLevel::Info));
        assert_eq!(log.len(), 2);
        assert_eq!(log.visible_entries().count(), 1);
        assert_eq!(log.to_plain_text().lines().count(), 2);
    }

    #[test]
    fn test_plain_text_format() {
        let mut log = BoundedEventLog::new();
        log.record(LogLevel::Warn, vec!["disk".into(), "90%".into()], at(9, 5, 7));
        log.record(LogLevel::Log, vec![], at(13, 0, 0));
        assert_eq!(log.to_plain_text(), "[09:05:07] WARN disk 90%\n[13:00:00] LOG");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut log = BoundedEventLog::new();
        log.record(LogLevel::Log, vec!["x".into()], None);
        log.set_paused(true);
        log.record(LogLevel::Log, vec!["y".into()], None);

        log.clear();
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.pending_len(), 0);
        assert_eq!(log.to_plain_text(), "");
    }

    #[test]
    fn test_level_filters_deserialize_partial() {
        let filters: LevelFilters = serde_json::from_str(r#"{"log": false}"#).unwrap();
        assert!(!filters.log);
        assert!(filters.info && filters.warn && filters.error);
    }
}
