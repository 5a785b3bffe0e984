use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_CUSTOM_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Hourly,
    Daily,
    Weekly,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("unknown frequency: {0} (expected hourly, daily, weekly, or custom)")]
    UnknownFrequency(String),

    #[error("custom frequency requires interval_seconds")]
    MissingInterval,

    #[error("custom interval must be at least 60s, got {0}s")]
    IntervalTooShort(u64),
}

impl Frequency {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Custom => "custom",
        }
    }

    /// Resolve the run interval in seconds.
    ///
    /// `custom_secs` is only consulted for [`Frequency::Custom`].
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError`] when a custom interval is missing or shorter
    /// than [`MIN_CUSTOM_INTERVAL_SECS`].
    pub fn interval_secs(self, custom_secs: Option<u64>) -> Result<u64, ScheduleError> {
        match self {
            Frequency::Hourly => Ok(3_600),
            Frequency::Daily => Ok(86_400),
            Frequency::Weekly => Ok(604_800),
            Frequency::Custom => match custom_secs {
                None => Err(ScheduleError::MissingInterval),
                Some(s) if s < MIN_CUSTOM_INTERVAL_SECS => Err(ScheduleError::IntervalTooShort(s)),
                Some(s) => Ok(s),
            },
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Frequency {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hourly" => Ok(Frequency::Hourly),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "custom" => Ok(Frequency::Custom),
            other => Err(ScheduleError::UnknownFrequency(other.to_string())),
        }
    }
}

/// Live cadence of a running scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    pub frequency: Frequency,
    pub interval_seconds: u64,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: DateTime<Utc>,
}

impl ScheduleState {
    #[must_use]
    pub fn new(frequency: Frequency, interval_seconds: u64, now: DateTime<Utc>) -> Self {
        Self {
            frequency,
            interval_seconds,
            enabled: true,
            last_run: None,
            next_run: now + interval(interval_seconds),
        }
    }

    /// Record a completed run; the next run is measured from completion.
    pub fn record_completion(&mut self, completed_at: DateTime<Utc>) {
        self.last_run = Some(completed_at);
        self.next_run = completed_at + interval(self.interval_seconds);
    }

    /// Push the next run one interval past `now` without recording a run.
    pub fn defer(&mut self, now: DateTime<Utc>) {
        self.next_run = now + interval(self.interval_seconds);
    }
}

fn interval(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or_else(|| chrono::Duration::days(36_500))
}

/// Point-in-time view returned by status reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleStatus {
    pub enabled: bool,
    pub is_running: bool,
    pub frequency: Option<Frequency>,
    pub interval_seconds: Option<u64>,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub seconds_until_next: Option<i64>,
}

impl ScheduleStatus {
    #[must_use]
    pub fn stopped() -> Self {
        Self {
            enabled: false,
            is_running: false,
            frequency: None,
            interval_seconds: None,
            last_run: None,
            next_run: None,
            seconds_until_next: None,
        }
    }

    #[must_use]
    pub fn from_state(state: &ScheduleState, now: DateTime<Utc>) -> Self {
        Self {
            enabled: state.enabled,
            is_running: true,
            frequency: Some(state.frequency),
            interval_seconds: Some(state.interval_seconds),
            last_run: state.last_run,
            next_run: Some(state.next_run),
            seconds_until_next: Some((state.next_run - now).num_seconds().max(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn fixed_frequencies_ignore_custom_interval() {
        assert_eq!(Frequency::Hourly.interval_secs(Some(5)).unwrap(), 3_600);
        assert_eq!(Frequency::Daily.interval_secs(None).unwrap(), 86_400);
        assert_eq!(Frequency::Weekly.interval_secs(None).unwrap(), 604_800);
    }

    #[test]
    fn custom_interval_bounds() {
        assert_eq!(
            Frequency::Custom.interval_secs(None),
            Err(ScheduleError::MissingInterval)
        );
        assert_eq!(
            Frequency::Custom.interval_secs(Some(59)),
            Err(ScheduleError::IntervalTooShort(59))
        );
        assert_eq!(Frequency::Custom.interval_secs(Some(60)).unwrap(), 60);
    }

    #[test]
    fn frequency_parses_case_insensitively() {
        assert_eq!("Daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert!(matches!(
            "monthly".parse::<Frequency>(),
            Err(ScheduleError::UnknownFrequency(_))
        ));
    }

    #[test]
    fn next_run_measured_from_completion() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut state = ScheduleState::new(Frequency::Hourly, 3_600, start);
        assert_eq!(state.next_run, start + chrono::Duration::hours(1));

        let completed = start + chrono::Duration::minutes(95);
        state.record_completion(completed);
        assert_eq!(state.last_run, Some(completed));
        assert_eq!(state.next_run, completed + chrono::Duration::hours(1));
    }

    #[test]
    fn defer_moves_next_run_but_not_last_run() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut state = ScheduleState::new(Frequency::Custom, 60, start);
        state.defer(start + chrono::Duration::seconds(60));
        assert_eq!(state.last_run, None);
        assert_eq!(state.next_run, start + chrono::Duration::seconds(120));
    }

    #[test]
    fn status_clamps_overdue_countdown() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let state = ScheduleState::new(Frequency::Custom, 60, start);
        let status = ScheduleStatus::from_state(&state, start + chrono::Duration::minutes(5));
        assert_eq!(status.seconds_until_next, Some(0));
        assert!(status.is_running);
    }
}
