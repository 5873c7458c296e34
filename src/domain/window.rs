// Time window navigation
//
// The window is `[anchor - duration, anchor]`. Stepping clamps against the
// oldest and newest stored samples so a window never runs off the data.
use super::series::TimeRange;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_DURATION_MINUTES: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowError {
    #[error("invalid duration {0} minutes: must be a positive number")]
    InvalidDuration(f64),
    #[error("invalid time frame '{0}': expected a number and a unit, e.g. '2 hours'")]
    InvalidTimeFrame(String),
}

/// Oldest and newest sample timestamps held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBounds {
    pub oldest: DateTime<Utc>,
    pub newest: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Past,
    Back,
    Forward,
    Present,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindow {
    anchor: DateTime<Utc>,
    duration: TimeDelta,
    duration_minutes: f64,
}

impl TimeWindow {
    pub fn new(anchor: DateTime<Utc>, duration_minutes: f64) -> Result<Self, WindowError> {
        let duration = checked_duration(anchor, duration_minutes)?;
        Ok(Self {
            anchor,
            duration,
            duration_minutes,
        })
    }

    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_minutes
    }

    /// Saturates at the earliest representable time.
    pub fn start(&self) -> DateTime<Utc> {
        saturating_sub(self.anchor, self.duration)
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start(), self.anchor)
    }

    /// Change the width; the anchor stays where it is.
    pub fn set_duration(&mut self, minutes: f64) -> Result<(), WindowError> {
        self.duration = checked_duration(self.anchor, minutes)?;
        self.duration_minutes = minutes;
        Ok(())
    }

    pub fn step(&mut self, step: Step, bounds: TimeBounds, now: DateTime<Utc>) {
        match step {
            Step::Past => self.go_past(bounds),
            Step::Back => self.go_back(bounds),
            Step::Forward => self.go_forward(bounds, now),
            Step::Present => self.go_present(bounds),
        }
    }

    /// Earliest anchor whose window still starts inside the data.
    fn earliest_anchor(&self, bounds: TimeBounds) -> DateTime<Utc> {
        bounds
            .oldest
            .checked_add_signed(self.duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn go_past(&mut self, bounds: TimeBounds) {
        self.anchor = self.earliest_anchor(bounds);
    }

    pub fn go_back(&mut self, bounds: TimeBounds) {
        self.anchor = saturating_sub(self.anchor, self.duration);
        if self.start() < bounds.oldest {
            self.anchor = self.earliest_anchor(bounds);
        }
    }

    /// Never past the newest sample nor the wall clock, whichever is earlier,
    /// and never behind the current anchor.
    pub fn go_forward(&mut self, bounds: TimeBounds, now: DateTime<Utc>) {
        let limit = bounds.newest.min(now).max(self.anchor);
        let target = self
            .anchor
            .checked_add_signed(self.duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.anchor = target.min(limit);
    }

    pub fn go_present(&mut self, bounds: TimeBounds) {
        self.anchor = bounds.newest;
    }
}

fn saturating_sub(time: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    time.checked_sub_signed(delta).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// A duration is usable only if the window it opens at `anchor` is representable.
fn checked_duration(anchor: DateTime<Utc>, minutes: f64) -> Result<TimeDelta, WindowError> {
    let duration = minutes_to_delta(minutes)?;
    anchor
        .checked_sub_signed(duration)
        .map(|_| duration)
        .ok_or(WindowError::InvalidDuration(minutes))
}

fn minutes_to_delta(minutes: f64) -> Result<TimeDelta, WindowError> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(WindowError::InvalidDuration(minutes));
    }
    let millis = (minutes * 60_000.0).round();
    if millis < 1.0 || millis > i64::MAX as f64 {
        return Err(WindowError::InvalidDuration(minutes));
    }
    TimeDelta::try_milliseconds(millis as i64).ok_or(WindowError::InvalidDuration(minutes))
}

/// Parse operator text such as `"2 hours"` or `"1.5 d"` into minutes.
pub fn parse_time_frame(text: &str) -> Result<f64, WindowError> {
    let invalid = || WindowError::InvalidTimeFrame(text.to_string());

    let parts: Vec<&str> = text.split_whitespace().collect();
    let [amount, unit] = parts.as_slice() else {
        return Err(invalid());
    };
    let amount: f64 = amount.parse().map_err(|_| invalid())?;
    if !amount.is_finite() {
        return Err(invalid());
    }

    let minutes_per_unit = match unit.to_ascii_lowercase().as_str() {
        "year" | "years" | "yr" | "yrs" | "y" => 365.0 * 24.0 * 60.0,
        "month" | "months" | "mo" | "mos" => 30.0 * 24.0 * 60.0,
        "week" | "weeks" | "wk" | "wks" | "w" => 7.0 * 24.0 * 60.0,
        "day" | "days" | "d" => 24.0 * 60.0,
        "hour" | "hours" | "hr" | "hrs" | "h" => 60.0,
        "minute" | "minutes" | "min" | "mins" | "m" => 1.0,
        _ => return Err(invalid()),
    };
    Ok(amount * minutes_per_unit)
}
