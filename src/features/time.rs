//! Time Context Features
//!
//! Cyclical hour/day encodings and the rush-hour, night and weekend indicators.

use std::f32::consts::PI;

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};

use super::FeatureError;

pub const HOURS_PER_DAY: u32 = 24;
pub const DAYS_PER_WEEK: u32 = 7;

/// First weekend day (Saturday, with Monday = 0)
pub const WEEKEND_START: u32 = 5;

/// Hour and weekday (Monday = 0) a window is classified at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeContext {
    pub hour: u32,
    pub day_of_week: u32,
}

impl TimeContext {
    pub fn new(hour: u32, day_of_week: u32) -> Result<Self, FeatureError> {
        if hour >= HOURS_PER_DAY {
            return Err(FeatureError::InvalidHour(hour));
        }
        if day_of_week >= DAYS_PER_WEEK {
            return Err(FeatureError::InvalidDay(day_of_week));
        }
        Ok(Self { hour, day_of_week })
    }

    /// Current local time
    pub fn now() -> Self {
        let now = chrono::Local::now();
        Self {
            hour: now.hour(),
            day_of_week: now.weekday().num_days_from_monday(),
        }
    }

    /// Fill missing parts from the local clock
    pub fn resolve(hour: Option<u32>, day_of_week: Option<u32>) -> Result<Self, FeatureError> {
        let now = Self::now();
        Self::new(
            hour.unwrap_or(now.hour),
            day_of_week.unwrap_or(now.day_of_week),
        )
    }

    pub fn hour_sin(&self) -> f32 {
        cyclical(self.hour, HOURS_PER_DAY).0
    }

    pub fn hour_cos(&self) -> f32 {
        cyclical(self.hour, HOURS_PER_DAY).1
    }

    pub fn day_sin(&self) -> f32 {
        cyclical(self.day_of_week, DAYS_PER_WEEK).0
    }

    pub fn day_cos(&self) -> f32 {
        cyclical(self.day_of_week, DAYS_PER_WEEK).1
    }

    pub fn is_weekend(&self) -> bool {
        self.day_of_week >= WEEKEND_START
    }
}

fn cyclical(value: u32, period: u32) -> (f32, f32) {
    let angle = 2.0 * PI * value as f32 / period as f32;
    (angle.sin(), angle.cos())
}

/// Rush hour and night boundaries (inclusive ranges for rush hours)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindows {
    pub morning_rush: (u32, u32),
    pub evening_rush: (u32, u32),
    /// Night is `hour >= night_start || hour < night_end`
    pub night_start: u32,
    pub night_end: u32,
}

impl Default for TimeWindows {
    fn default() -> Self {
        Self {
            morning_rush: (7, 9),
            evening_rush: (16, 19),
            night_start: 22,
            night_end: 4,
        }
    }
}

impl TimeWindows {
    /// Every boundary must be an hour of the day
    pub fn validate(&self) -> Result<(), FeatureError> {
        let hours = [
            self.morning_rush.0,
            self.morning_rush.1,
            self.evening_rush.0,
            self.evening_rush.1,
            self.night_start,
            self.night_end,
        ];
        match hours.into_iter().find(|&h| h >= HOURS_PER_DAY) {
            Some(hour) => Err(FeatureError::InvalidHour(hour)),
            None => Ok(()),
        }
    }

    pub fn is_morning_rush(&self, hour: u32) -> bool {
        (self.morning_rush.0..=self.morning_rush.1).contains(&hour)
    }

    pub fn is_evening_rush(&self, hour: u32) -> bool {
        (self.evening_rush.0..=self.evening_rush.1).contains(&hour)
    }

    pub fn is_night(&self, hour: u32) -> bool {
        hour >= self.night_start || hour < self.night_end
    }

    /// Evaluate every indicator for a time context
    pub fn flags(&self, time: &TimeContext) -> TimeFlags {
        TimeFlags {
            is_morning_rush: self.is_morning_rush(time.hour),
            is_evening_rush: self.is_evening_rush(time.hour),
            is_night: self.is_night(time.hour),
            is_weekend: time.is_weekend(),
        }
    }
}

/// Boolean indicators derived from a time context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFlags {
    pub is_morning_rush: bool,
    pub is_evening_rush: bool,
    pub is_night: bool,
    pub is_weekend: bool,
}

pub(crate) fn indicator(flag: bool) -> f32 {
    if flag { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_context_ranges() {
        assert!(TimeContext::new(23, 6).is_ok());
        assert_eq!(TimeContext::new(24, 0), Err(FeatureError::InvalidHour(24)));
        assert_eq!(TimeContext::new(0, 7), Err(FeatureError::InvalidDay(7)));
    }

    #[test]
    fn test_resolve_keeps_explicit_values() {
        let ctx = TimeContext::resolve(Some(8), Some(2)).unwrap();
        assert_eq!(ctx, TimeContext { hour: 8, day_of_week: 2 });
    }

    #[test]
    fn test_cyclical_encoding() {
        let midnight = TimeContext::new(0, 0).unwrap();
        assert!(midnight.hour_sin().abs() < 1e-6);
        assert!((midnight.hour_cos() - 1.0).abs() < 1e-6);

        let six = TimeContext::new(6, 0).unwrap();
        assert!((six.hour_sin() - 1.0).abs() < 1e-6);
        assert!(six.hour_cos().abs() < 1e-6);

        assert!(midnight.day_sin().abs() < 1e-6);
    }

    #[test]
    fn test_time_windows_validate_hours() {
        assert!(TimeWindows::default().validate().is_ok());

        let late_rush = TimeWindows { evening_rush: (16, 24), ..Default::default() };
        assert_eq!(late_rush.validate(), Err(FeatureError::InvalidHour(24)));

        let night = TimeWindows { night_start: 30, ..Default::default() };
        assert_eq!(night.validate(), Err(FeatureError::InvalidHour(30)));
    }

    #[test]
    fn test_rush_hour_boundaries() {
        let windows = TimeWindows::default();
        assert!(!windows.is_morning_rush(6));
        assert!(windows.is_morning_rush(7));
        assert!(windows.is_morning_rush(9));
        assert!(!windows.is_morning_rush(10));
        assert!(windows.is_evening_rush(16));
        assert!(windows.is_evening_rush(19));
        assert!(!windows.is_evening_rush(20));
    }

    #[test]
    fn test_night_wraps_midnight() {
        let windows = TimeWindows::default();
        assert!(windows.is_night(22));
        assert!(windows.is_night(0));
        assert!(windows.is_night(3));
        assert!(!windows.is_night(4));
        assert!(!windows.is_night(21));

        let late = TimeWindows { night_end: 6, ..Default::default() };
        assert!(late.is_night(5));
    }

    #[test]
    fn test_weekend() {
        let windows = TimeWindows::default();
        assert!(!windows.flags(&TimeContext::new(12, 4).unwrap()).is_weekend);
        assert!(windows.flags(&TimeContext::new(12, 5).unwrap()).is_weekend);
        assert!(windows.flags(&TimeContext::new(12, 6).unwrap()).is_weekend);
    }
}
