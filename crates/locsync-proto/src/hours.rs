//! Daily opening hours and the "open now" status derived from them.

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

/// Same window every day, `[open_hour, close_hour)` in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(default = "default_open_hour")]
    pub open_hour: u32,
    #[serde(default = "default_close_hour")]
    pub close_hour: u32,
}

impl Default for OpeningHours {
    fn default() -> Self {
        Self {
            open_hour: default_open_hour(),
            close_hour: default_close_hour(),
        }
    }
}

fn default_open_hour() -> u32 {
    12
}

fn default_close_hour() -> u32 {
    21
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStatus {
    Open,
    Closed,
}

impl OpenStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "Open now",
            Self::Closed => "Closed now",
        }
    }
}

impl OpeningHours {
    pub fn status_at_hour(&self, hour: u32) -> OpenStatus {
        if hour >= self.open_hour && hour < self.close_hour {
            OpenStatus::Open
        } else {
            OpenStatus::Closed
        }
    }

    pub fn status_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> OpenStatus {
        self.status_at_hour(now.hour())
    }

    /// "12:00 - 21:00"
    pub fn window_label(&self) -> String {
        format!("{}:00 - {}:00", self.open_hour, self.close_hour)
    }

    /// "Today open: 12:00 - 21:00"
    pub fn today_line<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String {
        let word = match self.status_at(now) {
            OpenStatus::Open => "open",
            OpenStatus::Closed => "closed",
        };
        format!("Today {}: {}", word, self.window_label())
    }
}

/// Row of the weekly hours grid that `now` falls on; the grid starts on
/// Sunday.
pub fn grid_row<Tz: TimeZone>(now: &DateTime<Tz>) -> usize {
    now.weekday().num_days_from_sunday() as usize
}
