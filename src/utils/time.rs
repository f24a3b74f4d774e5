use std::fmt::Display;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Timelike};
use clap::ValueEnum;

/// This is the standard way of converting a date to a string in wellhive. It is also the format
/// dates are stored in.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum DateStyle {
    #[default]
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Parses a calendar day. ISO dates are tried first, then phrases like "yesterday" or
/// "3 days ago" relative to `now`.
pub fn parse_day<Tz: TimeZone>(input: &str, now: DateTime<Tz>, style: DateStyle) -> Result<NaiveDate>
where
    Tz::Offset: Copy,
{
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }
    chrono_english::parse_date_string(input, now, style.into())
        .map(|v| v.date_naive())
        .map_err(|e| anyhow!("Can't parse \"{input}\" as a date: {e}"))
}

/// Parses "HH:MM" in 24-hour format.
pub fn parse_time_of_day(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|e| anyhow!("Can't parse \"{input}\" as HH:MM: {e}"))
}

/// Drops seconds and below. Reminders work with minute resolution.
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}
