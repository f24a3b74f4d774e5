use std::fmt::Display;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};

/// Moods offered by the mood view. Anything else is still accepted and stored verbatim.
pub const MOOD_CHOICES: [&str; 6] = ["Angry", "Happy", "Sad", "Neutral", "Excited", "Stressed"];

/// Kinds of per-date entries. Every kind owns exactly one table with a `date` key and one value
/// column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerKind {
    Sleep,
    Water,
    Mood,
    Gratitude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Real,
    Text,
}

impl TrackerKind {
    pub const ALL: [TrackerKind; 4] = [
        TrackerKind::Sleep,
        TrackerKind::Water,
        TrackerKind::Mood,
        TrackerKind::Gratitude,
    ];

    pub fn table(self) -> &'static str {
        match self {
            TrackerKind::Sleep => "sleep_entries",
            TrackerKind::Water => "water_entries",
            TrackerKind::Mood => "mood_entries",
            TrackerKind::Gratitude => "gratitude_entries",
        }
    }

    pub fn value_column(self) -> &'static str {
        match self {
            TrackerKind::Sleep => "duration",
            TrackerKind::Water => "intake",
            TrackerKind::Mood => "mood_entry",
            TrackerKind::Gratitude => "gratitude",
        }
    }

    pub fn value_kind(self) -> ValueKind {
        match self {
            TrackerKind::Sleep | TrackerKind::Water => ValueKind::Real,
            TrackerKind::Mood | TrackerKind::Gratitude => ValueKind::Text,
        }
    }

    /// Field name used in report lines.
    pub fn label(self) -> &'static str {
        match self {
            TrackerKind::Sleep => "Sleep Duration",
            TrackerKind::Water => "Water Intake",
            TrackerKind::Mood => "Mood",
            TrackerKind::Gratitude => "Gratitude",
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            TrackerKind::Sleep => Some("hours"),
            TrackerKind::Water => Some("liters"),
            TrackerKind::Mood | TrackerKind::Gratitude => None,
        }
    }

    pub fn report_title(self) -> &'static str {
        match self {
            TrackerKind::Sleep => "Sleep Duration Report",
            TrackerKind::Water => "Water Intake Report",
            TrackerKind::Mood => "Mood Entries Report",
            TrackerKind::Gratitude => "Gratitude Report",
        }
    }

    /// Turns user input into a storable value. Numbers must be finite and positive, text must
    /// not be blank.
    pub fn parse_value(self, raw: &str) -> TrackerResult<EntryValue> {
        let trimmed = raw.trim();
        let invalid = |reason| TrackerError::InvalidValue {
            kind: self,
            value: raw.to_string(),
            reason,
        };
        if trimmed.is_empty() {
            return Err(invalid("value is empty"));
        }
        match self.value_kind() {
            ValueKind::Real => {
                let v = trimmed
                    .parse::<f64>()
                    .map_err(|_| invalid("expected a number"))?;
                if !v.is_finite() || v <= 0. {
                    return Err(invalid("expected a positive number"));
                }
                Ok(EntryValue::Real(v))
            }
            ValueKind::Text => Ok(EntryValue::Text(trimmed.to_string())),
        }
    }
}

impl Display for TrackerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerKind::Sleep => write!(f, "sleep"),
            TrackerKind::Water => write!(f, "water"),
            TrackerKind::Mood => write!(f, "mood"),
            TrackerKind::Gratitude => write!(f, "gratitude"),
        }
    }
}

/// Value stored for one date. Numeric kinds hold [EntryValue::Real], the rest hold text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryValue {
    Real(f64),
    Text(String),
}

impl EntryValue {
    pub fn as_real(&self) -> Option<f64> {
        match self {
            EntryValue::Real(v) => Some(*v),
            EntryValue::Text(_) => None,
        }
    }
}

/// Whole numbers print without a fractional part, so 7.0 hours shows as "7".
impl Display for EntryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryValue::Real(v) => write!(f, "{v}"),
            EntryValue::Text(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub date: NaiveDate,
    pub value: EntryValue,
}

impl Entry {
    pub fn new(date: NaiveDate, value: EntryValue) -> Self {
        Self { date, value }
    }
}

#[cfg(test)]
mod tests {
    use super::{EntryValue, TrackerKind};

    #[test]
    fn test_parse_numeric_value() {
        assert_eq!(
            TrackerKind::Sleep.parse_value(" 7.5 ").unwrap(),
            EntryValue::Real(7.5)
        );
        assert!(TrackerKind::Water.parse_value("lots").is_err());
        assert!(TrackerKind::Water.parse_value("-1").is_err());
        assert!(TrackerKind::Sleep.parse_value("0").is_err());
        assert!(TrackerKind::Sleep.parse_value("NaN").is_err());
    }

    #[test]
    fn test_parse_text_value() {
        assert_eq!(
            TrackerKind::Mood.parse_value("Happy").unwrap(),
            EntryValue::Text("Happy".into())
        );
        assert!(TrackerKind::Gratitude.parse_value("   ").is_err());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(EntryValue::Real(7.).to_string(), "7");
        assert_eq!(EntryValue::Real(1.25).to_string(), "1.25");
        assert_eq!(EntryValue::Text("Sad".into()).to_string(), "Sad");
    }
}
