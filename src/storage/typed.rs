use std::marker::PhantomData;

use chrono::NaiveDate;

use crate::error::{TrackerError, TrackerResult};

use super::{
    entities::{EntryValue, TrackerKind},
    entry_store::{DateRange, EntryStore},
};

/// Binds a [TrackerKind] to the Rust type of its value.
pub trait Tracker {
    const KIND: TrackerKind;
    type Value;

    fn into_entry_value(value: Self::Value) -> EntryValue;

    fn from_entry_value(value: EntryValue) -> Option<Self::Value>;
}

/// Hours slept.
pub struct Sleep;
/// Liters drunk.
pub struct Water;
pub struct Mood;
pub struct Gratitude;

macro_rules! real_tracker {
    ($name:ident, $kind:expr) => {
        impl Tracker for $name {
            const KIND: TrackerKind = $kind;
            type Value = f64;

            fn into_entry_value(value: f64) -> EntryValue {
                EntryValue::Real(value)
            }

            fn from_entry_value(value: EntryValue) -> Option<f64> {
                value.as_real()
            }
        }
    };
}

macro_rules! text_tracker {
    ($name:ident, $kind:expr) => {
        impl Tracker for $name {
            const KIND: TrackerKind = $kind;
            type Value = String;

            fn into_entry_value(value: String) -> EntryValue {
                EntryValue::Text(value)
            }

            fn from_entry_value(value: EntryValue) -> Option<String> {
                match value {
                    EntryValue::Text(v) => Some(v),
                    EntryValue::Real(_) => None,
                }
            }
        }
    };
}

real_tracker!(Sleep, TrackerKind::Sleep);
real_tracker!(Water, TrackerKind::Water);
text_tracker!(Mood, TrackerKind::Mood);
text_tracker!(Gratitude, TrackerKind::Gratitude);

/// Typed view over a generic [EntryStore].
pub struct TypedStore<S, T> {
    inner: S,
    _tracker: PhantomData<T>,
}

impl<S: EntryStore, T: Tracker> TypedStore<S, T> {
    pub fn new(inner: S) -> Self {
        debug_assert_eq!(inner.kind(), T::KIND);
        Self {
            inner,
            _tracker: PhantomData,
        }
    }

    fn convert(value: EntryValue) -> TrackerResult<T::Value> {
        let shown = value.to_string();
        T::from_entry_value(value).ok_or(TrackerError::InvalidValue {
            kind: T::KIND,
            value: shown,
            reason: "stored value has the wrong type",
        })
    }

    pub fn upsert(&self, date: NaiveDate, value: T::Value) -> TrackerResult<()> {
        self.inner.upsert(date, &T::into_entry_value(value))
    }

    pub fn get(&self, date: NaiveDate) -> TrackerResult<Option<T::Value>> {
        self.inner.get(date)?.map(Self::convert).transpose()
    }

    pub fn query_range(&self, range: DateRange) -> TrackerResult<Vec<(NaiveDate, T::Value)>> {
        self.inner
            .query_range(range)?
            .into_iter()
            .map(|e| Ok((e.date, Self::convert(e.value)?)))
            .collect()
    }

    pub fn delete(&self, date: NaiveDate) -> TrackerResult<()> {
        self.inner.delete(date)
    }

    pub fn update(&self, date: NaiveDate, value: T::Value) -> TrackerResult<()> {
        self.inner.update(date, &T::into_entry_value(value))
    }

    pub fn untyped(&self) -> &S {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::storage::{
        entities::{EntryValue, TrackerKind},
        entry_store::{DateRange, EntryStore},
        session::StorageSession,
        typed::{Gratitude, Mood, Sleep, Water},
    };

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_typed_round_trip() -> anyhow::Result<()> {
        let session = StorageSession::open_in_memory()?;

        session.typed::<Sleep>().upsert(day(1), 7.5)?;
        session.typed::<Water>().upsert(day(1), 2.)?;
        session.typed::<Mood>().upsert(day(1), "Excited".into())?;
        session
            .typed::<Gratitude>()
            .upsert(day(1), "Coffee with a friend".into())?;

        assert_eq!(session.typed::<Sleep>().get(day(1))?, Some(7.5));
        assert_eq!(session.typed::<Water>().get(day(1))?, Some(2.));
        assert_eq!(
            session.typed::<Mood>().get(day(1))?.as_deref(),
            Some("Excited")
        );

        assert_eq!(
            session.entries(TrackerKind::Gratitude).get(day(1))?,
            Some(EntryValue::Text("Coffee with a friend".into()))
        );
        Ok(())
    }

    #[test]
    fn test_typed_range_and_delete() -> anyhow::Result<()> {
        let session = StorageSession::open_in_memory()?;
        let water = session.typed::<Water>();
        water.upsert(day(2), 1.5)?;
        water.upsert(day(4), 2.5)?;

        assert_eq!(
            water.query_range(DateRange::between(day(1), day(3)))?,
            vec![(day(2), 1.5)]
        );

        water.delete(day(2))?;
        assert!(water.delete(day(2)).unwrap_err().is_not_found());
        assert!(water.update(day(3), 1.).unwrap_err().is_not_found());
        water.update(day(4), 3.)?;
        assert_eq!(water.untyped().get(day(4))?, Some(EntryValue::Real(3.)));
        Ok(())
    }
}
