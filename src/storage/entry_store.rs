use std::ops::Deref;

use chrono::{Days, Months, NaiveDate};
use rusqlite::{
    types::{ToSql, ToSqlOutput},
    Connection, OptionalExtension,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{TrackerError, TrackerResult};

use super::entities::{Entry, EntryValue, TrackerKind, ValueKind};

/// Inclusive interval of calendar days. A missing bound is open, so [DateRange::all] covers every
/// stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::between(date, date)
    }

    /// `days` days back from `today`, both ends included.
    pub fn trailing_days(today: NaiveDate, days: u32) -> Self {
        let start = today
            .checked_sub_days(Days::new(days.into()))
            .unwrap_or(NaiveDate::MIN);
        Self::between(start, today)
    }

    pub fn trailing_month(today: NaiveDate) -> Self {
        let start = today
            .checked_sub_months(Months::new(1))
            .unwrap_or(NaiveDate::MIN);
        Self::between(start, today)
    }

    pub fn is_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

/// Interface for abstracting storage of entries of one [TrackerKind]. Every date holds at most
/// one entry; writing a date again replaces its value.
pub trait EntryStore {
    fn kind(&self) -> TrackerKind;

    /// Writes or replaces the value stored for `date`.
    fn upsert(&self, date: NaiveDate, value: &EntryValue) -> TrackerResult<()>;

    /// Absent entries are `None`, not an error.
    fn get(&self, date: NaiveDate) -> TrackerResult<Option<EntryValue>>;

    /// Entries inside `range`, ascending by date.
    fn query_range(&self, range: DateRange) -> TrackerResult<Vec<Entry>>;

    /// Fails with [TrackerError::NotFound] when nothing is stored for `date`.
    fn delete(&self, date: NaiveDate) -> TrackerResult<()>;

    /// Same write as [EntryStore::upsert], but only for a date that already has an entry.
    fn update(&self, date: NaiveDate, value: &EntryValue) -> TrackerResult<()>;
}

impl<T: Deref> EntryStore for T
where
    T::Target: EntryStore,
{
    fn kind(&self) -> TrackerKind {
        self.deref().kind()
    }

    fn upsert(&self, date: NaiveDate, value: &EntryValue) -> TrackerResult<()> {
        self.deref().upsert(date, value)
    }

    fn get(&self, date: NaiveDate) -> TrackerResult<Option<EntryValue>> {
        self.deref().get(date)
    }

    fn query_range(&self, range: DateRange) -> TrackerResult<Vec<Entry>> {
        self.deref().query_range(range)
    }

    fn delete(&self, date: NaiveDate) -> TrackerResult<()> {
        self.deref().delete(date)
    }

    fn update(&self, date: NaiveDate, value: &EntryValue) -> TrackerResult<()> {
        self.deref().update(date, value)
    }
}

impl ToSql for EntryValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            EntryValue::Real(v) => ToSqlOutput::from(*v),
            EntryValue::Text(v) => ToSqlOutput::from(v.as_str()),
        })
    }
}

/// Statement creating the table of `kind` when it is missing.
pub(super) fn create_table_sql(kind: TrackerKind) -> String {
    let column_type = match kind.value_kind() {
        ValueKind::Real => "REAL",
        ValueKind::Text => "TEXT",
    };
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
  date TEXT NOT NULL PRIMARY KEY CHECK (date IS date(date)),
  {column} {column_type} NOT NULL
);
"#,
        table = kind.table(),
        column = kind.value_column(),
    )
}

/// The main realization of [EntryStore], backed by the connection of a
/// [StorageSession](super::session::StorageSession).
pub struct SqliteEntryStore<'a> {
    conn: &'a Connection,
    kind: TrackerKind,
}

impl<'a> SqliteEntryStore<'a> {
    pub fn new(conn: &'a Connection, kind: TrackerKind) -> Self {
        Self { conn, kind }
    }

    fn check_value(&self, value: &EntryValue) -> TrackerResult<()> {
        let matches = match (self.kind.value_kind(), value) {
            (ValueKind::Real, EntryValue::Real(_)) | (ValueKind::Text, EntryValue::Text(_)) => {
                true
            }
            (ValueKind::Real, EntryValue::Text(_)) | (ValueKind::Text, EntryValue::Real(_)) => {
                false
            }
        };
        if matches {
            Ok(())
        } else {
            Err(TrackerError::InvalidValue {
                kind: self.kind,
                value: value.to_string(),
                reason: "value type doesn't match the tracker",
            })
        }
    }

    fn read_value(&self, row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<EntryValue> {
        match self.kind.value_kind() {
            ValueKind::Real => row.get::<_, f64>(index).map(EntryValue::Real),
            ValueKind::Text => row.get::<_, String>(index).map(EntryValue::Text),
        }
    }
}

impl EntryStore for SqliteEntryStore<'_> {
    fn kind(&self) -> TrackerKind {
        self.kind
    }

    fn upsert(&self, date: NaiveDate, value: &EntryValue) -> TrackerResult<()> {
        self.check_value(value)?;
        let sql = format!(
            r#"
INSERT INTO {table} (date, {column})
VALUES (?1, ?2)
ON CONFLICT(date) DO UPDATE SET
  {column}=excluded.{column}
"#,
            table = self.kind.table(),
            column = self.kind.value_column(),
        );
        self.conn.execute(&sql, (date, value))?;
        info!(kind = %self.kind, %date, %value, "Saved entry");
        Ok(())
    }

    fn get(&self, date: NaiveDate) -> TrackerResult<Option<EntryValue>> {
        let sql = format!(
            "SELECT {column} FROM {table} WHERE date = ?1",
            table = self.kind.table(),
            column = self.kind.value_column(),
        );
        let value = self
            .conn
            .query_row(&sql, [date], |row| self.read_value(row, 0))
            .optional()?;
        debug!(kind = %self.kind, %date, found = value.is_some(), "Looked up entry");
        Ok(value)
    }

    fn query_range(&self, range: DateRange) -> TrackerResult<Vec<Entry>> {
        let sql = format!(
            r#"
SELECT date, {column} FROM {table}
WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
ORDER BY date ASC
"#,
            table = self.kind.table(),
            column = self.kind.value_column(),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map((range.start, range.end), |row| {
            Ok(Entry {
                date: row.get(0)?,
                value: self.read_value(row, 1)?,
            })
        })?;
        let mut entries = Vec::new();
        for r in rows {
            entries.push(r?);
        }
        debug!(kind = %self.kind, ?range, count = entries.len(), "Queried entries");
        Ok(entries)
    }

    fn delete(&self, date: NaiveDate) -> TrackerResult<()> {
        let sql = format!("DELETE FROM {table} WHERE date = ?1", table = self.kind.table());
        let deleted = self.conn.execute(&sql, [date])?;
        if deleted == 0 {
            return Err(TrackerError::NotFound {
                kind: self.kind,
                date,
            });
        }
        info!(kind = %self.kind, %date, "Deleted entry");
        Ok(())
    }

    fn update(&self, date: NaiveDate, value: &EntryValue) -> TrackerResult<()> {
        self.check_value(value)?;
        let sql = format!(
            "UPDATE {table} SET {column} = ?2 WHERE date = ?1",
            table = self.kind.table(),
            column = self.kind.value_column(),
        );
        let updated = self.conn.execute(&sql, (date, value))?;
        if updated == 0 {
            return Err(TrackerError::NotFound {
                kind: self.kind,
                date,
            });
        }
        info!(kind = %self.kind, %date, %value, "Updated entry");
        Ok(())
    }
}
