use anyhow::Result;
use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::{
    report::format_entry_line,
    storage::{
        entities::{Entry, TrackerKind, MOOD_CHOICES},
        entry_store::EntryStore,
    },
    utils::time::{parse_day, DateStyle},
};

use super::AppContext;

/// Day given on the command line, or today.
fn resolve_day(date: Option<&str>, date_style: DateStyle) -> Result<NaiveDate> {
    let now = Local::now();
    match date {
        Some(date) => parse_day(date, now, date_style),
        None => Ok(now.date_naive()),
    }
}

pub fn log_entry(
    ctx: &AppContext,
    kind: TrackerKind,
    raw_value: &str,
    date: Option<&str>,
    date_style: DateStyle,
) -> Result<()> {
    let date = resolve_day(date, date_style)?;
    let value = kind.parse_value(raw_value)?;
    if kind == TrackerKind::Mood && !MOOD_CHOICES.contains(&raw_value.trim()) {
        debug!("Storing custom mood {raw_value:?}");
    }
    ctx.session.entries(kind).upsert(date, &value)?;
    println!("Saved {}", format_entry_line(kind, &Entry::new(date, value)));
    Ok(())
}

pub fn show_entry(
    ctx: &AppContext,
    kind: TrackerKind,
    date: Option<&str>,
    date_style: DateStyle,
) -> Result<()> {
    let date = resolve_day(date, date_style)?;
    match ctx.session.entries(kind).get(date)? {
        Some(value) => println!("{}", format_entry_line(kind, &Entry::new(date, value))),
        None => println!("No {kind} entry for {date}."),
    }
    Ok(())
}

pub fn edit_entry(
    ctx: &AppContext,
    kind: TrackerKind,
    date: &str,
    raw_value: &str,
    date_style: DateStyle,
) -> Result<()> {
    let date = resolve_day(Some(date), date_style)?;
    let value = kind.parse_value(raw_value)?;
    ctx.session.entries(kind).update(date, &value)?;
    println!("Updated {}", format_entry_line(kind, &Entry::new(date, value)));
    Ok(())
}

pub fn delete_entry(
    ctx: &AppContext,
    kind: TrackerKind,
    date: &str,
    date_style: DateStyle,
) -> Result<()> {
    let date = resolve_day(Some(date), date_style)?;
    ctx.session.entries(kind).delete(date)?;
    println!("Deleted the {kind} entry for {date}.");
    Ok(())
}
