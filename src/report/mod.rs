//! Turns entries returned by a range query into something a person reads: plain text, a chart,
//! or a paginated PDF. Everything here is pure formatting except the `export_*` helpers, which
//! write their output through [write_atomically].

pub mod chart;
pub mod pdf;
pub mod raster;

use std::path::Path;

use image::ImageFormat;
use serde::Serialize;
use tracing::info;

use crate::{
    error::{TrackerError, TrackerResult},
    fs::operations::write_atomically,
    storage::{
        entities::{Entry, EntryValue, TrackerKind},
        entry_store::DateRange,
    },
    utils::time::date_to_record_name,
};

use self::{
    chart::Chart,
    pdf::{render_pdf, BackgroundImage},
    raster::{encode, rasterize, ChartFont, ChartFormat},
};

/// One report line, e.g. `Date: 2024-01-01 | Sleep Duration: 7 hours`. Line breaks inside a
/// note are flattened so every entry stays on its own line.
pub fn format_entry_line(kind: TrackerKind, entry: &Entry) -> String {
    let date = date_to_record_name(entry.date);
    let value = match &entry.value {
        EntryValue::Text(text) => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        value => value.to_string(),
    };
    match kind.unit() {
        Some(unit) => format!("Date: {date} | {}: {value} {unit}", kind.label()),
        None => format!("Date: {date} | {}: {value}", kind.label()),
    }
}

/// Report body: one line per row, each terminated by a newline.
pub fn render_text(kind: TrackerKind, rows: &[Entry]) -> String {
    rows.iter().fold(String::new(), |mut acc, entry| {
        acc.push_str(&format_entry_line(kind, entry));
        acc.push('\n');
        acc
    })
}

/// Title line of a report. Bounded ranges are echoed.
pub fn report_header(kind: TrackerKind, range: &DateRange) -> String {
    let title = kind.report_title();
    match (range.start, range.end) {
        (Some(start), Some(end)) => format!(
            "{title} from {} to {}:",
            date_to_record_name(start),
            date_to_record_name(end)
        ),
        (Some(start), None) => format!("{title} from {}:", date_to_record_name(start)),
        (None, Some(end)) => format!("{title} until {}:", date_to_record_name(end)),
        (None, None) => format!("{title} (All Records):"),
    }
}

/// Header, a blank line and the body. An empty result says so instead of printing nothing.
pub fn render_report(kind: TrackerKind, rows: &[Entry], range: &DateRange) -> String {
    let mut report = report_header(kind, range);
    report.push_str("\n\n");
    if rows.is_empty() {
        report.push_str(&format!("No {kind} data available.\n"));
    } else {
        report.push_str(&render_text(kind, rows));
    }
    report
}

#[derive(Serialize)]
struct JsonReport<'a> {
    kind: TrackerKind,
    range: &'a DateRange,
    entries: &'a [Entry],
}

pub fn render_json(kind: TrackerKind, rows: &[Entry], range: &DateRange) -> TrackerResult<String> {
    serde_json::to_string_pretty(&JsonReport {
        kind,
        range,
        entries: rows,
    })
    .map_err(|e| TrackerError::Render(e.to_string()))
}

/// Renders the rows into a PDF and writes it to `path`. Nothing is written for an empty range.
pub fn export_pdf(
    kind: TrackerKind,
    rows: &[Entry],
    range: &DateRange,
    background: Option<&BackgroundImage>,
    path: &Path,
) -> TrackerResult<()> {
    if rows.is_empty() {
        return Err(TrackerError::NoData { kind });
    }
    let title = report_header(kind, range);
    let title = title.trim_end_matches(':');
    let lines = rows
        .iter()
        .map(|entry| format_entry_line(kind, entry))
        .collect::<Vec<_>>();
    let bytes = render_pdf(title, &lines, background);
    write_atomically(path, &bytes).map_err(|source| TrackerError::Export {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Exported {} {kind} entries to {path:?}", rows.len());
    Ok(())
}

/// Writes the chart as PNG, JPEG or SVG, depending on the extension of `path`. Bitmaps are
/// labelled with `font`, or with a system font when none is given.
pub fn export_chart(
    kind: TrackerKind,
    chart: &Chart,
    path: &Path,
    font: Option<&Path>,
) -> TrackerResult<()> {
    if chart.is_empty() {
        return Err(TrackerError::NoData { kind });
    }
    let format = ChartFormat::from_path(path)?;
    let bytes = match format {
        ChartFormat::Svg => chart.to_svg().into_bytes(),
        ChartFormat::Png | ChartFormat::Jpeg => {
            let image = rasterize(chart, ChartFont::find(font).as_ref());
            let format = if format == ChartFormat::Png {
                ImageFormat::Png
            } else {
                ImageFormat::Jpeg
            };
            encode(&image, format)?
        }
    };
    write_atomically(path, &bytes).map_err(|source| TrackerError::Export {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Exported chart \"{}\" as {format:?} to {path:?}", chart.title);
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::{
        error::TrackerError,
        report::{
            chart::{render_chart, Chart, ChartKind},
            export_chart, export_pdf, render_json, render_report, render_text, report_header,
        },
        storage::{
            entities::{Entry, EntryValue, TrackerKind},
            entry_store::{DateRange, EntryStore},
            session::StorageSession,
        },
    };

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_render_text_sleep_range() -> anyhow::Result<()> {
        let session = StorageSession::open_in_memory()?;
        let store = session.entries(TrackerKind::Sleep);
        store.upsert(day(1), &EntryValue::Real(7.))?;
        store.upsert(day(2), &EntryValue::Real(8.))?;
        store.upsert(day(3), &EntryValue::Real(6.))?;

        let rows = store.query_range(DateRange::between(day(1), day(2)))?;
        assert_eq!(
            render_text(TrackerKind::Sleep, &rows),
            "Date: 2024-01-01 | Sleep Duration: 7 hours\nDate: 2024-01-02 | Sleep Duration: 8 hours\n"
        );
        Ok(())
    }

    #[test]
    fn test_render_text_units_and_labels() {
        let rows = [Entry::new(day(4), EntryValue::Real(1.5))];
        assert_eq!(
            render_text(TrackerKind::Water, &rows),
            "Date: 2024-01-04 | Water Intake: 1.5 liters\n"
        );
        let rows = [Entry::new(day(4), EntryValue::Text("Neutral".into()))];
        assert_eq!(
            render_text(TrackerKind::Mood, &rows),
            "Date: 2024-01-04 | Mood: Neutral\n"
        );
    }

    #[test]
    fn test_multiline_note_stays_on_one_line() {
        let rows = [Entry::new(day(1), EntryValue::Text("tea\nsun\r\n".into()))];
        assert_eq!(
            render_text(TrackerKind::Gratitude, &rows),
            "Date: 2024-01-01 | Gratitude: tea sun\n"
        );
    }

    #[test]
    fn test_headers() {
        assert_eq!(
            report_header(TrackerKind::Mood, &DateRange::between(day(1), day(7))),
            "Mood Entries Report from 2024-01-01 to 2024-01-07:"
        );
        assert_eq!(
            report_header(TrackerKind::Sleep, &DateRange::all()),
            "Sleep Duration Report (All Records):"
        );
    }

    #[test]
    fn test_render_report_empty() {
        let report = render_report(TrackerKind::Water, &[], &DateRange::day(day(3)));
        assert_eq!(
            report,
            "Water Intake Report from 2024-01-03 to 2024-01-03:\n\nNo water data available.\n"
        );
    }

    #[test]
    fn test_render_json() -> anyhow::Result<()> {
        let rows = [Entry::new(day(2), EntryValue::Real(8.))];
        let json = render_json(TrackerKind::Sleep, &rows, &DateRange::all())?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        assert_eq!(value["kind"], "sleep");
        assert_eq!(value["entries"][0]["date"], "2024-01-02");
        assert_eq!(value["entries"][0]["value"], 8.0);
        Ok(())
    }

    #[test]
    fn test_export_pdf_writes_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("Sleep_Report.pdf");
        let rows = [Entry::new(day(2), EntryValue::Real(8.))];
        export_pdf(TrackerKind::Sleep, &rows, &DateRange::all(), None, &path)?;
        let bytes = std::fs::read(&path)?;
        assert!(bytes.starts_with(b"%PDF-"));
        Ok(())
    }

    #[test]
    fn test_export_pdf_bad_path() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("missing").join("report.pdf");
        let rows = [Entry::new(day(2), EntryValue::Real(8.))];
        let err = export_pdf(TrackerKind::Sleep, &rows, &DateRange::all(), None, &path).unwrap_err();
        assert!(matches!(err, TrackerError::Export { .. }));
        Ok(())
    }

    #[test]
    fn test_export_pdf_empty_writes_nothing() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("report.pdf");
        let err = export_pdf(TrackerKind::Mood, &[], &DateRange::all(), None, &path).unwrap_err();
        assert!(matches!(err, TrackerError::NoData { kind: TrackerKind::Mood }));
        assert_eq!(err.to_string(), "No mood data available for the selected period");
        assert!(!path.exists());
        Ok(())
    }

    fn mood_chart() -> Chart {
        let rows = [
            Entry::new(day(1), EntryValue::Text("Happy".into())),
            Entry::new(day(2), EntryValue::Text("Sad".into())),
        ];
        render_chart(TrackerKind::Mood, &rows, ChartKind::Pie)
    }

    #[test]
    fn test_export_chart_formats() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let chart = mood_chart();

        let png = dir.path().join("mood.png");
        export_chart(TrackerKind::Mood, &chart, &png, None)?;
        assert!(std::fs::read(&png)?.starts_with(b"\x89PNG"));

        let jpg = dir.path().join("mood.jpg");
        export_chart(TrackerKind::Mood, &chart, &jpg, None)?;
        assert!(std::fs::read(&jpg)?.starts_with(&[0xFF, 0xD8]));

        let svg = dir.path().join("mood.svg");
        export_chart(TrackerKind::Mood, &chart, &svg, None)?;
        assert!(std::fs::read_to_string(&svg)?.starts_with("<svg"));
        Ok(())
    }

    #[test]
    fn test_export_chart_rejects_unknown_extension() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mood.gif");
        let err = export_chart(TrackerKind::Mood, &mood_chart(), &path, None).unwrap_err();
        assert!(matches!(err, TrackerError::Render(_)));
        assert!(!path.exists());

        let empty = render_chart(TrackerKind::Mood, &[], ChartKind::Bar);
        let path = dir.path().join("mood.png");
        let err = export_chart(TrackerKind::Mood, &empty, &path, None).unwrap_err();
        assert!(matches!(err, TrackerError::NoData { .. }));
        assert!(!path.exists());
        Ok(())
    }
}
