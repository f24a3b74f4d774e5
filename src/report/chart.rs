use std::{collections::BTreeMap, f64::consts::PI, fmt::Write};

use ansi_term::Colour;
use clap::ValueEnum;

use crate::{
    storage::entities::{Entry, EntryValue, TrackerKind, ValueKind},
    utils::{percentage::Percentage, time::date_to_record_name},
};

pub(super) const PALETTE: [&str; 6] = ["#ff9999", "#66b3ff", "#99ff99", "#ffcc99", "#c2c2f0", "#ffb3e6"];

pub(super) const CHART_WIDTH: f64 = 640.;
pub(super) const CHART_HEIGHT: f64 = 420.;
const TERMINAL_BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ChartKind {
    #[default]
    Pie,
    Bar,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Rendered chart. Holds the aggregated points and knows how to draw itself as an SVG image or
/// as text bars for the terminal. Bitmaps are drawn by [super::raster].
#[derive(Debug, Clone)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub points: Vec<ChartPoint>,
}

/// Numeric trackers are summed per date. Text trackers are counted per distinct value, which is
/// what a mood distribution shows. Labels come out ascending.
pub fn aggregate(kind: TrackerKind, rows: &[Entry]) -> Vec<ChartPoint> {
    match kind.value_kind() {
        ValueKind::Real => {
            let mut sums = BTreeMap::new();
            for row in rows {
                if let EntryValue::Real(v) = row.value {
                    *sums.entry(row.date).or_insert(0.) += v;
                }
            }
            sums.into_iter()
                .map(|(date, value)| ChartPoint {
                    label: date_to_record_name(date),
                    value,
                })
                .collect()
        }
        ValueKind::Text => {
            let mut counts = BTreeMap::<&str, f64>::new();
            for row in rows {
                if let EntryValue::Text(v) = &row.value {
                    *counts.entry(v.as_str()).or_insert(0.) += 1.;
                }
            }
            counts
                .into_iter()
                .map(|(label, value)| ChartPoint {
                    label: label.to_string(),
                    value,
                })
                .collect()
        }
    }
}

pub fn render_chart(kind: TrackerKind, rows: &[Entry], chart_kind: ChartKind) -> Chart {
    Chart {
        kind: chart_kind,
        title: format!("{} Distribution", kind.label()),
        points: aggregate(kind, rows),
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Formats a value without a trailing `.0` for whole numbers.
pub(super) fn format_value(value: f64) -> String {
    format!("{value}")
}

impl Chart {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }

    pub(super) fn max(&self) -> f64 {
        self.points.iter().map(|p| p.value).fold(0., f64::max)
    }

    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        // Writing into a String can't fail.
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{CHART_WIDTH}" height="{CHART_HEIGHT}" viewBox="0 0 {CHART_WIDTH} {CHART_HEIGHT}">"#
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="30" font-family="Helvetica, Arial, sans-serif" font-size="18" text-anchor="middle">{}</text>"#,
            CHART_WIDTH / 2.,
            escape_xml(&self.title)
        );
        match self.kind {
            ChartKind::Pie => self.write_pie(&mut svg),
            ChartKind::Bar => self.write_bars(&mut svg),
        }
        svg.push_str("</svg>\n");
        svg
    }

    fn write_pie(&self, svg: &mut String) {
        let (cx, cy, r) = (220., 225., 160.);
        let total = self.total();
        if total <= 0. {
            return;
        }

        // Slices go counterclockwise starting at 12 o'clock.
        let mut angle = PI / 2.;
        for (i, point) in self.points.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let sweep = point.value / total * 2. * PI;
            if point.value >= total {
                let _ = writeln!(
                    svg,
                    r#"<circle cx="{cx}" cy="{cy}" r="{r}" fill="{color}" stroke="white"/>"#
                );
            } else if sweep > 0. {
                let (x0, y0) = (cx + r * angle.cos(), cy - r * angle.sin());
                let end = angle + sweep;
                let (x1, y1) = (cx + r * end.cos(), cy - r * end.sin());
                let large = if sweep > PI { 1 } else { 0 };
                let _ = writeln!(
                    svg,
                    r#"<path d="M {cx} {cy} L {x0:.2} {y0:.2} A {r} {r} 0 {large} 0 {x1:.2} {y1:.2} Z" fill="{color}" stroke="white"/>"#
                );
            }

            let mid = angle + sweep / 2.;
            if let Some(share) = Percentage::share(point.value, total) {
                let (lx, ly) = (cx + r * 0.6 * mid.cos(), cy - r * 0.6 * mid.sin());
                let _ = writeln!(
                    svg,
                    r#"<text x="{lx:.2}" y="{ly:.2}" font-family="Helvetica, Arial, sans-serif" font-size="12" text-anchor="middle">{share}</text>"#
                );
            }
            let (tx, ty) = (cx + r * 1.12 * mid.cos(), cy - r * 1.12 * mid.sin());
            let anchor = if mid.cos() < 0. { "end" } else { "start" };
            let _ = writeln!(
                svg,
                r#"<text x="{tx:.2}" y="{ty:.2}" font-family="Helvetica, Arial, sans-serif" font-size="12" text-anchor="{anchor}">{}</text>"#,
                escape_xml(&point.label)
            );
            angle += sweep;
        }
    }

    fn write_bars(&self, svg: &mut String) {
        let (left, right, top, bottom) = (60., CHART_WIDTH - 20., 60., CHART_HEIGHT - 60.);
        let max = self.max();
        let _ = writeln!(
            svg,
            r#"<line x1="{left}" y1="{bottom}" x2="{right}" y2="{bottom}" stroke="black"/>"#
        );
        let _ = writeln!(
            svg,
            r#"<line x1="{left}" y1="{top}" x2="{left}" y2="{bottom}" stroke="black"/>"#
        );
        if self.points.is_empty() || max <= 0. {
            return;
        }

        let slot = (right - left) / self.points.len() as f64;
        let width = slot * 0.7;
        for (i, point) in self.points.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let height = point.value / max * (bottom - top);
            let x = left + slot * i as f64 + (slot - width) / 2.;
            let y = bottom - height;
            let _ = writeln!(
                svg,
                r#"<rect x="{x:.2}" y="{y:.2}" width="{width:.2}" height="{height:.2}" fill="{color}"/>"#
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.2}" y="{:.2}" font-family="Helvetica, Arial, sans-serif" font-size="11" text-anchor="middle">{}</text>"#,
                x + width / 2.,
                y - 4.,
                format_value(point.value)
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.2}" y="{:.2}" font-family="Helvetica, Arial, sans-serif" font-size="11" text-anchor="middle">{}</text>"#,
                x + width / 2.,
                bottom + 16.,
                escape_xml(&point.label)
            );
        }
    }

    /// Horizontal bars for the terminal. Pie charts get their share appended to each row.
    pub fn to_terminal(&self) -> String {
        let mut out = format!("{}\n", self.title);
        let max = self.max();
        let total = self.total();
        let label_width = self
            .points
            .iter()
            .map(|p| p.label.chars().count())
            .max()
            .unwrap_or(0);

        for (i, point) in self.points.iter().enumerate() {
            let length = if max > 0. {
                ((point.value / max) * TERMINAL_BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            let length = if point.value > 0. { length.max(1) } else { length };
            let bar = "█".repeat(length);
            let colour = match i % 3 {
                0 => Colour::Cyan,
                1 => Colour::Green,
                _ => Colour::Yellow,
            };
            let _ = write!(
                out,
                "{:>label_width$} | {} {}",
                point.label,
                colour.paint(bar),
                format_value(point.value)
            );
            if self.kind == ChartKind::Pie {
                if let Some(share) = Percentage::share(point.value, total) {
                    let _ = write!(out, " ({share})");
                }
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{
        report::chart::{aggregate, render_chart, ChartKind, ChartPoint},
        storage::entities::{Entry, EntryValue, TrackerKind},
    };

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_aggregate_sums_duplicate_dates() {
        let rows = [
            Entry::new(day(2), EntryValue::Real(1.5)),
            Entry::new(day(1), EntryValue::Real(2.)),
            Entry::new(day(2), EntryValue::Real(0.5)),
        ];
        assert_eq!(
            aggregate(TrackerKind::Water, &rows),
            vec![
                ChartPoint {
                    label: "2024-01-01".into(),
                    value: 2.
                },
                ChartPoint {
                    label: "2024-01-02".into(),
                    value: 2.
                },
            ]
        );
    }

    #[test]
    fn test_aggregate_counts_moods() {
        let rows = [
            Entry::new(day(1), EntryValue::Text("Happy".into())),
            Entry::new(day(2), EntryValue::Text("Sad".into())),
            Entry::new(day(3), EntryValue::Text("Happy".into())),
        ];
        let points = aggregate(TrackerKind::Mood, &rows);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].label, "Happy");
        assert_eq!(points[0].value, 2.);
        assert_eq!(points[1].label, "Sad");
        assert_eq!(points[1].value, 1.);
    }

    #[test]
    fn test_pie_svg() {
        let rows = [
            Entry::new(day(1), EntryValue::Real(7.)),
            Entry::new(day(2), EntryValue::Real(7.)),
            Entry::new(day(3), EntryValue::Real(14.)),
        ];
        let chart = render_chart(TrackerKind::Sleep, &rows, ChartKind::Pie);
        assert_eq!(chart.title, "Sleep Duration Distribution");
        let svg = chart.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<path").count(), 3);
        assert!(svg.contains("25.0%"));
        assert!(svg.contains("50.0%"));
        assert!(svg.contains("2024-01-03"));
    }

    #[test]
    fn test_single_slice_is_circle() {
        let rows = [Entry::new(day(1), EntryValue::Text("Calm & <ok>".into()))];
        let svg = render_chart(TrackerKind::Mood, &rows, ChartKind::Pie).to_svg();
        assert!(svg.contains("<circle"));
        assert!(svg.contains("100.0%"));
        assert!(svg.contains("Calm &amp; &lt;ok&gt;"));
    }

    #[test]
    fn test_bar_svg() {
        let rows = [
            Entry::new(day(1), EntryValue::Real(1.)),
            Entry::new(day(2), EntryValue::Real(2.)),
        ];
        let svg = render_chart(TrackerKind::Water, &rows, ChartKind::Bar).to_svg();
        // Background plus one rect per bar.
        assert_eq!(svg.matches("<rect").count(), 3);
    }

    #[test]
    fn test_terminal_chart() {
        let rows = [
            Entry::new(day(1), EntryValue::Real(2.)),
            Entry::new(day(2), EntryValue::Real(6.)),
        ];
        let text = render_chart(TrackerKind::Sleep, &rows, ChartKind::Pie).to_terminal();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("2024-01-01 |"));
        assert!(lines[1].ends_with("2 (25.0%)"));
        assert!(lines[2].ends_with("6 (75.0%)"));
    }

    #[test]
    fn test_empty_chart() {
        let chart = render_chart(TrackerKind::Sleep, &[], ChartKind::Bar);
        assert!(chart.is_empty());
        assert!(chart.to_svg().contains("</svg>"));
    }
}
