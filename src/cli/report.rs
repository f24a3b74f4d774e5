use std::path::Path;

use anyhow::{bail, Result};
use chrono::{DateTime, Local, TimeZone};
use clap::{CommandFactory, ValueEnum};

use crate::{
    report::{
        chart::{render_chart, ChartKind},
        export_chart, export_pdf,
        pdf::BackgroundImage,
        render_json, render_report,
    },
    storage::{entities::TrackerKind, entry_store::{DateRange, EntryStore}},
    utils::time::{parse_day, DateStyle},
};

use super::{AppContext, Args};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Period {
    Today,
    Week,
    Month,
}

#[derive(Debug, Clone, clap::Args)]
pub struct RangeArgs {
    #[arg(
        long,
        short,
        help = "First day of the range. Examples are \"yesterday\", \"3 days ago\", \"15/03/2025\", \"2025-03-15\""
    )]
    start: Option<String>,
    #[arg(
        long,
        short,
        help = "Last day of the range, today by default. Examples are \"yesterday\", \"15/03/2025\", \"2025-03-15\""
    )]
    end: Option<String>,
    #[arg(
        long,
        conflicts_with_all = ["start", "end", "period"],
        help = "Include every stored entry"
    )]
    all: bool,
    #[arg(
        long,
        value_enum,
        conflicts_with_all = ["start", "end"],
        help = "Today, the last week or the last month"
    )]
    period: Option<Period>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

impl RangeArgs {
    /// Turns the flags into a range. Without any flags the range covers the last
    /// `default_days` days up to today.
    pub fn resolve<Tz: TimeZone>(&self, now: DateTime<Tz>, default_days: u32) -> Result<DateRange>
    where
        Tz::Offset: Copy,
    {
        let today = now.date_naive();
        if self.all {
            return Ok(DateRange::all());
        }
        if let Some(period) = self.period {
            return Ok(match period {
                Period::Today => DateRange::day(today),
                Period::Week => DateRange::trailing_days(today, 7),
                Period::Month => DateRange::trailing_month(today),
            });
        }

        let parse = |value: &str| -> Result<_> {
            parse_day(value, now.clone(), self.date_style).map_err(|e| {
                Args::command()
                    .error(clap::error::ErrorKind::ValueValidation, e.to_string())
                    .into()
            })
        };
        let range = match (self.start.as_deref(), self.end.as_deref()) {
            (None, None) => DateRange::trailing_days(today, default_days),
            (Some(start), None) => DateRange::between(parse(start)?, today),
            (None, Some(end)) => DateRange {
                start: None,
                end: Some(parse(end)?),
            },
            (Some(start), Some(end)) => DateRange::between(parse(start)?, parse(end)?),
        };

        if let (Some(start), Some(end)) = (range.start, range.end) {
            if start > end {
                bail!("The range starts on {start}, after it ends on {end}");
            }
        }
        Ok(range)
    }
}

pub fn process_report_command(
    ctx: &AppContext,
    kind: TrackerKind,
    range: &RangeArgs,
    json: bool,
) -> Result<()> {
    let range = range.resolve(Local::now(), ctx.config.report_days)?;
    let rows = ctx.session.entries(kind).query_range(range)?;
    if json {
        println!("{}", render_json(kind, &rows, &range)?);
    } else {
        print!("{}", render_report(kind, &rows, &range));
    }
    Ok(())
}

pub fn process_chart_command(
    ctx: &AppContext,
    kind: TrackerKind,
    range: &RangeArgs,
    chart_kind: ChartKind,
    out: Option<&Path>,
) -> Result<()> {
    let range = range.resolve(Local::now(), ctx.config.report_days)?;
    let rows = ctx.session.entries(kind).query_range(range)?;
    let chart = render_chart(kind, &rows, chart_kind);
    if chart.is_empty() {
        println!("No {kind} data available.");
        return Ok(());
    }

    println!("{}", chart.title);
    println!("{}", chart.to_terminal());
    if let Some(out) = out {
        export_chart(kind, &chart, out, ctx.config.chart_font.as_deref())?;
        println!("Chart saved to {}", out.display());
    }
    Ok(())
}

pub fn process_pdf_command(
    ctx: &AppContext,
    kind: TrackerKind,
    range: &RangeArgs,
    out: &Path,
    background: Option<&Path>,
) -> Result<()> {
    let range = range.resolve(Local::now(), ctx.config.report_days)?;
    let rows = ctx.session.entries(kind).query_range(range)?;

    let background = background
        .or(ctx.config.background_image.as_deref())
        .map(BackgroundImage::load)
        .transpose()?;

    export_pdf(kind, &rows, &range, background.as_ref(), out)?;
    println!("Saved {} {kind} entries to {}", rows.len(), out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
    use clap::Parser;

    use crate::{cli::report::RangeArgs, storage::entry_store::DateRange};

    #[derive(Parser)]
    struct RangeOnly {
        #[command(flatten)]
        range: RangeArgs,
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn resolve(args: &[&str]) -> anyhow::Result<DateRange> {
        let parsed = RangeOnly::try_parse_from(std::iter::once("range").chain(args.iter().copied()))?;
        parsed.range.resolve(Utc.from_utc_datetime(&now()), 7)
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn test_default_is_trailing_days() -> anyhow::Result<()> {
        assert_eq!(resolve(&[])?, DateRange::between(day(3, 8), day(3, 15)));
        Ok(())
    }

    #[test]
    fn test_periods() -> anyhow::Result<()> {
        assert_eq!(resolve(&["--all"])?, DateRange::all());
        assert_eq!(resolve(&["--period", "today"])?, DateRange::day(day(3, 15)));
        assert_eq!(resolve(&["--period", "month"])?, DateRange::between(day(2, 15), day(3, 15)));
        Ok(())
    }

    #[test]
    fn test_explicit_bounds() -> anyhow::Result<()> {
        assert_eq!(
            resolve(&["--start", "2024-03-01", "--end", "2024-03-03"])?,
            DateRange::between(day(3, 1), day(3, 3))
        );
        assert_eq!(
            resolve(&["--start", "2024-03-01"])?,
            DateRange::between(day(3, 1), day(3, 15))
        );
        assert_eq!(
            resolve(&["--end", "yesterday"])?,
            DateRange {
                start: None,
                end: Some(day(3, 14))
            }
        );
        Ok(())
    }

    #[test]
    fn test_reversed_range_rejected() {
        assert!(resolve(&["--start", "2024-03-10", "--end", "2024-03-01"]).is_err());
        assert!(resolve(&["--start", "someday maybe"]).is_err());
    }
}
