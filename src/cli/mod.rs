pub mod entries;
pub mod meditate;
pub mod remind;
pub mod report;
pub mod shell;
pub mod shutdown;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use meditate::{run_meditation, MeditateArgs};
use remind::{run_reminders, RemindArgs};
use report::{process_chart_command, process_pdf_command, process_report_command, RangeArgs};
use tracing::{info, level_filters::LevelFilter};

use crate::{
    config::AppConfig,
    error::TrackerError,
    report::chart::ChartKind,
    storage::{entities::TrackerKind, session::StorageSession},
    utils::{
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, LOG_PREFIX},
        time::DateStyle,
    },
};

const DATABASE_FILE: &str = "wellhive.db";

#[derive(Parser, Debug)]
#[command(name = "WellHive", version, long_about = None)]
#[command(about = "Track sleep, water, mood and gratitude, with reminders and breathing exercises", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "Database file. Defaults to wellhive.db inside the application directory"
    )]
    db: Option<PathBuf>,
    #[arg(long, global = true, help = "Print logs to the console")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Log level, one of off, error, warn, info, debug or trace"
    )]
    log_filter: Option<LevelFilter>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
pub enum Commands {
    #[command(about = "Save a value for a day. An earlier value for the same day is replaced")]
    Log {
        kind: TrackerKind,
        #[arg(help = "Hours for sleep, liters for water, a mood or a gratitude note")]
        value: String,
        #[arg(long, help = "Day of the entry, today by default. Examples are \"yesterday\", \"2024-01-03\"")]
        date: Option<String>,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(about = "Show the entry of a single day")]
    Show {
        kind: TrackerKind,
        #[arg(long, help = "Day to show, today by default")]
        date: Option<String>,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(about = "Change the value of an existing entry")]
    Edit {
        kind: TrackerKind,
        date: String,
        value: String,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(about = "Delete the entry of a day")]
    Delete {
        kind: TrackerKind,
        date: String,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(about = "Print every entry in a range of days")]
    Report {
        kind: TrackerKind,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, help = "Print the entries as JSON")]
        json: bool,
    },
    #[command(about = "Draw entries as a chart in the terminal, optionally saving it as an image")]
    Chart {
        kind: TrackerKind,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long = "type", value_enum, default_value_t = ChartKind::Pie)]
        chart_kind: ChartKind,
        #[arg(long, help = "Save the chart as an image. The extension picks the format: .png, .jpg or .svg")]
        out: Option<PathBuf>,
    },
    #[command(about = "Export entries as a PDF document")]
    Pdf {
        kind: TrackerKind,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, help = "Target file")]
        out: PathBuf,
        #[arg(long, help = "PNG or JPEG image drawn under the text of every page")]
        background: Option<PathBuf>,
    },
    #[command(about = "Wait for reminders and notify when their time comes")]
    Remind {
        #[command(flatten)]
        args: RemindArgs,
    },
    #[command(about = "Guided breathing exercise")]
    Meditate {
        #[command(flatten)]
        args: MeditateArgs,
    },
    #[command(about = "Interactive shell hosting every tracker, with reminders running in the background")]
    Shell,
}

/// Everything a command needs. Built once per process; the shell reuses it for every line.
pub struct AppContext {
    pub session: StorageSession,
    pub config: AppConfig,
    pub dir: PathBuf,
}

impl AppContext {
    pub fn new(session: StorageSession, config: AppConfig, dir: PathBuf) -> Self {
        Self {
            session,
            config,
            dir,
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    let logging_level = args
        .log_filter
        .or_else(|| args.log.then_some(LevelFilter::TRACE));
    enable_logging(LOG_PREFIX, &dir.join("logs"), logging_level, args.log)?;

    let config = AppConfig::load_or_create(&dir)?;
    let db_path = args.db.unwrap_or_else(|| dir.join(DATABASE_FILE));
    let session = StorageSession::open(&db_path)
        .with_context(|| format!("Can't start without storage at {db_path:?}"))?;
    info!("Opened storage at {db_path:?}");

    let ctx = AppContext::new(session, config, dir);
    match args.commands {
        Commands::Shell => shell::run_shell(&ctx).await,
        command => surface(execute(&ctx, command).await),
    }
}

/// Runs one command to completion. The shell routes reminders and meditation through its own
/// event loop and only hands the rest here.
pub async fn execute(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Log {
            kind,
            value,
            date,
            date_style,
        } => entries::log_entry(ctx, kind, &value, date.as_deref(), date_style),
        Commands::Show {
            kind,
            date,
            date_style,
        } => entries::show_entry(ctx, kind, date.as_deref(), date_style),
        Commands::Edit {
            kind,
            date,
            value,
            date_style,
        } => entries::edit_entry(ctx, kind, &date, &value, date_style),
        Commands::Delete {
            kind,
            date,
            date_style,
        } => entries::delete_entry(ctx, kind, &date, date_style),
        Commands::Report { kind, range, json } => process_report_command(ctx, kind, &range, json),
        Commands::Chart {
            kind,
            range,
            chart_kind,
            out,
        } => process_chart_command(ctx, kind, &range, chart_kind, out.as_deref()),
        Commands::Pdf {
            kind,
            range,
            out,
            background,
        } => process_pdf_command(ctx, kind, &range, &out, background.as_deref()),
        Commands::Remind { args } => run_reminders(ctx, args).await,
        Commands::Meditate { args } => run_meditation(args).await,
        Commands::Shell => bail!("Already inside the shell"),
    }
}

/// A missing entry on edit or delete, or an empty export, is a notice, not a failure.
pub fn surface(result: Result<()>) -> Result<()> {
    match result {
        Err(e)
            if e
                .downcast_ref::<TrackerError>()
                .is_some_and(TrackerError::is_notice) =>
        {
            if e.downcast_ref::<TrackerError>().is_some_and(TrackerError::is_not_found) {
                println!("{e}. Nothing changed.");
            } else {
                println!("{e}.");
            }
            Ok(())
        }
        other => other,
    }
}
