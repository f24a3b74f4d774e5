use anyhow::{bail, Result};
use chrono::NaiveTime;
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    reminder::{
        notify::{ConsoleNotifier, DesktopNotifier},
        ReminderScheduler, ACTIVITIES,
    },
    utils::{clock::DefaultClock, time::parse_time_of_day},
};

use super::{shutdown::detect_shutdown, AppContext};

fn time_arg(value: &str) -> Result<NaiveTime, String> {
    parse_time_of_day(value).map_err(|e| e.to_string())
}

#[derive(Debug, Clone, clap::Args)]
pub struct RemindArgs {
    #[arg(
        long = "at",
        required = true,
        value_parser = time_arg,
        help = "Time of day as HH:MM. Repeat together with --activity for several reminders"
    )]
    times: Vec<NaiveTime>,
    #[arg(
        long = "activity",
        required = true,
        help = format!("What to remind about, for example {}", ACTIVITIES.join(", "))
    )]
    activities: Vec<String>,
}

impl RemindArgs {
    /// Pairs every `--at` with the `--activity` in the same position.
    pub fn reminders(&self) -> Result<Vec<(String, NaiveTime)>> {
        if self.times.len() != self.activities.len() {
            bail!(
                "Got {} times but {} activities, every --at needs an --activity",
                self.times.len(),
                self.activities.len()
            );
        }
        self.activities
            .iter()
            .zip(&self.times)
            .map(|(activity, time)| {
                let activity = activity.trim();
                if activity.is_empty() {
                    bail!("Activity can't be empty");
                }
                Ok((activity.to_string(), *time))
            })
            .collect()
    }
}

pub fn build_scheduler(config: &AppConfig) -> ReminderScheduler {
    ReminderScheduler::new(
        vec![
            Box::new(DesktopNotifier::new(config.notification_timeout())),
            Box::new(ConsoleNotifier),
        ],
        Box::new(DefaultClock),
    )
}

pub fn print_pending(scheduler: &ReminderScheduler) {
    let pending = scheduler.pending();
    if pending.is_empty() {
        println!("No pending reminders.");
    }
    for reminder in pending {
        println!("Reminder set: {reminder}");
    }
}

/// Runs in the foreground until every reminder has fired or Ctrl-C is pressed.
pub async fn run_reminders(ctx: &AppContext, args: RemindArgs) -> Result<()> {
    let mut scheduler = build_scheduler(&ctx.config);
    for (activity, time) in args.reminders()? {
        scheduler.add(&activity, time)?;
    }
    print_pending(&scheduler);

    let shutdown = CancellationToken::new();
    tokio::spawn(detect_shutdown(shutdown.clone()));
    scheduler.run(shutdown.clone()).await;
    shutdown.cancel();
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use clap::Parser;

    use super::RemindArgs;

    #[derive(Parser)]
    struct RemindOnly {
        #[command(flatten)]
        args: RemindArgs,
    }

    #[test]
    fn test_pairs_times_and_activities() -> anyhow::Result<()> {
        let parsed = RemindOnly::try_parse_from([
            "remind",
            "--at",
            "14:30",
            "--activity",
            "Drink Water",
            "--at",
            "15:00",
            "--activity",
            "Smile",
        ])?;
        assert_eq!(
            parsed.args.reminders()?,
            vec![
                ("Drink Water".to_string(), NaiveTime::from_hms_opt(14, 30, 0).unwrap()),
                ("Smile".to_string(), NaiveTime::from_hms_opt(15, 0, 0).unwrap()),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_mismatched_counts() -> anyhow::Result<()> {
        let parsed = RemindOnly::try_parse_from([
            "remind", "--at", "14:30", "--at", "15:00", "--activity", "Smile",
        ])?;
        assert!(parsed.args.reminders().is_err());
        assert!(RemindOnly::try_parse_from(["remind", "--at", "2pm", "--activity", "Smile"]).is_err());
        Ok(())
    }
}
