//! Interactive shell. Every tracker command is available on one prompt, sharing one storage
//! session, while reminders keep being checked on the same loop.

use std::io::Write;

use ansi_term::Colour;
use anyhow::{bail, Result};
use clap::{CommandFactory, Parser};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::{Interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{reminder::ReminderScheduler, storage::entities::MOOD_CHOICES};

use super::{
    execute,
    meditate::{print_outcome, print_phase, MeditateArgs},
    remind::{build_scheduler, print_pending, RemindArgs},
    shutdown::detect_shutdown,
    surface, AppContext, Commands,
};

#[derive(Parser, Debug)]
#[command(name = "", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Commands,
}

enum Flow {
    Continue,
    Exit,
}

/// Splits a line into words. Single or double quotes keep spaces inside one word.
pub fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        bail!("Missing closing {q}");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn prompt() {
    print!("{} ", Colour::Yellow.bold().paint("wellhive>"));
    let _ = std::io::stdout().flush();
}

fn print_help() {
    let mut command = ShellLine::command();
    println!("{}", command.render_help());
    println!("Shell commands: reminders, moods, exit");
}

pub async fn run_shell(ctx: &AppContext) -> Result<()> {
    let mut scheduler = build_scheduler(&ctx.config);
    let shutdown = CancellationToken::new();
    tokio::spawn(detect_shutdown(shutdown.clone()));

    let mut ticker = tokio::time::interval(scheduler.tick());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    info!("Shell started");
    println!("WellHive shell. Type help for the list of commands, exit to leave.");
    prompt();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                if scheduler.check() > 0 {
                    prompt();
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    println!();
                    break;
                };
                match handle_line(ctx, &mut scheduler, &mut ticker, &shutdown, &line).await {
                    Ok(Flow::Exit) => break,
                    Ok(Flow::Continue) => (),
                    Err(e) => eprintln!("{}", Colour::Red.paint(format!("Error: {e:#}"))),
                }
                prompt();
            }
        }
    }

    shutdown.cancel();
    info!("Shell closed with {} pending reminders", scheduler.pending().len());
    Ok(())
}

async fn handle_line(
    ctx: &AppContext,
    scheduler: &mut ReminderScheduler,
    ticker: &mut Interval,
    shutdown: &CancellationToken,
    line: &str,
) -> Result<Flow> {
    let words = split_words(line)?;
    let Some(first) = words.first() else {
        return Ok(Flow::Continue);
    };
    debug!("Shell command {words:?}");

    match first.as_str() {
        "exit" | "quit" => return Ok(Flow::Exit),
        "help" => {
            print_help();
            return Ok(Flow::Continue);
        }
        "reminders" => {
            print_pending(scheduler);
            return Ok(Flow::Continue);
        }
        "moods" => {
            println!("{}", MOOD_CHOICES.join(", "));
            return Ok(Flow::Continue);
        }
        _ => (),
    }

    let command = match ShellLine::try_parse_from(&words) {
        Ok(parsed) => parsed.command,
        Err(e) => {
            // Help and usage errors alike are printed by clap.
            let _ = e.print();
            return Ok(Flow::Continue);
        }
    };

    match command {
        Commands::Remind { args } => add_reminders(scheduler, &args)?,
        Commands::Meditate { args } => {
            meditate(scheduler, ticker, shutdown, args).await?;
        }
        command => surface(execute(ctx, command).await)?,
    }
    Ok(Flow::Continue)
}

fn add_reminders(scheduler: &mut ReminderScheduler, args: &RemindArgs) -> Result<()> {
    for (activity, time) in args.reminders()? {
        scheduler.add(&activity, time)?;
    }
    print_pending(scheduler);
    Ok(())
}

/// Runs a breathing session while still checking reminders on every tick.
async fn meditate(
    scheduler: &mut ReminderScheduler,
    ticker: &mut Interval,
    shutdown: &CancellationToken,
    args: MeditateArgs,
) -> Result<()> {
    let session = args.session()?;
    let run = session.run(shutdown.child_token(), print_phase);
    tokio::pin!(run);
    let finished = loop {
        tokio::select! {
            finished = &mut run => break finished,
            _ = ticker.tick() => {
                scheduler.check();
            }
        }
    };
    print_outcome(finished);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{split_words, ShellLine};
    use crate::cli::Commands;

    #[test]
    fn test_split_words() {
        assert_eq!(
            split_words("  log gratitude \"a warm cup of tea\"  --date yesterday ").unwrap(),
            vec!["log", "gratitude", "a warm cup of tea", "--date", "yesterday"]
        );
        assert_eq!(
            split_words("remind --at 14:30 --activity 'Drink Water'").unwrap(),
            vec!["remind", "--at", "14:30", "--activity", "Drink Water"]
        );
        assert_eq!(split_words("show mood --date \"\"").unwrap(), vec!["show", "mood", "--date", ""]);
        assert!(split_words("").unwrap().is_empty());
    }

    #[test]
    fn test_split_words_unterminated() {
        assert!(split_words("log gratitude \"unfinished").is_err());
    }

    #[test]
    fn test_shell_line_parses_commands() {
        let parsed = ShellLine::try_parse_from(["report", "sleep", "--all"]).unwrap();
        assert!(matches!(parsed.command, Commands::Report { .. }));
        assert!(ShellLine::try_parse_from(["fly", "away"]).is_err());
    }
}
