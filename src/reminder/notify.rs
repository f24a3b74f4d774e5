use std::time::Duration;

use ansi_term::{Colour, Style};
use anyhow::{bail, Result};

/// A channel reminders are delivered through. Delivery is best-effort; the scheduler logs
/// failures and carries on with the other channels.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier {
    fn notify(&self, title: &str, message: &str) -> Result<()>;
}

/// Desktop notification through `notify-send`.
pub struct DesktopNotifier {
    timeout: Duration,
}

impl DesktopNotifier {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Notifier for DesktopNotifier {
    #[cfg(unix)]
    fn notify(&self, title: &str, message: &str) -> Result<()> {
        let output = std::process::Command::new("notify-send")
            .arg("--app-name=WellHive")
            .arg(format!("--expire-time={}", self.timeout.as_millis()))
            .arg(title)
            .arg(message)
            .stdin(std::process::Stdio::null())
            .output()?;
        if !output.status.success() {
            bail!(
                "notify-send exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn notify(&self, _title: &str, _message: &str) -> Result<()> {
        bail!("Desktop notifications are only supported on unix")
    }
}

/// Prints the reminder in the terminal, standing in for a modal dialog.
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn dialog(title: &str, message: &str) -> String {
        let width = message
            .lines()
            .chain(std::iter::once(title))
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0);
        let border = "─".repeat(width + 2);
        let mut dialog = format!("┌{border}┐\n");
        dialog.push_str(&format!(
            "│ {} │\n",
            Style::new()
                .bold()
                .fg(Colour::Cyan)
                .paint(format!("{title:<width$}"))
        ));
        for line in message.lines() {
            dialog.push_str(&format!("│ {line:<width$} │\n"));
        }
        dialog.push_str(&format!("└{border}┘"));
        dialog
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<()> {
        println!("{}", Self::dialog(title, message));
        Ok(())
    }
}
