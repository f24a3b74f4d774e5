//! Personal wellness tracker: sleep, water intake, mood and gratitude entries kept one per day in
//! SQLite, with text, chart and PDF reports, in-memory reminders and a breathing timer.
//! Everything is reachable from the `wellhive` binary, either one command at a time or through
//! its interactive shell.

pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod meditation;
pub mod reminder;
pub mod report;
pub mod storage;
pub mod utils;
