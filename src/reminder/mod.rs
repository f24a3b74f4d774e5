//! In-memory reminders. Nothing here is persisted: a reminder lives until it fires, until its
//! minute passes unnoticed, or until the process exits.

pub mod notify;

use std::{collections::BTreeMap, fmt::Display, time::Duration};

use chrono::NaiveTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::{TrackerError, TrackerResult},
    utils::{clock::Clock, time::truncate_to_minute},
};

use self::notify::Notifier;

pub const ACTIVITIES: [&str; 5] = [
    "Drink Water",
    "Take a Deep Breath",
    "Mood Check",
    "Smile",
    "Practice Gratitude",
];

pub const NOTIFICATION_TITLE: &str = "WellHive Reminder";

const DEFAULT_TICK: Duration = Duration::from_secs(1);

pub fn reminder_message(activity: &str) -> String {
    format!("It's time to {activity}!\nStay consistent for a better you.")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub activity: String,
    pub time: NaiveTime,
}

impl Reminder {
    pub fn new(activity: impl Into<String>, time: NaiveTime) -> Self {
        Self {
            activity: activity.into(),
            time: truncate_to_minute(time),
        }
    }
}

impl Display for Reminder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.activity, self.time.format("%H:%M"))
    }
}

/// Pending reminders ordered by time of day, so a check only looks at the front.
#[derive(Debug, Default)]
pub struct ReminderQueue {
    pending: BTreeMap<NaiveTime, Vec<String>>,
}

impl ReminderQueue {
    /// Times earlier than the minute of `now` are rejected; the current minute is accepted.
    pub fn add(&mut self, reminder: Reminder, now: NaiveTime) -> TrackerResult<()> {
        if reminder.time < truncate_to_minute(now) {
            return Err(TrackerError::PastTime {
                time: reminder.time,
            });
        }
        debug!("Queued reminder {reminder}");
        self.pending
            .entry(reminder.time)
            .or_default()
            .push(reminder.activity);
        Ok(())
    }

    /// Removes and returns every reminder set for the minute of `now`. Reminders whose minute
    /// is already behind `now` can no longer match and are dropped.
    pub fn due(&mut self, now: NaiveTime) -> Vec<Reminder> {
        let current = truncate_to_minute(now);

        let later = self.pending.split_off(&current);
        let stale = std::mem::replace(&mut self.pending, later);
        for (time, activities) in stale {
            for activity in activities {
                warn!("Dropping reminder {activity} at {time}, its time has passed");
            }
        }

        self.pending
            .remove(&current)
            .unwrap_or_default()
            .into_iter()
            .map(|activity| Reminder {
                activity,
                time: current,
            })
            .collect()
    }

    pub fn pending(&self) -> Vec<Reminder> {
        self.pending
            .iter()
            .flat_map(|(time, activities)| {
                activities.iter().map(|activity| Reminder {
                    activity: activity.clone(),
                    time: *time,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Checks the queue against the clock and delivers due reminders through every notifier.
pub struct ReminderScheduler {
    queue: ReminderQueue,
    notifiers: Vec<Box<dyn Notifier>>,
    clock: Box<dyn Clock>,
    tick: Duration,
}

impl ReminderScheduler {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>, clock: Box<dyn Clock>) -> Self {
        Self {
            queue: ReminderQueue::default(),
            notifiers,
            clock,
            tick: DEFAULT_TICK,
        }
    }

    pub fn add(&mut self, activity: &str, time: NaiveTime) -> TrackerResult<()> {
        let now = self.clock.local_time();
        self.queue.add(Reminder::new(activity, time), now)
    }

    pub fn pending(&self) -> Vec<Reminder> {
        self.queue.pending()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Fires whatever is due right now. Returns the number of reminders fired.
    pub fn check(&mut self) -> usize {
        let due = self.queue.due(self.clock.local_time());
        for reminder in &due {
            info!("Firing reminder {reminder}");
            let message = reminder_message(&reminder.activity);
            for notifier in &self.notifiers {
                if let Err(e) = notifier.notify(NOTIFICATION_TITLE, &message) {
                    warn!("Failed to deliver reminder {reminder}: {e:?}");
                }
            }
        }
        due.len()
    }

    /// Checks once per tick until every reminder has fired or `shutdown` is cancelled.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        let mut check_point = self.clock.instant();
        loop {
            self.check();
            if self.queue.is_empty() {
                info!("No reminders left");
                return;
            }
            check_point += self.tick;

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Reminders cancelled with {} pending", self.queue.len());
                    return
                }
                _ = self.clock.sleep_until(check_point) => ()
            }
        }
    }
}
