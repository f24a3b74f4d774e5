use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveTime, Utc};
use tokio::time::Instant;

/// Represents an entity responsible for providing dates across application. Reminders and
/// meditation sessions only ever look at time through this trait, so tests can drive them with
/// a paused tokio clock.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    /// Wall-clock time of day in the user's timezone.
    fn local_time(&self) -> NaiveTime {
        self.time().with_timezone(&Local).time()
    }

    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: tokio::time::Instant);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

#[cfg(test)]
pub mod test_clock {
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tokio::time::Instant;

    use super::Clock;

    /// Clock that starts at a fixed local date and time and then follows tokio's (possibly
    /// paused) clock.
    #[derive(Clone)]
    pub struct TestClock {
        start_time: NaiveDateTime,
        reference: Instant,
    }

    impl TestClock {
        pub fn starting_at(start_time: NaiveDateTime) -> Self {
            Self {
                start_time,
                reference: Instant::now(),
            }
        }

        fn current(&self) -> NaiveDateTime {
            self.start_time
                + chrono::Duration::from_std(self.reference.elapsed())
                    .expect("Test durations are small")
        }
    }

    #[async_trait]
    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            Utc.from_utc_datetime(&self.current())
        }

        fn local_time(&self) -> NaiveTime {
            self.current().time()
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep_until(&self, instant: tokio::time::Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }
}
