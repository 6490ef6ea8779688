use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;

use crate::clock::Clock;

/// Spaces successive `acquire` calls at least `interval` apart.
///
/// Only the start of each operation is paced; time spent inside the operation counts
/// towards the next interval.
pub struct FixedIntervalPacer {
    clock: Arc<dyn Clock>,
    interval: Duration,
    last: Option<DateTime<Utc>>,
}

impl FixedIntervalPacer {
    pub fn new(clock: Arc<dyn Clock>, interval: Duration) -> FixedIntervalPacer {
        FixedIntervalPacer { clock, interval, last: None }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn acquire(&mut self) {
        if let Some(last) = self.last {
            let elapsed = (self.clock.now() - last).to_std().unwrap_or_default();
            if elapsed < self.interval {
                let wait = self.interval - elapsed;
                debug!("Pacing next request by {:?}", wait);
                self.clock.sleep(wait).await;
            }
        }

        self.last = Some(self.clock.now());
    }
}
