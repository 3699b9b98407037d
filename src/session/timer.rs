use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Periodic tick source for the recording timer
///
/// Each call to `start` begins a fresh sequence; the sequence ends when the
/// receiver is dropped or closed.
pub trait TickSource: Send + Sync {
    fn start(&self) -> mpsc::Receiver<()>;
}

/// Wall-clock ticks from a tokio interval
#[derive(Debug, Clone)]
pub struct IntervalTicks {
    period: Duration,
}

impl IntervalTicks {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn every_second() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl TickSource for IntervalTicks {
    fn start(&self) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel(8);
        let period = self.period;

        tokio::spawn(async move {
            // First tick one full period after start, not immediately
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_a_full_period() {
        let ticks = IntervalTicks::every_second();
        let started = Instant::now();
        let mut rx = ticks.start();

        rx.recv().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(1));

        rx.recv().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
