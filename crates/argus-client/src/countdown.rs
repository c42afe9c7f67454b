//! Timer wheel for supervised auto-execute countdowns.
//!
//! The engine owns the deadlines; this scheduler only owns the clock. Each
//! active countdown gets one sleeping task that reports the suggestion id on
//! a channel when its deadline passes. The run loop resolves the firing
//! against the engine, which may have cancelled it in the meantime, so a
//! late or spurious firing is harmless.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use argus_protocol::{Countdown, SuggestionId};

pub struct CountdownScheduler {
    timers: HashMap<SuggestionId, (f64, JoinHandle<()>)>,
    fired_tx: mpsc::UnboundedSender<SuggestionId>,
}

impl CountdownScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SuggestionId>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        (
            Self {
                timers: HashMap::new(),
                fired_tx,
            },
            fired_rx,
        )
    }

    /// Arm a timer for one countdown, replacing any previous deadline.
    pub fn schedule(&mut self, countdown: &Countdown, now: f64) {
        if let Some((deadline, _)) = self.timers.get(&countdown.suggestion_id) {
            if *deadline == countdown.auto_execute_at {
                return;
            }
        }
        self.cancel(&countdown.suggestion_id);

        let remaining = Duration::from_secs_f64((countdown.auto_execute_at - now).max(0.0));
        let id = countdown.suggestion_id.clone();
        let fired_tx = self.fired_tx.clone();
        debug!(suggestion = %id, ?remaining, "countdown timer armed");
        let task = tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            let _ = fired_tx.send(id);
        });
        self.timers
            .insert(countdown.suggestion_id.clone(), (countdown.auto_execute_at, task));
    }

    pub fn cancel(&mut self, id: &SuggestionId) {
        if let Some((_, task)) = self.timers.remove(id) {
            task.abort();
        }
    }

    /// Bring the timer set in line with the engine's active countdowns,
    /// arming new deadlines and disarming stale ones.
    pub fn sync<'a>(&mut self, active: impl Iterator<Item = &'a Countdown>, now: f64) {
        let mut keep = Vec::new();
        for countdown in active {
            self.schedule(countdown, now);
            keep.push(countdown.suggestion_id.clone());
        }
        let stale: Vec<_> = self
            .timers
            .keys()
            .filter(|id| !keep.contains(id))
            .cloned()
            .collect();
        for id in stale {
            self.cancel(&id);
        }
    }

    pub fn shutdown(&mut self) {
        for (_, (_, task)) in self.timers.drain() {
            task.abort();
        }
    }
}

impl Drop for CountdownScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_protocol::{CommandType, RobotId};

    fn countdown(id: &str, at: f64) -> Countdown {
        Countdown {
            suggestion_id: SuggestionId::from(id),
            robot_id: RobotId::from("r1"),
            command_type: CommandType::HoldPosition,
            auto_execute_at: at,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn armed_timer_fires() {
        let (mut scheduler, mut fired) = CountdownScheduler::new();
        scheduler.schedule(&countdown("s1", 10.0), 0.0);

        let id = fired.recv().await.unwrap();
        assert_eq!(id, SuggestionId::from("s1"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (mut scheduler, mut fired) = CountdownScheduler::new();
        scheduler.schedule(&countdown("s1", 10.0), 0.0);
        scheduler.cancel(&SuggestionId::from("s1"));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(fired.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn sync_disarms_timers_the_engine_dropped() {
        let (mut scheduler, mut fired) = CountdownScheduler::new();
        scheduler.schedule(&countdown("s1", 10.0), 0.0);
        scheduler.schedule(&countdown("s2", 10.0), 0.0);

        let remaining = [countdown("s2", 10.0)];
        scheduler.sync(remaining.iter(), 0.0);

        tokio::time::sleep(Duration::from_secs(20)).await;
        let id = fired.recv().await.unwrap();
        assert_eq!(id, SuggestionId::from("s2"));
        assert!(fired.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn past_deadline_fires_immediately() {
        let (mut scheduler, mut fired) = CountdownScheduler::new();
        scheduler.schedule(&countdown("s1", 5.0), 10.0);

        let id = fired.recv().await.unwrap();
        assert_eq!(id, SuggestionId::from("s1"));
    }
}
