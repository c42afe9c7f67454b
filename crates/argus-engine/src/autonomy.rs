//! The four-tier autonomy engine.
//!
//! Decides, per robot tier, what happens when a pending suggestion arrives:
//! display only (manual), wait for the operator (assisted), start a
//! time-boxed countdown (supervised, low-risk actions only), or treat as
//! already executed (autonomous). Owns the countdown set and the bounded
//! tier change log. The engine exposes deadlines and accepts overrides; the
//! firing clock itself belongs to the async shell.

use std::collections::{HashMap, VecDeque};

use argus_protocol::{
    AutonomyTier, Countdown, RobotId, Suggestion, SuggestionId, TierChange, TierTarget,
};

/// What the tier engine decided for a freshly arrived pending suggestion.
#[derive(Clone, Debug, PartialEq)]
pub enum Disposition {
    /// Manual tier: render it, offer no actions.
    DisplayOnly,
    /// Assisted tier, or a supervised high-risk action: wait for an explicit
    /// operator approve/reject.
    AwaitDecision,
    /// Supervised tier, low-risk action: auto-executes at the deadline
    /// unless overridden.
    CountdownStarted(Countdown),
    /// Autonomous tier: treated as already executed for display purposes.
    AutoExecute,
}

#[derive(Debug)]
pub struct AutonomyEngine {
    fleet_default: AutonomyTier,
    change_log: VecDeque<TierChange>,
    countdowns: HashMap<SuggestionId, Countdown>,
    log_cap: usize,
    countdown_secs: f64,
}

impl AutonomyEngine {
    pub fn new(fleet_default: AutonomyTier, log_cap: usize, countdown_secs: f64) -> Self {
        Self {
            fleet_default,
            change_log: VecDeque::new(),
            countdowns: HashMap::new(),
            log_cap,
            countdown_secs,
        }
    }

    pub fn fleet_default(&self) -> AutonomyTier {
        self.fleet_default
    }

    pub fn set_fleet_default(&mut self, tier: AutonomyTier) {
        self.fleet_default = tier;
    }

    /// Append a tier change to the bounded log, oldest evicted.
    pub fn record_change(&mut self, change: TierChange) {
        self.change_log.push_back(change);
        while self.change_log.len() > self.log_cap {
            self.change_log.pop_front();
        }
    }

    /// Change log entries, most recent first.
    pub fn changes(&self) -> impl Iterator<Item = &TierChange> {
        self.change_log.iter().rev()
    }

    /// Entries affecting one robot: its own changes plus fleet-wide ones.
    pub fn changes_for<'a>(
        &'a self,
        robot_id: &'a RobotId,
    ) -> impl Iterator<Item = &'a TierChange> {
        self.changes().filter(move |change| match &change.target {
            TierTarget::Fleet => true,
            TierTarget::Robot(id) => id == robot_id,
        })
    }

    /// Decide the workflow position of a new pending suggestion given the
    /// owning robot's current tier. A supervised countdown is created here;
    /// every other disposition leaves the countdown set untouched.
    pub fn decide(&mut self, tier: AutonomyTier, suggestion: &Suggestion, now: f64) -> Disposition {
        match tier {
            AutonomyTier::Manual => Disposition::DisplayOnly,
            AutonomyTier::Assisted => Disposition::AwaitDecision,
            AutonomyTier::Supervised => match &suggestion.proposed_action {
                Some(action) if !action.command_type.is_high_risk() => {
                    let countdown = Countdown {
                        suggestion_id: suggestion.id.clone(),
                        robot_id: suggestion.robot_id.clone(),
                        command_type: action.command_type,
                        auto_execute_at: now + self.countdown_secs,
                    };
                    self.countdowns
                        .insert(suggestion.id.clone(), countdown.clone());
                    Disposition::CountdownStarted(countdown)
                }
                // High-risk or actionless suggestions always wait for a human.
                _ => Disposition::AwaitDecision,
            },
            AutonomyTier::Autonomous => Disposition::AutoExecute,
        }
    }

    /// Adopt a countdown announced by the fleet side (authoritative
    /// deadline), replacing any locally computed one for the same id.
    pub fn upsert_countdown(&mut self, countdown: Countdown) {
        self.countdowns
            .insert(countdown.suggestion_id.clone(), countdown);
    }

    pub fn countdown(&self, id: &SuggestionId) -> Option<&Countdown> {
        self.countdowns.get(id)
    }

    pub fn countdowns(&self) -> impl Iterator<Item = &Countdown> {
        self.countdowns.values()
    }

    /// Remove the countdown for one suggestion, if any.
    pub fn cancel_countdown(&mut self, id: &SuggestionId) -> Option<Countdown> {
        self.countdowns.remove(id)
    }

    /// Remove every countdown owned by a robot. Used when the robot's tier
    /// leaves supervised, so no timer can fire against a stale tier.
    pub fn cancel_for_robot(&mut self, robot_id: &RobotId) -> Vec<SuggestionId> {
        let ids: Vec<SuggestionId> = self
            .countdowns
            .values()
            .filter(|c| &c.robot_id == robot_id)
            .map(|c| c.suggestion_id.clone())
            .collect();
        for id in &ids {
            self.countdowns.remove(id);
        }
        ids
    }

    /// Suggestion ids whose deadline has passed.
    pub fn due(&self, now: f64) -> Vec<SuggestionId> {
        self.countdowns
            .values()
            .filter(|c| c.auto_execute_at <= now)
            .map(|c| c.suggestion_id.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.change_log.clear();
        self.countdowns.clear();
    }
}
