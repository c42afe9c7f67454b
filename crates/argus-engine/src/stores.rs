//! In-memory mirrors of fleet state.
//!
//! Each store is exclusively owned by the session; external readers get
//! references, never mutation handles. Upsert is the standard merge
//! operation; `state.sync` replaces wholesale.

use std::collections::HashMap;

use tracing::debug;

use argus_protocol::{
    AutonomyTier, Mission, MissionId, MissionStatus, Robot, RobotId, Suggestion, SuggestionId,
    SuggestionStatus,
};

/// Authoritative mirror of the robot fleet.
#[derive(Debug, Default)]
pub struct RobotStore {
    robots: HashMap<RobotId, Robot>,
}

impl RobotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole map. A robot absent from the incoming map is
    /// dropped; the snapshot is the reconciliation point after reconnect.
    pub fn replace_all(&mut self, robots: HashMap<RobotId, Robot>) {
        self.robots = robots;
    }

    /// Insert or replace one robot wholesale, returning the previous record.
    pub fn upsert(&mut self, robot: Robot) -> Option<Robot> {
        self.robots.insert(robot.id.clone(), robot)
    }

    pub fn get(&self, id: &RobotId) -> Option<&Robot> {
        self.robots.get(id)
    }

    /// A robot's effective tier, falling back to the fleet default for
    /// robots the store has not seen.
    pub fn tier_of(&self, id: &RobotId, fleet_default: AutonomyTier) -> AutonomyTier {
        self.robots
            .get(id)
            .map(|robot| robot.autonomy_tier)
            .unwrap_or(fleet_default)
    }

    /// Set one robot's tier, returning the previous tier if the robot exists.
    pub fn set_tier(&mut self, id: &RobotId, tier: AutonomyTier) -> Option<AutonomyTier> {
        let robot = self.robots.get_mut(id)?;
        let previous = robot.autonomy_tier;
        robot.autonomy_tier = tier;
        Some(previous)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Robot> {
        self.robots.values()
    }

    pub fn len(&self) -> usize {
        self.robots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }

    pub fn clear(&mut self) {
        self.robots.clear();
    }
}

/// Mission mirror plus the single focused mission for UI purposes.
#[derive(Debug, Default)]
pub struct MissionStore {
    missions: HashMap<MissionId, Mission>,
    focused: Option<MissionId>,
}

impl MissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, missions: HashMap<MissionId, Mission>) {
        self.missions = missions;
        self.focused = self
            .missions
            .values()
            .filter(|m| m.status == MissionStatus::Active)
            .max_by(|a, b| a.updated_at.total_cmp(&b.updated_at))
            .map(|m| m.id.clone());
    }

    /// Upsert one mission. An active mission takes UI focus; a focused
    /// mission leaving the active state releases it.
    pub fn upsert(&mut self, mission: Mission) {
        if mission.status == MissionStatus::Active {
            self.focused = Some(mission.id.clone());
        } else if self.focused.as_ref() == Some(&mission.id) {
            self.focused = None;
        }
        self.missions.insert(mission.id.clone(), mission);
    }

    pub fn get(&self, id: &MissionId) -> Option<&Mission> {
        self.missions.get(id)
    }

    pub fn focused(&self) -> Option<&Mission> {
        self.focused.as_ref().and_then(|id| self.missions.get(id))
    }

    pub fn len(&self) -> usize {
        self.missions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }

    pub fn clear(&mut self) {
        self.missions.clear();
        self.focused = None;
    }
}

/// Suggestion mirror with the fleet's retention policy: pendings past their
/// expiry flip to expired, and once over capacity the oldest resolved
/// records are evicted (pendings are never evicted).
#[derive(Debug)]
pub struct SuggestionStore {
    suggestions: HashMap<SuggestionId, Suggestion>,
    cap: usize,
}

impl SuggestionStore {
    pub fn new(cap: usize) -> Self {
        Self {
            suggestions: HashMap::new(),
            cap,
        }
    }

    /// Insert or replace by id, then enforce capacity. Returns true when
    /// the id was unseen.
    pub fn upsert(&mut self, suggestion: Suggestion) -> bool {
        let unseen = self
            .suggestions
            .insert(suggestion.id.clone(), suggestion)
            .is_none();
        self.evict_resolved();
        unseen
    }

    pub fn get(&self, id: &SuggestionId) -> Option<&Suggestion> {
        self.suggestions.get(id)
    }

    /// Transition a pending suggestion to approved. No-op otherwise.
    pub fn approve(&mut self, id: &SuggestionId) -> Option<&Suggestion> {
        self.transition(id, SuggestionStatus::Approved)
    }

    /// Transition a pending suggestion to rejected. No-op otherwise.
    pub fn reject(&mut self, id: &SuggestionId) -> Option<&Suggestion> {
        self.transition(id, SuggestionStatus::Rejected)
    }

    fn transition(&mut self, id: &SuggestionId, status: SuggestionStatus) -> Option<&Suggestion> {
        let suggestion = self.suggestions.get_mut(id)?;
        if suggestion.status != SuggestionStatus::Pending {
            debug!(suggestion = %id, current = ?suggestion.status, "suggestion already resolved");
            return None;
        }
        suggestion.status = status;
        Some(suggestion)
    }

    /// Flip pendings past their expiry to expired, returning the affected
    /// ids so their countdowns can be cancelled.
    pub fn expire_due(&mut self, now: f64) -> Vec<SuggestionId> {
        let mut expired = Vec::new();
        for suggestion in self.suggestions.values_mut() {
            if suggestion.status == SuggestionStatus::Pending && suggestion.is_expired(now) {
                suggestion.status = SuggestionStatus::Expired;
                expired.push(suggestion.id.clone());
            }
        }
        self.evict_resolved();
        expired
    }

    fn evict_resolved(&mut self) {
        if self.suggestions.len() <= self.cap {
            return;
        }
        let mut resolved: Vec<(f64, SuggestionId)> = self
            .suggestions
            .values()
            .filter(|s| s.status.is_terminal())
            .map(|s| (s.created_at, s.id.clone()))
            .collect();
        resolved.sort_by(|a, b| a.0.total_cmp(&b.0));

        let excess = self.suggestions.len() - self.cap;
        for (_, id) in resolved.into_iter().take(excess) {
            self.suggestions.remove(&id);
        }
    }

    /// Pending suggestions, optionally filtered by robot.
    pub fn pending(&self, robot_id: Option<&RobotId>) -> Vec<&Suggestion> {
        self.suggestions
            .values()
            .filter(|s| s.status == SuggestionStatus::Pending)
            .filter(|s| robot_id.is_none_or(|id| &s.robot_id == id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.suggestions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    pub fn clear(&mut self) {
        self.suggestions.clear();
    }
}
