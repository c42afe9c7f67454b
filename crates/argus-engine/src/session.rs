//! One console session: every store, explicitly constructed and torn down.
//!
//! The session owns all engine state and is the only writer. All mutation
//! happens on message arrival or operator input, run to completion, so no
//! locking discipline is needed inside. Outgoing messages accumulate in an
//! outbox the async shell drains and transmits best-effort.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use thiserror::Error;
use tracing::info;

use argus_protocol::{
    AutonomyTier, Command, CommandId, CommandSource, CommandStatus, CommandType, OutboundMessage,
    RobotId, SuggestionId, TierTarget,
};

use crate::autonomy::AutonomyEngine;
use crate::builder::{ClickAction, CommandBuilder, InteractionMode};
use crate::config::EngineConfig;
use crate::stores::{MissionStore, RobotStore, SuggestionStore};
use crate::tracker::CommandTracker;
use crate::trail::TrailBuffer;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown suggestion: {0}")]
    UnknownSuggestion(SuggestionId),
    #[error("suggestion {0} is no longer pending")]
    SuggestionResolved(SuggestionId),
    #[error("suggestion {0} has no proposed action")]
    NoProposedAction(SuggestionId),
    #[error("tier {tier:?} does not permit operator action on suggestions")]
    ActionNotPermitted { tier: AutonomyTier },
    #[error("unknown robot: {0}")]
    UnknownRobot(RobotId),
    #[error("no robot selected")]
    NoSelection,
}

/// Compensating snapshot for an optimistic tier write: capture before,
/// apply locally, confirm remotely, restore on failure.
#[derive(Clone, Debug)]
pub struct TierRollback {
    pub target: TierTarget,
    pub previous: AutonomyTier,
}

pub struct Session {
    config: EngineConfig,
    robots: RobotStore,
    missions: MissionStore,
    suggestions: SuggestionStore,
    trails: TrailBuffer,
    commands: CommandTracker,
    autonomy: AutonomyEngine,
    builder: CommandBuilder,
    selected: Option<RobotId>,
    outbox: Vec<OutboundMessage>,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        let autonomy = AutonomyEngine::new(
            AutonomyTier::default(),
            config.change_log_cap,
            config.supervised_countdown.as_secs_f64(),
        );
        Self {
            robots: RobotStore::new(),
            missions: MissionStore::new(),
            suggestions: SuggestionStore::new(config.suggestion_cap),
            trails: TrailBuffer::new(config.trail_cap),
            commands: CommandTracker::new(),
            autonomy,
            builder: CommandBuilder::new(),
            selected: None,
            outbox: Vec::new(),
            config,
        }
    }

    /// Tear down all session state (logout/disconnect-for-good). Trails,
    /// drafts, countdowns and the outbox are all discarded.
    pub fn reset(&mut self) {
        self.robots.clear();
        self.missions.clear();
        self.suggestions.clear();
        self.trails.clear();
        self.commands.clear();
        self.autonomy.clear();
        self.builder.reset();
        self.selected = None;
        self.outbox.clear();
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn robots(&self) -> &RobotStore {
        &self.robots
    }

    pub fn missions(&self) -> &MissionStore {
        &self.missions
    }

    pub fn suggestions(&self) -> &SuggestionStore {
        &self.suggestions
    }

    pub fn trails(&self) -> &TrailBuffer {
        &self.trails
    }

    pub fn commands(&self) -> &CommandTracker {
        &self.commands
    }

    pub fn autonomy(&self) -> &AutonomyEngine {
        &self.autonomy
    }

    pub fn builder(&self) -> &CommandBuilder {
        &self.builder
    }

    pub fn selected_robot(&self) -> Option<&RobotId> {
        self.selected.as_ref()
    }

    /// Select a robot (or clear the selection). Always collapses the
    /// command builder and discards its draft.
    pub fn select_robot(&mut self, robot: Option<RobotId>) {
        self.selected = robot;
        self.builder.reset();
    }

    /// Messages queued for transmission, in dispatch order. The shell sends
    /// them best-effort; delivery is not assumed.
    pub fn drain_outbox(&mut self) -> Vec<OutboundMessage> {
        std::mem::take(&mut self.outbox)
    }

    /// Create an optimistic pending command record and queue its dispatch.
    pub fn issue_command(
        &mut self,
        robot_id: RobotId,
        command_type: CommandType,
        parameters: serde_json::Value,
        source: CommandSource,
    ) -> CommandId {
        let now = unix_now();
        let id = CommandId(generate_short_id());
        let command = Command {
            id: id.clone(),
            robot_id: robot_id.clone(),
            command_type,
            parameters: parameters.clone(),
            source,
            status: CommandStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.commands.record(command);
        self.outbox.push(OutboundMessage::CommandSend {
            robot_id,
            command_type,
            parameters,
        });
        info!(command = %id, ?command_type, "command queued");
        id
    }

    /// Batch dispatch: one independent send per target, no atomicity.
    pub fn issue_command_batch(
        &mut self,
        robots: &[RobotId],
        command_type: CommandType,
        parameters: serde_json::Value,
        source: CommandSource,
    ) -> Vec<CommandId> {
        robots
            .iter()
            .map(|robot| {
                self.issue_command(robot.clone(), command_type, parameters.clone(), source)
            })
            .collect()
    }

    /// Approve a pending suggestion: dispatch its proposed action and mark
    /// it approved. Only permitted at tiers that offer the approve action.
    pub fn approve_suggestion(&mut self, id: &SuggestionId) -> Result<CommandId, EngineError> {
        let suggestion = self
            .suggestions
            .get(id)
            .ok_or_else(|| EngineError::UnknownSuggestion(id.clone()))?;
        if suggestion.status.is_terminal() {
            return Err(EngineError::SuggestionResolved(id.clone()));
        }
        let tier = self
            .robots
            .tier_of(&suggestion.robot_id, self.autonomy.fleet_default());
        if !tier.allows_approval() {
            return Err(EngineError::ActionNotPermitted { tier });
        }
        let action = suggestion
            .proposed_action
            .clone()
            .ok_or_else(|| EngineError::NoProposedAction(id.clone()))?;

        self.autonomy.cancel_countdown(id);
        self.suggestions.approve(id);
        Ok(self.issue_command(
            action.robot_id,
            action.command_type,
            action.parameters,
            CommandSource::Ai,
        ))
    }

    /// Operator override/reject: cancel any countdown and mark the
    /// suggestion rejected without dispatching anything.
    pub fn override_suggestion(&mut self, id: &SuggestionId) -> Result<(), EngineError> {
        let suggestion = self
            .suggestions
            .get(id)
            .ok_or_else(|| EngineError::UnknownSuggestion(id.clone()))?;
        if suggestion.status.is_terminal() {
            return Err(EngineError::SuggestionResolved(id.clone()));
        }
        let tier = self
            .robots
            .tier_of(&suggestion.robot_id, self.autonomy.fleet_default());
        if !tier.allows_approval() {
            return Err(EngineError::ActionNotPermitted { tier });
        }
        self.autonomy.cancel_countdown(id);
        self.suggestions.reject(id);
        info!(suggestion = %id, "suggestion overridden");
        Ok(())
    }

    /// A supervised countdown elapsed with no override: dispatch the action
    /// as if approved. Caller (the shell's scheduler) owns the clock.
    pub fn fire_countdown(&mut self, id: &SuggestionId) -> Result<CommandId, EngineError> {
        let countdown = self
            .autonomy
            .cancel_countdown(id)
            .ok_or_else(|| EngineError::UnknownSuggestion(id.clone()))?;
        let suggestion = self
            .suggestions
            .get(&countdown.suggestion_id)
            .ok_or_else(|| EngineError::UnknownSuggestion(id.clone()))?;
        if suggestion.status.is_terminal() {
            return Err(EngineError::SuggestionResolved(id.clone()));
        }
        let action = suggestion
            .proposed_action
            .clone()
            .ok_or_else(|| EngineError::NoProposedAction(id.clone()))?;

        self.suggestions.approve(id);
        info!(suggestion = %id, "supervised countdown elapsed, auto-executing");
        Ok(self.issue_command(
            action.robot_id,
            action.command_type,
            action.parameters,
            CommandSource::Ai,
        ))
    }

    /// Fire every countdown whose deadline has passed.
    pub fn fire_due_countdowns(&mut self, now: f64) -> Vec<CommandId> {
        self.autonomy
            .due(now)
            .into_iter()
            .filter_map(|id| self.fire_countdown(&id).ok())
            .collect()
    }

    /// Flip expired pendings to expired and drop their countdowns.
    pub fn expire_suggestions(&mut self, now: f64) {
        for id in self.suggestions.expire_due(now) {
            self.autonomy.cancel_countdown(&id);
        }
    }

    /// Optimistically apply a tier change and return the compensating
    /// snapshot to restore if the collaborator rejects it.
    pub fn begin_tier_change(
        &mut self,
        target: TierTarget,
        tier: AutonomyTier,
    ) -> Result<TierRollback, EngineError> {
        let previous = match &target {
            TierTarget::Fleet => {
                let previous = self.autonomy.fleet_default();
                self.autonomy.set_fleet_default(tier);
                previous
            }
            TierTarget::Robot(id) => {
                let previous = self
                    .robots
                    .set_tier(id, tier)
                    .ok_or_else(|| EngineError::UnknownRobot(id.clone()))?;
                if tier != AutonomyTier::Supervised {
                    self.autonomy.cancel_for_robot(id);
                }
                previous
            }
        };
        Ok(TierRollback { target, previous })
    }

    /// Restore the pre-change tier after a failed confirmation.
    pub fn rollback_tier(&mut self, rollback: TierRollback) {
        match &rollback.target {
            TierTarget::Fleet => self.autonomy.set_fleet_default(rollback.previous),
            TierTarget::Robot(id) => {
                self.robots.set_tier(id, rollback.previous);
            }
        }
    }

    // Map-interaction passthroughs. Dispatching interactions require a
    // selected robot; draft-only interactions do not consume the click
    // without one either, so the builder can't get ahead of the selection.

    pub fn toggle_interaction(&mut self, mode: InteractionMode) {
        self.builder.toggle(mode);
    }

    pub fn cancel_interaction(&mut self) {
        self.builder.reset();
    }

    pub fn set_circle_radius(&mut self, radius_m: f64) {
        self.builder.set_circle_radius(radius_m);
    }

    pub fn undo_waypoint(&mut self) {
        self.builder.undo_waypoint();
    }

    pub fn clear_waypoints(&mut self) {
        self.builder.clear_waypoints();
    }

    /// Feed a map click through the builder; emits at most one command.
    pub fn map_click(&mut self, latitude: f64, longitude: f64) -> Result<Option<CommandId>, EngineError> {
        if self.builder.mode() == InteractionMode::None {
            return Ok(None);
        }
        let robot = self.selected.clone().ok_or(EngineError::NoSelection)?;
        match self.builder.map_click(latitude, longitude) {
            ClickAction::Ignored | ClickAction::DraftUpdated => Ok(None),
            ClickAction::Dispatch(command_type, parameters) => Ok(Some(self.issue_command(
                robot,
                command_type,
                parameters,
                CommandSource::Operator,
            ))),
        }
    }

    /// Send the accumulated waypoint draft as one follow-waypoints command.
    pub fn send_pending_waypoints(&mut self) -> Result<Option<CommandId>, EngineError> {
        let robot = self.selected.clone().ok_or(EngineError::NoSelection)?;
        Ok(self.builder.send_waypoints().map(|(command_type, params)| {
            self.issue_command(robot, command_type, params, CommandSource::Operator)
        }))
    }

    /// Confirm the drafted circle as one circle-area command.
    pub fn confirm_circle(&mut self) -> Result<Option<CommandId>, EngineError> {
        let robot = self.selected.clone().ok_or(EngineError::NoSelection)?;
        Ok(self.builder.confirm_circle().map(|(command_type, params)| {
            self.issue_command(robot, command_type, params, CommandSource::Operator)
        }))
    }

    pub(crate) fn robots_mut(&mut self) -> &mut RobotStore {
        &mut self.robots
    }

    pub(crate) fn missions_mut(&mut self) -> &mut MissionStore {
        &mut self.missions
    }

    pub(crate) fn suggestions_mut(&mut self) -> &mut SuggestionStore {
        &mut self.suggestions
    }

    pub(crate) fn trails_mut(&mut self) -> &mut TrailBuffer {
        &mut self.trails
    }

    pub(crate) fn commands_mut(&mut self) -> &mut CommandTracker {
        &mut self.commands
    }

    pub(crate) fn autonomy_mut(&mut self) -> &mut AutonomyEngine {
        &mut self.autonomy
    }
}

/// Wall clock as Unix epoch seconds, the wire's native timestamp unit.
pub(crate) fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}

/// Short random id for locally created records.
fn generate_short_id() -> String {
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| {
            let idx = rng.gen_range(0..36);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect()
}
