//! Inbound message routing: the single entry point through which server
//! traffic mutates session state. Messages arrive in connection order and
//! are applied to completion, one at a time, so later messages always see
//! the effects of earlier ones.

use tracing::{debug, info, warn};

use argus_protocol::{
    AutonomyTier, Countdown, InboundMessage, Robot, StateSync, Suggestion, SuggestionStatus,
    TierChange, TierTarget,
};

use crate::autonomy::Disposition;
use crate::session::{unix_now, Session};

impl Session {
    /// Apply one decoded server message. Infallible: malformed traffic is
    /// rejected at the wire layer, and anything decodable is reconciled.
    pub fn apply_inbound(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::StateSync(sync) => self.apply_state_sync(sync),
            InboundMessage::RobotUpdated(robot) => self.apply_robot_updated(robot),
            InboundMessage::CommandStatus(command) => {
                self.commands_mut().apply_status(command);
            }
            InboundMessage::MissionUpdated(mission) => {
                self.missions_mut().upsert(mission);
            }
            InboundMessage::Suggestion(suggestion) => self.apply_suggestion(suggestion),
            InboundMessage::AutonomyChanged(change) => self.apply_tier_change(change),
            InboundMessage::AutonomyCountdown(countdown) => self.apply_countdown(countdown),
        }
    }

    /// Authoritative snapshot: replace entity state wholesale. Robots absent
    /// from the snapshot are gone. Trails and command history are local
    /// observations, not server state, and survive the sync.
    fn apply_state_sync(&mut self, sync: StateSync) {
        info!(robots = sync.robots.len(), "state sync received");
        self.robots_mut().replace_all(sync.robots);
        if let Some(missions) = sync.missions {
            self.missions_mut().replace_all(missions);
        }
        self.reconcile_countdowns();
    }

    fn apply_robot_updated(&mut self, robot: Robot) {
        self.trails_mut().record(&robot);
        let id = robot.id.clone();
        let tier = robot.autonomy_tier;
        let previous = self.robots_mut().upsert(robot);
        // A tier downgrade arriving via robot state still voids countdowns.
        if tier != AutonomyTier::Supervised
            && previous.is_some_and(|prev| prev.autonomy_tier == AutonomyTier::Supervised)
        {
            for cancelled in self.autonomy_mut().cancel_for_robot(&id) {
                debug!(suggestion = %cancelled, "countdown voided by robot tier change");
            }
        }
    }

    fn apply_suggestion(&mut self, suggestion: Suggestion) {
        if suggestion.status.is_terminal() {
            // Resolution restated by the server wins over any local countdown.
            self.autonomy_mut().cancel_countdown(&suggestion.id);
            self.suggestions_mut().upsert(suggestion);
            return;
        }
        // A record resolved locally stays resolved. A pending restatement can
        // cross a local approve/reject in flight; merge its fields but keep
        // the terminal status.
        if let Some(held) = self
            .suggestions()
            .get(&suggestion.id)
            .map(|stored| stored.status)
            .filter(|status| status.is_terminal())
        {
            debug!(suggestion = %suggestion.id, ?held, "pending restatement of a resolved suggestion");
            let mut merged = suggestion;
            merged.status = held;
            self.suggestions_mut().upsert(merged);
            return;
        }
        let unseen = self.suggestions().get(&suggestion.id).is_none();
        if unseen {
            let tier = self
                .robots()
                .tier_of(&suggestion.robot_id, self.autonomy().fleet_default());
            match self.autonomy_mut().decide(tier, &suggestion, unix_now()) {
                Disposition::CountdownStarted(countdown) => {
                    info!(
                        suggestion = %countdown.suggestion_id,
                        at = countdown.auto_execute_at,
                        "supervised countdown started"
                    );
                }
                Disposition::AutoExecute => {
                    let id = suggestion.id.clone();
                    self.suggestions_mut().upsert(suggestion);
                    self.suggestions_mut().approve(&id);
                    return;
                }
                Disposition::DisplayOnly | Disposition::AwaitDecision => {}
            }
        }
        self.suggestions_mut().upsert(suggestion);
    }

    fn apply_tier_change(&mut self, change: TierChange) {
        let new_tier = change.new_tier;
        match &change.target {
            TierTarget::Fleet => {
                info!(?new_tier, "fleet autonomy tier changed");
                self.autonomy_mut().set_fleet_default(new_tier);
            }
            TierTarget::Robot(id) => {
                info!(robot = %id, ?new_tier, "robot autonomy tier changed");
                if self.robots_mut().set_tier(id, new_tier).is_none() {
                    warn!(robot = %id, "tier change for unknown robot");
                }
                if new_tier != AutonomyTier::Supervised {
                    let id = id.clone();
                    for cancelled in self.autonomy_mut().cancel_for_robot(&id) {
                        debug!(suggestion = %cancelled, "countdown voided by tier change");
                    }
                }
            }
        }
        self.autonomy_mut().record_change(change);
    }

    /// Server-announced countdown with the authoritative deadline. Only
    /// honored while the invariants that justify it still hold locally.
    fn apply_countdown(&mut self, countdown: Countdown) {
        let pending = self
            .suggestions()
            .get(&countdown.suggestion_id)
            .map(|s| s.status == SuggestionStatus::Pending);
        if pending != Some(true) {
            debug!(suggestion = %countdown.suggestion_id, "countdown for non-pending suggestion dropped");
            return;
        }
        let tier = self
            .robots()
            .tier_of(&countdown.robot_id, self.autonomy().fleet_default());
        if tier != AutonomyTier::Supervised {
            debug!(suggestion = %countdown.suggestion_id, ?tier, "countdown outside supervised tier dropped");
            return;
        }
        self.autonomy_mut().upsert_countdown(countdown);
    }

    /// Drop countdowns whose preconditions no longer hold after a snapshot.
    fn reconcile_countdowns(&mut self) {
        let stale: Vec<_> = self
            .autonomy()
            .countdowns()
            .filter(|countdown| {
                let pending = self
                    .suggestions()
                    .get(&countdown.suggestion_id)
                    .is_some_and(|s| s.status == SuggestionStatus::Pending);
                let supervised = self
                    .robots()
                    .tier_of(&countdown.robot_id, self.autonomy().fleet_default())
                    == AutonomyTier::Supervised;
                !(pending && supervised)
            })
            .map(|countdown| countdown.suggestion_id.clone())
            .collect();
        for id in stale {
            debug!(suggestion = %id, "countdown voided by state sync");
            self.autonomy_mut().cancel_countdown(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use argus_protocol::{
        Command, CommandSource, CommandStatus, CommandType, Health, InboundMessage, Mission,
        MissionStatus, OutboundMessage, Position, ProposedAction, RobotId, RobotStatus, RobotType,
        Severity, StateSync, SuggestionId, SuggestionSource,
    };

    use super::*;
    use crate::builder::InteractionMode;
    use crate::config::EngineConfig;

    fn robot(id: &str, tier: AutonomyTier) -> Robot {
        Robot {
            id: RobotId::from(id),
            name: id.to_uppercase(),
            robot_type: RobotType::Aerial,
            status: RobotStatus::Active,
            position: Position {
                latitude: 42.35,
                longitude: -71.04,
                altitude: 30.0,
                heading: 90.0,
            },
            speed: 4.0,
            health: Health {
                battery_percent: 80.0,
                signal_strength: 95.0,
            },
            last_seen: 0.0,
            metadata: HashMap::new(),
            autonomy_tier: tier,
            last_command_source: None,
            last_command_at: 0.0,
        }
    }

    fn suggestion(id: &str, robot: &str, command_type: CommandType) -> Suggestion {
        Suggestion {
            id: SuggestionId::from(id),
            robot_id: RobotId::from(robot),
            title: "battery low".into(),
            description: "battery below threshold".into(),
            reasoning: "battery at 18%".into(),
            severity: Severity::Warning,
            proposed_action: Some(ProposedAction {
                robot_id: RobotId::from(robot),
                command_type,
                parameters: json!({}),
            }),
            confidence: 0.9,
            status: SuggestionStatus::Pending,
            source: SuggestionSource::Heuristic,
            created_at: 0.0,
            expires_at: 0.0,
        }
    }

    fn snapshot(robots: Vec<Robot>) -> InboundMessage {
        InboundMessage::StateSync(StateSync {
            robots: robots.into_iter().map(|r| (r.id.clone(), r)).collect(),
            missions: None,
        })
    }

    fn session() -> Session {
        Session::new(EngineConfig::default())
    }

    #[test]
    fn later_robot_update_wins() {
        let mut session = session();
        let mut first = robot("r1", AutonomyTier::Assisted);
        first.position.latitude = 10.0;
        let mut second = first.clone();
        second.position.latitude = 20.0;

        session.apply_inbound(InboundMessage::RobotUpdated(first));
        session.apply_inbound(InboundMessage::RobotUpdated(second));

        let stored = session.robots().get(&RobotId::from("r1")).unwrap();
        assert_eq!(stored.position.latitude, 20.0);
        assert_eq!(session.trails().trail(&RobotId::from("r1")).unwrap().len(), 2);
    }

    #[test]
    fn snapshot_replaces_wholesale_but_keeps_trails() {
        let mut session = session();
        session.apply_inbound(InboundMessage::RobotUpdated(robot(
            "gone",
            AutonomyTier::Assisted,
        )));
        session.apply_inbound(snapshot(vec![robot("kept", AutonomyTier::Assisted)]));

        assert!(session.robots().get(&RobotId::from("gone")).is_none());
        assert!(session.robots().get(&RobotId::from("kept")).is_some());
        // Trail history is a local observation and outlives the snapshot.
        assert_eq!(
            session.trails().trail(&RobotId::from("gone")).unwrap().len(),
            1
        );
    }

    #[test]
    fn supervised_low_risk_starts_countdown() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Supervised)]));
        session.apply_inbound(InboundMessage::Suggestion(suggestion(
            "s1",
            "r1",
            CommandType::HoldPosition,
        )));

        let countdown = session.autonomy().countdown(&SuggestionId::from("s1"));
        assert!(countdown.is_some());
    }

    #[test]
    fn supervised_high_risk_awaits_decision() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Supervised)]));
        session.apply_inbound(InboundMessage::Suggestion(suggestion(
            "s1",
            "r1",
            CommandType::ReturnHome,
        )));

        assert!(session
            .autonomy()
            .countdown(&SuggestionId::from("s1"))
            .is_none());
        let stored = session.suggestions().get(&SuggestionId::from("s1")).unwrap();
        assert_eq!(stored.status, SuggestionStatus::Pending);
    }

    #[test]
    fn autonomous_suggestion_shows_as_approved() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Autonomous)]));
        session.apply_inbound(InboundMessage::Suggestion(suggestion(
            "s1",
            "r1",
            CommandType::HoldPosition,
        )));

        let stored = session.suggestions().get(&SuggestionId::from("s1")).unwrap();
        assert_eq!(stored.status, SuggestionStatus::Approved);
        assert!(session
            .autonomy()
            .countdown(&SuggestionId::from("s1"))
            .is_none());
    }

    #[test]
    fn manual_tier_rejects_operator_approval() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Manual)]));
        session.apply_inbound(InboundMessage::Suggestion(suggestion(
            "s1",
            "r1",
            CommandType::HoldPosition,
        )));

        let err = session
            .approve_suggestion(&SuggestionId::from("s1"))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::session::EngineError::ActionNotPermitted { .. }
        ));
        assert!(session.drain_outbox().is_empty());
    }

    #[test]
    fn override_cancels_countdown_and_rejects() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Supervised)]));
        session.apply_inbound(InboundMessage::Suggestion(suggestion(
            "s1",
            "r1",
            CommandType::HoldPosition,
        )));

        session
            .override_suggestion(&SuggestionId::from("s1"))
            .unwrap();

        assert!(session
            .autonomy()
            .countdown(&SuggestionId::from("s1"))
            .is_none());
        let stored = session.suggestions().get(&SuggestionId::from("s1")).unwrap();
        assert_eq!(stored.status, SuggestionStatus::Rejected);
        assert!(session.drain_outbox().is_empty());
    }

    #[test]
    fn approval_dispatches_and_cancels_countdown() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Supervised)]));
        session.apply_inbound(InboundMessage::Suggestion(suggestion(
            "s1",
            "r1",
            CommandType::HoldPosition,
        )));

        session.approve_suggestion(&SuggestionId::from("s1")).unwrap();

        let outbox = session.drain_outbox();
        assert_eq!(outbox.len(), 1);
        assert!(matches!(
            &outbox[0],
            OutboundMessage::CommandSend { command_type, .. }
                if *command_type == CommandType::HoldPosition
        ));
        assert!(session
            .autonomy()
            .countdown(&SuggestionId::from("s1"))
            .is_none());
        assert_eq!(session.commands().len(), 1);
    }

    #[test]
    fn countdown_fires_as_ai_command() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Supervised)]));
        session.apply_inbound(InboundMessage::Suggestion(suggestion(
            "s1",
            "r1",
            CommandType::HoldPosition,
        )));

        let id = session.fire_countdown(&SuggestionId::from("s1")).unwrap();

        let stored = session.suggestions().get(&SuggestionId::from("s1")).unwrap();
        assert_eq!(stored.status, SuggestionStatus::Approved);
        let command = session.commands().get(&id).unwrap();
        assert_eq!(command.source, CommandSource::Ai);
        assert_eq!(session.drain_outbox().len(), 1);
    }

    #[test]
    fn tier_downgrade_voids_countdowns() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Supervised)]));
        session.apply_inbound(InboundMessage::Suggestion(suggestion(
            "s1",
            "r1",
            CommandType::HoldPosition,
        )));
        assert!(session
            .autonomy()
            .countdown(&SuggestionId::from("s1"))
            .is_some());

        session.apply_inbound(InboundMessage::AutonomyChanged(TierChange {
            id: "c1".into(),
            target: TierTarget::Robot(RobotId::from("r1")),
            old_tier: AutonomyTier::Supervised,
            new_tier: AutonomyTier::Assisted,
            changed_by: "operator".into(),
            timestamp: 0.0,
        }));

        assert!(session
            .autonomy()
            .countdown(&SuggestionId::from("s1"))
            .is_none());
        assert_eq!(
            session.robots().tier_of(
                &RobotId::from("r1"),
                session.autonomy().fleet_default()
            ),
            AutonomyTier::Assisted
        );
        assert_eq!(session.autonomy().changes().count(), 1);
    }

    #[test]
    fn fleet_change_updates_default_only() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Manual)]));
        session.apply_inbound(InboundMessage::AutonomyChanged(TierChange {
            id: "c1".into(),
            target: TierTarget::Fleet,
            old_tier: AutonomyTier::Assisted,
            new_tier: AutonomyTier::Supervised,
            changed_by: "operator".into(),
            timestamp: 0.0,
        }));

        assert_eq!(session.autonomy().fleet_default(), AutonomyTier::Supervised);
        // Per-robot tier is untouched by the fleet default.
        assert_eq!(
            session
                .robots()
                .tier_of(&RobotId::from("r1"), session.autonomy().fleet_default()),
            AutonomyTier::Manual
        );
    }

    #[test]
    fn server_countdown_respects_local_invariants() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Assisted)]));
        session.apply_inbound(InboundMessage::Suggestion(suggestion(
            "s1",
            "r1",
            CommandType::HoldPosition,
        )));

        // r1 is not supervised, so the announced countdown is dropped.
        session.apply_inbound(InboundMessage::AutonomyCountdown(Countdown {
            suggestion_id: SuggestionId::from("s1"),
            robot_id: RobotId::from("r1"),
            command_type: CommandType::HoldPosition,
            auto_execute_at: 999.0,
        }));
        assert!(session
            .autonomy()
            .countdown(&SuggestionId::from("s1"))
            .is_none());

        // For an unknown suggestion it is dropped too.
        session.apply_inbound(InboundMessage::AutonomyCountdown(Countdown {
            suggestion_id: SuggestionId::from("ghost"),
            robot_id: RobotId::from("r1"),
            command_type: CommandType::HoldPosition,
            auto_execute_at: 999.0,
        }));
        assert!(session
            .autonomy()
            .countdown(&SuggestionId::from("ghost"))
            .is_none());
    }

    #[test]
    fn snapshot_voids_stale_countdowns() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Supervised)]));
        session.apply_inbound(InboundMessage::Suggestion(suggestion(
            "s1",
            "r1",
            CommandType::HoldPosition,
        )));
        assert!(session
            .autonomy()
            .countdown(&SuggestionId::from("s1"))
            .is_some());

        // Reconnect snapshot shows the robot back at assisted.
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Assisted)]));

        assert!(session
            .autonomy()
            .countdown(&SuggestionId::from("s1"))
            .is_none());
    }

    #[test]
    fn terminal_restatement_cancels_countdown() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Supervised)]));
        session.apply_inbound(InboundMessage::Suggestion(suggestion(
            "s1",
            "r1",
            CommandType::HoldPosition,
        )));

        let mut resolved = suggestion("s1", "r1", CommandType::HoldPosition);
        resolved.status = SuggestionStatus::Rejected;
        session.apply_inbound(InboundMessage::Suggestion(resolved));

        assert!(session
            .autonomy()
            .countdown(&SuggestionId::from("s1"))
            .is_none());
        let stored = session.suggestions().get(&SuggestionId::from("s1")).unwrap();
        assert_eq!(stored.status, SuggestionStatus::Rejected);
    }

    #[test]
    fn pending_restatement_cannot_resurrect_a_resolved_suggestion() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Supervised)]));
        session.apply_inbound(InboundMessage::Suggestion(suggestion(
            "s1",
            "r1",
            CommandType::HoldPosition,
        )));
        session.approve_suggestion(&SuggestionId::from("s1")).unwrap();

        // Broadcast crossing the local approval in flight.
        session.apply_inbound(InboundMessage::Suggestion(suggestion(
            "s1",
            "r1",
            CommandType::HoldPosition,
        )));

        let stored = session.suggestions().get(&SuggestionId::from("s1")).unwrap();
        assert_eq!(stored.status, SuggestionStatus::Approved);
        assert!(session
            .autonomy()
            .countdown(&SuggestionId::from("s1"))
            .is_none());
    }

    #[test]
    fn command_status_flows_into_tracker() {
        let mut session = session();
        session.apply_inbound(InboundMessage::CommandStatus(Command {
            id: "cmd1".into(),
            robot_id: RobotId::from("r1"),
            command_type: CommandType::Goto,
            parameters: json!({"latitude": 1.0, "longitude": 2.0}),
            source: CommandSource::Operator,
            status: CommandStatus::Acknowledged,
            created_at: 1.0,
            updated_at: 2.0,
        }));

        let command = session.commands().get(&"cmd1".into()).unwrap();
        assert_eq!(command.status, CommandStatus::Acknowledged);
    }

    #[test]
    fn mission_update_takes_focus() {
        let mut session = session();
        let mission = Mission {
            id: "m1".into(),
            name: "perimeter sweep".into(),
            status: MissionStatus::Active,
            assigned_robots: vec![RobotId::from("r1")],
            waypoints: HashMap::new(),
            created_at: 1.0,
            updated_at: 1.0,
        };
        session.apply_inbound(InboundMessage::MissionUpdated(mission));

        assert_eq!(
            session.missions().focused().map(|m| m.id.as_str()),
            Some("m1")
        );
    }

    #[test]
    fn optimistic_tier_change_rolls_back() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Assisted)]));

        let rollback = session
            .begin_tier_change(
                TierTarget::Robot(RobotId::from("r1")),
                AutonomyTier::Autonomous,
            )
            .unwrap();
        assert_eq!(
            session
                .robots()
                .tier_of(&RobotId::from("r1"), session.autonomy().fleet_default()),
            AutonomyTier::Autonomous
        );

        session.rollback_tier(rollback);
        assert_eq!(
            session
                .robots()
                .tier_of(&RobotId::from("r1"), session.autonomy().fleet_default()),
            AutonomyTier::Assisted
        );
    }

    #[test]
    fn waypoint_interaction_dispatches_ordered_points() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Assisted)]));
        session.select_robot(Some(RobotId::from("r1")));

        session.toggle_interaction(InteractionMode::Waypoints);
        session.map_click(1.0, 1.0).unwrap();
        session.map_click(2.0, 2.0).unwrap();
        session.map_click(3.0, 3.0).unwrap();
        session.undo_waypoint();
        let id = session.send_pending_waypoints().unwrap();
        assert!(id.is_some());

        let outbox = session.drain_outbox();
        assert_eq!(outbox.len(), 1);
        match &outbox[0] {
            OutboundMessage::CommandSend {
                command_type,
                parameters,
                ..
            } => {
                assert_eq!(*command_type, CommandType::FollowWaypoints);
                let points = parameters["waypoints"].as_array().unwrap();
                assert_eq!(points.len(), 2);
                assert_eq!(points[0]["latitude"], 1.0);
                assert_eq!(points[1]["latitude"], 2.0);
            }
            other => panic!("unexpected outbound message: {other:?}"),
        }
        assert_eq!(session.builder().mode(), InteractionMode::None);
        assert!(session.builder().pending_waypoints().is_empty());
    }

    #[test]
    fn map_click_without_selection_is_an_error() {
        let mut session = session();
        session.toggle_interaction(InteractionMode::Goto);
        let err = session.map_click(1.0, 1.0).unwrap_err();
        assert!(matches!(err, crate::session::EngineError::NoSelection));
    }

    #[test]
    fn selecting_a_robot_collapses_the_draft() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Assisted)]));
        session.select_robot(Some(RobotId::from("r1")));
        session.toggle_interaction(InteractionMode::Waypoints);
        session.map_click(1.0, 1.0).unwrap();

        session.select_robot(Some(RobotId::from("r1")));

        assert_eq!(session.builder().mode(), InteractionMode::None);
        assert!(session.builder().pending_waypoints().is_empty());
    }

    #[test]
    fn reset_clears_everything() {
        let mut session = session();
        session.apply_inbound(snapshot(vec![robot("r1", AutonomyTier::Supervised)]));
        session.apply_inbound(InboundMessage::Suggestion(suggestion(
            "s1",
            "r1",
            CommandType::HoldPosition,
        )));
        session.select_robot(Some(RobotId::from("r1")));
        session.issue_command(
            RobotId::from("r1"),
            CommandType::Stop,
            json!({}),
            CommandSource::Operator,
        );

        session.reset();

        assert!(session.robots().is_empty());
        assert!(session.suggestions().is_empty());
        assert!(session.commands().is_empty());
        assert!(session.autonomy().countdowns().next().is_none());
        assert!(session.selected_robot().is_none());
        assert!(session.drain_outbox().is_empty());
    }
}
