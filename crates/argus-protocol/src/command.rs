use serde::{Deserialize, Serialize};

use crate::{CommandId, RobotId};

/// Fixed catalog of commands a robot understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Goto,
    Stop,
    ReturnHome,
    Patrol,
    SetSpeed,
    SetHome,
    FollowWaypoints,
    CircleArea,
    TakeOff,
    Land,
    Dive,
    Surface,
    HoldPosition,
    HoldDepth,
}

impl CommandType {
    /// High-risk commands move or reconfigure the platform in ways that are
    /// expensive to undo. Under the supervised tier they never auto-execute.
    pub fn is_high_risk(self) -> bool {
        matches!(
            self,
            CommandType::Goto
                | CommandType::ReturnHome
                | CommandType::TakeOff
                | CommandType::Land
                | CommandType::Dive
                | CommandType::Surface
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandSource {
    Operator,
    Ai,
    Voice,
}

/// Lifecycle stage of a command. Advances monotonically:
/// pending < sent < acknowledged < completed/failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Pending,
    Sent,
    Acknowledged,
    Completed,
    Failed,
}

impl CommandStatus {
    /// Canonical ordering for monotonicity checks. Completed and failed are
    /// both terminal and share a rank.
    pub fn rank(self) -> u8 {
        match self {
            CommandStatus::Pending => 0,
            CommandStatus::Sent => 1,
            CommandStatus::Acknowledged => 2,
            CommandStatus::Completed | CommandStatus::Failed => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CommandStatus::Completed | CommandStatus::Failed)
    }
}

/// One command record, created optimistically by the console or received
/// from the fleet side and reconciled by id.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: CommandId,
    pub robot_id: RobotId,
    pub command_type: CommandType,
    #[serde(default)]
    pub parameters: serde_json::Value,
    pub source: CommandSource,
    pub status: CommandStatus,
    #[serde(default)]
    pub created_at: f64,
    #[serde(default)]
    pub updated_at: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_type_wire_names_are_snake_case() {
        assert_eq!(
            serde_json::to_string(&CommandType::FollowWaypoints).unwrap(),
            "\"follow_waypoints\""
        );
        assert_eq!(
            serde_json::to_string(&CommandType::ReturnHome).unwrap(),
            "\"return_home\""
        );
        let parsed: CommandType = serde_json::from_str("\"circle_area\"").unwrap();
        assert_eq!(parsed, CommandType::CircleArea);
    }

    #[test]
    fn risk_catalog_matches_fleet_policy() {
        for high in [
            CommandType::Goto,
            CommandType::ReturnHome,
            CommandType::TakeOff,
            CommandType::Land,
            CommandType::Dive,
            CommandType::Surface,
        ] {
            assert!(high.is_high_risk(), "{high:?} should be high risk");
        }
        for low in [
            CommandType::Stop,
            CommandType::Patrol,
            CommandType::SetSpeed,
            CommandType::HoldPosition,
            CommandType::HoldDepth,
        ] {
            assert!(!low.is_high_risk(), "{low:?} should be low risk");
        }
    }

    #[test]
    fn status_ordering_is_monotonic() {
        assert!(CommandStatus::Pending.rank() < CommandStatus::Sent.rank());
        assert!(CommandStatus::Sent.rank() < CommandStatus::Acknowledged.rank());
        assert!(CommandStatus::Acknowledged.rank() < CommandStatus::Completed.rank());
        assert_eq!(
            CommandStatus::Completed.rank(),
            CommandStatus::Failed.rank()
        );
        assert!(CommandStatus::Failed.is_terminal());
        assert!(!CommandStatus::Acknowledged.is_terminal());
    }
}
