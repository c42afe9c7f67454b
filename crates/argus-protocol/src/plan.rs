//! Shapes exchanged with the AI planning collaborator over REST.
//!
//! These never cross the persistent connection; the collaborator turns an
//! approved plan into mission and command records that arrive back through
//! the normal `mission.updated` / `command.status` flow.

use serde::{Deserialize, Serialize};

use crate::{Command, RobotId, WaypointAction};

/// Operator intent for mission planning.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanIntent {
    pub objective: String,
    /// GeoJSON polygon or bounding box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<serde_json::Value>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub rules_of_engagement: Vec<String>,
    #[serde(default)]
    pub preferences: serde_json::Value,
    /// None lets the planner pick from the whole available fleet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_robots: Option<Vec<RobotId>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanWaypoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
    #[serde(default = "default_action")]
    pub action: WaypointAction,
}

fn default_action() -> WaypointAction {
    WaypointAction::Navigate
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanAssignment {
    pub robot_id: RobotId,
    #[serde(default)]
    pub waypoints: Vec<PlanWaypoint>,
}

/// A generated mission plan awaiting operator approval.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionPlan {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub assignments: Vec<PlanAssignment>,
}

/// Result of a natural-language execute call: the commands the collaborator
/// dispatched plus its explanation of what it did.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecuteOutcome {
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_omits_empty_optionals() {
        let intent = PlanIntent {
            objective: "Survey the north shore".to_string(),
            ..PlanIntent::default()
        };
        let value = serde_json::to_value(&intent).unwrap();
        assert!(value.get("zone").is_none());
        assert!(value.get("selectedRobots").is_none());
        assert_eq!(value["objective"], "Survey the north shore");
    }

    #[test]
    fn plan_waypoint_action_defaults_to_navigate() {
        let wp: PlanWaypoint =
            serde_json::from_str(r#"{"latitude": 1.0, "longitude": 2.0}"#).unwrap();
        assert_eq!(wp.action, WaypointAction::Navigate);
    }
}
