use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{MissionId, RobotId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Aborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointAction {
    Navigate,
    Hover,
    Land,
    Survey,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointStatus {
    Pending,
    Active,
    Completed,
    Skipped,
}

/// One step in a robot's mission route. `sequence` is unique within the
/// owning robot's list.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub id: String,
    pub sequence: u32,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
    pub action: WaypointAction,
    #[serde(default)]
    pub parameters: serde_json::Value,
    pub status: WaypointStatus,
}

/// Mission records arrive and are stored wholesale; the console never edits
/// them locally (the command builder's waypoint draft is a separate,
/// unpersisted thing until dispatched).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: MissionId,
    pub name: String,
    pub status: MissionStatus,
    #[serde(default)]
    pub assigned_robots: Vec<RobotId>,
    /// Ordered waypoint route per assigned robot.
    #[serde(default)]
    pub waypoints: HashMap<RobotId, Vec<Waypoint>>,
    #[serde(default)]
    pub created_at: f64,
    #[serde(default)]
    pub updated_at: f64,
}
