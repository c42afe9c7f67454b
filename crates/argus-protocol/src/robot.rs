use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{CommandSource, RobotId};

/// Robot platform class. The catalog is closed; new platform kinds are a
/// protocol revision, not runtime data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotType {
    Aerial,
    Ground,
    Submersible,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotStatus {
    Idle,
    Active,
    Returning,
    Error,
    Offline,
}

/// How much an AI-proposed action may do without a human in the loop.
///
/// Ordered from least to most autonomous; the ordering is meaningful for
/// display but tier semantics are applied per-variant, never by comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutonomyTier {
    Manual,
    Assisted,
    Supervised,
    Autonomous,
}

impl Default for AutonomyTier {
    fn default() -> Self {
        AutonomyTier::Assisted
    }
}

impl AutonomyTier {
    /// Whether the operator is offered an explicit approve action at this
    /// tier. Manual is display-only; autonomous needs no human at all.
    pub fn allows_approval(self) -> bool {
        matches!(self, AutonomyTier::Assisted | AutonomyTier::Supervised)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub heading: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub battery_percent: f64,
    pub signal_strength: f64,
}

/// One robot as mirrored from the fleet side.
///
/// `status` and `position` are only ever replaced wholesale by an inbound
/// update; the console never patches them locally. The single exception is
/// `autonomy_tier`, which the tier engine flips optimistically before the
/// collaborator confirms.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Robot {
    pub id: RobotId,
    pub name: String,
    pub robot_type: RobotType,
    pub status: RobotStatus,
    pub position: Position,
    pub speed: f64,
    pub health: Health,
    /// Unix epoch seconds of the last message that touched this robot.
    #[serde(default)]
    pub last_seen: f64,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub autonomy_tier: AutonomyTier,
    /// Provenance of the last accepted command. The original wire encodes
    /// "no command yet" as an empty string.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub last_command_source: Option<CommandSource>,
    #[serde(default)]
    pub last_command_at: f64,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<CommandSource>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(other) => serde_json::from_value(serde_json::Value::String(other.to_string()))
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
