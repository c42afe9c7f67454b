use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{AutonomyTier, CommandType, RobotId, SuggestionId};

/// Sentinel robot id the wire uses for fleet-wide tier changes.
pub const FLEET_TARGET: &str = "__fleet__";

/// Subject of a tier change: one robot, or the fleet default.
///
/// Encoded on the wire as a plain robot-id string, with `"__fleet__"`
/// reserved for the fleet default.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TierTarget {
    Fleet,
    Robot(RobotId),
}

impl TierTarget {
    pub fn as_str(&self) -> &str {
        match self {
            TierTarget::Fleet => FLEET_TARGET,
            TierTarget::Robot(id) => id.as_str(),
        }
    }
}

impl Serialize for TierTarget {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TierTarget {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw == FLEET_TARGET {
            Ok(TierTarget::Fleet)
        } else {
            Ok(TierTarget::Robot(RobotId(raw)))
        }
    }
}

/// One entry in the autonomy change log: who moved which subject between
/// which tiers, and when.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierChange {
    pub id: String,
    #[serde(rename = "robotId")]
    pub target: TierTarget,
    pub old_tier: AutonomyTier,
    pub new_tier: AutonomyTier,
    #[serde(default)]
    pub changed_by: String,
    #[serde(default)]
    pub timestamp: f64,
}

/// A scheduled auto-execution deadline for one pending supervised
/// suggestion. Removing the suggestion or overriding it removes this.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    pub suggestion_id: SuggestionId,
    pub robot_id: RobotId,
    pub command_type: CommandType,
    /// Wall-clock deadline, Unix epoch seconds.
    pub auto_execute_at: f64,
}
