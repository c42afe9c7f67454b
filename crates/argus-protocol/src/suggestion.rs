use serde::{Deserialize, Serialize};

use crate::{CommandType, RobotId, SuggestionId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Once a suggestion leaves `Pending` the new status is terminal for that
/// record; later restatements of the same id may only confirm it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl SuggestionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SuggestionStatus::Pending)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Heuristic,
    Ai,
}

/// The concrete action a suggestion proposes, ready to dispatch as a
/// `command.send` if approved.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedAction {
    pub robot_id: RobotId,
    pub command_type: CommandType,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: SuggestionId,
    pub robot_id: RobotId,
    pub title: String,
    pub description: String,
    pub reasoning: String,
    pub severity: Severity,
    #[serde(default)]
    pub proposed_action: Option<ProposedAction>,
    /// Confidence in [0, 1].
    #[serde(default)]
    pub confidence: f64,
    pub status: SuggestionStatus,
    pub source: SuggestionSource,
    #[serde(default)]
    pub created_at: f64,
    /// Unix epoch seconds; 0 means no expiry.
    #[serde(default)]
    pub expires_at: f64,
}

impl Suggestion {
    pub fn is_expired(&self, now: f64) -> bool {
        self.expires_at > 0.0 && now > self.expires_at
    }
}
