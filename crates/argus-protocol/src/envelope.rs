//! The `{type, payload, timestamp}` envelope and the closed message unions.
//!
//! Inbound decoding distinguishes three cases: a known type with a valid
//! payload (a message), an unknown type (ignored, so newer fleet software
//! never breaks an older console), and a known type with a malformed payload
//! (an error the dispatcher drops and logs).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::{
    AutonomyTier, Command, CommandType, Countdown, Mission, MissionId, Robot, RobotId, Suggestion,
    TierChange, TierTarget,
};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Payload of a `state.sync` message: the authoritative reconciliation point
/// after (re)connect. Stores replace wholesale, never merge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateSync {
    pub robots: HashMap<RobotId, Robot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missions: Option<HashMap<MissionId, Mission>>,
}

/// Every message the fleet side sends to the console.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum InboundMessage {
    #[serde(rename = "state.sync")]
    StateSync(StateSync),
    #[serde(rename = "robot.updated")]
    RobotUpdated(Robot),
    #[serde(rename = "command.status")]
    CommandStatus(Command),
    #[serde(rename = "mission.updated")]
    MissionUpdated(Mission),
    #[serde(rename = "ai.suggestion")]
    Suggestion(Suggestion),
    #[serde(rename = "autonomy.changed")]
    AutonomyChanged(TierChange),
    #[serde(rename = "autonomy.countdown")]
    AutonomyCountdown(Countdown),
}

impl InboundMessage {
    /// Wire tag for this message.
    pub fn message_type(&self) -> &'static str {
        match self {
            InboundMessage::StateSync(_) => "state.sync",
            InboundMessage::RobotUpdated(_) => "robot.updated",
            InboundMessage::CommandStatus(_) => "command.status",
            InboundMessage::MissionUpdated(_) => "mission.updated",
            InboundMessage::Suggestion(_) => "ai.suggestion",
            InboundMessage::AutonomyChanged(_) => "autonomy.changed",
            InboundMessage::AutonomyCountdown(_) => "autonomy.countdown",
        }
    }

    /// All recognized inbound tags, in dispatch order.
    pub const KNOWN_TYPES: [&'static str; 7] = [
        "state.sync",
        "robot.updated",
        "command.status",
        "mission.updated",
        "ai.suggestion",
        "autonomy.changed",
        "autonomy.countdown",
    ];
}

/// Every message the console sends over the persistent connection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum OutboundMessage {
    #[serde(rename = "command.send")]
    #[serde(rename_all = "camelCase")]
    CommandSend {
        robot_id: RobotId,
        command_type: CommandType,
        parameters: serde_json::Value,
    },
    #[serde(rename = "autonomy.set_tier")]
    #[serde(rename_all = "camelCase")]
    SetTier {
        #[serde(rename = "robotId")]
        target: TierTarget,
        tier: AutonomyTier,
    },
}

/// Uniform wrapper for every message crossing the persistent connection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<M> {
    #[serde(flatten)]
    pub message: M,
    pub timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct TypeProbe {
    #[serde(rename = "type")]
    kind: String,
}

/// Decode one inbound frame.
///
/// Returns `Ok(None)` for envelopes whose type tag is not recognized; those
/// must be ignored without error. A recognized tag with a payload that does
/// not match its shape is a `WireError`.
pub fn decode_inbound(text: &str) -> Result<Option<Envelope<InboundMessage>>, WireError> {
    let probe: TypeProbe = serde_json::from_str(text)?;
    if !InboundMessage::KNOWN_TYPES.contains(&probe.kind.as_str()) {
        return Ok(None);
    }
    let envelope = serde_json::from_str(text)?;
    Ok(Some(envelope))
}

/// Encode an outbound message into a timestamped envelope frame.
pub fn encode_outbound(message: &OutboundMessage) -> Result<String, WireError> {
    let envelope = Envelope {
        message: message.clone(),
        timestamp: Utc::now(),
    };
    Ok(serde_json::to_string(&envelope)?)
}
