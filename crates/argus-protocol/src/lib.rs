//! Wire types for the Argus fleet console.
//!
//! Everything that crosses the persistent connection or the REST collaborator
//! boundary lives here: the `{type, payload, timestamp}` envelope, the closed
//! inbound/outbound message unions, and the entity shapes they carry. Field
//! names serialize in the console's camelCase wire format; enums serialize
//! lowercase (snake_case for command types).

pub mod autonomy;
pub mod command;
pub mod envelope;
pub mod ids;
pub mod mission;
pub mod plan;
pub mod robot;
pub mod suggestion;

pub use autonomy::{Countdown, TierChange, TierTarget, FLEET_TARGET};
pub use command::{Command, CommandSource, CommandStatus, CommandType};
pub use envelope::{
    decode_inbound, encode_outbound, Envelope, InboundMessage, OutboundMessage, StateSync,
    WireError,
};
pub use ids::{CommandId, MissionId, RobotId, SuggestionId};
pub use mission::{Mission, MissionStatus, Waypoint, WaypointAction, WaypointStatus};
pub use plan::{ExecuteOutcome, MissionPlan, PlanAssignment, PlanIntent, PlanWaypoint};
pub use robot::{AutonomyTier, Health, Position, Robot, RobotStatus, RobotType};
pub use suggestion::{ProposedAction, Severity, Suggestion, SuggestionSource, SuggestionStatus};
