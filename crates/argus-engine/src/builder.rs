//! Map-interaction command builder.
//!
//! A small state machine that accumulates operator map clicks into a single
//! outgoing command: a goto point, a home point, an ordered waypoint list,
//! or a circle definition. Draft state is ephemeral; it is never persisted
//! and collapses whenever the mode exits or the robot selection changes.

use serde_json::json;

use argus_protocol::CommandType;

/// Which map-interaction mode is active. At most one at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionMode {
    None,
    Goto,
    SetHome,
    Waypoints,
    CircleArea,
}

/// What a map click did.
#[derive(Clone, Debug, PartialEq)]
pub enum ClickAction {
    /// Click outside any interaction mode; nothing to do.
    Ignored,
    /// The click completed the interaction: dispatch exactly this command.
    Dispatch(CommandType, serde_json::Value),
    /// The click grew the draft; no command yet.
    DraftUpdated,
}

pub const DEFAULT_CIRCLE_RADIUS_M: f64 = 100.0;

#[derive(Debug)]
pub struct CommandBuilder {
    mode: InteractionMode,
    /// Ordered (latitude, longitude) pending waypoints.
    waypoints: Vec<(f64, f64)>,
    circle_center: Option<(f64, f64)>,
    circle_radius_m: f64,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBuilder {
    pub fn new() -> Self {
        Self {
            mode: InteractionMode::None,
            waypoints: Vec::new(),
            circle_center: None,
            circle_radius_m: DEFAULT_CIRCLE_RADIUS_M,
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn pending_waypoints(&self) -> &[(f64, f64)] {
        &self.waypoints
    }

    pub fn circle(&self) -> Option<((f64, f64), f64)> {
        self.circle_center
            .map(|center| (center, self.circle_radius_m))
    }

    /// Toggle into a mode; re-activating the active mode returns to `None`.
    /// Switching modes discards the previous draft.
    pub fn toggle(&mut self, mode: InteractionMode) {
        if self.mode == mode {
            self.reset();
        } else {
            self.reset();
            self.mode = mode;
        }
    }

    /// Collapse to `None` and discard any draft. Called on robot
    /// (de)selection, the cancel key, and session reset.
    pub fn reset(&mut self) {
        self.mode = InteractionMode::None;
        self.waypoints.clear();
        self.circle_center = None;
        self.circle_radius_m = DEFAULT_CIRCLE_RADIUS_M;
    }

    /// Feed one map click through the state machine.
    pub fn map_click(&mut self, latitude: f64, longitude: f64) -> ClickAction {
        match self.mode {
            InteractionMode::None => ClickAction::Ignored,
            InteractionMode::Goto => {
                self.mode = InteractionMode::None;
                ClickAction::Dispatch(
                    CommandType::Goto,
                    json!({"latitude": latitude, "longitude": longitude}),
                )
            }
            InteractionMode::SetHome => {
                self.mode = InteractionMode::None;
                ClickAction::Dispatch(
                    CommandType::SetHome,
                    json!({"latitude": latitude, "longitude": longitude}),
                )
            }
            InteractionMode::Waypoints => {
                self.waypoints.push((latitude, longitude));
                ClickAction::DraftUpdated
            }
            InteractionMode::CircleArea => {
                // First click fixes the center; later clicks reposition it.
                self.circle_center = Some((latitude, longitude));
                ClickAction::DraftUpdated
            }
        }
    }

    /// Remove the most recent pending waypoint.
    pub fn undo_waypoint(&mut self) {
        self.waypoints.pop();
    }

    pub fn clear_waypoints(&mut self) {
        self.waypoints.clear();
    }

    /// Package the whole ordered draft as one follow-waypoints command,
    /// clearing the draft and exiting the mode. None when the draft is
    /// empty or the mode is not waypoints.
    pub fn send_waypoints(&mut self) -> Option<(CommandType, serde_json::Value)> {
        if self.mode != InteractionMode::Waypoints || self.waypoints.is_empty() {
            return None;
        }
        let waypoints: Vec<serde_json::Value> = self
            .waypoints
            .iter()
            .map(|(latitude, longitude)| {
                json!({
                    "latitude": latitude,
                    "longitude": longitude,
                    "altitude": 0.0,
                    "action": "navigate",
                })
            })
            .collect();
        self.reset();
        Some((CommandType::FollowWaypoints, json!({"waypoints": waypoints})))
    }

    /// Adjust the circle radius (meters). Only meaningful in circle mode.
    pub fn set_circle_radius(&mut self, radius_m: f64) {
        if radius_m > 0.0 {
            self.circle_radius_m = radius_m;
        }
    }

    /// Emit one circle command with the drafted center and radius, exiting
    /// the mode. None without a fixed center.
    pub fn confirm_circle(&mut self) -> Option<(CommandType, serde_json::Value)> {
        if self.mode != InteractionMode::CircleArea {
            return None;
        }
        let (latitude, longitude) = self.circle_center?;
        let radius_m = self.circle_radius_m;
        self.reset();
        Some((
            CommandType::CircleArea,
            json!({
                "center": {"latitude": latitude, "longitude": longitude},
                "radiusMeters": radius_m,
            }),
        ))
    }
}
