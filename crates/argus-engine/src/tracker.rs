//! Outgoing command lifecycle tracking.

use std::collections::HashMap;

use tracing::warn;

use argus_protocol::{Command, CommandId, RobotId};

/// Records every command the console knows about, indexed by id and by
/// owning robot for recency queries.
///
/// Status transitions are clamped monotonic: an inbound record carrying an
/// earlier lifecycle stage than the one already held keeps the held status
/// and logs the regression. Everything else in the record merges.
#[derive(Debug, Default)]
pub struct CommandTracker {
    commands: HashMap<CommandId, Command>,
    /// Append-only insertion order per robot, not deduplicated by content.
    by_robot: HashMap<RobotId, Vec<CommandId>>,
}

impl CommandTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new command and index it under its robot.
    pub fn record(&mut self, command: Command) {
        self.by_robot
            .entry(command.robot_id.clone())
            .or_default()
            .push(command.id.clone());
        self.commands.insert(command.id.clone(), command);
    }

    /// Apply an inbound command record. Unseen ids insert as new; known ids
    /// merge with the status clamp described above.
    pub fn apply_status(&mut self, incoming: Command) {
        match self.commands.get_mut(&incoming.id) {
            None => self.record(incoming),
            Some(existing) => {
                if incoming.status.rank() < existing.status.rank() {
                    warn!(
                        command = %incoming.id,
                        held = ?existing.status,
                        incoming = ?incoming.status,
                        "ignoring command status regression"
                    );
                    let held = existing.status;
                    *existing = incoming;
                    existing.status = held;
                } else {
                    *existing = incoming;
                }
            }
        }
    }

    pub fn get(&self, id: &CommandId) -> Option<&Command> {
        self.commands.get(id)
    }

    /// Most recent `limit` commands for a robot, newest first.
    pub fn recent(&self, robot_id: &RobotId, limit: usize) -> Vec<&Command> {
        let Some(ids) = self.by_robot.get(robot_id) else {
            return Vec::new();
        };
        ids.iter()
            .rev()
            .filter_map(|id| self.commands.get(id))
            .take(limit)
            .collect()
    }

    /// Most recent non-terminal command for a robot, if any.
    pub fn active(&self, robot_id: &RobotId) -> Option<&Command> {
        self.by_robot.get(robot_id)?.iter().rev().find_map(|id| {
            self.commands
                .get(id)
                .filter(|command| !command.status.is_terminal())
        })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.by_robot.clear();
    }
}
