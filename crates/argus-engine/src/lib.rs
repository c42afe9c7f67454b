//! Synchronous state engine for the Argus operations console.
//!
//! Everything here is plain single-threaded state: reconciliation stores,
//! trail history, command lifecycle tracking, the autonomy tier machine and
//! the map-interaction command builder, all owned by a [`Session`]. The
//! engine never touches the network or a clock source beyond reading wall
//! time; connections, timers and HTTP live in the client shell that drives
//! it.

pub mod autonomy;
pub mod builder;
pub mod config;
pub mod router;
pub mod session;
pub mod stores;
pub mod tracker;
pub mod trail;

pub use autonomy::{AutonomyEngine, Disposition};
pub use builder::{ClickAction, CommandBuilder, InteractionMode, DEFAULT_CIRCLE_RADIUS_M};
pub use config::EngineConfig;
pub use session::{EngineError, Session, TierRollback};
pub use stores::{MissionStore, RobotStore, SuggestionStore};
pub use tracker::CommandTracker;
pub use trail::{TrailBuffer, TrailPoint};
