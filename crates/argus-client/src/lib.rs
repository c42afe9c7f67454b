//! Async shell around the console engine.
//!
//! The engine is synchronous and single-owner; this crate supplies the
//! things it deliberately lacks: the WebSocket connection with its
//! reconnect loop, wall-clock countdown timers, and the collaborator REST
//! side-channel. An embedding UI drives [`ConsoleClient::tick`] and calls
//! the operator methods in between; the bundled binary just runs the loop.

pub mod api;
pub mod config;
pub mod connection;
pub mod countdown;
pub mod error;

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use argus_engine::{EngineConfig, Session};
use argus_protocol::{
    AutonomyTier, CommandId, CommandSource, CommandType, ExecuteOutcome, Mission, MissionPlan,
    OutboundMessage, PlanIntent, RobotId, SuggestionId, TierTarget,
};

pub use api::CollaboratorApi;
pub use config::ClientConfig;
pub use connection::{ConnectionEvent, ConnectionState, ConsoleConnection};
pub use countdown::CountdownScheduler;
pub use error::{ClientError, Result};

pub struct ConsoleClient {
    config: ClientConfig,
    session: Session,
    connection: ConsoleConnection,
    api: CollaboratorApi,
    scheduler: CountdownScheduler,
    fired: mpsc::UnboundedReceiver<SuggestionId>,
}

impl ConsoleClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let connection = ConsoleConnection::new(&config.ws_url, config.connect_timeout)?;
        let api = CollaboratorApi::new(&config.api_base)?;
        let (scheduler, fired) = CountdownScheduler::new();
        Ok(Self {
            session: Session::new(EngineConfig::default()),
            connection,
            api,
            scheduler,
            fired,
            config,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn api(&self) -> &CollaboratorApi {
        &self.api
    }

    /// Dial until a connection sticks, waiting the configured delay between
    /// attempts.
    pub async fn connect(&self) -> Result<()> {
        loop {
            match self.connection.connect().await {
                Ok(()) => {
                    info!(url = self.connection.url(), "connected");
                    return Ok(());
                }
                Err(ClientError::AlreadyConnected) => return Ok(()),
                Err(error) => {
                    warn!(
                        url = self.connection.url(),
                        "connect failed ({}), retrying in {:?}",
                        error.user_message(),
                        self.config.reconnect_delay
                    );
                    tokio::time::sleep(self.config.reconnect_delay).await;
                }
            }
        }
    }

    /// Process one event: an inbound message, a dropped connection, or an
    /// elapsed countdown. Returns when something was handled.
    pub async fn tick(&mut self) -> Result<()> {
        let ConsoleClient {
            config,
            session,
            connection,
            scheduler,
            fired,
            ..
        } = self;

        tokio::select! {
            event = connection.recv() => match event {
                Some(ConnectionEvent::Message(envelope)) => {
                    session.apply_inbound(envelope.message);
                    flush_outbox(session, connection).await;
                    let now = epoch_now();
                    session.expire_suggestions(now);
                    scheduler.sync(session.autonomy().countdowns(), now);
                }
                Some(ConnectionEvent::Closed) => {
                    info!("connection lost, reconnecting in {:?}", config.reconnect_delay);
                    // The next snapshot reconciles whatever was missed
                    // while offline.
                    loop {
                        tokio::time::sleep(config.reconnect_delay).await;
                        match connection.connect().await {
                            Ok(()) => {
                                info!(url = connection.url(), "reconnected");
                                break;
                            }
                            Err(error) => {
                                warn!("reconnect failed: {}", error.user_message());
                            }
                        }
                    }
                }
                None => return Err(ClientError::NotConnected),
            },
            Some(id) = fired.recv() => {
                scheduler.cancel(&id);
                match session.fire_countdown(&id) {
                    Ok(command) => {
                        info!(suggestion = %id, command = %command, "countdown auto-executed");
                        flush_outbox(session, connection).await;
                    }
                    Err(error) => debug!(suggestion = %id, "stale countdown firing: {error}"),
                }
            }
        }
        Ok(())
    }

    /// Connect and run until the event channel closes or ctrl-c.
    pub async fn run(&mut self) -> Result<()> {
        self.connect().await?;
        loop {
            self.tick().await?;
        }
    }

    pub async fn shutdown(&mut self) {
        self.scheduler.shutdown();
        if let Err(error) = self.connection.disconnect().await {
            debug!("disconnect error: {error}");
        }
        self.session.reset();
    }

    /// Approve a suggestion: dispatch its action and tell the collaborator.
    /// The collaborator call is bookkeeping; the dispatch already happened.
    pub async fn approve_suggestion(&mut self, id: &SuggestionId) -> Result<CommandId> {
        let command = self.session.approve_suggestion(id)?;
        self.flush().await;
        self.scheduler.cancel(id);
        if let Err(error) = self.api.approve_suggestion(id).await {
            debug!(suggestion = %id, "collaborator approve failed: {}", error.user_message());
        }
        Ok(command)
    }

    /// Reject or override a suggestion.
    pub async fn reject_suggestion(&mut self, id: &SuggestionId) -> Result<()> {
        self.session.override_suggestion(id)?;
        self.scheduler.cancel(id);
        if let Err(error) = self.api.reject_suggestion(id).await {
            debug!(suggestion = %id, "collaborator reject failed: {}", error.user_message());
        }
        Ok(())
    }

    /// Optimistic tier change with rollback: apply locally, announce over the
    /// socket, restore the previous tier if the announcement cannot be sent.
    pub async fn set_tier(&mut self, target: TierTarget, tier: AutonomyTier) -> Result<()> {
        let rollback = self.session.begin_tier_change(target.clone(), tier)?;
        let result = self
            .connection
            .send(&OutboundMessage::SetTier { target, tier })
            .await;
        if let Err(error) = result {
            warn!("tier change not sent, rolling back: {}", error.user_message());
            self.session.rollback_tier(rollback);
            return Err(error);
        }
        Ok(())
    }

    /// Dispatch a manual command to one robot.
    pub async fn send_command(
        &mut self,
        robot: RobotId,
        command_type: CommandType,
        parameters: serde_json::Value,
    ) -> CommandId {
        let id = self
            .session
            .issue_command(robot, command_type, parameters, CommandSource::Operator);
        self.flush().await;
        id
    }

    pub async fn execute_instruction(
        &self,
        text: &str,
        robot: Option<&RobotId>,
    ) -> Result<ExecuteOutcome> {
        self.api.execute_instruction(text, robot).await
    }

    pub async fn generate_plan(&self, intent: &PlanIntent) -> Result<MissionPlan> {
        self.api.generate_plan(intent).await
    }

    pub async fn approve_plan(&self, plan: &MissionPlan) -> Result<Mission> {
        self.api.approve_plan(plan).await
    }

    async fn flush(&mut self) {
        flush_outbox(&mut self.session, &self.connection).await;
    }
}

/// Drain the engine outbox onto the socket. Sends are best-effort: while
/// disconnected the messages are dropped and logged, never queued.
async fn flush_outbox(session: &mut Session, connection: &ConsoleConnection) {
    for message in session.drain_outbox() {
        if let Err(error) = connection.send(&message).await {
            warn!("outbound message dropped: {}", error.user_message());
        }
    }
}

fn epoch_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}
