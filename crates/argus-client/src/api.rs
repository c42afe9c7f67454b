//! Collaborator REST API.
//!
//! Side-channel for operations that need a synchronous answer: suggestion
//! resolution, mission planning and tier changes. The collaborator reports
//! application failures as HTTP 200 with an `{"error": "..."}` body, so
//! every response goes through the same error check before being decoded.

use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use argus_protocol::{
    AutonomyTier, ExecuteOutcome, Mission, MissionPlan, PlanIntent, RobotId, SuggestionId,
};

use crate::error::{ClientError, Result};

pub struct CollaboratorApi {
    http: Client,
    base: Url,
}

impl CollaboratorApi {
    pub fn new(base: &str) -> Result<Self> {
        // A missing trailing slash would make Url::join drop the last path
        // segment.
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let base =
            Url::parse(&normalized).map_err(|error| ClientError::InvalidUrl(error.to_string()))?;
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    pub async fn approve_suggestion(&self, id: &SuggestionId) -> Result<()> {
        self.post(&format!("ai/suggestions/{id}/approve"), &json!({}))
            .await?;
        Ok(())
    }

    pub async fn reject_suggestion(&self, id: &SuggestionId) -> Result<()> {
        self.post(&format!("ai/suggestions/{id}/reject"), &json!({}))
            .await?;
        Ok(())
    }

    /// Run a free-text instruction through the collaborator, optionally
    /// scoped to one robot. Returns the commands it dispatched.
    pub async fn execute_instruction(
        &self,
        text: &str,
        robot: Option<&RobotId>,
    ) -> Result<ExecuteOutcome> {
        let mut body = json!({ "text": text });
        if let Some(robot) = robot {
            body["robotId"] = json!(robot);
        }
        let value = self.post("ai/execute", &body).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Turn an operator intent into a reviewable multi-robot plan.
    pub async fn generate_plan(&self, intent: &PlanIntent) -> Result<MissionPlan> {
        let value = self
            .post("ai/missions/plan", &serde_json::to_value(intent)?)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Approve a reviewed plan. The collaborator creates the mission and
    /// dispatches the per-robot waypoint commands itself.
    pub async fn approve_plan(&self, plan: &MissionPlan) -> Result<Mission> {
        let value = self
            .post("ai/missions/plan/approve", &serde_json::to_value(plan)?)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn set_robot_tier(&self, robot: &RobotId, tier: AutonomyTier) -> Result<()> {
        self.put(
            &format!("autonomy/robots/{robot}/tier"),
            &json!({ "tier": tier }),
        )
        .await?;
        Ok(())
    }

    pub async fn set_fleet_tier(&self, tier: AutonomyTier) -> Result<()> {
        self.put("autonomy/fleet/default-tier", &json!({ "tier": tier }))
            .await?;
        Ok(())
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.join(path)?;
        debug!(%url, "collaborator POST");
        let response = self.http.post(url).json(body).send().await?;
        check_payload(response.error_for_status()?.json().await?)
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.join(path)?;
        debug!(%url, "collaborator PUT");
        let response = self.http.put(url).json(body).send().await?;
        check_payload(response.error_for_status()?.json().await?)
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|error| ClientError::InvalidUrl(error.to_string()))
    }
}

/// Application failures arrive as 200s with an error field.
fn check_payload(value: Value) -> Result<Value> {
    if let Some(reason) = value.get("error").and_then(Value::as_str) {
        return Err(ClientError::Collaborator(reason.to_string()));
    }
    Ok(value)
}
