//! Session-mutating tools: `transferToHuman`, `sendDTMF`, `hangUpCall`,
//! `updateAppointmentStatus`. Each resolves its owning Session through
//! [`ToolContext`] (the arena-and-index pattern — see crate-level docs)
//! rather than holding a direct reference to it.

use async_trait::async_trait;
use serde::Deserialize;

use crate::appointment::{AppointmentPatch, AppointmentStatus, AppointmentStore};
use crate::llm::LlmError;

use super::types::{Tool, ToolContext, ToolResult};

async fn resolve(ctx: &ToolContext) -> Result<crate::session::registry::SharedSession, LlmError> {
    ctx.registry
        .get(&ctx.session_id)
        .ok_or_else(|| LlmError::ToolError(format!("no session for id {}", ctx.session_id)))
}

#[derive(Debug, Deserialize)]
struct TransferArgs {
    reason: String,
}

pub struct TransferToHumanTool;

#[async_trait]
impl Tool for TransferToHumanTool {
    fn name(&self) -> &str {
        "transferToHuman"
    }

    fn description(&self) -> &str {
        "Transfer the live call to a human by bridging it into a conference."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "reason": {"type": "string"}
            },
            "required": ["reason"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, args: serde_json::Value) -> Result<ToolResult, LlmError> {
        let args: TransferArgs =
            serde_json::from_value(args).map_err(|e| LlmError::ToolError(format!("invalid arguments: {e}")))?;
        let session = resolve(ctx).await?;
        let mut session = session.lock().await;
        session
            .transfer_to_human(&args.reason)
            .await
            .map_err(|e| LlmError::ToolError(e.to_string()))?;
        Ok(ToolResult::success("transfer initiated".into()))
    }
}

#[derive(Debug, Deserialize)]
struct DtmfArgs {
    digits: String,
}

pub struct SendDtmfTool;

#[async_trait]
impl Tool for SendDtmfTool {
    fn name(&self) -> &str {
        "sendDTMF"
    }

    fn description(&self) -> &str {
        "Send DTMF tones over the live call."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "digits": {"type": "string", "pattern": "^[0-9*#]+$"}
            },
            "required": ["digits"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, args: serde_json::Value) -> Result<ToolResult, LlmError> {
        let args: DtmfArgs =
            serde_json::from_value(args).map_err(|e| LlmError::ToolError(format!("invalid arguments: {e}")))?;
        let session = resolve(ctx).await?;
        let session = session.lock().await;
        session
            .send_dtmf(&args.digits)
            .map_err(|e| LlmError::ToolError(e.to_string()))?;
        Ok(ToolResult::success(format!("sent {}", args.digits)))
    }
}

#[derive(Debug, Deserialize)]
struct HangUpArgs {
    status: AppointmentStatus,
    #[serde(default)]
    notes: Option<String>,
}

pub struct HangUpCallTool;

#[async_trait]
impl Tool for HangUpCallTool {
    fn name(&self) -> &str {
        "hangUpCall"
    }

    fn description(&self) -> &str {
        "Record the outcome of this call and end it."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "enum": ["pending", "in_progress", "failed_tech_error", "failed_business_closed", "failed_human_error", "failed_no_available_slots", "success"]
                },
                "notes": {"type": "string"}
            },
            "required": ["status"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, args: serde_json::Value) -> Result<ToolResult, LlmError> {
        let args: HangUpArgs =
            serde_json::from_value(args).map_err(|e| LlmError::ToolError(format!("invalid arguments: {e}")))?;
        let session = resolve(ctx).await?;
        let mut session = session.lock().await;
        session.record_call_outcome(args.status, args.notes);
        session.hang_up().await;
        Ok(ToolResult::success("call ended".into()))
    }
}

#[derive(Debug, Deserialize)]
struct UpdateAppointmentArgs {
    status: AppointmentStatus,
    #[serde(default)]
    notes: Option<String>,
}

pub struct UpdateAppointmentStatusTool {
    store: std::sync::Arc<dyn AppointmentStore>,
}

impl UpdateAppointmentStatusTool {
    pub fn new(store: std::sync::Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateAppointmentStatusTool {
    fn name(&self) -> &str {
        "updateAppointmentStatus"
    }

    fn description(&self) -> &str {
        "Record the outcome of the appointment this call concerns."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "enum": ["pending", "in_progress", "failed_tech_error", "failed_business_closed", "failed_human_error", "failed_no_available_slots", "success"]
                },
                "notes": {"type": "string"}
            },
            "required": ["status"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, args: serde_json::Value) -> Result<ToolResult, LlmError> {
        let args: UpdateAppointmentArgs =
            serde_json::from_value(args).map_err(|e| LlmError::ToolError(format!("invalid arguments: {e}")))?;
        let session = resolve(ctx).await?;
        let appointment_id = {
            let session = session.lock().await;
            session.appointment_id().map(str::to_string)
        };
        let Some(appointment_id) = appointment_id else {
            return Ok(ToolResult::failure(
                "this call is not bound to an appointment".into(),
            ));
        };
        self.store
            .update_appointment(
                &appointment_id,
                AppointmentPatch {
                    status: Some(args.status),
                    notes: args.notes,
                },
            )
            .await
            .map_err(|e| LlmError::ToolError(e.to_string()))?;
        Ok(ToolResult::success("appointment updated".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::{Appointment, UserProfile};
    use crate::error::CoreError;
    use crate::session::orchestrator::test_support::fake_session;
    use crate::session::SessionRegistry;
    use std::sync::Arc;

    fn ctx(registry: Arc<SessionRegistry>) -> ToolContext {
        ToolContext {
            session_id: "S-test".into(),
            registry,
        }
    }

    #[tokio::test]
    async fn hang_up_tool_transitions_session_to_idle() {
        let registry = Arc::new(SessionRegistry::new());
        registry.create("S-test", fake_session());
        let tool = HangUpCallTool;
        let result = tool
            .execute(
                &ctx(registry.clone()),
                serde_json::json!({"status": "success", "notes": "resolved on the call"}),
            )
            .await;
        assert!(result.unwrap().success);
        let session = registry.get("S-test").unwrap();
        let session = session.lock().await;
        assert_eq!(session.state(), crate::state::State::Idle);
        assert_eq!(
            session.call_outcome(),
            Some(&(AppointmentStatus::Success, Some("resolved on the call".to_string())))
        );
    }

    #[tokio::test]
    async fn hang_up_tool_rejects_missing_status() {
        let registry = Arc::new(SessionRegistry::new());
        registry.create("S-test", fake_session());
        let tool = HangUpCallTool;
        let result = tool.execute(&ctx(registry), serde_json::json!({})).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn send_dtmf_tool_rejects_invalid_digits() {
        let registry = Arc::new(SessionRegistry::new());
        registry.create("S-test", fake_session());
        let tool = SendDtmfTool;
        let result = tool
            .execute(&ctx(registry), serde_json::json!({"digits": "12x"}))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn send_dtmf_tool_accepts_valid_digits() {
        let registry = Arc::new(SessionRegistry::new());
        registry.create("S-test", fake_session());
        let tool = SendDtmfTool;
        let result = tool
            .execute(&ctx(registry), serde_json::json!({"digits": "123*#"}))
            .await;
        assert!(result.unwrap().success);
    }

    struct NullStore;

    #[async_trait]
    impl AppointmentStore for NullStore {
        async fn fetch_appointment(&self, id: &str) -> Result<(Appointment, UserProfile), CoreError> {
            Ok((
                Appointment {
                    id: id.to_string(),
                    status: AppointmentStatus::Pending,
                    notes: None,
                },
                UserProfile {
                    name: None,
                    phone: "+15551234".into(),
                },
            ))
        }
        async fn update_appointment(&self, _id: &str, _patch: AppointmentPatch) -> Result<(), CoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn update_appointment_tool_requires_bound_appointment() {
        let registry = Arc::new(SessionRegistry::new());
        registry.create("S-test", fake_session());
        let tool = UpdateAppointmentStatusTool::new(Arc::new(NullStore));
        let result = tool
            .execute(&ctx(registry), serde_json::json!({"status": "success"}))
            .await
            .expect("tool does not error, reports failure instead");
        assert!(!result.success);
    }

    #[tokio::test]
    async fn update_appointment_tool_succeeds_when_bound() {
        let registry = Arc::new(SessionRegistry::new());
        registry.create("S-test", fake_session());
        {
            let session = registry.get("S-test").unwrap();
            session.lock().await.set_appointment_id(Some("appt-1".into()));
        }
        let tool = UpdateAppointmentStatusTool::new(Arc::new(NullStore));
        let result = tool
            .execute(
                &ctx(registry),
                serde_json::json!({"status": "success", "notes": "all good"}),
            )
            .await
            .expect("succeeds");
        assert!(result.success);
    }
}
