//! Calendar tools: `getCalendarAvailability` and `getCalendarEvents`.
//! The calendar itself is a thin external collaborator — only the
//! invocation contract matters to the core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::llm::LlmError;

use super::types::{Tool, ToolContext, ToolResult};

/// An open slot returned by the calendar service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSlot {
    pub start: String,
    pub end: String,
}

/// An existing event returned by the calendar service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub start: String,
    pub end: String,
    pub title: String,
}

/// The calendar boundary contract.
#[async_trait]
pub trait CalendarService: Send + Sync {
    async fn get_availability(
        &self,
        start_date: &str,
        end_date: &str,
        min_duration_minutes: Option<u32>,
    ) -> Result<Vec<CalendarSlot>, CoreError>;

    async fn get_events(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<CalendarEvent>, CoreError>;
}

#[derive(Debug, Deserialize)]
struct AvailabilityArgs {
    start_date: String,
    end_date: String,
    #[serde(default)]
    min_duration_minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EventsArgs {
    start_date: String,
    end_date: String,
}

pub struct GetCalendarAvailabilityTool {
    calendar: std::sync::Arc<dyn CalendarService>,
}

impl GetCalendarAvailabilityTool {
    pub fn new(calendar: std::sync::Arc<dyn CalendarService>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl Tool for GetCalendarAvailabilityTool {
    fn name(&self) -> &str {
        "getCalendarAvailability"
    }

    fn description(&self) -> &str {
        "Look up open calendar slots in a date range."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "startDate": {"type": "string"},
                "endDate": {"type": "string"},
                "minDurationMinutes": {"type": "integer"}
            },
            "required": ["startDate", "endDate"]
        })
    }

    async fn execute(
        &self,
        _ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<ToolResult, LlmError> {
        let args: AvailabilityArgs = serde_json::from_value(remap_camel_case(args))
            .map_err(|e| LlmError::ToolError(format!("invalid arguments: {e}")))?;
        let slots = self
            .calendar
            .get_availability(&args.start_date, &args.end_date, args.min_duration_minutes)
            .await
            .map_err(|e| LlmError::ToolError(e.to_string()))?;
        let json = serde_json::to_string(&slots)
            .map_err(|e| LlmError::ToolError(format!("could not encode slots: {e}")))?;
        Ok(ToolResult::success(json))
    }
}

pub struct GetCalendarEventsTool {
    calendar: std::sync::Arc<dyn CalendarService>,
}

impl GetCalendarEventsTool {
    pub fn new(calendar: std::sync::Arc<dyn CalendarService>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl Tool for GetCalendarEventsTool {
    fn name(&self) -> &str {
        "getCalendarEvents"
    }

    fn description(&self) -> &str {
        "List existing calendar events in a date range."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "startDate": {"type": "string"},
                "endDate": {"type": "string"}
            },
            "required": ["startDate", "endDate"]
        })
    }

    async fn execute(
        &self,
        _ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<ToolResult, LlmError> {
        let args: EventsArgs = serde_json::from_value(remap_camel_case(args))
            .map_err(|e| LlmError::ToolError(format!("invalid arguments: {e}")))?;
        let events = self
            .calendar
            .get_events(&args.start_date, &args.end_date)
            .await
            .map_err(|e| LlmError::ToolError(e.to_string()))?;
        let json = serde_json::to_string(&events)
            .map_err(|e| LlmError::ToolError(format!("could not encode events: {e}")))?;
        Ok(ToolResult::success(json))
    }
}

/// The stable tool-surface contract (§6) names arguments in camelCase
/// (`startDate`); our internal structs use snake_case. Remap keys so
/// the external schema stays the contractual shape while decoding is
/// ordinary serde.
fn remap_camel_case(mut value: serde_json::Value) -> serde_json::Value {
    if let serde_json::Value::Object(map) = &mut value {
        let renames = [
            ("startDate", "start_date"),
            ("endDate", "end_date"),
            ("minDurationMinutes", "min_duration_minutes"),
        ];
        for (camel, snake) in renames {
            if let Some(v) = map.remove(camel) {
                map.insert(snake.to_string(), v);
            }
        }
    }
    value
}
