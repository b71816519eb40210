#![forbid(unsafe_code)]

use pv_core::{CheckpointResponse, Decision};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const EVENT_SESSION_START: &str = "SessionStart";
pub const EVENT_PRE_TOOL_USE: &str = "PreToolUse";
pub const EVENT_STOP: &str = "Stop";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct HookInput {
    pub hook_event_name: Option<String>,
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub tool_name: Option<String>,
    pub tool_input: Option<Value>,
    pub stop_hook_active: Option<bool>,
}

impl HookInput {
    pub fn event(&self) -> Option<HookEvent> {
        self.hook_event_name.as_deref().map(HookEvent::from_name)
    }

    pub fn tool_input_object(&self) -> Map<String, Value> {
        match &self.tool_input {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }

    pub fn tool_command(&self) -> Option<&str> {
        self.tool_input
            .as_ref()
            .and_then(|input| input.get("command"))
            .and_then(Value::as_str)
    }

    pub fn tool_description(&self) -> Option<&str> {
        self.tool_input
            .as_ref()
            .and_then(|input| input.get("description"))
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookEvent {
    SessionStart,
    PreToolUse,
    Stop,
    Other(String),
}

impl HookEvent {
    pub fn from_name(name: &str) -> Self {
        match name {
            EVENT_SESSION_START => Self::SessionStart,
            EVENT_PRE_TOOL_USE => Self::PreToolUse,
            EVENT_STOP => Self::Stop,
            other => Self::Other(other.to_string()),
        }
    }
}

pub fn parse_input(raw: &str) -> Result<HookInput, serde_json::Error> {
    serde_json::from_str(raw)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StopOutput {
    pub decision: &'static str,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: &'static str,
    pub permission_decision: String,
    pub permission_decision_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreToolUseOutput {
    pub hook_specific_output: HookSpecificOutput,
}

/// What the hook writes to stdout.
#[derive(Clone, Debug, PartialEq)]
pub enum HookReply {
    Silent,
    Text(String),
    Json(Value),
}

impl HookReply {
    pub fn json(value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::Json(value),
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode hook output");
                Self::Silent
            }
        }
    }

    pub fn render(&self) -> Option<String> {
        match self {
            Self::Silent => None,
            Self::Text(text) => Some(text.clone()),
            Self::Json(value) => Some(value.to_string()),
        }
    }
}

/// Stop and fail-closed replies: silent allow, `approve` with a reason, or `block`.
pub fn decision_reply(response: &CheckpointResponse) -> HookReply {
    let decision = match response.decision {
        Decision::Allow => return HookReply::Silent,
        Decision::AllowWithReminder => "approve",
        Decision::Block => "block",
    };
    HookReply::json(StopOutput {
        decision,
        reason: response.reason.clone().unwrap_or_default(),
    })
}

pub fn pre_tool_use_reply(
    permission_decision: impl Into<String>,
    reason: impl Into<String>,
    updated_input: Option<Map<String, Value>>,
) -> HookReply {
    HookReply::json(PreToolUseOutput {
        hook_specific_output: HookSpecificOutput {
            hook_event_name: EVENT_PRE_TOOL_USE,
            permission_decision: permission_decision.into(),
            permission_decision_reason: reason.into(),
            updated_input,
        },
    })
}
