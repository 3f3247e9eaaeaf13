use crate::agent::CatalogEntry;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub const DIRECT_CALLER: &str = "direct";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn as sent to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text(content.into()),
        }
    }

    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Blocks(blocks),
        }
    }

    /// A user turn holding nothing but tool results.
    pub fn tool_results(results: Vec<ToolResultEntry>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Blocks(
                results
                    .into_iter()
                    .map(|r| ContentBlock::ToolResult {
                        tool_use_id: r.tool_use_id,
                        content: r.content,
                    })
                    .collect(),
            ),
        }
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        match &self.content {
            TurnContent::Blocks(blocks) => blocks,
            TurnContent::Text(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// `extra` carries fields such as `citations` so the block is re-sent unchanged.
    Text {
        text: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caller: Option<Caller>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
    /// Server-side blocks (code execution requests and results, etc.) kept verbatim.
    #[serde(untagged)]
    Other(Value),
}

/// Who issued a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
}

impl Caller {
    pub fn direct() -> Self {
        Self {
            kind: DIRECT_CALLER.to_string(),
            tool_id: None,
        }
    }

    pub fn code_execution(kind: impl Into<String>, tool_id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            tool_id: Some(tool_id.into()),
        }
    }
}

/// Borrowed view over a `tool_use` block.
#[derive(Debug, Clone, Copy)]
pub struct ToolInvocation<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub input: &'a Value,
    pub caller: Option<&'a Caller>,
}

impl ToolInvocation<'_> {
    /// Only an explicit `direct` caller counts as direct.
    pub fn is_programmatic(&self) -> bool {
        self.caller.is_none_or(|c| c.kind != DIRECT_CALLER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResultEntry {
    pub tool_use_id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    Other(String),
    #[default]
    Missing,
}

impl StopReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::EndTurn => "end_turn",
            Self::ToolUse => "tool_use",
            Self::Other(reason) => reason,
            Self::Missing => "",
        }
    }
}

impl From<String> for StopReason {
    fn from(reason: String) -> Self {
        match reason.as_str() {
            "end_turn" => Self::EndTurn,
            "tool_use" => Self::ToolUse,
            "" => Self::Missing,
            _ => Self::Other(reason),
        }
    }
}

impl From<&str> for StopReason {
    fn from(reason: &str) -> Self {
        Self::from(reason.to_string())
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StopReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Missing => serializer.serialize_none(),
            other => serializer.serialize_str(other.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for StopReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let reason = Option::<String>::deserialize(deserializer)?;
        Ok(reason.map(Self::from).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// The sandbox container a response ran its code in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub stop_reason: StopReason,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: Usage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<SessionDescriptor>,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            extra: Map::new(),
        }
    }

    pub fn tool_use(
        id: impl Into<String>,
        name: impl Into<String>,
        input: Value,
        caller: Option<Caller>,
    ) -> Self {
        Self::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
            caller,
            extra: Map::new(),
        }
    }
}

impl ModelResponse {
    pub fn text_blocks(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Text blocks joined with newlines, empty when there are none.
    pub fn joined_text(&self) -> String {
        self.text_blocks().collect::<Vec<_>>().join("\n")
    }

    /// Tool invocations in the order the model emitted them.
    pub fn tool_invocations(&self) -> Vec<ToolInvocation<'_>> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse {
                    id,
                    name,
                    input,
                    caller,
                    ..
                } => Some(ToolInvocation {
                    id,
                    name,
                    input,
                    caller: caller.as_ref(),
                }),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExchangeRequest<'a> {
    pub turns: &'a [Turn],
    pub catalog: &'a [CatalogEntry],
    pub system: Option<&'a str>,
    pub session: Option<&'a str>,
}

/// Model transport: one blocking call-and-response exchange.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn exchange(&self, request: ExchangeRequest<'_>) -> anyhow::Result<ModelResponse>;
}
