use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Argument object of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    /// `null` is treated as an empty argument object.
    pub fn from_value(value: Value) -> Result<Self, ToolError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(ToolError::invalid_arguments(format!(
                "expected an argument object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, ToolError> {
        self.get_opt(name)?
            .ok_or_else(|| ToolError::invalid_arguments(format!("missing '{}' parameter", name)))
    }

    pub fn get_opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ToolError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
                ToolError::invalid_arguments(format!("invalid '{}' parameter: {}", name, e))
            }),
        }
    }

    /// Deserializes the whole argument object into a typed parameter struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// What a handler hands back. Tool results travel as text, so JSON values are serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Json(Value),
}

impl ToolOutput {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ToolError> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    pub fn into_content(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Json(value) => value.to_string(),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Json(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{reason}")]
    InvalidArguments { reason: String },

    #[error("tool '{tool}' may not be invoked by a {caller} caller")]
    CallerNotAllowed { tool: String, caller: CallerKind },

    #[error("{message}")]
    Failed { kind: String, message: String },
}

impl ToolError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }

    /// Error kind name reported back to the model.
    pub fn kind(&self) -> &str {
        match self {
            Self::InvalidArguments { .. } => "InvalidArguments",
            Self::CallerNotAllowed { .. } => "CallerNotAllowed",
            Self::Failed { kind, .. } => kind,
        }
    }
}

impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        Self::new("Error", format!("{:#}", err))
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::new("JsonError", err.to_string())
    }
}

/// Single handler interface; blocking and suspending handlers are both awaited.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutput, ToolError>;
}

#[async_trait]
impl<F, Fut, O, E> ToolHandler for F
where
    F: Fn(ToolArgs) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, E>> + Send,
    O: Into<ToolOutput> + Send + 'static,
    E: Into<ToolError> + Send + 'static,
{
    async fn call(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        (self)(args).await.map(Into::into).map_err(Into::into)
    }
}

/// Adapter for synchronous handlers; runs inline on the dispatching task.
pub struct Blocking<F>(F);

pub fn blocking<F, O, E>(handler: F) -> Blocking<F>
where
    F: Fn(ToolArgs) -> Result<O, E> + Send + Sync,
{
    Blocking(handler)
}

#[async_trait]
impl<F, O, E> ToolHandler for Blocking<F>
where
    F: Fn(ToolArgs) -> Result<O, E> + Send + Sync,
    O: Into<ToolOutput> + Send + 'static,
    E: Into<ToolError> + Send + 'static,
{
    async fn call(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        (self.0)(args).map(Into::into).map_err(Into::into)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallerKind {
    Direct,
    CodeExecution,
}

impl std::fmt::Display for CallerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::CodeExecution => write!(f, "code_execution"),
        }
    }
}

/// Which invocation contexts may call a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowedCallers {
    Direct,
    #[default]
    CodeExecution,
    Both,
}

impl AllowedCallers {
    pub fn permits(self, caller: CallerKind) -> bool {
        matches!(
            (self, caller),
            (Self::Both, _)
                | (Self::Direct, CallerKind::Direct)
                | (Self::CodeExecution, CallerKind::CodeExecution)
        )
    }

    /// Caller tags as the transport expects them.
    pub fn wire_names(self, code_execution_type: &str) -> Vec<String> {
        match self {
            Self::Direct => vec!["direct".to_string()],
            Self::CodeExecution => vec![code_execution_type.to_string()],
            Self::Both => vec!["direct".to_string(), code_execution_type.to_string()],
        }
    }
}

/// A registered tool: its contract for the model plus the handler that serves it.
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub allowed_callers: AllowedCallers,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            allowed_callers: AllowedCallers::default(),
            handler: Arc::new(handler),
        }
    }

    pub fn with_allowed_callers(mut self, allowed_callers: AllowedCallers) -> Self {
        self.allowed_callers = allowed_callers;
        self
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("allowed_callers", &self.allowed_callers)
            .finish_non_exhaustive()
    }
}

/// Struct-style tools: implement this and register `tool.into_definition()`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> Value;

    fn allowed_callers(&self) -> AllowedCallers {
        AllowedCallers::CodeExecution
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError>;

    fn into_definition(self) -> ToolDefinition
    where
        Self: Sized + 'static,
    {
        let name = self.name().to_string();
        let description = self.description().to_string();
        let input_schema = self.parameters_schema();
        let allowed_callers = self.allowed_callers();
        ToolDefinition {
            name,
            description,
            input_schema,
            allowed_callers,
            handler: Arc::new(ToolAdapter(self)),
        }
    }
}

struct ToolAdapter<T>(T);

#[async_trait]
impl<T: Tool> ToolHandler for ToolAdapter<T> {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        self.0.execute(args).await
    }
}
