use crate::traits::{CallerKind, ToolArgs, ToolDefinition, ToolError, ToolOutput};
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

pub const CODE_EXECUTION_TOOL_NAME: &str = "code_execution";
pub const DEFAULT_CODE_EXECUTION_TYPE: &str = "code_execution_20260120";

/// One entry of the tool list sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogEntry {
    CodeExecution {
        #[serde(rename = "type")]
        kind: String,
        name: String,
    },
    Tool {
        name: String,
        description: String,
        input_schema: Value,
        allowed_callers: Vec<String>,
    },
}

impl CatalogEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::CodeExecution { name, .. } | Self::Tool { name, .. } => name,
        }
    }
}

pub struct ToolRegistry {
    tools: RwLock<Vec<Arc<ToolDefinition>>>,
    enforce_callers: bool,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(Vec::new()),
            enforce_callers: false,
        }
    }

    /// Reject invocations whose caller is not in the tool's allowed set.
    pub fn with_caller_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_callers = enforce;
        self
    }

    /// Registers a tool. A tool with the same name is replaced in place.
    pub fn register(&self, definition: ToolDefinition) {
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        let definition = Arc::new(definition);

        match tools.iter().position(|t| t.name == definition.name) {
            Some(idx) => {
                tracing::debug!("Replacing tool registration: {}", definition.name);
                tools[idx] = definition;
            }
            None => {
                tracing::debug!("Registered tool: {}", definition.name);
                tools.push(definition);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ToolDefinition>> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        tools.iter().find(|t| t.name == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        tools.iter().map(|t| t.name.clone()).collect()
    }

    /// The code execution entry first, then every registered tool in registration order.
    pub fn build_catalog(&self, code_execution_type: &str) -> Vec<CatalogEntry> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        let mut catalog = Vec::with_capacity(tools.len() + 1);

        catalog.push(CatalogEntry::CodeExecution {
            kind: code_execution_type.to_string(),
            name: CODE_EXECUTION_TOOL_NAME.to_string(),
        });
        catalog.extend(tools.iter().map(|t| CatalogEntry::Tool {
            name: t.name.clone(),
            description: t.description.clone(),
            input_schema: t.input_schema.clone(),
            allowed_callers: t.allowed_callers.wire_names(code_execution_type),
        }));

        catalog
    }

    /// Runs a tool and renders the outcome as tool-result text. Never fails.
    pub async fn dispatch(&self, name: &str, input: &Value) -> String {
        self.dispatch_from(name, input, None).await
    }

    /// Like [`dispatch`](Self::dispatch), with the caller checked when enforcement is on.
    pub async fn dispatch_from(&self, name: &str, input: &Value, caller: Option<CallerKind>) -> String {
        let Some(tool) = self.get(name) else {
            return format!("Error: Unknown tool '{}'", name);
        };

        match self.invoke(&tool, input, caller).await {
            Ok(output) => output.into_content(),
            Err(e) => format!("Error: {}: {}", e.kind(), e),
        }
    }

    async fn invoke(
        &self,
        tool: &ToolDefinition,
        input: &Value,
        caller: Option<CallerKind>,
    ) -> Result<ToolOutput, ToolError> {
        if self.enforce_callers
            && let Some(caller) = caller
            && !tool.allowed_callers.permits(caller)
        {
            return Err(ToolError::CallerNotAllowed {
                tool: tool.name.clone(),
                caller,
            });
        }

        let args = ToolArgs::from_value(input.clone())?;
        check_arguments(&tool.input_schema, &args)?;

        AssertUnwindSafe(tool.handler.call(args))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ToolError::new("Panic", panic_message(panic.as_ref()))))
    }
}

/// Checks argument names against the schema's `required` and `properties`.
fn check_arguments(schema: &Value, args: &ToolArgs) -> Result<(), ToolError> {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !args.contains(name) {
                return Err(ToolError::invalid_arguments(format!(
                    "missing required argument '{}'",
                    name
                )));
            }
        }
    }

    let open = schema.get("additionalProperties").and_then(Value::as_bool) == Some(true);
    if let Some(properties) = schema.get("properties").and_then(Value::as_object)
        && !properties.is_empty()
        && !open
        && let Some(unknown) = args.keys().find(|k| !properties.contains_key(*k))
    {
        return Err(ToolError::invalid_arguments(format!(
            "unexpected argument '{}'",
            unknown
        )));
    }

    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{AllowedCallers, blocking};
    use serde_json::json;

    fn add_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": {"type": "integer"},
                "b": {"type": "integer"}
            },
            "required": ["a", "b"]
        })
    }

    fn add_tool() -> ToolDefinition {
        ToolDefinition::new(
            "add",
            "Add two integers. Returns the sum as a JSON number.",
            add_schema(),
            |args: ToolArgs| async move {
                let a: i64 = args.get("a")?;
                let b: i64 = args.get("b")?;
                Ok::<_, ToolError>(json!(a + b))
            },
        )
    }

    #[tokio::test]
    async fn dispatch_matches_direct_handler_call() {
        let registry = ToolRegistry::new();
        registry.register(add_tool());

        let input = json!({"a": 1, "b": 2});
        let direct = add_tool()
            .handler
            .call(ToolArgs::from_value(input.clone()).unwrap())
            .await
            .unwrap()
            .into_content();

        assert_eq!(registry.dispatch("add", &input).await, direct);
        assert_eq!(direct, "3");
    }

    #[tokio::test]
    async fn string_results_pass_through_verbatim() {
        let registry = ToolRegistry::new();
        registry.register(ToolDefinition::new(
            "echo",
            "Echo text",
            json!({"type": "object", "properties": {"text": {"type": "string"}}}),
            blocking(|args: ToolArgs| args.get::<String>("text")),
        ));

        let out = registry.dispatch("echo", &json!({"text": "{not json"})).await;
        assert_eq!(out, "{not json");
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_not_raised() {
        let registry = ToolRegistry::new();
        let out = registry.dispatch("missing", &json!({})).await;
        assert_eq!(out, "Error: Unknown tool 'missing'");
    }

    #[tokio::test]
    async fn handler_errors_carry_kind_and_message() {
        let registry = ToolRegistry::new();
        registry.register(ToolDefinition::new(
            "divide",
            "Divide",
            json!({"type": "object"}),
            blocking(|_args: ToolArgs| {
                Err::<String, _>(ToolError::new("ZeroDivisionError", "division by zero"))
            }),
        ));

        let out = registry.dispatch("divide", &json!({})).await;
        assert_eq!(out, "Error: ZeroDivisionError: division by zero");
    }

    #[tokio::test]
    async fn handler_panics_are_contained() {
        let registry = ToolRegistry::new();
        registry.register(ToolDefinition::new(
            "boom",
            "Always panics",
            json!({"type": "object"}),
            blocking(|_args: ToolArgs| -> Result<String, ToolError> { panic!("kaboom") }),
        ));

        let out = registry.dispatch("boom", &json!({})).await;
        assert_eq!(out, "Error: Panic: kaboom");
    }

    #[tokio::test]
    async fn arguments_are_checked_against_schema() {
        let registry = ToolRegistry::new();
        registry.register(add_tool());

        let out = registry.dispatch("add", &json!({"a": 1})).await;
        assert_eq!(out, "Error: InvalidArguments: missing required argument 'b'");

        let out = registry.dispatch("add", &json!({"a": 1, "b": 2, "c": 3})).await;
        assert_eq!(out, "Error: InvalidArguments: unexpected argument 'c'");

        let out = registry.dispatch("add", &json!("1 + 2")).await;
        assert!(out.starts_with("Error: InvalidArguments:"));
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let registry = ToolRegistry::new();
        registry.register(ToolDefinition::new(
            "version",
            "first",
            json!({"type": "object"}),
            blocking(|_args: ToolArgs| Ok::<_, ToolError>("one")),
        ));
        registry.register(ToolDefinition::new(
            "other",
            "other",
            json!({"type": "object"}),
            blocking(|_args: ToolArgs| Ok::<_, ToolError>("other")),
        ));
        registry.register(ToolDefinition::new(
            "version",
            "second",
            json!({"type": "object"}),
            blocking(|_args: ToolArgs| Ok::<_, ToolError>("two")),
        ));

        assert_eq!(registry.names(), vec!["version", "other"]);
        assert_eq!(registry.dispatch("version", &json!({})).await, "two");
    }

    #[test]
    fn catalog_leads_with_code_execution() {
        let registry = ToolRegistry::new();
        registry.register(add_tool());
        registry.register(
            ToolDefinition::new(
                "lookup",
                "Look something up",
                json!({"type": "object"}),
                blocking(|_args: ToolArgs| Ok::<_, ToolError>("ok")),
            )
            .with_allowed_callers(AllowedCallers::Direct),
        );

        let catalog = registry.build_catalog(DEFAULT_CODE_EXECUTION_TYPE);
        let names: Vec<_> = catalog.iter().map(CatalogEntry::name).collect();
        assert_eq!(names, vec!["code_execution", "add", "lookup"]);

        let rendered = serde_json::to_value(&catalog).unwrap();
        assert_eq!(
            rendered[0],
            json!({"type": "code_execution_20260120", "name": "code_execution"})
        );
        assert_eq!(
            rendered[1]["allowed_callers"],
            json!(["code_execution_20260120"])
        );
        assert_eq!(rendered[1]["input_schema"], add_schema());
        assert_eq!(rendered[2]["allowed_callers"], json!(["direct"]));
    }

    #[test]
    fn catalog_uses_the_configured_code_execution_type() {
        let registry = ToolRegistry::new();
        registry.register(add_tool());
        let catalog = registry.build_catalog("code_execution_custom");
        assert!(matches!(
            &catalog[0],
            CatalogEntry::CodeExecution { kind, .. } if kind == "code_execution_custom"
        ));
        assert_eq!(
            serde_json::to_value(&catalog[1]).unwrap()["allowed_callers"],
            json!(["code_execution_custom"])
        );
    }

    #[tokio::test]
    async fn callers_are_not_checked_by_default() {
        let registry = ToolRegistry::new();
        registry.register(add_tool());

        let out = registry
            .dispatch_from("add", &json!({"a": 1, "b": 2}), Some(CallerKind::Direct))
            .await;
        assert_eq!(out, "3");
    }

    #[tokio::test]
    async fn enforcement_rejects_disallowed_callers() {
        let registry = ToolRegistry::new().with_caller_enforcement(true);
        registry.register(add_tool());

        let out = registry
            .dispatch_from("add", &json!({"a": 1, "b": 2}), Some(CallerKind::Direct))
            .await;
        assert_eq!(
            out,
            "Error: CallerNotAllowed: tool 'add' may not be invoked by a direct caller"
        );

        let out = registry
            .dispatch_from("add", &json!({"a": 1, "b": 2}), Some(CallerKind::CodeExecution))
            .await;
        assert_eq!(out, "3");
    }
}
