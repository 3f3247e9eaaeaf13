use crate::tools::string_param_schema;
use crate::traits::{Tool, ToolArgs, ToolError, ToolOutput};
use async_trait::async_trait;
use serde_json::{Value, json};

const SERVER_ID: &str = "server_id";
const SERVER_ID_DESCRIPTION: &str = "Server identifier";

pub struct LogInfoTool;

#[async_trait]
impl Tool for LogInfoTool {
    fn name(&self) -> &str {
        "get_log_info"
    }

    fn description(&self) -> &str {
        "Get metadata about a log file. \
         Returns JSON: {\"filename\": str, \"size_bytes\": int, \"line_count\": int}"
    }

    fn parameters_schema(&self) -> Value {
        string_param_schema(SERVER_ID, SERVER_ID_DESCRIPTION)
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let server_id: String = args.get(SERVER_ID)?;
        let info = match server_id.as_str() {
            "web-01" => json!({"filename": "web-01.log", "size_bytes": 5200, "line_count": 45}),
            "web-02" => {
                json!({"filename": "web-02.log", "size_bytes": 2_500_000, "line_count": 18000})
            }
            "db-01" => json!({"filename": "db-01.log", "size_bytes": 800, "line_count": 12}),
            _ => json!({"error": "Server not found"}),
        };
        Ok(info.into())
    }
}

pub struct FetchLogsTool;

#[async_trait]
impl Tool for FetchLogsTool {
    fn name(&self) -> &str {
        "fetch_logs"
    }

    fn description(&self) -> &str {
        "Fetch full log contents for a server. \
         Returns the complete log as a string, one entry per line."
    }

    fn parameters_schema(&self) -> Value {
        string_param_schema(SERVER_ID, SERVER_ID_DESCRIPTION)
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let server_id: String = args.get(SERVER_ID)?;
        let lines: &[&str] = match server_id.as_str() {
            "web-01" => &[
                "2025-01-15 10:00:01 INFO  Request /api/users 200 45ms",
                "2025-01-15 10:00:02 ERROR Connection pool exhausted",
                "2025-01-15 10:00:03 INFO  Request /api/orders 200 23ms",
                "2025-01-15 10:00:04 WARN  Slow query detected: 850ms",
                "2025-01-15 10:00:05 ERROR Database timeout after 30s",
                "2025-01-15 10:00:06 INFO  Request /api/products 200 12ms",
            ],
            "db-01" => &[
                "2025-01-15 10:00:01 INFO  Checkpoint complete",
                "2025-01-15 10:00:02 ERROR Replication lag: 15s",
                "2025-01-15 10:00:03 INFO  Vacuum started",
            ],
            _ => return Ok("No logs found".into()),
        };
        Ok(lines.join("\n").into())
    }
}

/// Summary for log files too large to pull in full.
pub struct LogSummaryTool;

#[async_trait]
impl Tool for LogSummaryTool {
    fn name(&self) -> &str {
        "fetch_log_summary"
    }

    fn description(&self) -> &str {
        "Fetch a summary of a large log file. \
         Returns JSON: {\"errors\": int, \"warnings\": int, \"last_error\": str}"
    }

    fn parameters_schema(&self) -> Value {
        string_param_schema(SERVER_ID, SERVER_ID_DESCRIPTION)
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let _server_id: String = args.get(SERVER_ID)?;
        Ok(json!({
            "errors": 342,
            "warnings": 1205,
            "last_error": "2025-01-15 09:58:22 ERROR OOM killer invoked on pid 4521"
        })
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ToolRegistry;

    fn registry() -> ToolRegistry {
        let registry = ToolRegistry::new();
        registry.register(LogInfoTool.into_definition());
        registry.register(FetchLogsTool.into_definition());
        registry.register(LogSummaryTool.into_definition());
        registry
    }

    #[tokio::test]
    async fn log_tools_through_the_registry() {
        let registry = registry();

        let info = registry
            .dispatch("get_log_info", &json!({"server_id": "web-02"}))
            .await;
        let info: Value = serde_json::from_str(&info).unwrap();
        assert_eq!(info["line_count"], 18000);

        let logs = registry
            .dispatch("fetch_logs", &json!({"server_id": "db-01"}))
            .await;
        assert_eq!(logs.lines().count(), 3);
        assert!(logs.contains("Replication lag"));

        let missing = registry
            .dispatch("fetch_logs", &json!({"server_id": "cache-01"}))
            .await;
        assert_eq!(missing, "No logs found");
    }

    #[tokio::test]
    async fn missing_server_id_is_reported() {
        let out = registry().dispatch("fetch_log_summary", &json!({})).await;
        assert_eq!(
            out,
            "Error: InvalidArguments: missing required argument 'server_id'"
        );
    }
}
