//! Simulated business tools used by the demo scenarios.

pub mod logs;
pub mod sales;

pub use logs::{FetchLogsTool, LogInfoTool, LogSummaryTool};
pub use sales::{QueryDatabaseTool, RegionSalesTool};

use serde_json::{Value, json};

pub(crate) fn string_param_schema(name: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            name: {
                "type": "string",
                "description": description
            }
        },
        "required": [name]
    })
}
