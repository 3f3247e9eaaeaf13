use crate::tools::string_param_schema;
use crate::traits::{Tool, ToolArgs, ToolError, ToolOutput};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct CustomerRow {
    pub customer_id: &'static str,
    pub name: &'static str,
    pub revenue: u64,
    pub orders: u32,
}

const CUSTOMERS: &[CustomerRow] = &[
    CustomerRow { customer_id: "C1", name: "Acme Corp", revenue: 45000, orders: 23 },
    CustomerRow { customer_id: "C2", name: "Globex", revenue: 38000, orders: 18 },
    CustomerRow { customer_id: "C3", name: "Initech", revenue: 24000, orders: 12 },
    CustomerRow { customer_id: "C4", name: "Umbrella", revenue: 19000, orders: 9 },
    CustomerRow { customer_id: "C5", name: "Wonka", revenue: 32000, orders: 15 },
    CustomerRow { customer_id: "C6", name: "Stark", revenue: 28500, orders: 14 },
    CustomerRow { customer_id: "C7", name: "Wayne", revenue: 15000, orders: 7 },
    CustomerRow { customer_id: "C8", name: "Oscorp", revenue: 21000, orders: 11 },
];

/// Pretends to run SQL; every query returns the same customer table.
pub struct QueryDatabaseTool;

#[async_trait]
impl Tool for QueryDatabaseTool {
    fn name(&self) -> &str {
        "query_database"
    }

    fn description(&self) -> &str {
        "Execute a SQL query against the sales database. Returns a JSON array of row objects, \
         e.g. [{\"customer_id\": \"C1\", \"name\": \"Acme\", \"revenue\": 45000, \"orders\": 23}]"
    }

    fn parameters_schema(&self) -> Value {
        string_param_schema("sql", "SQL query to execute")
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let sql: String = args.get("sql")?;
        tracing::debug!("query_database: {}", sql);
        ToolOutput::json(&CUSTOMERS)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductSales {
    pub product: &'static str,
    pub revenue: u64,
}

fn region_sales(region: &str) -> &'static [ProductSales] {
    const WEST: &[ProductSales] = &[
        ProductSales { product: "A", revenue: 12000 },
        ProductSales { product: "B", revenue: 8000 },
    ];
    const EAST: &[ProductSales] = &[
        ProductSales { product: "A", revenue: 15000 },
        ProductSales { product: "B", revenue: 11000 },
    ];
    const CENTRAL: &[ProductSales] = &[
        ProductSales { product: "A", revenue: 9000 },
        ProductSales { product: "B", revenue: 7500 },
    ];
    const NORTH: &[ProductSales] = &[
        ProductSales { product: "A", revenue: 6000 },
        ProductSales { product: "B", revenue: 4500 },
    ];
    const SOUTH: &[ProductSales] = &[
        ProductSales { product: "A", revenue: 11000 },
        ProductSales { product: "B", revenue: 9000 },
    ];

    match region {
        "West" => WEST,
        "East" => EAST,
        "Central" => CENTRAL,
        "North" => NORTH,
        "South" => SOUTH,
        _ => &[],
    }
}

pub struct RegionSalesTool;

#[async_trait]
impl Tool for RegionSalesTool {
    fn name(&self) -> &str {
        "get_region_sales"
    }

    fn description(&self) -> &str {
        "Query sales data for a specific region. \
         Returns JSON array: [{\"product\": str, \"revenue\": int}, ...]"
    }

    fn parameters_schema(&self) -> Value {
        string_param_schema("region", "Region name")
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let region: String = args.get("region")?;
        ToolOutput::json(&region_sales(&region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> ToolArgs {
        ToolArgs::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn query_returns_customer_rows() {
        let out = QueryDatabaseTool
            .execute(args(json!({"sql": "SELECT * FROM customers"})))
            .await
            .unwrap()
            .into_content();
        let rows: Vec<Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0]["name"], "Acme Corp");
    }

    #[tokio::test]
    async fn unknown_region_is_empty() {
        let out = RegionSalesTool
            .execute(args(json!({"region": "Atlantis"})))
            .await
            .unwrap()
            .into_content();
        assert_eq!(out, "[]");

        let out = RegionSalesTool
            .execute(args(json!({"region": "East"})))
            .await
            .unwrap()
            .into_content();
        assert_eq!(
            out,
            json!([{"product": "A", "revenue": 15000}, {"product": "B", "revenue": 11000}]).to_string()
        );
    }
}
