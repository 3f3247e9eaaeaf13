use clap::ValueEnum;
use ptc_core::ToolRegistry;
use ptc_core::tools::{
    FetchLogsTool, LogInfoTool, LogSummaryTool, QueryDatabaseTool, RegionSalesTool,
};
use ptc_core::traits::Tool;

/// Simulated tool sets, each paired with a request that exercises it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoSet {
    /// Single tool, simple query + aggregate
    Basic,
    /// Loop over 5 regions, 1 model call
    Batch,
    /// Check metadata, pick a tool, filter results
    Conditional,
}

impl DemoSet {
    pub fn register(self, registry: &ToolRegistry) {
        match self {
            Self::Basic => registry.register(QueryDatabaseTool.into_definition()),
            Self::Batch => registry.register(RegionSalesTool.into_definition()),
            Self::Conditional => {
                registry.register(LogInfoTool.into_definition());
                registry.register(FetchLogsTool.into_definition());
                registry.register(LogSummaryTool.into_definition());
            }
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            Self::Basic => "Query customer data and identify our top 3 customers by revenue.",
            Self::Batch => {
                "Compare sales across all five regions (West, East, Central, North, South). \
                 Which region had the highest total revenue? Show a ranked breakdown."
            }
            Self::Conditional => {
                "Check servers web-01, web-02, and db-01. For small log files, \
                 get the full logs and find errors. For large files, just get the summary. \
                 Report which servers need attention."
            }
        }
    }
}
