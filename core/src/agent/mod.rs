pub mod loop_;
pub mod registry;
pub mod session;

pub use loop_::{AgentLoop, BudgetKind, RunBudget, RunError, RunOptions, RunResult, RunStop};
pub use registry::{
    CODE_EXECUTION_TOOL_NAME, CatalogEntry, DEFAULT_CODE_EXECUTION_TYPE, ToolRegistry,
};
pub use session::SessionHandle;
