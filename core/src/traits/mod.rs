pub mod provider;
pub mod tool;

pub use provider::{
    Caller, ContentBlock, ExchangeRequest, ModelResponse, Provider, Role, SessionDescriptor,
    StopReason, ToolInvocation, ToolResultEntry, Turn, TurnContent, Usage,
};
pub use tool::{
    AllowedCallers, Blocking, CallerKind, Tool, ToolArgs, ToolDefinition, ToolError,
    ToolHandler, ToolOutput, blocking,
};
