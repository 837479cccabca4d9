//! MCP (Model Context Protocol) surface.
//!
//! JSON-RPC 2.0 envelope, tool registry, argument binding and the tool-call
//! dispatcher shared by the stdio server, the HTTP endpoint and the CLI.

pub mod content;
pub mod handler;
pub mod params;
pub mod protocol;
pub mod registry;
mod server;

pub use content::{ContentEntry, FileContent, ToolCallResult};
pub use handler::{CallContext, ToolCallHandler};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use registry::{
    DeclaredType, ParameterDefinition, SchemaType, ToolDefinition, ToolOutput, ToolRegistry,
};
pub use server::McpServer;
