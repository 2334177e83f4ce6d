//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Provides envelope validation, the per-method auth gate, and method routing.

pub mod rpc;
pub mod server;
