//! HTTP Transport layer for the Model Context Protocol
//!
//! Provides the external API routing: the `/mcp` JSON-RPC endpoint, the `/call-tool` REST
//! endpoint and the discovery documents.

pub mod cors;
pub mod handlers;
