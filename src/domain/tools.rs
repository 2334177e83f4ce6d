//! Interactive tools exposed via Model Context Protocol
//!
//! The registry is a closed enum; `get_random_joke` is its only entry and takes no
//! arguments.

use chrono::{SecondsFormat, Utc};
use rand::seq::SliceRandom;
use rust_mcp_sdk::{
    macros,
    schema::{CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::mcp::rpc::RpcFailure;

pub const JOKES: &[&str] = &[
    "Why do programmers prefer dark mode? Because light attracts bugs!",
    "Why did the developer go broke? Because he used up all his cache!",
    "How many programmers does it take to change a light bulb? None, that's a hardware problem!",
    "Why do Java developers wear glasses? Because they don't C#!",
    "What's a programmer's favorite hangout place? The Foo Bar!",
    "Why did the programmer quit his job? Because he didn't get arrays!",
    "What do you call a programmer from Finland? Nerdic!",
    "Why do programmers always mix up Halloween and Christmas? Because Oct 31 == Dec 25!",
    "How do you comfort a JavaScript bug? You console it!",
    "Why did the database administrator leave his wife? She had one-to-many relationships!",
];

#[macros::mcp_tool(
    name = "get_random_joke",
    description = "Get a random programming joke"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetRandomJokeTool {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, IntoStaticStr)]
pub enum RegisteredTool {
    #[strum(serialize = "get_random_joke")]
    GetRandomJoke,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub structured: Map<String, Value>,
}

impl RegisteredTool {
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn names() -> Vec<&'static str> {
        Self::iter().map(Self::name).collect()
    }

    pub fn definition(self) -> Tool {
        match self {
            Self::GetRandomJoke => GetRandomJokeTool::tool(),
        }
    }

    pub fn invoke(self) -> ToolOutput {
        match self {
            Self::GetRandomJoke => random_joke(),
        }
    }
}

pub fn build_tools_list() -> Vec<Tool> {
    RegisteredTool::iter()
        .map(RegisteredTool::definition)
        .collect()
}

fn random_joke() -> ToolOutput {
    let joke = JOKES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default();

    ToolOutput {
        text: joke.to_string(),
        structured: Map::from_iter([
            ("joke".to_string(), json!(joke)),
            (
                "generated_at_utc".to_string(),
                json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            ),
        ]),
    }
}

/// Resolves `params.name` against the registry and wraps the tool output as a
/// `CallToolResult`.
pub fn handle_tools_call(params: Option<&Value>) -> Result<Value, RpcFailure> {
    let requested = params
        .and_then(|params| params.get("name"))
        .and_then(Value::as_str);

    let Some(tool) = requested.and_then(RegisteredTool::from_name) else {
        return Err(RpcFailure::UnknownTool {
            requested: requested.map(str::to_string),
        });
    };

    let output = tool.invoke();
    serde_json::to_value(CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(output.text, None, None))],
        is_error: Some(false),
        meta: None,
        structured_content: Some(output.structured),
    })
    .map_err(|err| RpcFailure::Internal(format!("{} result serialization: {err}", tool.name())))
}
