//! # Agent tools
//!
//! Tools are named, schema-typed functions a language model may ask to run.
//! A [`ToolRegistry`] is the dispatch table the agent step binds to the model
//! and executes calls against; it never special-cases a tool by name.
//!
//! ## Usage
//!
//! ```rust
//! use hitl_agent::tools::{ToolDefinition, ToolRegistry, ToolResult};
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct Query {
//!     query: String,
//! }
//!
//! let mut registry = ToolRegistry::new();
//! registry
//!     .register_fn(
//!         ToolDefinition::new(
//!             "search_code",
//!             "Search for code patterns in the codebase",
//!             json!({
//!                 "type": "object",
//!                 "properties": {"query": {"type": "string"}},
//!                 "required": ["query"]
//!             }),
//!         ),
//!         |input: Query| async move { Ok(ToolResult::text(format!("No results for {}", input.query))) },
//!     )
//!     .unwrap();
//!
//! assert_eq!(registry.names(), vec!["search_code"]);
//! ```

/// Blog-post pipeline tools
pub mod blog;
mod models;
mod registry;
/// Sales-outreach workflow tools
pub mod sales;
/// Web scraping backend
pub mod scrape;

// Re-export the public API
pub use models::{ToolDefinition, ToolResult, ToolResultContent};
pub use registry::{AgentTool, FnTool, ToolRegistry};
pub use scrape::{FirecrawlClient, Scraper};
