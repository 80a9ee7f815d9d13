//! Tools module - tool calls made by the agent engine
//!
//! Business tools implement the `Tool` trait and live in a `ToolRegistry`.
//! Every call the engine makes goes through the `ToolPipeline`:
//!
//! - **guard**: binds the call to the session's customer profile, lowercases
//!   string arguments and short-circuits deterministic answers
//! - **registry**: runs the tool body
//! - **post_process**: stages UI-display results for the next turn
//!
//! ## Adding a New Tool
//!
//! 1. Implement the `Tool` trait
//! 2. Register it on the `ToolRegistry` passed to `ToolPipeline::new`

mod guard;
mod pipeline;
mod post_process;
mod profile;
mod registry;
mod traits;

// Core trait and types
pub use traits::{Tool, ToolCall, ToolDefinition};

// Registry
pub use registry::ToolRegistry;

// Call pipeline
pub use guard::{lowercase_strings, GuardDecision, ToolGuard, CUSTOMER_ID_ARG};
pub use pipeline::ToolPipeline;
pub use post_process::{empty_result, PostProcessor, UiCommand, DISPLAY_UI_ACTION};

// Customer profiles
pub use profile::{CachedProfileProvider, CustomerProfile, ProfileProvider, StaticProfileProvider};
