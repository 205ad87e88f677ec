//! Tool execution context.

use std::sync::Arc;
use std::time::Instant;

use crate::config::QueryDefaults;
use crate::engine::QueryEngine;
use crate::query::poller::PollSettings;

/// Context handed to tool handlers during execution.
///
/// Cheap to clone; each invocation gets its own copy and no mutable state is
/// shared between concurrent tool calls.
#[derive(Clone)]
pub struct ToolContext {
    /// Access to the remote engine.
    pub engine: Arc<dyn QueryEngine>,

    /// Defaults applied to unspecified tool parameters.
    pub defaults: QueryDefaults,

    /// Poll cadence for query executions started by this server.
    pub poll: PollSettings,

    /// Server version info.
    pub server_version: String,

    /// Server start time (for uptime reporting).
    pub start_time: Instant,
}
