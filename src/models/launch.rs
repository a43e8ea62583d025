//! Decoded routing intent supplied by the host at startup.

use serde::{Deserialize, Serialize};

/// Routing context resolved from the launch parameter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LaunchContext {
    /// Target chat; negative for group chats.
    pub chat_id: Option<i64>,
    /// Report to open automatically (deep link).
    pub report_id: Option<i64>,
    /// Whether the deep link targets the admin queue.
    pub admin_intent: bool,
}

impl LaunchContext {
    /// Whether a deep link to a specific report is present.
    #[must_use]
    pub fn has_deep_link(&self) -> bool {
        self.report_id.is_some()
    }
}
