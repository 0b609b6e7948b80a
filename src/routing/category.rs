//! Task categories and lenient label parsing

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which handler serves a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    /// Answered locally by the general responder
    General,
    /// Forwarded to the GUI testing worker over HTTP
    Gui,
    /// Forwarded to the API testing worker over WebSocket
    Api,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 3] = [TaskCategory::General, TaskCategory::Gui, TaskCategory::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::General => "general",
            TaskCategory::Gui => "gui",
            TaskCategory::Api => "api",
        }
    }

    fn from_exact(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interpret a model reply as a category.
///
/// Returns `None` when the reply names no label or more than one distinct
/// label; callers fall back to [`TaskCategory::General`].
pub fn parse_label(reply: &str) -> Option<TaskCategory> {
    let trimmed = reply
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c.is_whitespace())
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim();

    if let Some(category) = TaskCategory::from_exact(trimmed) {
        return Some(category);
    }

    let mut found: Option<TaskCategory> = None;
    for word in reply.split(|c: char| !c.is_ascii_alphanumeric()) {
        let Some(category) = TaskCategory::from_exact(word) else {
            continue;
        };
        match found {
            Some(previous) if previous != category => return None,
            _ => found = Some(category),
        }
    }
    found
}
