//! Structured output schema for the classifier call

use crate::routing::category::TaskCategory;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Shape requested from providers that support JSON-schema output
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassificationOutput {
    /// The handler best suited to the task
    pub category: TaskCategory,
}

impl ClassificationOutput {
    pub const SCHEMA_NAME: &'static str = "task_category";

    /// JSON schema for `response_format`
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(ClassificationOutput);
        serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
    }
}
