use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Upper bound on every free-text record field, counted in Unicode code
/// points. Items exceeding it are rejected at validation, never truncated.
pub const MAX_FIELD_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum KeyPointCategory {
    Decision,
    Discussion,
    Warning,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImportanceLevel {
    Critical,
    High,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Timeframe {
    Immediate,
    ShortTerm,
    LongTerm,
}

/// A concrete task someone committed to during the conversation.
///
/// Unknown fields on incoming items are stripped rather than rejected; only
/// the length and enum constraints below reject an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Todo {
    #[schemars(length(max = 50))]
    pub task: String,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(max = 50))]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(max = 50))]
    pub deadline: Option<String>,
}

/// A notable statement worth surfacing independently of any task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeyPoint {
    #[schemars(length(max = 50))]
    pub point: String,
    pub category: KeyPointCategory,
    pub importance: ImportanceLevel,
}

/// A recommended follow-up that nobody explicitly committed to yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NextAction {
    #[schemars(length(max = 50))]
    pub action: String,
    #[schemars(length(max = 50))]
    pub reason: String,
    pub timeframe: Timeframe,
}

/// Aggregate of everything one analysis pass extracted from a transcript.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub todos: Vec<Todo>,
    pub key_points: Vec<KeyPoint>,
    pub next_actions: Vec<NextAction>,
    pub summary: String,
}
