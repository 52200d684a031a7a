use std::sync::LazyLock;

use jsonschema::JSONSchema;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::records::{KeyPoint, NextAction, Todo};
use crate::llm::ToolSpec;

/// Number of summary characters kept when a summary pass is executed locally
/// and no explicit limit is supplied.
pub const DEFAULT_SUMMARY_MAX_CHARS: usize = 200;

/// The fixed extraction tool set exposed to the analysis backend. Each tool is
/// a pass-through validator: the backend proposes fully-formed items and the
/// tool admits or rejects them against the record schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionTool {
    CreateTodo,
    ExtractKeyPoints,
    SuggestNextActions,
    CreateSummary,
}

impl ExtractionTool {
    pub const ALL: [Self; 4] = [
        Self::CreateTodo,
        Self::ExtractKeyPoints,
        Self::SuggestNextActions,
        Self::CreateSummary,
    ];

    pub const fn canonical_name(self) -> &'static str {
        match self {
            Self::CreateTodo => "create-todo",
            Self::ExtractKeyPoints => "extract-key-points",
            Self::SuggestNextActions => "suggest-next-actions",
            Self::CreateSummary => "create-summary",
        }
    }

    /// Resolves a backend-reported tool name. Backends drift on separators
    /// and casing ("createTodo", "create_todo", "Create-Todo"), so matching
    /// happens on the name with separators stripped and case folded.
    pub fn parse(reported_name: &str) -> Option<Self> {
        match normalize_tool_name(reported_name).as_str() {
            "createtodo" => Some(Self::CreateTodo),
            "extractkeypoints" => Some(Self::ExtractKeyPoints),
            "suggestnextactions" => Some(Self::SuggestNextActions),
            "createsummary" => Some(Self::CreateSummary),
            _ => None,
        }
    }

    pub fn spec(self) -> ToolSpec {
        match self {
            Self::CreateTodo => ToolSpec {
                name: self.canonical_name().to_string(),
                description: "Record concrete tasks that were committed to in the conversation."
                    .to_string(),
                parameters: args_schema::<CreateTodoArgs>(),
            },
            Self::ExtractKeyPoints => ToolSpec {
                name: self.canonical_name().to_string(),
                description: "Record notable statements such as decisions and warnings."
                    .to_string(),
                parameters: args_schema::<ExtractKeyPointsArgs>(),
            },
            Self::SuggestNextActions => ToolSpec {
                name: self.canonical_name().to_string(),
                description: "Record recommended follow-ups nobody explicitly committed to."
                    .to_string(),
                parameters: args_schema::<SuggestNextActionsArgs>(),
            },
            Self::CreateSummary => ToolSpec {
                name: self.canonical_name().to_string(),
                description: "Produce a short summary of the transcription.".to_string(),
                parameters: args_schema::<CreateSummaryArgs>(),
            },
        }
    }
}

fn normalize_tool_name(reported_name: &str) -> String {
    reported_name
        .chars()
        .filter(|ch| !matches!(ch, '-' | '_' | ' ' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn args_schema<T: JsonSchema>() -> Value {
    match serde_json::to_value(schema_for!(T)) {
        Ok(schema) => schema,
        Err(_) => Value::Null,
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct CreateTodoArgs {
    todos: Vec<Todo>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ExtractKeyPointsArgs {
    key_points: Vec<KeyPoint>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SuggestNextActionsArgs {
    next_actions: Vec<NextAction>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct CreateSummaryArgs {
    transcription: String,
    #[serde(default)]
    max_length: Option<usize>,
}

/// Summary emitted by the summary tool. `key_topics` is validated and
/// retained for callers that want it, though the response surface only uses
/// `summary`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutput {
    pub summary: String,
    #[serde(default)]
    pub key_topics: Vec<String>,
}

#[derive(Debug, Clone, Error)]
#[error("tool {tool} rejected a payload item: {}", .errors.join("; "))]
pub struct SchemaViolation {
    pub tool: &'static str,
    pub errors: Vec<String>,
}

/// Everything one tool execution admitted, plus the items it rejected.
#[derive(Debug, Default)]
pub struct ToolOutcome {
    pub todos: Vec<Todo>,
    pub key_points: Vec<KeyPoint>,
    pub next_actions: Vec<NextAction>,
    pub summary: Option<SummaryOutput>,
    pub violations: Vec<SchemaViolation>,
}

static TODO_VALIDATOR: LazyLock<Result<JSONSchema, String>> = LazyLock::new(|| {
    let schema = serde_json::to_value(schema_for!(Todo))
        .map_err(|err| err.to_string())?;
    JSONSchema::compile(&schema).map_err(|err| err.to_string())
});

static KEY_POINT_VALIDATOR: LazyLock<Result<JSONSchema, String>> = LazyLock::new(|| {
    let schema = serde_json::to_value(schema_for!(KeyPoint))
        .map_err(|err| err.to_string())?;
    JSONSchema::compile(&schema).map_err(|err| err.to_string())
});

static NEXT_ACTION_VALIDATOR: LazyLock<Result<JSONSchema, String>> = LazyLock::new(|| {
    let schema = serde_json::to_value(schema_for!(NextAction))
        .map_err(|err| err.to_string())?;
    JSONSchema::compile(&schema).map_err(|err| err.to_string())
});

static SUMMARY_VALIDATOR: LazyLock<Result<JSONSchema, String>> = LazyLock::new(|| {
    let schema = serde_json::to_value(schema_for!(SummaryOutput))
        .map_err(|err| err.to_string())?;
    JSONSchema::compile(&schema).map_err(|err| err.to_string())
});

/// Runs one extraction tool over one reported payload. Items that fail
/// validation are dropped individually and surfaced as violations; the run
/// itself never fails.
pub fn run_tool(tool: ExtractionTool, payload: &Value) -> ToolOutcome {
    let mut outcome = ToolOutcome::default();

    match tool {
        ExtractionTool::CreateTodo => {
            let items = items_field(payload, "todos");
            collect_validated(
                tool,
                &TODO_VALIDATOR,
                items,
                &mut outcome.violations,
                &mut outcome.todos,
            );
        }
        ExtractionTool::ExtractKeyPoints => {
            let items = items_field(payload, "keyPoints");
            collect_validated(
                tool,
                &KEY_POINT_VALIDATOR,
                items,
                &mut outcome.violations,
                &mut outcome.key_points,
            );
        }
        ExtractionTool::SuggestNextActions => {
            let items = items_field(payload, "nextActions");
            collect_validated(
                tool,
                &NEXT_ACTION_VALIDATOR,
                items,
                &mut outcome.violations,
                &mut outcome.next_actions,
            );
        }
        ExtractionTool::CreateSummary => {
            outcome.summary = run_summary_tool(payload, &mut outcome.violations);
        }
    }

    outcome
}

/// Payloads for the list tools arrive either as the canonical wrapper object
/// (`{"todos": [...]}`) or as a bare array when the backend flattens the
/// arguments. Accept both.
fn items_field<'a>(payload: &'a Value, field: &str) -> &'a [Value] {
    let array = match payload {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.get(field).and_then(Value::as_array),
        _ => None,
    };
    array.map(Vec::as_slice).unwrap_or(&[])
}

fn collect_validated<T: serde::de::DeserializeOwned>(
    tool: ExtractionTool,
    validator: &LazyLock<Result<JSONSchema, String>>,
    items: &[Value],
    violations: &mut Vec<SchemaViolation>,
    accepted: &mut Vec<T>,
) {
    let compiled = match &**validator {
        Ok(compiled) => compiled,
        Err(compile_error) => {
            violations.push(SchemaViolation {
                tool: tool.canonical_name(),
                errors: vec![format!("schema unavailable: {compile_error}")],
            });
            return;
        }
    };

    for item in items {
        let validation_errors = compiled
            .validate(item)
            .err()
            .map(|errors| errors.map(|err| err.to_string()).collect::<Vec<_>>())
            .unwrap_or_default();
        if !validation_errors.is_empty() {
            violations.push(SchemaViolation {
                tool: tool.canonical_name(),
                errors: validation_errors,
            });
            continue;
        }

        match serde_json::from_value::<T>(item.clone()) {
            Ok(parsed) => accepted.push(parsed),
            Err(err) => violations.push(SchemaViolation {
                tool: tool.canonical_name(),
                errors: vec![err.to_string()],
            }),
        }
    }
}

/// The summary tool is reported in two shapes. A result-shaped payload
/// carries the finished `{"summary": ...}` object and is validated as-is. An
/// args-shaped payload carries `{"transcription": ...}` and means the pass
/// was left to us, so the truncation pass runs locally.
fn run_summary_tool(payload: &Value, violations: &mut Vec<SchemaViolation>) -> Option<SummaryOutput> {
    if payload.get("summary").is_some() {
        let compiled = match &*SUMMARY_VALIDATOR {
            Ok(compiled) => compiled,
            Err(compile_error) => {
                violations.push(SchemaViolation {
                    tool: ExtractionTool::CreateSummary.canonical_name(),
                    errors: vec![format!("schema unavailable: {compile_error}")],
                });
                return None;
            }
        };

        let validation_errors = compiled
            .validate(payload)
            .err()
            .map(|errors| errors.map(|err| err.to_string()).collect::<Vec<_>>())
            .unwrap_or_default();
        if !validation_errors.is_empty() {
            violations.push(SchemaViolation {
                tool: ExtractionTool::CreateSummary.canonical_name(),
                errors: validation_errors,
            });
            return None;
        }

        return match serde_json::from_value::<SummaryOutput>(payload.clone()) {
            Ok(summary) => Some(summary),
            Err(err) => {
                violations.push(SchemaViolation {
                    tool: ExtractionTool::CreateSummary.canonical_name(),
                    errors: vec![err.to_string()],
                });
                None
            }
        };
    }

    match serde_json::from_value::<CreateSummaryArgs>(payload.clone()) {
        Ok(args) => Some(SummaryOutput {
            summary: truncate_summary(
                &args.transcription,
                args.max_length.unwrap_or(DEFAULT_SUMMARY_MAX_CHARS),
            ),
            key_topics: Vec::new(),
        }),
        Err(err) => {
            violations.push(SchemaViolation {
                tool: ExtractionTool::CreateSummary.canonical_name(),
                errors: vec![err.to_string()],
            });
            None
        }
    }
}

fn truncate_summary(transcription: &str, max_chars: usize) -> String {
    let trimmed = transcription.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut truncated: String = trimmed.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
