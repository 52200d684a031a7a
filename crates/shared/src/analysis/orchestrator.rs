use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use super::records::AnalysisResult;
use super::tools::{ExtractionTool, run_tool};
use super::trigger::TranscriptSession;
use crate::llm::{LlmGateway, LlmGatewayError, LlmRequest, LlmResponse};

pub const ANALYSIS_TEMPERATURE: f32 = 0.3;

const ANALYSIS_SYSTEM_PROMPT: &str = "You analyze meeting and conversation transcripts. \
Extract action items with the provided tools and answer with a concise summary of the \
transcript as plain text. Use create-todo for tasks someone committed to, \
extract-key-points for decisions, warnings and other notable statements, and \
suggest-next-actions for follow-ups nobody committed to. Every extracted field must \
stay within 50 characters. Do not invent items that are not supported by the transcript.";

fn instruction_payload(transcript: &str) -> String {
    format!(
        "Analyze the following transcript. Call each relevant tool with the items you \
find, then reply with a short summary.\n\nTranscript:\n{transcript}"
    )
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("transcription must not be empty")]
    EmptyInput,
    #[error(transparent)]
    Backend(#[from] LlmGatewayError),
}

/// Drives one transcript through the extraction backend and reconciles the
/// reported tool invocations into a validated result.
pub struct AnalysisOrchestrator {
    gateway: Arc<dyn LlmGateway>,
}

impl AnalysisOrchestrator {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self { gateway }
    }

    pub async fn analyze(&self, transcript: &str) -> Result<AnalysisResult, AnalysisError> {
        let trimmed = transcript.trim();
        if trimmed.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }

        let tools = ExtractionTool::ALL
            .into_iter()
            .map(ExtractionTool::spec)
            .collect();
        let request = LlmRequest::single_turn(ANALYSIS_SYSTEM_PROMPT, instruction_payload(trimmed))
            .with_tools(tools)
            .with_temperature(ANALYSIS_TEMPERATURE);

        let response = self.gateway.generate(request).await?;
        Ok(reconcile(&response))
    }

    /// Incremental entry point: runs a pass only when the session's trigger
    /// policy says one is due. Returns `None` when no pass ran.
    pub async fn analyze_if_due(
        &self,
        session: &TranscriptSession,
        transcript: &str,
        recording_active: bool,
    ) -> Option<Result<AnalysisResult, AnalysisError>> {
        let current_len = transcript.chars().count();
        let permit = session.try_begin(current_len, recording_active)?;

        match self.analyze(transcript).await {
            Ok(result) => {
                permit.commit();
                Some(Ok(result))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

#[derive(Debug)]
struct ToolInvocation<'a> {
    tool: ExtractionTool,
    payload: &'a Value,
}

/// Collapses the two invocation-report locations into one validated result.
/// The result list wins for any tool present in both; call records fill in
/// tools the result list omitted. Duplicate records for the same tool within
/// a list are all executed, since a backend may legitimately report a tool
/// twice with different items.
fn reconcile(response: &LlmResponse) -> AnalysisResult {
    let mut analysis = AnalysisResult::default();
    let mut tool_summary = None;

    let result_invocations = invocations_from_results(response);
    let tools_with_results: HashSet<ExtractionTool> = result_invocations
        .iter()
        .map(|invocation| invocation.tool)
        .collect();
    let call_invocations = invocations_from_calls(response)
        .into_iter()
        .filter(|invocation| !tools_with_results.contains(&invocation.tool));

    for invocation in result_invocations.into_iter().chain(call_invocations) {
        let outcome = run_tool(invocation.tool, invocation.payload);
        for violation in &outcome.violations {
            warn!(tool = violation.tool, error = %violation, "dropped invalid extraction item");
        }

        analysis.todos.extend(outcome.todos);
        analysis.key_points.extend(outcome.key_points);
        analysis.next_actions.extend(outcome.next_actions);
        if let Some(summary) = outcome.summary {
            tool_summary.get_or_insert(summary);
        }
    }

    let top_level_text = response.text.trim();
    analysis.summary = if top_level_text.is_empty() {
        tool_summary
            .map(|summary| summary.summary)
            .unwrap_or_default()
    } else {
        top_level_text.to_string()
    };

    analysis
}

fn invocations_from_results(response: &LlmResponse) -> Vec<ToolInvocation<'_>> {
    response
        .tool_results
        .iter()
        .filter_map(|record| {
            let tool = match ExtractionTool::parse(&record.name) {
                Some(tool) => tool,
                None => {
                    warn!(name = %record.name, "ignoring unknown tool result");
                    return None;
                }
            };
            Some(ToolInvocation {
                tool,
                payload: &record.result,
            })
        })
        .collect()
}

fn invocations_from_calls(response: &LlmResponse) -> Vec<ToolInvocation<'_>> {
    response
        .tool_calls
        .iter()
        .filter_map(|record| {
            let tool = match ExtractionTool::parse(&record.name) {
                Some(tool) => tool,
                None => {
                    warn!(name = %record.name, "ignoring unknown tool call");
                    return None;
                }
            };
            Some(ToolInvocation {
                tool,
                payload: &record.arguments,
            })
        })
        .collect()
}
