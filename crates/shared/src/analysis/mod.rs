pub mod orchestrator;
pub mod records;
pub mod tools;
pub mod trigger;

pub use orchestrator::{AnalysisError, AnalysisOrchestrator};
pub use records::{
    AnalysisResult, ImportanceLevel, KeyPoint, KeyPointCategory, NextAction, Priority, Timeframe,
    Todo,
};
pub use tools::{ExtractionTool, SchemaViolation, SummaryOutput, ToolOutcome};
pub use trigger::{AnalysisPermit, TranscriptSession, ANALYSIS_CHUNK_CHARS};
