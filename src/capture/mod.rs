//! Capture-to-items extraction pipeline
//!
//! Turns free-form text from voice transcription or OCR into candidate
//! tasks and events:
//! - `input_gate`: trims input and rejects blank captures
//! - `heuristic`: deterministic rule-based parser (always succeeds)
//! - `contract`: JSON extraction and schema validation of model replies
//! - `model`: the optional language model collaborator
//! - `retry`: bounded sequential attempts against the model
//! - `diagnostics`: per-session audit trail
//! - `pipeline`: the coordinator tying it all together

pub mod contract;
pub mod diagnostics;
pub mod heuristic;
pub mod input_gate;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod retry;
mod types;

pub use contract::{ContractError, JsonContractExtractor};
pub use diagnostics::{
    Diagnostic, DiagnosticEntry, DiagnosticLevel, DiagnosticStep, DiagnosticsRecorder,
    DiagnosticsStore, InMemoryDiagnosticsStore,
};
pub use heuristic::HeuristicParser;
pub use input_gate::{GateRejection, InputGate, NormalizedText};
pub use model::{CommandModel, ModelCollaborator, UnavailableModel};
pub use pipeline::{PipelineCoordinator, PipelineSettings, PipelineState};
pub use retry::{RetryOrchestrator, RetryOutcome};
pub use types::{
    CaptureSource, ExtractedItem, FailureReason, ProcessFailure, ProcessResult, RawCapture,
    StructuredResult,
};
