//! End-to-end capture processing
//!
//! ```text
//! RECEIVED -> (LLM_ATTEMPT)* -> VALIDATED ----------------------------> COMPLETED
//!                            -> LLM_EXHAUSTED --> HEURISTIC_FALLBACK -> COMPLETED
//!          -> LLM_UNAVAILABLE -----------------> HEURISTIC_FALLBACK -> COMPLETED
//!          -> FAILED(EMPTY_TRANSCRIPT)
//! ```
//!
//! Only blank input fails. Every other problem (missing model, crashes,
//! blank or malformed replies) degrades into the heuristic parser, which
//! always yields at least one item.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::contract::JsonContractExtractor;
use super::diagnostics::{Diagnostic, DiagnosticStep, DiagnosticsRecorder, DiagnosticsStore};
use super::heuristic::HeuristicParser;
use super::input_gate::{GateRejection, InputGate, NormalizedText};
use super::model::ModelCollaborator;
use super::retry::{RetryOrchestrator, RetryOutcome};
use super::types::{ExtractedItem, ProcessFailure, ProcessResult, RawCapture};

/// States a capture moves through; no state is entered twice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    LlmAttempt,
    Validated,
    LlmExhausted,
    LlmUnavailable,
    HeuristicFallback,
    Completed,
    Failed,
}

impl PipelineState {
    fn can_advance_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Received, LlmAttempt)
                | (Received, LlmUnavailable)
                | (Received, Failed)
                | (LlmAttempt, Validated)
                | (LlmAttempt, LlmExhausted)
                | (LlmExhausted, HeuristicFallback)
                | (LlmUnavailable, HeuristicFallback)
                | (Validated, Completed)
                | (HeuristicFallback, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }
}

// Tracks the current state of one run and refuses to move backwards.
struct StateTracker {
    session_id: String,
    state: PipelineState,
}

impl StateTracker {
    fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            state: PipelineState::Received,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal pipeline transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(session_id = %self.session_id, from = ?self.state, to = ?next, "pipeline transition");
        self.state = next;
    }
}

/// Tunables for a [`PipelineCoordinator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Extra model attempts after the first; negative values mean none
    pub retry_count: i32,
    pub retry_backoff: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            retry_count: 2,
            retry_backoff: Duration::ZERO,
        }
    }
}

/// Composes gate, retries, contract, fallback and diagnostics
pub struct PipelineCoordinator {
    gate: InputGate,
    orchestrator: RetryOrchestrator,
    extractor: JsonContractExtractor,
    heuristic: HeuristicParser,
    diagnostics: Arc<dyn DiagnosticsStore>,
    retry_count: i32,
}

impl PipelineCoordinator {
    pub fn new(
        gate: InputGate,
        orchestrator: RetryOrchestrator,
        extractor: JsonContractExtractor,
        heuristic: HeuristicParser,
        diagnostics: Arc<dyn DiagnosticsStore>,
        retry_count: i32,
    ) -> Self {
        Self {
            gate,
            orchestrator,
            extractor,
            heuristic,
            diagnostics,
            retry_count,
        }
    }

    /// Standard wiring around a model collaborator and diagnostics store
    pub fn with_model(
        model: Arc<dyn ModelCollaborator>,
        diagnostics: Arc<dyn DiagnosticsStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self::new(
            InputGate::new(),
            RetryOrchestrator::new(model).with_backoff(settings.retry_backoff),
            JsonContractExtractor::new(),
            HeuristicParser::new(),
            diagnostics,
            settings.retry_count,
        )
    }

    /// Process a capture under a freshly generated session id
    pub async fn process(&self, capture: &RawCapture) -> ProcessResult {
        self.process_session(Uuid::new_v4().to_string(), capture).await
    }

    /// Process a capture under the given session id.
    ///
    /// Dropping the returned future cancels the run; entries recorded so far
    /// stay in the diagnostics store.
    pub async fn process_session(
        &self,
        session_id: impl Into<String>,
        capture: &RawCapture,
    ) -> ProcessResult {
        let session_id = session_id.into();
        let mut recorder =
            DiagnosticsRecorder::new(self.diagnostics.clone(), session_id.clone(), capture.source);
        let mut state = StateTracker::new(&session_id);

        info!(session_id = %session_id, source = %capture.source, "capture received");

        let text = match self.gate.accept(&capture.text) {
            Ok(text) => text,
            Err(GateRejection::Blank) => {
                state.advance(PipelineState::Failed);
                let failure = ProcessFailure::EmptyTranscript;
                warn!(session_id = %session_id, "capture rejected: empty transcript");
                recorder.record(
                    Diagnostic::error(DiagnosticStep::Failed, "Capture is empty after trimming")
                        .failure_reason(failure.reason()),
                );
                return ProcessResult::Failure {
                    session_id,
                    reason: failure,
                    diagnostics: recorder.into_trail(),
                };
            }
        };

        let reference_date = capture.reference_date;
        let outcome = self
            .orchestrator
            .run_validated(
                text.as_str(),
                reference_date,
                &capture.time_zone,
                self.retry_count,
                &mut recorder,
                |response| self.extractor.extract(response, reference_date),
            )
            .await;

        let (items, used_heuristic_fallback) = match outcome {
            RetryOutcome::Accepted { value, attempts } => {
                state.advance(PipelineState::LlmAttempt);
                state.advance(PipelineState::Validated);
                recorder.record(
                    Diagnostic::info(
                        DiagnosticStep::Validated,
                        format!("Model response validated after {} attempt(s)", attempts),
                    )
                    .task_count(value.len()),
                );
                (value, false)
            }
            RetryOutcome::Exhausted { attempts } => {
                state.advance(PipelineState::LlmAttempt);
                state.advance(PipelineState::LlmExhausted);
                warn!(session_id = %session_id, attempts, "model attempts exhausted");
                recorder.record(
                    Diagnostic::warn(
                        DiagnosticStep::LlmExhausted,
                        format!("All {} model attempt(s) failed; using heuristic parser", attempts),
                    ),
                );
                state.advance(PipelineState::HeuristicFallback);
                (self.fallback(&text, capture), true)
            }
            RetryOutcome::Unavailable => {
                state.advance(PipelineState::LlmUnavailable);
                state.advance(PipelineState::HeuristicFallback);
                (self.fallback(&text, capture), true)
            }
        };

        state.advance(PipelineState::Completed);
        let task_count = items.len();
        let message = if used_heuristic_fallback {
            format!("Extracted {} item(s) with heuristic fallback", task_count)
        } else {
            format!("Extracted {} item(s) with language model", task_count)
        };
        recorder.record(
            Diagnostic::info(DiagnosticStep::Completed, message)
                .transcript(text.as_str())
                .task_count(task_count),
        );
        info!(
            session_id = %session_id,
            task_count,
            used_heuristic_fallback,
            "capture processed"
        );

        ProcessResult::Success {
            session_id,
            items,
            task_count,
            used_heuristic_fallback,
            diagnostics: recorder.into_trail(),
        }
    }

    fn fallback(&self, text: &NormalizedText, capture: &RawCapture) -> Vec<ExtractedItem> {
        self.heuristic
            .parse(text, capture.reference_date, &capture.time_zone)
            .items
    }
}
