//! Bounded, sequential retries against the model collaborator.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::contract::ContractError;
use super::diagnostics::{Diagnostic, DiagnosticStep, DiagnosticsRecorder};
use super::model::ModelCollaborator;
use super::prompt::build_prompt;
use super::types::FailureReason;

/// What happened across all attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    /// The model reported itself unavailable; no attempt was made
    Unavailable,
    /// An attempt produced a usable response
    Accepted { value: T, attempts: u32 },
    /// Every attempt failed, was blank or was rejected
    Exhausted { attempts: u32 },
}

impl<T> RetryOutcome<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            RetryOutcome::Accepted { value, .. } => Some(value),
            RetryOutcome::Unavailable | RetryOutcome::Exhausted { .. } => None,
        }
    }
}

/// Drives up to `retry_count + 1` model calls, one at a time
pub struct RetryOrchestrator {
    model: Arc<dyn ModelCollaborator>,
    backoff: Duration,
}

impl RetryOrchestrator {
    pub fn new(model: Arc<dyn ModelCollaborator>) -> Self {
        Self {
            model,
            backoff: Duration::ZERO,
        }
    }

    /// Wait this long between a failed attempt and the next one
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns the first non-blank response, or `None` when the model is
    /// unavailable or every attempt came back blank or failed.
    pub async fn run(
        &self,
        text: &str,
        reference_date: NaiveDate,
        time_zone: &str,
        retry_count: i32,
        recorder: &mut DiagnosticsRecorder,
    ) -> Option<String> {
        self.run_validated(text, reference_date, time_zone, retry_count, recorder, |response| {
            Ok::<_, ContractError>(response.to_string())
        })
        .await
        .into_value()
    }

    /// Like [`run`](Self::run), but a non-blank response must also pass
    /// `validate`; a rejected response is recorded with the validator's
    /// reason and the next attempt starts.
    ///
    /// Collaborator errors never escape: they are recorded as `EXCEPTION`
    /// and count as a failed attempt.
    pub async fn run_validated<T, F>(
        &self,
        text: &str,
        reference_date: NaiveDate,
        time_zone: &str,
        retry_count: i32,
        recorder: &mut DiagnosticsRecorder,
        mut validate: F,
    ) -> RetryOutcome<T>
    where
        F: FnMut(&str) -> Result<T, ContractError>,
    {
        if !self.model.is_available() {
            info!(session_id = recorder.session_id(), "model unavailable, skipping attempts");
            recorder.record(
                Diagnostic::info(
                    DiagnosticStep::LlmUnavailable,
                    "Language model unavailable; using heuristic parser",
                )
                .failure_reason(FailureReason::LlmUnavailable),
            );
            return RetryOutcome::Unavailable;
        }

        let total = retry_count.max(0).unsigned_abs() + 1;
        let prompt = build_prompt(text, reference_date, time_zone);

        for attempt in 1..=total {
            if attempt > 1 && !self.backoff.is_zero() {
                tokio::time::sleep(self.backoff).await;
            }

            debug!(session_id = recorder.session_id(), attempt, total, "calling model");
            let failure = match self.model.generate(&prompt, reference_date, time_zone).await {
                Err(e) => {
                    warn!(session_id = recorder.session_id(), attempt, error = %e, "model call failed");
                    (FailureReason::Exception, format!("model call failed: {}", e))
                }
                Ok(response) => match response.as_deref().map(str::trim) {
                    None | Some("") => (
                        FailureReason::BlankResponse,
                        "model returned a blank response".to_string(),
                    ),
                    Some(trimmed) => match validate(trimmed) {
                        Ok(value) => {
                            recorder.record(Diagnostic::info(
                                DiagnosticStep::LlmAttempt,
                                format!("Attempt {}/{} accepted", attempt, total),
                            ));
                            return RetryOutcome::Accepted {
                                value,
                                attempts: attempt,
                            };
                        }
                        Err(e) => (e.reason(), e.to_string()),
                    },
                },
            };

            let (reason, detail) = failure;
            warn!(session_id = recorder.session_id(), attempt, %reason, "model attempt rejected");
            recorder.record(
                Diagnostic::warn(
                    DiagnosticStep::LlmAttempt,
                    format!("Attempt {}/{} failed: {}", attempt, total, detail),
                )
                .failure_reason(reason),
            );
        }

        RetryOutcome::Exhausted { attempts: total }
    }
}
