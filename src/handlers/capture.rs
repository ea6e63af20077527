//! Capture handler for the capture MCP server

use crate::CaptureServerHandler;
use crate::capture::{CaptureSource, ProcessResult, RawCapture};
use crate::formatting;
use crate::tasks::{InboxStore, TaskOrigin, TaskRecord, TaskStore, local_date_today};
use crate::validation;
use mcp_attr::{Result as McpResult, bail_public};
use tracing::{error, info};

impl CaptureServerHandler {
    /// Store the capture in the inbox, run it through the pipeline and
    /// turn the extracted items into tasks.
    ///
    /// The capture is written to the data file as `pending` before the
    /// pipeline runs and ends up `processed` or `failed`. If the call is
    /// cancelled mid-pipeline the saved capture stays `pending`.
    pub async fn handle_capture(
        &self,
        text: String,
        source: Option<String>,
        reference_date: Option<String>,
        person_id: Option<String>,
    ) -> McpResult<String> {
        let source = match source {
            Some(ref s) => validation::parse_source_param(s)?,
            None => CaptureSource::today_quick_capture,
        };
        let reference_date = match reference_date {
            Some(ref d) => validation::parse_date_param(d)?,
            None => local_date_today(),
        };
        let person_id = validation::person_or_default(person_id, &self.config.default_person_id);

        let capture_id = {
            let mut data = self.data.lock().unwrap();
            data.add_capture(&text, source, &person_id, reference_date)
        };
        if let Err(e) = self.save_data() {
            error!(capture_id = %capture_id, error = %e, "failed to save capture");
            bail_public!(_, "Failed to save: {}", e);
        }

        let raw = RawCapture::new(text, source, reference_date)
            .with_time_zone(self.config.time_zone.clone())
            .with_person(person_id.clone());
        let result = self.pipeline.process(&raw).await;

        let mut data = self.data.lock().unwrap();
        match result {
            ProcessResult::Success {
                session_id,
                items,
                used_heuristic_fallback,
                ..
            } => {
                let origin = TaskOrigin {
                    capture_id: &capture_id,
                    person_id: &person_id,
                    source,
                };
                let mut task_ids: Vec<String> = Vec::with_capacity(items.len());
                for item in &items {
                    let id = data.upsert(item, &origin);
                    // Identical items collapse into one task
                    if !task_ids.contains(&id) {
                        task_ids.push(id);
                    }
                }
                data.mark_processed(&capture_id, &session_id, task_ids.clone());
                let tasks: Vec<TaskRecord> = task_ids
                    .iter()
                    .filter_map(|id| data.find_task(id).cloned())
                    .collect();
                drop(data);

                if let Err(e) = self.save_data() {
                    error!(capture_id = %capture_id, error = %e, "failed to save tasks");
                    bail_public!(_, "Failed to save: {}", e);
                }
                info!(capture_id = %capture_id, task_count = tasks.len(), "capture stored");

                Ok(formatting::format_capture_summary(
                    &capture_id,
                    &session_id,
                    &tasks,
                    used_heuristic_fallback,
                ))
            }
            ProcessResult::Failure {
                session_id, reason, ..
            } => {
                data.mark_failed(&capture_id, &session_id);
                drop(data);

                if let Err(e) = self.save_data() {
                    error!(capture_id = %capture_id, error = %e, "failed to save capture");
                    bail_public!(_, "Failed to save: {}", e);
                }

                bail_public!(
                    _,
                    "Capture {} was rejected ({}): the text is empty. Please capture something to extract. Session: {}",
                    capture_id,
                    reason,
                    session_id
                );
            }
        }
    }
}
