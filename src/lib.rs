//! Capture MCP Server Library
//!
//! This library provides a Model Context Protocol (MCP) server that turns
//! free-form household captures (typed notes, voice transcripts, OCR text)
//! into dated tasks and events.
//!
//! # Architecture
//!
//! - **MCP Layer**: `CaptureServerHandler` - Handles MCP protocol communication
//! - **Pipeline Layer**: `capture` module - Input gate, model retries, JSON
//!   contract, heuristic fallback and diagnostics
//! - **Persistence Layer**: `storage` and `tasks` modules - TOML file with
//!   the capture inbox and the tasks made from it
//!
//! # Example
//!
//! ```no_run
//! use capture_mcp::{CaptureConfig, CaptureServerHandler};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let handler = CaptureServerHandler::new("tasks.toml", CaptureConfig::default())?;
//!     // Use handler with MCP server...
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod config;
pub mod formatting;
pub mod handlers;
pub mod storage;
pub mod tasks;
pub mod validation;

use anyhow::Result;
use mcp_attr::Result as McpResult;
use mcp_attr::server::{McpServer, mcp_server};
use std::sync::{Arc, Mutex};

use crate::capture::{DiagnosticsStore, ModelCollaborator, PipelineCoordinator};

// Re-export commonly used types
pub use config::{CaptureConfig, ConfigError};
pub use storage::Storage;
pub use tasks::{CaptureRecord, CaptureStatus, TaskFile, TaskRecord};

/// MCP Server handler for household captures
///
/// Owns the task file, the pipeline and the diagnostics store. Every capture
/// is persisted to a TOML file.
pub struct CaptureServerHandler {
    pub(crate) data: Mutex<TaskFile>,
    pub(crate) storage: Storage,
    pub(crate) pipeline: PipelineCoordinator,
    pub(crate) diagnostics: Arc<dyn DiagnosticsStore>,
    pub(crate) config: CaptureConfig,
}

impl CaptureServerHandler {
    /// Create a new handler using the model described by `config`
    ///
    /// # Arguments
    /// * `storage_path` - Path to the task data file (TOML format)
    /// * `config` - Server configuration
    ///
    /// # Returns
    /// Result containing the handler or an error
    pub fn new(storage_path: &str, config: CaptureConfig) -> Result<Self> {
        let model = config.model_collaborator();
        Self::with_model(storage_path, config, model)
    }

    /// Create a new handler around an explicit model collaborator
    pub fn with_model(
        storage_path: &str,
        config: CaptureConfig,
        model: Arc<dyn ModelCollaborator>,
    ) -> Result<Self> {
        config.validate()?;
        let storage = Storage::new(storage_path);
        let data = Mutex::new(storage.load()?);
        let diagnostics: Arc<dyn DiagnosticsStore> = Arc::new(config.diagnostics_store());
        let pipeline =
            PipelineCoordinator::with_model(model, diagnostics.clone(), config.pipeline_settings());
        Ok(Self {
            data,
            storage,
            pipeline,
            diagnostics,
            config,
        })
    }

    /// Snapshot of the current task file
    pub fn snapshot(&self) -> TaskFile {
        self.data.lock().unwrap().clone()
    }

    fn save_data(&self) -> Result<()> {
        let data = self.data.lock().unwrap();
        self.storage.save(&data)?;
        Ok(())
    }
}

/// Household capture server: turns quick notes, voice transcripts and
/// scanned text into tasks and calendar events.
///
/// A local language model is used when one is configured; otherwise (or when
/// it keeps failing) a rule-based parser understands cues like "today",
/// "next friday", "3/14", "8am" and "3-4pm".
///
/// Workflow: 1) capture text → 2) list_tasks to review → 3) diagnostics with
/// the session id when an extraction looks wrong.
#[mcp_server]
impl McpServer for CaptureServerHandler {
    /// **Capture**: Turn free-form text into tasks. Blank text is rejected.
    /// **Returns**: The created tasks, the session id and whether the rule-based fallback was used.
    #[tool]
    async fn capture(
        &self,
        /// Text to extract tasks from (typed, dictated or scanned)
        text: String,
        /// Source: today_quick_capture/quick_add_voice/ocr_scan/inbox_import (default: today_quick_capture)
        source: Option<String>,
        /// Date that "today", "tomorrow" and weekdays are resolved against: YYYY-MM-DD (default: today)
        reference_date: Option<String>,
        /// Household member the tasks belong to (optional)
        person_id: Option<String>,
    ) -> McpResult<String> {
        self.handle_capture(text, source, reference_date, person_id)
            .await
    }

    /// **Review**: List tasks created from captures.
    #[tool]
    async fn list_tasks(
        &self,
        /// Only tasks on this date: YYYY-MM-DD (optional)
        date: Option<String>,
    ) -> McpResult<String> {
        self.handle_list_tasks(date).await
    }

    /// **Troubleshoot**: Show every pipeline step recorded for a capture session.
    #[tool]
    async fn diagnostics(
        &self,
        /// Session id returned by capture
        session_id: String,
    ) -> McpResult<String> {
        self.handle_diagnostics(session_id).await
    }
}
