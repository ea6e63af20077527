//! Diagnostics handler for the capture MCP server

use crate::CaptureServerHandler;
use crate::formatting;
use mcp_attr::{Result as McpResult, bail_public};

impl CaptureServerHandler {
    /// Show the diagnostic trail of one pipeline session.
    pub async fn handle_diagnostics(&self, session_id: String) -> McpResult<String> {
        let session_id = session_id.trim();
        let entries = self.diagnostics.entries_for_session(session_id);
        if entries.is_empty() {
            bail_public!(
                _,
                "No diagnostics found for session '{}'. Sessions are kept in memory only and the oldest are dropped first.",
                session_id
            );
        }
        Ok(formatting::format_diagnostics(session_id, &entries))
    }
}
