//! List handler for the capture MCP server

use crate::CaptureServerHandler;
use crate::formatting;
use crate::validation;
use mcp_attr::Result as McpResult;

impl CaptureServerHandler {
    /// List stored tasks, optionally only those on one day.
    pub async fn handle_list_tasks(&self, date: Option<String>) -> McpResult<String> {
        let date_filter = if let Some(ref date_str) = date {
            Some(validation::parse_date_param(date_str)?)
        } else {
            None
        };

        let data = self.data.lock().unwrap();
        let tasks = data.list_tasks(date_filter);
        drop(data);

        Ok(formatting::format_tasks(&tasks))
    }
}
