//! MCP tool handlers for the capture server
//!
//! Each tool delegates to a `handle_*` method defined in its own file.

pub mod capture;
pub mod diagnostics;
pub mod list;
