//! Parameter parsing for the MCP tools
//!
//! Errors are returned as `INVALID_PARAMS` with a message the client can
//! show to the user.

use crate::capture::CaptureSource;
use chrono::NaiveDate;
use mcp_attr::Result as McpResult;

fn invalid_params(message: String) -> mcp_attr::Error {
    mcp_attr::Error::new(mcp_attr::ErrorCode::INVALID_PARAMS).with_message(message, true)
}

/// Parse the `source` parameter of the capture tool
///
/// # Arguments
/// * `source_str` - Source name, e.g. "quick_add_voice" or the alias "voice"
///
/// # Returns
/// Result containing parsed CaptureSource or error
pub fn parse_source_param(source_str: &str) -> McpResult<CaptureSource> {
    source_str
        .trim()
        .parse::<CaptureSource>()
        .map_err(invalid_params)
}

/// Parse a date parameter
///
/// # Arguments
/// * `date_str` - Date string in YYYY-MM-DD format
///
/// # Returns
/// Result containing parsed NaiveDate or error
pub fn parse_date_param(date_str: &str) -> McpResult<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|_| {
        invalid_params(format!(
            "Invalid date format '{}'. Use YYYY-MM-DD (e.g., '2025-03-15')",
            date_str
        ))
    })
}

/// Normalize an optional person ID; blank means "use the default"
pub fn person_or_default(person_id: Option<String>, default: &str) -> String {
    person_id
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_param() {
        assert_eq!(
            parse_source_param("ocr_scan").unwrap(),
            CaptureSource::ocr_scan
        );
        assert_eq!(
            parse_source_param(" voice ").unwrap(),
            CaptureSource::quick_add_voice
        );
        assert!(parse_source_param("fax").is_err());
    }

    #[test]
    fn test_parse_date_param() {
        assert_eq!(
            parse_date_param("2025-03-15").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
        );
        assert!(parse_date_param("15/03/2025").is_err());
        assert!(parse_date_param("2025-02-30").is_err());
    }

    #[test]
    fn test_person_or_default() {
        assert_eq!(person_or_default(None, "household"), "household");
        assert_eq!(person_or_default(Some("  ".to_string()), "household"), "household");
        assert_eq!(person_or_default(Some(" kid-1 ".to_string()), "household"), "kid-1");
    }
}
