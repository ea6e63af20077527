//! Entry check for captured text.

use std::fmt;

/// Capture text that has been trimmed and is known to be non-empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    /// Nothing but whitespace was captured
    Blank,
}

/// Trims raw capture text and rejects blank input.
///
/// No other validation happens here; everything downstream must cope with
/// arbitrary non-empty text (unicode, punctuation, several lines).
#[derive(Debug, Default, Clone, Copy)]
pub struct InputGate;

impl InputGate {
    pub fn new() -> Self {
        Self
    }

    pub fn accept(&self, raw_text: &str) -> Result<NormalizedText, GateRejection> {
        let trimmed = raw_text.trim();
        if trimmed.is_empty() {
            return Err(GateRejection::Blank);
        }
        Ok(NormalizedText(trimmed.to_string()))
    }
}
