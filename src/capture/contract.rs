//! JSON output contract for model responses
//!
//! Pulls the first balanced JSON object out of free-form model text (the
//! model may wrap it in prose or a fenced code block), checks it against the
//! event schema and maps it to [`ExtractedItem`]s.

use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::LazyLock;
use thiserror::Error;

use super::heuristic::{clock_time, expand_year};
use super::types::{ExtractedItem, FailureReason};

static CLOCK_12H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m\.?$").expect("12h pattern is valid")
});

static CLOCK_24H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})(?::\d{2})?$").expect("24h pattern is valid")
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("no JSON object found in model response")]
    JsonBlockNotFound,

    #[error("model response does not match the event schema: {detail}")]
    SchemaInvalid { detail: String },
}

impl ContractError {
    pub fn reason(&self) -> FailureReason {
        match self {
            ContractError::JsonBlockNotFound => FailureReason::JsonBlockNotFound,
            ContractError::SchemaInvalid { .. } => FailureReason::SchemaInvalid,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EventEnvelope {
    events: Vec<EventPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct EventPayload {
    title: String,
    date: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    #[serde(default, deserialize_with = "non_null_bool")]
    all_day: Option<bool>,
    source_text: Option<String>,
}

// `allDay` may be omitted but, unlike the string fields, may not be null.
fn non_null_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    bool::deserialize(deserializer).map(Some)
}

/// Validates model output against the event schema
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonContractExtractor;

impl JsonContractExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract items from a raw model response.
    ///
    /// Relative or partial dates are resolved against `reference_date`.
    /// Date and time fields that cannot be parsed are dropped; the item is
    /// kept as long as it has a title.
    pub fn extract(
        &self,
        response: &str,
        reference_date: NaiveDate,
    ) -> Result<Vec<ExtractedItem>, ContractError> {
        let block = find_json_block(response).ok_or(ContractError::JsonBlockNotFound)?;

        let envelope: EventEnvelope =
            serde_json::from_str(block).map_err(|e| ContractError::SchemaInvalid {
                detail: e.to_string(),
            })?;

        if envelope.events.is_empty() {
            return Err(ContractError::SchemaInvalid {
                detail: "events array is empty".to_string(),
            });
        }

        envelope
            .events
            .into_iter()
            .enumerate()
            .map(|(index, payload)| to_item(index, payload, reference_date))
            .collect()
    }
}

fn to_item(
    index: usize,
    payload: EventPayload,
    reference_date: NaiveDate,
) -> Result<ExtractedItem, ContractError> {
    let item = ExtractedItem::new(&payload.title).ok_or_else(|| ContractError::SchemaInvalid {
        detail: format!("events[{}].title is blank", index),
    })?;

    let date = payload
        .date
        .as_deref()
        .and_then(|d| parse_date_field(d, reference_date));
    let start = payload.start_time.as_deref().and_then(parse_time_field);
    let end = payload.end_time.as_deref().and_then(parse_time_field);
    let all_day = payload
        .all_day
        .unwrap_or(date.is_some() && start.is_none());

    Ok(item
        .with_date(date)
        .with_times(start, end)
        .with_all_day(all_day)
        .with_source_text(payload.source_text))
}

/// Locate the first balanced `{...}` substring.
///
/// Braces inside JSON string literals (including escaped quotes) do not count
/// towards the balance. If an opening brace never closes, scanning resumes at
/// the next one.
pub fn find_json_block(response: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = response[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_end(&response[start..]) {
            return Some(&response[start..start + end]);
        }
        search_from = start + 1;
    }
    None
}

// Byte length of the balanced object at the start of `text`, if it closes
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Accepts `YYYY-MM-DD`, `MM/DD`, `MM/DD/YY(YY)`, `today` and `tomorrow`
pub(crate) fn parse_date_field(value: &str, reference_date: NaiveDate) -> Option<NaiveDate> {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "today" => return Some(reference_date),
        "tomorrow" => return reference_date.checked_add_days(Days::new(1)),
        _ => {}
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }

    let mut parts = value.split('/');
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let year = match parts.next() {
        Some(y) => expand_year(y.trim().parse().ok()?),
        None => reference_date.year(),
    };
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Accepts `h:mm am/pm`, `h am/pm` and 24-hour `HH:MM[:SS]`
pub(crate) fn parse_time_field(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    if let Some(caps) = CLOCK_12H.captures(value) {
        let hour = caps.get(1)?.as_str().parse().ok()?;
        let minute = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        return clock_time(hour, minute, caps.get(3)?.as_str().chars().next());
    }
    let caps = CLOCK_24H.captures(value)?;
    clock_time(
        caps.get(1)?.as_str().parse().ok()?,
        caps.get(2)?.as_str().parse().ok()?,
        None,
    )
}
