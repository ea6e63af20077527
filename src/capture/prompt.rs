//! Instruction text sent to the model collaborator.

use chrono::NaiveDate;

/// JSON schema the model output must satisfy
pub const EVENT_SCHEMA: &str = r#"{
  "type": "object",
  "required": ["events"],
  "properties": {
    "events": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["title"],
        "properties": {
          "title": {"type": "string"},
          "date": {"type": ["string","null"]},
          "startTime": {"type": ["string","null"]},
          "endTime": {"type": ["string","null"]},
          "allDay": {"type": "boolean"},
          "sourceText": {"type": ["string","null"]}
        },
        "additionalProperties": false
      }
    }
  },
  "additionalProperties": false
}"#;

/// Build the extraction prompt for one capture
pub fn build_prompt(text: &str, reference_date: NaiveDate, time_zone: &str) -> String {
    format!(
        "Extract every task or calendar event from the household note below.\n\
         Reply with a single JSON object and nothing else. It must match this schema:\n\
         {schema}\n\n\
         Rules:\n\
         - \"title\" is a short, non-empty description of the task or event.\n\
         - \"date\" is YYYY-MM-DD or MM/DD; resolve words like \"tomorrow\" against today.\n\
         - \"startTime\" and \"endTime\" use h:mm am/pm.\n\
         - Use null for anything the note does not say.\n\n\
         Today is {date} ({weekday}) in time zone {time_zone}.\n\n\
         Note:\n\"\"\"\n{text}\n\"\"\"",
        schema = EVENT_SCHEMA,
        date = reference_date.format("%Y-%m-%d"),
        weekday = reference_date.format("%A"),
        time_zone = time_zone,
        text = text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_valid_json() {
        let schema: serde_json::Value = serde_json::from_str(EVENT_SCHEMA).unwrap();
        assert_eq!(schema["required"][0], "events");
        assert_eq!(schema["properties"]["events"]["items"]["additionalProperties"], false);
    }

    #[test]
    fn test_prompt_contains_context() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let prompt = build_prompt("Swim lessons friday", date, "Europe/Berlin");
        assert!(prompt.contains("Swim lessons friday"));
        assert!(prompt.contains("2025-03-10 (Monday)"));
        assert!(prompt.contains("Europe/Berlin"));
        assert!(prompt.contains("\"sourceText\""));
    }
}
