//! Rule-based fallback parser
//!
//! Deterministic extraction of a date and a time from capture text. This is
//! the backstop of the pipeline: for any non-empty input it returns at least
//! one item, whatever the model did.
//!
//! # Grammar
//!
//! All cues are matched case-insensitively on word boundaries. Date and time
//! cues are scanned independently; within each kind the earliest textual
//! match that resolves to a real calendar value wins.
//!
//! Date cues:
//! - `today`, `tonight` → reference date
//! - `tomorrow` → reference date + 1
//! - `day after tomorrow` → reference date + 2
//! - `monday` … `sunday` → first such day on or after the reference date
//! - `next monday` … `next sunday` → the bare weekday + 7 days
//! - `MM/DD`, `MM/DD/YY`, `MM/DD/YYYY` → literal date (year defaults to the
//!   reference year; impossible dates such as `2/30` are skipped)
//!
//! Time cues:
//! - `h:mm am`, `h:mm p.m.` → 12-hour clock with minutes
//! - `h am`, `at hpm` → 12-hour clock on the hour
//! - `noon`, `midday` → 12:00, `midnight` → 00:00
//! - `at HH:MM` → 24-hour clock (the `at` is required to avoid matching scores
//!   and ratios)
//!
//! A time cue followed by `-`, `to`, `until` or `till` and a second time cue
//! gives the end time. A bare start hour takes the meridiem of the end
//! (`4-5pm` → 16:00-17:00, `9 to 10:30am` → 09:00-10:30), unless that would
//! put it after the end (`11-1pm` starts at 11:00). Dates that would fall
//! past the end of the calendar are dropped. Cue text is never stripped from
//! the title.

use chrono::{Datelike, Days, NaiveDate, NaiveTime, Weekday};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

use super::input_gate::NormalizedText;
use super::types::{ExtractedItem, StructuredResult};

static DATE_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?P<after>day\s+after\s+tomorrow)|(?P<today>today|tonight)|(?P<tomorrow>tomorrow)|(?P<next>next\s+)?(?P<weekday>monday|tuesday|wednesday|thursday|friday|saturday|sunday)|(?P<month>\d{1,2})/(?P<day>\d{1,2})(?:/(?P<year>\d{4}|\d{2}))?)\b",
    )
    .expect("date cue pattern is valid")
});

static TIME_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:at\s+)?(?P<h12>\d{1,2}):(?P<m12>\d{2})\s*(?P<ap1>[ap])\.?m\b\.?|(?:at\s+)?(?P<hour>\d{1,2})\s*(?P<ap2>[ap])\.?m\b\.?|(?P<noon>noon|midday)|(?P<midnight>midnight)|at\s+(?P<h24>\d{1,2}):(?P<m24>\d{2})\b)",
    )
    .expect("time cue pattern is valid")
});

static BARE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<h>\d{1,2})(?::(?P<m>\d{2}))?\s*(?:-|–|—|to\b|until\b|till\b)\s*(?P<eh>\d{1,2})(?::(?P<em>\d{2}))?\s*(?P<ap>[ap])\.?m\b\.?",
    )
    .expect("bare range pattern is valid")
});

static RANGE_JOINER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:-|–|—|to\b|until\b|till\b)\s*").expect("range joiner pattern is valid")
});

/// Deterministic text-to-item parser used when the model path yields nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicParser;

impl HeuristicParser {
    pub fn new() -> Self {
        Self
    }

    /// Structure `text` into items. Never fails and never returns an empty list.
    ///
    /// Text with two or more non-blank lines, at least two of which carry a
    /// date cue, is treated as a list and yields one item per line. Anything
    /// else yields a single item titled with the whole text.
    pub fn parse(
        &self,
        text: &NormalizedText,
        reference_date: NaiveDate,
        time_zone: &str,
    ) -> StructuredResult {
        let lines: Vec<&str> = text
            .as_str()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let dated_lines = lines
            .iter()
            .filter(|line| find_date(line, reference_date).is_some())
            .count();

        let mut items = Vec::new();
        if lines.len() > 1 && dated_lines > 1 {
            items.extend(lines.iter().filter_map(|line| {
                ExtractedItem::new(line).map(|item| structure(item, line, reference_date))
            }));
        }
        if items.is_empty() {
            items.push(structure(
                ExtractedItem::from_normalized(text),
                text.as_str(),
                reference_date,
            ));
        }

        debug!(
            items = items.len(),
            %reference_date,
            time_zone,
            "heuristic parse finished"
        );

        StructuredResult {
            items,
            used_heuristic_fallback: true,
        }
    }
}

fn structure(item: ExtractedItem, fragment: &str, reference_date: NaiveDate) -> ExtractedItem {
    let date = find_date(fragment, reference_date);
    let (start, end) = find_times(fragment);
    item.with_date(date)
        .with_times(start, end)
        .with_all_day(date.is_some() && start.is_none())
        .with_source_text(Some(fragment.to_string()))
}

/// First date cue in `text` that resolves against `reference_date`
pub(crate) fn find_date(text: &str, reference_date: NaiveDate) -> Option<NaiveDate> {
    DATE_CUE
        .captures_iter(text)
        .find_map(|caps| date_from_captures(&caps, reference_date))
}

fn date_from_captures(caps: &Captures<'_>, reference_date: NaiveDate) -> Option<NaiveDate> {
    if caps.name("after").is_some() {
        return reference_date.checked_add_days(Days::new(2));
    }
    if caps.name("today").is_some() {
        return Some(reference_date);
    }
    if caps.name("tomorrow").is_some() {
        return reference_date.checked_add_days(Days::new(1));
    }
    if let Some(name) = caps.name("weekday") {
        let weekday = parse_weekday(name.as_str())?;
        return resolve_weekday(reference_date, weekday, caps.name("next").is_some());
    }
    let month: u32 = caps.name("month")?.as_str().parse().ok()?;
    let day: u32 = caps.name("day")?.as_str().parse().ok()?;
    let year = match caps.name("year") {
        Some(y) => expand_year(y.as_str().parse().ok()?),
        None => reference_date.year(),
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    match name.to_ascii_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn resolve_weekday(reference_date: NaiveDate, target: Weekday, next: bool) -> Option<NaiveDate> {
    let today = u64::from(reference_date.weekday().num_days_from_monday());
    let wanted = u64::from(target.num_days_from_monday());
    let ahead = (wanted + 7 - today) % 7;
    let ahead = if next { ahead + 7 } else { ahead };
    reference_date.checked_add_days(Days::new(ahead))
}

/// Two-digit years are taken as 20YY
pub(crate) fn expand_year(year: i32) -> i32 {
    if year < 100 { 2000 + year } else { year }
}

/// First time cue in `text`, plus the end of a range if one follows it
pub(crate) fn find_times(text: &str) -> (Option<NaiveTime>, Option<NaiveTime>) {
    let single = TIME_CUE.captures_iter(text).find_map(|caps| {
        let start = time_from_captures(&caps)?;
        let cue = caps.get(0)?;
        Some((cue.start(), start, range_end(&text[cue.end()..])))
    });
    let bare = BARE_RANGE.captures_iter(text).find_map(|caps| {
        let (start, end) = bare_range(&caps)?;
        Some((caps.get(0)?.start(), start, Some(end)))
    });

    match [single, bare].into_iter().flatten().min_by_key(|(at, ..)| *at) {
        Some((_, start, end)) => (Some(start), end),
        None => (None, None),
    }
}

fn bare_range(caps: &Captures<'_>) -> Option<(NaiveTime, NaiveTime)> {
    let meridiem = caps.name("ap")?.as_str().chars().next();
    let end = clock_time(
        caps.name("eh")?.as_str().parse().ok()?,
        minutes(caps.name("em"))?,
        meridiem,
    )?;

    let hour = caps.name("h")?.as_str().parse().ok()?;
    let minute = minutes(caps.name("m"))?;
    let start = clock_time(hour, minute, meridiem)?;
    if start > end {
        return Some((clock_time(hour, minute, Some('a'))?, end));
    }
    Some((start, end))
}

fn minutes(group: Option<regex::Match<'_>>) -> Option<u32> {
    match group {
        Some(m) => m.as_str().parse().ok(),
        None => Some(0),
    }
}

fn range_end(rest: &str) -> Option<NaiveTime> {
    let joiner = RANGE_JOINER.find(rest)?;
    let tail = &rest[joiner.end()..];
    let caps = TIME_CUE.captures(tail)?;
    if caps.get(0)?.start() != 0 {
        return None;
    }
    time_from_captures(&caps)
}

fn time_from_captures(caps: &Captures<'_>) -> Option<NaiveTime> {
    if caps.name("noon").is_some() {
        return NaiveTime::from_hms_opt(12, 0, 0);
    }
    if caps.name("midnight").is_some() {
        return NaiveTime::from_hms_opt(0, 0, 0);
    }
    if let (Some(h), Some(m), Some(ap)) = (caps.name("h12"), caps.name("m12"), caps.name("ap1")) {
        return clock_time(
            h.as_str().parse().ok()?,
            m.as_str().parse().ok()?,
            ap.as_str().chars().next(),
        );
    }
    if let (Some(h), Some(ap)) = (caps.name("hour"), caps.name("ap2")) {
        return clock_time(h.as_str().parse().ok()?, 0, ap.as_str().chars().next());
    }
    let hour = caps.name("h24")?.as_str().parse().ok()?;
    let minute = caps.name("m24")?.as_str().parse().ok()?;
    clock_time(hour, minute, None)
}

/// Build a time from clock digits; `meridiem` is `a` or `p` for 12-hour input
pub(crate) fn clock_time(hour: u32, minute: u32, meridiem: Option<char>) -> Option<NaiveTime> {
    let hour = match meridiem.map(|c| c.to_ascii_lowercase()) {
        Some(m) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            let base = hour % 12;
            if m == 'p' { base + 12 } else { base }
        }
        None => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}
