//! iCalendar (RFC 5545) codec for a single `VEVENT`.
//!
//! Generation emits a fixed property order so the server always receives the same
//! shape. Parsing is lenient: it reads the first `VEVENT`, ignores properties it
//! does not know and never fails.
//!
//! [`escape_text`] and [`unescape_text`] are not exact inverses. Unescaping applies
//! `\n` before `\\`, so an escaped backslash followed by a literal `n` (`\\n` on the
//! wire) comes back as a backslash and a newline. ORGANIZER is escaped on output but
//! read back verbatim, and URL is written and read verbatim.

use std::ops::Range;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use icalendar::parser::{Component, read_calendar, unfold};
use tracing::{debug, warn};

use crate::caldav::types::CalendarEvent;

pub const PRODID: &str = "-//Stonewall//CalDAV Client//EN";
pub const DEFAULT_SUMMARY: &str = "Untitled Event";

/// Components the line scan reads in place.
const EVENT_SCOPES: &[&str] = &["VCALENDAR", "VEVENT"];

/// Escape TEXT values: `\` then `;` then `,` then newline.
pub fn escape_text(value: impl AsRef<str>) -> String {
    value
        .as_ref()
        .replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

/// Reverse of [`escape_text`], applied as `\n`, `\,`, `\;`, `\\`.
pub fn unescape_text(value: impl AsRef<str>) -> String {
    value
        .as_ref()
        .replace("\\n", "\n")
        .replace("\\,", ",")
        .replace("\\;", ";")
        .replace("\\\\", "\\")
}

/// `YYYYMMDDTHHMMSSZ`, UTC, whole seconds.
pub fn format_date_time(instant: &DateTime<Utc>) -> String {
    instant.format("%Y%m%dT%H%M%SZ").to_string()
}

/// `20250715` → `2025-07-15`; `20250715T143000Z` → `2025-07-15T14:30:00Z`.
pub fn parse_date_time(text: &str) -> String {
    let part = |range: Range<usize>| text.get(range).unwrap_or("");
    if text.len() == 8 {
        format!("{}-{}-{}", part(0..4), part(4..6), part(6..8))
    } else {
        format!(
            "{}-{}-{}T{}:{}:{}Z",
            part(0..4),
            part(4..6),
            part(6..8),
            part(9..11),
            part(11..13),
            part(13..15)
        )
    }
}

/// Read an instant as stored on [`CalendarEvent`]: RFC 3339, a bare date (midnight
/// UTC), or the iCalendar basic forms.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%SZ") {
        return Some(dt.and_utc());
    }
    ["%Y-%m-%d", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn instant_line(name: &str, value: &str) -> Option<String> {
    match parse_instant(value) {
        Some(instant) => Some(format!("{name}:{}", format_date_time(&instant))),
        None => {
            warn!(property = name, value, "dropping unparseable date");
            None
        }
    }
}

/// Serialize `event` as a VCALENDAR document, stamped with the current time.
pub fn generate_ical_data(event: &CalendarEvent) -> String {
    generate_ical_data_at(event, Utc::now())
}

/// Same as [`generate_ical_data`] with an explicit "now".
pub fn generate_ical_data_at(event: &CalendarEvent, now: DateTime<Utc>) -> String {
    let stamp = format_date_time(&now);
    let stamp_or = |value: &Option<String>| {
        present(value)
            .and_then(parse_instant)
            .map(|instant| format_date_time(&instant))
            .unwrap_or_else(|| stamp.clone())
    };

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}", event.uid),
        format!("DTSTAMP:{stamp}"),
        format!("CREATED:{}", stamp_or(&event.created_at)),
        format!("LAST-MODIFIED:{}", stamp_or(&event.updated_at)),
        format!(
            "SUMMARY:{}",
            escape_text(present(&event.title).unwrap_or(DEFAULT_SUMMARY))
        ),
    ];

    if let Some(description) = present(&event.description) {
        lines.push(format!("DESCRIPTION:{}", escape_text(description)));
    }
    if let Some(location) = present(&event.location) {
        lines.push(format!("LOCATION:{}", escape_text(location)));
    }
    if let Some(line) = present(&event.dtstart).and_then(|v| instant_line("DTSTART", v)) {
        lines.push(line);
    }
    if let Some(line) = present(&event.dtend).and_then(|v| instant_line("DTEND", v)) {
        lines.push(line);
    }
    if let Some(organizer) = present(&event.organizer) {
        lines.push(format!("ORGANIZER:{}", escape_text(organizer)));
    }
    if !event.categories.is_empty() {
        let joined = event
            .categories
            .iter()
            .map(|category| escape_text(category))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(format!("CATEGORIES:{joined}"));
    }
    if let Some(url) = present(&event.registration_url) {
        lines.push(format!("URL:{url}"));
    }
    if let Some(rrule) = present(&event.rrule) {
        lines.push(format!("RRULE:{rrule}"));
    }

    lines.extend(
        ["STATUS:CONFIRMED", "TRANSP:OPAQUE", "END:VEVENT", "END:VCALENDAR"]
            .into_iter()
            .map(String::from),
    );
    lines.join("\r\n")
}

/// Parse the first VEVENT of `text` into a [`CalendarEvent`].
///
/// Property parameters (`DTSTART;VALUE=DATE:…`) are ignored. Input the
/// iCalendar reader rejects, or where it finds no VEVENT, is scanned line by
/// line instead, so this never fails.
pub fn parse_ical_data(text: &str) -> CalendarEvent {
    let unfolded = unfold(text);
    let mut event = CalendarEvent::default();

    let calendar = read_calendar(&unfolded)
        .inspect_err(|err| debug!(error = %err, "unreadable iCalendar, scanning lines"))
        .ok();
    match calendar.as_ref().and_then(|calendar| first_event(&calendar.components)) {
        Some(vevent) => {
            for property in &vevent.properties {
                let name = property.name.as_ref().to_ascii_uppercase();
                apply_property(&mut event, &name, property.val.as_ref());
            }
        }
        None => scan_lines(&mut event, &unfolded),
    }

    event
}

fn first_event<'a, 'c>(components: &'c [Component<'a>]) -> Option<&'c Component<'a>> {
    components.iter().find_map(|component| {
        if component.name == "VEVENT" {
            Some(component)
        } else if component.name == "VCALENDAR" {
            first_event(&component.components)
        } else {
            None
        }
    })
}

/// Line scan over already-unfolded text. The value is everything after the
/// first colon; any BEGIN other than VCALENDAR/VEVENT skips up to its END.
fn scan_lines(event: &mut CalendarEvent, unfolded: &str) {
    let mut nested_depth = 0usize;

    for raw in unfolded.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase();

        match name.as_str() {
            "BEGIN" => {
                let component = value.trim().to_ascii_uppercase();
                if nested_depth > 0 || !EVENT_SCOPES.contains(&component.as_str()) {
                    nested_depth += 1;
                }
            }
            "END" => {
                if nested_depth > 0 {
                    nested_depth -= 1;
                } else if value.trim().eq_ignore_ascii_case("VEVENT") {
                    break;
                }
            }
            _ if nested_depth > 0 => {}
            _ => apply_property(event, &name, value),
        }
    }
}

fn apply_property(event: &mut CalendarEvent, name: &str, value: &str) {
    match name {
        "UID" => event.uid = value.to_string(),
        "SUMMARY" => event.title = Some(unescape_text(value)),
        "DESCRIPTION" => event.description = Some(unescape_text(value)),
        "LOCATION" => event.location = Some(unescape_text(value)),
        "DTSTART" => event.dtstart = Some(parse_date_time(value)),
        "DTEND" => event.dtend = Some(parse_date_time(value)),
        "CREATED" => event.created_at = Some(parse_date_time(value)),
        "LAST-MODIFIED" => event.updated_at = Some(parse_date_time(value)),
        "ORGANIZER" => event.organizer = Some(value.to_string()),
        "CATEGORIES" => event
            .categories
            .extend(value.split(',').map(|part| unescape_text(part.trim()))),
        "URL" => {
            if event.registration_url.is_none() {
                event.registration_url = Some(value.to_string());
            }
        }
        "RRULE" => event.rrule = Some(value.to_string()),
        _ => {}
    }
}
