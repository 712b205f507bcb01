//! CalDAV request bodies and response readers.
//!
//! Parsing is total at this boundary: malformed server XML degrades to an empty
//! result (or a failed [`SyncResult`]) and is logged, never returned as an error.

use chrono::{DateTime, Utc};
use tracing::{trace, warn};

use crate::caldav::ical::parse_ical_data;
use crate::caldav::types::{CalendarEvent, Change, ChangeStatus, EventFilters, SyncResult};
use crate::webdav::streaming::{MultistatusError, parse_multistatus};
use crate::webdav::xml::{
    CALDAV_NS, DAV_NS, build_propfind_body, build_sync_collection_body, escape_xml, scan_hrefs,
};

/// Lower bound used when a query only sets `to`.
pub const TIME_RANGE_FLOOR: &str = "19700101T000000Z";
/// Upper bound used when a query only sets `from`.
pub const TIME_RANGE_CEILING: &str = "20991231T235959Z";

/// Depth-1 PROPFIND body used to enumerate collection members.
pub fn build_list_propfind_xml() -> String {
    build_propfind_body(&["getetag", "resourcetype"])
}

/// Depth-0 PROPFIND body asking for the collection's `sync-token`.
pub fn build_sync_token_propfind_xml() -> String {
    build_propfind_body(&["sync-token"])
}

/// `calendar-query` REPORT body over VEVENTs, optionally bounded by a time range.
pub fn build_calendar_query_xml<F>(filters: &EventFilters, formatter: F) -> String
where
    F: Fn(&DateTime<Utc>) -> String,
{
    let mut filter = String::from(
        "<C:filter>\
           <C:comp-filter name=\"VCALENDAR\">\
             <C:comp-filter name=\"VEVENT\">",
    );
    if !filters.is_unbounded() {
        let start = filters
            .from
            .as_ref()
            .map(&formatter)
            .unwrap_or_else(|| TIME_RANGE_FLOOR.to_string());
        let end = filters
            .to
            .as_ref()
            .map(&formatter)
            .unwrap_or_else(|| TIME_RANGE_CEILING.to_string());
        filter.push_str(&format!(
            "<C:time-range start=\"{}\" end=\"{}\"/>",
            escape_xml(&start),
            escape_xml(&end)
        ));
    }
    filter.push_str("</C:comp-filter></C:comp-filter></C:filter>");

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><C:calendar-query xmlns:D="{DAV_NS}" xmlns:C="{CALDAV_NS}"><D:prop><D:getetag/><C:calendar-data/></D:prop>{filter}</C:calendar-query>"#
    )
}

pub fn build_sync_collection_xml(sync_token: Option<&str>) -> String {
    build_sync_collection_body(sync_token)
}

/// Hrefs of `.ics` members in document order.
///
/// Falls back to a text scan when the body is not well-formed, and yields nothing
/// when neither approach finds a multistatus root.
pub fn extract_hrefs_from_propfind(xml: &str) -> Vec<String> {
    match parse_multistatus(xml.as_bytes()) {
        Ok(doc) => doc
            .responses
            .into_iter()
            .filter(|r| r.is_calendar_object())
            .map(|r| r.href)
            .collect(),
        Err(err) => {
            warn!(error = %err, "PROPFIND body rejected by parser, scanning for hrefs");
            scan_hrefs(xml)
                .unwrap_or_default()
                .into_iter()
                .filter(|href| href.ends_with(".ics"))
                .collect()
        }
    }
}

/// Events carried inline by a `calendar-query` answer.
///
/// `base_url` is prefixed to each href to form `caldav_url`. Responses without a
/// 200 propstat carrying `calendar-data` are skipped.
pub fn parse_calendar_query_response(xml: &str, base_url: &str) -> Vec<CalendarEvent> {
    let doc = match parse_multistatus(xml.as_bytes()) {
        Ok(doc) => doc,
        Err(err) => {
            warn!(error = %err, "discarding unparseable calendar-query response");
            return Vec::new();
        }
    };

    let mut events = Vec::with_capacity(doc.responses.len());
    for response in &doc.responses {
        let Some(propstat) = response
            .ok_propstats()
            .find(|p| p.prop.calendar_data.is_some())
        else {
            trace!(href = %response.href, "response carries no calendar data");
            continue;
        };
        let Some(data) = propstat.prop.calendar_data.as_deref() else {
            continue;
        };

        let mut event = parse_ical_data(data);
        event.caldav_etag = response
            .ok_propstats()
            .find_map(|p| p.prop.getetag.clone());
        event.caldav_url = Some(format!("{base_url}{}", response.href));
        events.push(event);
    }
    events
}

/// Changes reported by a `sync-collection` answer.
///
/// Removed members (any 404 status) become [`ChangeStatus::Deleted`]; everything
/// else is [`ChangeStatus::Modified`] since the protocol does not flag creations.
pub fn parse_sync_collection_response(xml: &str) -> SyncResult {
    let doc = match parse_multistatus(xml.as_bytes()) {
        Ok(doc) => doc,
        Err(MultistatusError::MissingRoot) => {
            return SyncResult::failed("Invalid sync response");
        }
        Err(err) => {
            warn!(error = %err, "unparseable sync-collection response");
            return SyncResult::failed(format!("Failed to parse sync response: {err}"));
        }
    };

    let changes = doc
        .responses
        .iter()
        .filter(|r| r.is_calendar_object())
        .map(|r| {
            let status = if r.any_status_contains("404") {
                ChangeStatus::Deleted
            } else {
                ChangeStatus::Modified
            };
            Change {
                href: r.href.clone(),
                etag: r.ok_propstats().find_map(|p| p.prop.getetag.clone()),
                status,
            }
        })
        .collect();

    SyncResult::synced(doc.sync_token, changes)
}

/// `sync-token` from a depth-0 PROPFIND, property-level first, then top-level.
pub fn parse_sync_token_response(xml: &str) -> Option<String> {
    let doc = match parse_multistatus(xml.as_bytes()) {
        Ok(doc) => doc,
        Err(err) => {
            warn!(error = %err, "unparseable sync-token response");
            return None;
        }
    };
    doc.responses
        .iter()
        .flat_map(|r| r.ok_propstats())
        .find_map(|p| p.prop.sync_token.clone())
        .or(doc.sync_token)
}
