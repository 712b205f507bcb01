use chrono::{TimeZone, Utc};
use stonewall_caldav::caldav::{
    escape_text, extract_hrefs_from_propfind, format_date_time, generate_ical_data,
    parse_date_time, parse_ical_data, parse_sync_collection_response, unescape_text,
};
use stonewall_caldav::{CalendarEvent, ChangeStatus};

#[test]
fn test_uid_only_event_round_trips_as_absence() {
    let parsed = parse_ical_data(&generate_ical_data(&CalendarEvent::new("bare")));

    assert_eq!(parsed.uid, "bare");
    assert_eq!(parsed.title.as_deref(), Some("Untitled Event"));
    assert_eq!(parsed.description, None);
    assert_eq!(parsed.location, None);
    assert_eq!(parsed.dtstart, None);
    assert_eq!(parsed.dtend, None);
    assert_eq!(parsed.organizer, None);
    assert!(parsed.categories.is_empty());
    assert_eq!(parsed.registration_url, None);
    assert_eq!(parsed.rrule, None);
    assert!(parsed.created_at.is_some());
    assert!(parsed.updated_at.is_some());
}

#[test]
fn test_full_event_round_trip() {
    let event = CalendarEvent {
        title: Some("Retro; sprint 12, part 2".into()),
        description: Some("Agenda:\n- wins\n- misses".into()),
        location: Some("Room 4, floor 2".into()),
        dtstart: Some("2025-07-15T14:30:00Z".into()),
        dtend: Some("2025-07-15T15:30:00Z".into()),
        created_at: Some("2025-07-01T08:00:00Z".into()),
        updated_at: Some("2025-07-02T08:00:00Z".into()),
        organizer: Some("mailto:lead@example.com".into()),
        categories: vec!["team".into(), "recurring".into()],
        registration_url: Some("https://example.com/rsvp?id=12".into()),
        rrule: Some("FREQ=WEEKLY;INTERVAL=2".into()),
        ..CalendarEvent::new("retro-12")
    };

    let parsed = parse_ical_data(&generate_ical_data(&event));
    assert_eq!(parsed, event);
}

#[test]
fn test_escape_round_trip_and_known_asymmetry() {
    for text in ["a;b,c", "back\\slash", "multi\nline", "", "plain"] {
        assert_eq!(unescape_text(escape_text(text)), text);
    }

    // A literal backslash followed by `n` comes back as backslash + newline.
    assert_eq!(unescape_text(escape_text("C:\\new")), "C:\\\new");
}

#[test]
fn test_date_helpers() {
    let instant = Utc.with_ymd_and_hms(2025, 7, 15, 14, 30, 0).unwrap();
    assert_eq!(parse_date_time(&format_date_time(&instant)), "2025-07-15T14:30:00Z");
    assert_eq!(parse_date_time("20250715"), "2025-07-15");
    assert_eq!(parse_date_time("20250715T143000Z"), "2025-07-15T14:30:00Z");
}

#[test]
fn test_propfind_hrefs_two_of_three() {
    let xml = r#"<?xml version="1.0"?>
<multistatus xmlns="DAV:">
  <response><href>/cal/one.ics</href></response>
  <response><href>/cal/</href></response>
  <response><href>/cal/two.ics</href></response>
</multistatus>"#;

    assert_eq!(
        extract_hrefs_from_propfind(xml),
        vec!["/cal/one.ics".to_string(), "/cal/two.ics".to_string()]
    );
}

#[test]
fn test_propfind_fallback_decodes_escaped_hrefs() {
    let xml = r#"<?xml version="1.0"?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/cal/a&amp;b.ics</D:href>
    <D:propstat><D:prop><D:displayname>x&nbsp;y</D:displayname></D:prop></D:propstat>
  </D:response>
  <D:response><D:href>/cal/c.ics</D:href></D:response>
</D:multistatus>"#;

    assert_eq!(
        extract_hrefs_from_propfind(xml),
        vec!["/cal/a&b.ics".to_string(), "/cal/c.ics".to_string()]
    );
}

#[test]
fn test_sync_parse_modified_and_deleted() {
    let xml = r#"<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/cal/a.ics</d:href>
    <d:propstat><d:prop><d:getetag>"1"</d:getetag></d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat>
  </d:response>
  <d:response>
    <d:href>/cal/b.ics</d:href>
    <d:propstat><d:prop><d:getetag/></d:prop><d:status>HTTP/1.1 404 Not Found</d:status></d:propstat>
  </d:response>
  <d:sync-token>token-9</d:sync-token>
</d:multistatus>"#;

    let result = parse_sync_collection_response(xml);
    assert!(result.success);
    assert_eq!(result.sync_token.as_deref(), Some("token-9"));
    assert_eq!(result.changes.len(), 2);
    assert_eq!(result.changes[0].status, ChangeStatus::Modified);
    assert_eq!(result.changes[1].status, ChangeStatus::Deleted);
}

#[test]
fn test_event_serializes_camel_case() {
    let mut event = CalendarEvent::new("json-1");
    event.registration_url = Some("https://example.com".into());
    event.caldav_etag = Some("\"e\"".into());

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["uid"], "json-1");
    assert_eq!(json["registrationUrl"], "https://example.com");
    assert_eq!(json["caldavEtag"], "\"e\"");
    assert!(json.get("title").is_none());
    assert!(json.get("categories").is_none());

    let back: CalendarEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
}
