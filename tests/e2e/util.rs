use std::sync::atomic::{AtomicU64, Ordering};

use stonewall_caldav::{CalDavClient, CalendarEvent};

static UNIQUE_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn unique_uid(prefix: &str) -> String {
    let counter = UNIQUE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}-{}-{}",
        prefix,
        chrono::Utc::now().timestamp_micros(),
        counter
    )
}

pub fn create_test_client() -> CalDavClient {
    CalDavClient::from_env().expect("Failed to create CalDAV client")
}

pub fn test_event(uid: &str) -> CalendarEvent {
    CalendarEvent {
        title: Some("E2E event".into()),
        description: Some("Created by stonewall-caldav tests".into()),
        dtstart: Some("2030-01-15T10:00:00Z".into()),
        dtend: Some("2030-01-15T11:00:00Z".into()),
        categories: vec!["e2e".into()],
        ..CalendarEvent::new(uid)
    }
}
