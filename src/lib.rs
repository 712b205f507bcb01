//! CalDAV client for a single calendar collection.
//!
//! The crate manages the events of one collection on a remote CalDAV server, built
//! on hyper 1.x, rustls and tokio.
//!
//! # Features
//!
//! - Event CRUD with ETag-based optimistic concurrency (`If-Match` / `If-None-Match`)
//! - Bulk listing (PROPFIND + per-member GET) and time-bounded `calendar-query`
//! - Incremental synchronization with RFC 6578 `sync-collection`
//! - Graceful degradation on servers without REPORT or sync support
//! - One deadline per bulk operation, propagated to in-flight requests
//! - Automatic response decompression (br/zstd/gzip)
//! - Pluggable [`Transport`] for tests or custom HTTP stacks
//!
//! # Examples
//!
//! ## Create, read back and update an event
//!
//! ```no_run
//! use stonewall_caldav::{CalDavClient, CalDavConfig, CalDavError, CalendarEvent};
//!
//! #[tokio::main]
//! async fn main() -> stonewall_caldav::Result<()> {
//!     let client = CalDavClient::new(CalDavConfig::new(
//!         "http://localhost:8000",
//!         "/user/calendars/calendar/",
//!     ))?;
//!
//!     let mut event = CalendarEvent::new("meetup-42");
//!     event.title = Some("Rust meetup".into());
//!     event.dtstart = Some("2025-09-12T18:30:00Z".into());
//!     event.dtend = Some("2025-09-12T21:00:00Z".into());
//!     event.categories = vec!["community".into()];
//!
//!     let created = client.create_event_with_etag(&event).await?;
//!
//!     event.location = Some("Main hall".into());
//!     match client.update_event(&event, created.etag.as_deref()).await {
//!         Ok(new_etag) => println!("updated, etag {new_etag:?}"),
//!         Err(CalDavError::Conflict { remote_etag, .. }) => {
//!             println!("someone else changed it (now {remote_etag:?})");
//!         }
//!         Err(err) => return Err(err),
//!     }
//!
//!     if let Some(stored) = client.get_event("meetup-42").await? {
//!         println!("{:?} at {:?}", stored.title, stored.location);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Query a time window
//!
//! ```no_run
//! use chrono::{TimeZone, Utc};
//! use stonewall_caldav::{CalDavClient, EventFilters};
//!
//! # async fn demo(client: CalDavClient) -> stonewall_caldav::Result<()> {
//! let filters = EventFilters::between(
//!     Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap(),
//! );
//! for event in client.query_events(&filters).await? {
//!     println!("{} {:?}", event.uid, event.dtstart);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Incremental sync
//!
//! Keep the token from the previous round; `None` asks for everything.
//!
//! ```no_run
//! use stonewall_caldav::{CalDavClient, ChangeStatus};
//!
//! # async fn demo(client: CalDavClient, saved: Option<String>) {
//! let result = client.sync_collection(saved.as_deref()).await;
//! if result.skipped {
//!     // Server has no sync-collection support; fall back to list_events().
//! } else if result.success {
//!     for change in &result.changes {
//!         match change.status {
//!             ChangeStatus::Deleted => println!("gone: {}", change.href),
//!             _ => println!("changed: {} {:?}", change.href, change.etag),
//!         }
//!     }
//!     // persist result.sync_token for the next round
//! } else {
//!     eprintln!("sync failed: {:?}", result.error);
//! }
//! # }
//! ```
//!
//! # Configuration
//!
//! [`CalDavClient::from_env`] reads `CALDAV_BASE_URL`, `CALDAV_CALENDAR_PATH`,
//! `CALDAV_LIST_TIMEOUT_MS`, `CALDAV_QUERY_TIMEOUT_MS` and `CALDAV_SYNC_TIMEOUT_MS`,
//! falling back to [`CalDavConfig::default`] for anything unset.
//!
//! # Logging
//!
//! The crate emits `tracing` events and spans; install a subscriber to see them.
pub mod caldav;
pub mod common;
pub mod error;
pub mod webdav;

pub use caldav::{
    CalDavClient, CalDavConfig, CalendarEvent, Change, ChangeStatus, CreatedEvent, EventFilters,
    SyncResult,
};
pub use common::transport::{
    HyperTransport, HyperTransportOptions, Transport, TransportRequest, TransportResponse,
};
pub use error::{CalDavError, Result};
pub use webdav::Depth;
