pub mod client;
pub mod config;
pub mod ical;
pub mod types;
pub mod xml;

pub use client::CalDavClient;
pub use config::CalDavConfig;
pub use ical::{
    escape_text, format_date_time, generate_ical_data, parse_date_time, parse_ical_data,
    unescape_text,
};
pub use types::{
    CalendarEvent, Change, ChangeStatus, CreatedEvent, Depth, EventFilters, SyncResult,
};
pub use xml::{
    build_calendar_query_xml, build_sync_collection_xml, extract_hrefs_from_propfind,
    parse_calendar_query_response, parse_sync_collection_response,
};
