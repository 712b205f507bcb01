pub mod streaming;
pub mod types;
pub mod xml;

pub use streaming::{MultistatusError, parse_multistatus};
pub use types::{DavProp, DavResponse, Depth, Multistatus, Propstat};
pub use xml::{build_propfind_body, build_sync_collection_body, escape_xml, scan_hrefs};
