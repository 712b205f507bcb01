use std::sync::LazyLock;

use quick_xml::escape::unescape;
use regex::Regex;

pub const DAV_NS: &str = "DAV:";
pub const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";

pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// `PROPFIND` body asking for the given `DAV:` properties (local names).
pub fn build_propfind_body(props: &[&str]) -> String {
    let mut body = format!(r#"<?xml version="1.0" encoding="utf-8"?><D:propfind xmlns:D="{DAV_NS}"><D:prop>"#);
    for prop in props {
        body.push_str("<D:");
        body.push_str(prop);
        body.push_str("/>");
    }
    body.push_str("</D:prop></D:propfind>");
    body
}

/// `sync-collection` REPORT body. No token means an initial sync (`<D:sync-token/>`).
pub fn build_sync_collection_body(sync_token: Option<&str>) -> String {
    let mut body = format!(r#"<?xml version="1.0" encoding="utf-8"?><D:sync-collection xmlns:D="{DAV_NS}">"#);
    if let Some(token) = sync_token {
        body.push_str("<D:sync-token>");
        body.push_str(&escape_xml(token));
        body.push_str("</D:sync-token>");
    } else {
        body.push_str("<D:sync-token/>");
    }
    body.push_str("<D:sync-level>1</D:sync-level>");
    body.push_str("<D:prop><D:getetag/></D:prop>");
    body.push_str("</D:sync-collection>");
    body
}

static MULTISTATUS_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:[A-Za-z_][\w.-]*:)?multistatus[\s>/]").expect("multistatus pattern is valid")
});

static HREF_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:[A-Za-z_][\w.-]*:)?href(?:\s[^>]*)?>\s*([^<]*?)\s*</(?:[A-Za-z_][\w.-]*:)?href\s*>")
        .expect("href pattern is valid")
});

/// Text-level href scan for bodies the structured parser rejected.
///
/// Returns `None` when the text does not even look like a multistatus document.
/// Predefined and character entities in each href are decoded; an href with an
/// entity that cannot be decoded is returned as written.
pub fn scan_hrefs(xml: &str) -> Option<Vec<String>> {
    if !MULTISTATUS_TAG.is_match(xml) {
        return None;
    }
    Some(
        HREF_ELEMENT
            .captures_iter(xml)
            .filter_map(|caps| caps.get(1))
            .map(|m| {
                let raw = m.as_str();
                unescape(raw).map_or_else(|_| raw.to_string(), |text| text.into_owned())
            })
            .collect(),
    )
}
