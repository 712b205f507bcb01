/// `Depth` header value. Only the resource itself or its direct members are ever asked for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
}

impl Depth {
    pub fn as_str(self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
        }
    }
}

/// A parsed `207 Multi-Status` document.
///
/// Namespace prefixes are already stripped and every `response`/`propstat` is kept
/// in a `Vec`, whatever its cardinality in the source document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multistatus {
    /// Top-level `sync-token` (RFC 6578).
    pub sync_token: Option<String>,
    pub responses: Vec<DavResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DavResponse {
    pub href: String,
    /// Response-level `status`, used by sync-collection for removed members.
    pub status: Option<String>,
    pub propstats: Vec<Propstat>,
}

impl DavResponse {
    /// Whether the href names an iCalendar resource.
    pub fn is_calendar_object(&self) -> bool {
        self.href.ends_with(".ics")
    }

    pub fn ok_propstats(&self) -> impl Iterator<Item = &Propstat> {
        self.propstats.iter().filter(|p| p.is_ok())
    }

    /// True when the response status or any propstat status mentions `code`.
    pub fn any_status_contains(&self, code: &str) -> bool {
        self.status.as_deref().is_some_and(|s| s.contains(code))
            || self
                .propstats
                .iter()
                .any(|p| p.status.as_deref().is_some_and(|s| s.contains(code)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Propstat {
    pub status: Option<String>,
    pub prop: DavProp,
}

impl Propstat {
    pub fn is_ok(&self) -> bool {
        self.status.as_deref().is_some_and(|s| s.contains("200"))
    }
}

/// Properties this client asks for. Repeated `prop` elements merge into one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DavProp {
    pub getetag: Option<String>,
    pub calendar_data: Option<String>,
    pub sync_token: Option<String>,
}
