use std::io::{BufRead, Cursor};

use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::Event;
use thiserror::Error;

use crate::webdav::types::{DavResponse, Multistatus, Propstat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementName {
    Multistatus,
    Response,
    Propstat,
    Prop,
    Href,
    Status,
    Getetag,
    CalendarData,
    SyncToken,
    Other,
}

pub(crate) fn element_from_bytes(raw: &[u8]) -> ElementName {
    let local = match raw.iter().position(|b| *b == b':') {
        Some(idx) => &raw[idx + 1..],
        None => raw,
    };

    if local.eq_ignore_ascii_case(b"multistatus") {
        ElementName::Multistatus
    } else if local.eq_ignore_ascii_case(b"response") {
        ElementName::Response
    } else if local.eq_ignore_ascii_case(b"propstat") {
        ElementName::Propstat
    } else if local.eq_ignore_ascii_case(b"prop") {
        ElementName::Prop
    } else if local.eq_ignore_ascii_case(b"href") {
        ElementName::Href
    } else if local.eq_ignore_ascii_case(b"status") {
        ElementName::Status
    } else if local.eq_ignore_ascii_case(b"getetag") {
        ElementName::Getetag
    } else if local.eq_ignore_ascii_case(b"calendar-data") {
        ElementName::CalendarData
    } else if local.eq_ignore_ascii_case(b"sync-token") {
        ElementName::SyncToken
    } else {
        ElementName::Other
    }
}

#[derive(Debug, Error)]
pub enum MultistatusError {
    #[error("document has no multistatus root")]
    MissingRoot,
    #[error("XML parsing error: {0}")]
    Malformed(String),
}

impl MultistatusError {
    fn malformed(err: impl std::fmt::Display) -> Self {
        Self::Malformed(err.to_string())
    }
}

struct MultistatusParser {
    stack: Vec<ElementName>,
    text: String,
    saw_root: bool,
    document: Multistatus,
    response: DavResponse,
    propstat: Propstat,
}

impl MultistatusParser {
    fn new() -> Self {
        Self {
            stack: Vec::with_capacity(16),
            text: String::new(),
            saw_root: false,
            document: Multistatus::default(),
            response: DavResponse::default(),
            propstat: Propstat::default(),
        }
    }

    fn path_ends_with(&self, needle: &[ElementName]) -> bool {
        self.stack.len() >= needle.len()
            && self.stack[self.stack.len() - needle.len()..] == needle[..]
    }

    fn on_start(&mut self, raw: &[u8]) -> Result<(), MultistatusError> {
        let element = element_from_bytes(raw);
        if self.stack.is_empty() {
            if element != ElementName::Multistatus || self.saw_root {
                return Err(MultistatusError::MissingRoot);
            }
            self.saw_root = true;
        }
        self.stack.push(element);
        self.text.clear();

        match element {
            ElementName::Response if self.path_ends_with(&[ElementName::Multistatus, ElementName::Response]) => {
                self.response = DavResponse::default();
            }
            ElementName::Propstat if self.path_ends_with(&[ElementName::Response, ElementName::Propstat]) => {
                self.propstat = Propstat::default();
            }
            _ => {}
        }
        Ok(())
    }

    fn on_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn on_end(&mut self) {
        let text = std::mem::take(&mut self.text);
        let trimmed = text.trim();
        let value = (!trimmed.is_empty()).then(|| trimmed.to_string());

        if self.path_ends_with(&[ElementName::Response, ElementName::Href]) {
            if let Some(href) = value {
                self.response.href = href;
            }
        } else if self.path_ends_with(&[ElementName::Response, ElementName::Status]) {
            self.response.status = value;
        } else if self.path_ends_with(&[ElementName::Propstat, ElementName::Status]) {
            self.propstat.status = value;
        } else if self.path_ends_with(&[
            ElementName::Propstat,
            ElementName::Prop,
            ElementName::Getetag,
        ]) {
            self.propstat.prop.getetag = value;
        } else if self.path_ends_with(&[
            ElementName::Propstat,
            ElementName::Prop,
            ElementName::CalendarData,
        ]) {
            self.propstat.prop.calendar_data = value;
        } else if self.path_ends_with(&[
            ElementName::Propstat,
            ElementName::Prop,
            ElementName::SyncToken,
        ]) {
            self.propstat.prop.sync_token = value;
        } else if self.stack == [ElementName::Multistatus, ElementName::SyncToken] {
            self.document.sync_token = value;
        } else if self.path_ends_with(&[ElementName::Response, ElementName::Propstat]) {
            let finished = std::mem::take(&mut self.propstat);
            self.response.propstats.push(finished);
        } else if self.stack == [ElementName::Multistatus, ElementName::Response] {
            let finished = std::mem::take(&mut self.response);
            self.document.responses.push(finished);
        }

        self.stack.pop();
    }

    fn finish(self) -> Result<Multistatus, MultistatusError> {
        if !self.saw_root {
            return Err(MultistatusError::MissingRoot);
        }
        if !self.stack.is_empty() {
            return Err(MultistatusError::Malformed(
                "unexpected end of document".to_string(),
            ));
        }
        Ok(self.document)
    }
}

fn parse_multistatus_with<R: BufRead>(reader: R) -> Result<Multistatus, MultistatusError> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(false);

    let mut buf = Vec::with_capacity(8 * 1024);
    let mut parser = MultistatusParser::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => parser.on_start(e.name().as_ref())?,
            Ok(Event::Empty(e)) => {
                parser.on_start(e.name().as_ref())?;
                parser.on_end();
            }
            Ok(Event::Text(e)) => parser.on_text(&decode_text(e.as_ref())?),
            Ok(Event::CData(e)) => parser.on_text(&String::from_utf8_lossy(e.as_ref())),
            Ok(Event::GeneralRef(e)) => {
                let name = e.decode().map_err(MultistatusError::malformed)?;
                if let Some(ch) = e.resolve_char_ref().map_err(MultistatusError::malformed)? {
                    parser.on_text(ch.encode_utf8(&mut [0u8; 4]));
                } else if let Some(resolved) = resolve_predefined_entity(&name) {
                    parser.on_text(resolved);
                } else {
                    return Err(MultistatusError::Malformed(format!(
                        "unknown entity &{name};"
                    )));
                }
            }
            Ok(Event::End(_)) => parser.on_end(),
            Ok(Event::Eof) => break,
            Err(e) => return Err(MultistatusError::malformed(e)),
            _ => {}
        }
        buf.clear();
    }

    parser.finish()
}

/// Parse an aggregated `207 Multi-Status` body into a [`Multistatus`] tree.
pub fn parse_multistatus(body: &[u8]) -> Result<Multistatus, MultistatusError> {
    parse_multistatus_with(Cursor::new(body))
}

pub fn decode_text(raw: &[u8]) -> Result<String, MultistatusError> {
    match std::str::from_utf8(raw) {
        Ok(s) => Ok(unescape(s).map_err(MultistatusError::malformed)?.into_owned()),
        Err(_) => Ok(String::from_utf8_lossy(raw).into_owned()),
    }
}
