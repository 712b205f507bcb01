use hyper::header::{self, HeaderValue};
use hyper::{Method, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::caldav::config::CalDavConfig;
use crate::caldav::ical::{format_date_time, generate_ical_data, parse_ical_data};
use crate::caldav::types::{CalendarEvent, CreatedEvent, Depth, EventFilters, SyncResult};
use crate::caldav::xml::{
    build_calendar_query_xml, build_list_propfind_xml, build_sync_collection_xml,
    build_sync_token_propfind_xml, extract_hrefs_from_propfind, parse_calendar_query_response,
    parse_sync_collection_response, parse_sync_token_response,
};
use crate::common::deadline::with_deadline;
use crate::common::transport::{
    HyperTransport, ICAL_CONTENT_TYPE, Transport, TransportRequest, TransportResponse,
};
use crate::error::{CalDavError, Result};

/// Client bound to one calendar collection.
///
/// Holds only its configuration and the transport, so a single instance can serve
/// concurrent callers. Writes use ETags for optimistic concurrency; nothing is
/// retried automatically.
///
/// ```no_run
/// use stonewall_caldav::{CalDavClient, CalDavConfig, CalendarEvent};
///
/// # async fn demo() -> stonewall_caldav::Result<()> {
/// let client = CalDavClient::new(CalDavConfig::new("https://dav.example.com", "/cal/"))?;
/// let mut event = CalendarEvent::new("standup-2025-07-15");
/// event.title = Some("Standup".into());
/// event.dtstart = Some("2025-07-15T09:00:00Z".into());
///
/// let created = client.create_event_with_etag(&event).await?;
/// event.title = Some("Standup (moved)".into());
/// client.update_event(&event, created.etag.as_deref()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CalDavClient<T = HyperTransport> {
    config: CalDavConfig,
    transport: T,
}

impl CalDavClient<HyperTransport> {
    /// Client over the default hyper transport.
    pub fn new(config: CalDavConfig) -> Result<Self> {
        let transport = HyperTransport::new().map_err(CalDavError::from_anyhow)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Client configured from the `CALDAV_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(CalDavConfig::from_env())
    }
}

impl<T: Transport> CalDavClient<T> {
    pub fn with_transport(config: CalDavConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &CalDavConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn send(
        &self,
        request: TransportRequest,
        cancel: CancellationToken,
    ) -> anyhow::Result<TransportResponse> {
        debug!(method = %request.method, url = %request.url, "caldav request");
        let response = self.transport.send(request, cancel).await?;
        debug!(status = response.status.as_u16(), "caldav response");
        Ok(response)
    }

    /// Send outside any deadline.
    async fn send_unbounded(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.send(request, CancellationToken::new())
            .await
            .map_err(CalDavError::from_anyhow)
    }

    fn resource_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{}{href}", self.config.base_url)
        }
    }

    fn ical_put(&self, event: &CalendarEvent) -> TransportRequest {
        let body = generate_ical_data(event);
        trace!(uid = %event.uid, body = %body, "generated calendar data");
        TransportRequest::new(Method::PUT, self.config.event_url(&event.uid))
            .body(body, ICAL_CONTENT_TYPE)
    }

    /// Store a new event; fails with [`CalDavError::AlreadyExists`] if the uid is taken.
    pub async fn create_event(&self, event: &CalendarEvent) -> Result<String> {
        self.create_event_with_etag(event)
            .await
            .map(|created| created.uid)
    }

    /// Like [`create_event`](Self::create_event), also returning the server's ETag.
    #[tracing::instrument(skip(self, event), fields(uid = %event.uid))]
    pub async fn create_event_with_etag(&self, event: &CalendarEvent) -> Result<CreatedEvent> {
        let request = self
            .ical_put(event)
            .header(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
        let response = self.send_unbounded(request).await?;

        match response.status {
            StatusCode::PRECONDITION_FAILED => Err(CalDavError::AlreadyExists {
                uid: event.uid.clone(),
            }),
            _ if response.is_success() => Ok(CreatedEvent {
                uid: event.uid.clone(),
                etag: response.etag(),
            }),
            _ => Err(request_failed("create", &response)),
        }
    }

    /// Overwrite an event. With `etag`, the write only succeeds if the server copy
    /// still carries it; otherwise [`CalDavError::Conflict`] reports both tokens.
    ///
    /// Returns the new ETag when the server sends one.
    #[tracing::instrument(skip(self, event), fields(uid = %event.uid))]
    pub async fn update_event(
        &self,
        event: &CalendarEvent,
        etag: Option<&str>,
    ) -> Result<Option<String>> {
        let mut request = self.ical_put(event);
        if let Some(etag) = etag {
            request = request.header(header::IF_MATCH, HeaderValue::from_str(etag)?);
        }
        let response = self.send_unbounded(request).await?;

        if response.status == StatusCode::PRECONDITION_FAILED {
            let remote_etag = response.etag();
            warn!(local = ?etag, remote = ?remote_etag, "update rejected, etag mismatch");
            return Err(CalDavError::Conflict {
                local_etag: etag.map(str::to_string),
                remote_etag,
            });
        }
        if !response.is_success() {
            return Err(request_failed("update", &response));
        }
        Ok(response.etag())
    }

    /// Remove an event. A missing event counts as removed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_event(&self, uid: &str) -> Result<()> {
        let request = TransportRequest::new(Method::DELETE, self.config.event_url(uid));
        let response = self.send_unbounded(request).await?;

        if response.is_success() || response.status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(request_failed("delete", &response))
    }

    /// Fetch one event, `None` when it does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_event(&self, uid: &str) -> Result<Option<CalendarEvent>> {
        self.fetch_event(self.config.event_url(uid), CancellationToken::new())
            .await
            .map_err(CalDavError::from_anyhow)
    }

    async fn fetch_event(
        &self,
        url: String,
        cancel: CancellationToken,
    ) -> anyhow::Result<Option<CalendarEvent>> {
        let response = self
            .send(TransportRequest::new(Method::GET, url.clone()), cancel)
            .await?;
        if response.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(request_failed("get", &response).into());
        }

        let mut event = parse_ical_data(&response.text());
        event.caldav_etag = response.etag();
        event.caldav_url = Some(url);
        Ok(Some(event))
    }

    /// Every event in the collection, fetched one by one.
    ///
    /// Members that fail to load are logged and left out. If the whole pass
    /// exceeds the list timeout the result is empty.
    #[tracing::instrument(skip(self))]
    pub async fn list_events(&self) -> Result<Vec<CalendarEvent>> {
        let outcome = with_deadline(self.config.list_timeout, |cancel| {
            self.list_events_inner(cancel)
        })
        .await;

        match outcome {
            Err(CalDavError::Timeout) => {
                warn!(timeout = ?self.config.list_timeout, "listing timed out");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn list_events_inner(
        &self,
        cancel: CancellationToken,
    ) -> anyhow::Result<Vec<CalendarEvent>> {
        let request = TransportRequest::new(
            Method::from_bytes(b"PROPFIND")?,
            self.config.collection_url(),
        )
        .depth(Depth::One)
        .xml(build_list_propfind_xml());
        let response = self.send(request, cancel.clone()).await?;
        if !response.is_success() {
            return Err(request_failed("list", &response).into());
        }

        let hrefs = extract_hrefs_from_propfind(&response.text());
        debug!(count = hrefs.len(), "collection members");

        let mut events = Vec::with_capacity(hrefs.len());
        for href in hrefs {
            match self.fetch_event(self.resource_url(&href), cancel.clone()).await {
                Ok(Some(event)) => events.push(event),
                Ok(None) => debug!(%href, "member vanished before fetch"),
                Err(err) => warn!(%href, error = %err, "skipping unreadable member"),
            }
        }
        Ok(events)
    }

    /// Events matching `filters`, via `calendar-query`.
    ///
    /// Servers without REPORT support (501/405) are served by
    /// [`list_events`](Self::list_events) instead. A timeout yields an empty result.
    #[tracing::instrument(skip(self))]
    pub async fn query_events(&self, filters: &EventFilters) -> Result<Vec<CalendarEvent>> {
        let outcome = with_deadline(self.config.query_timeout, |cancel| {
            self.query_events_inner(filters, cancel)
        })
        .await;

        match outcome {
            Ok(Some(events)) => Ok(events),
            Ok(None) => {
                warn!("calendar-query unsupported, falling back to listing");
                self.list_events().await
            }
            Err(CalDavError::Timeout) => {
                warn!(timeout = ?self.config.query_timeout, "query timed out");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    /// `None` when the server does not implement the REPORT.
    async fn query_events_inner(
        &self,
        filters: &EventFilters,
        cancel: CancellationToken,
    ) -> anyhow::Result<Option<Vec<CalendarEvent>>> {
        let request = TransportRequest::new(
            Method::from_bytes(b"REPORT")?,
            self.config.collection_url(),
        )
        .depth(Depth::One)
        .xml(build_calendar_query_xml(filters, format_date_time));
        let response = self.send(request, cancel).await?;

        match response.status {
            StatusCode::NOT_IMPLEMENTED | StatusCode::METHOD_NOT_ALLOWED => Ok(None),
            _ if response.is_success() => Ok(Some(parse_calendar_query_response(
                &response.text(),
                &self.config.base_url,
            ))),
            _ => Err(request_failed("calendar-query", &response).into()),
        }
    }

    /// Current collection sync token, `None` if the server will not say.
    #[tracing::instrument(skip(self))]
    pub async fn get_sync_token(&self) -> Result<Option<String>> {
        self.get_sync_token_inner()
            .await
            .map_err(CalDavError::from_anyhow)
    }

    async fn get_sync_token_inner(&self) -> anyhow::Result<Option<String>> {
        let request = TransportRequest::new(
            Method::from_bytes(b"PROPFIND")?,
            self.config.collection_url(),
        )
        .depth(Depth::Zero)
        .xml(build_sync_token_propfind_xml());
        let response = self.send(request, CancellationToken::new()).await?;

        if !response.is_success() {
            debug!(status = response.status.as_u16(), "no sync token");
            return Ok(None);
        }
        Ok(parse_sync_token_response(&response.text()))
    }

    /// Changes since `sync_token` (everything when `None`).
    ///
    /// Never fails: problems are reported through [`SyncResult::error`], and servers
    /// without sync support (501/405/403) through [`SyncResult::skipped`].
    #[tracing::instrument(skip(self))]
    pub async fn sync_collection(&self, sync_token: Option<&str>) -> SyncResult {
        let outcome = with_deadline(self.config.sync_timeout, |cancel| {
            self.sync_collection_inner(sync_token, cancel)
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(CalDavError::Timeout) => {
                warn!(timeout = ?self.config.sync_timeout, "sync timed out");
                SyncResult::failed("Sync timeout")
            }
            Err(err) => {
                warn!(error = %err, "sync failed");
                SyncResult::failed(err.to_string())
            }
        }
    }

    async fn sync_collection_inner(
        &self,
        sync_token: Option<&str>,
        cancel: CancellationToken,
    ) -> anyhow::Result<SyncResult> {
        let request = TransportRequest::new(
            Method::from_bytes(b"REPORT")?,
            self.config.collection_url(),
        )
        .depth(Depth::Zero)
        .xml(build_sync_collection_xml(sync_token));
        let response = self.send(request, cancel).await?;

        match response.status {
            StatusCode::NOT_IMPLEMENTED | StatusCode::METHOD_NOT_ALLOWED | StatusCode::FORBIDDEN => {
                warn!(status = response.status.as_u16(), "sync-collection unsupported");
                Ok(SyncResult::skipped())
            }
            _ if response.is_success() => {
                let result = parse_sync_collection_response(&response.text());
                debug!(changes = result.changes.len(), success = result.success, "sync parsed");
                Ok(result)
            }
            _ => Ok(SyncResult::failed(
                request_failed("sync-collection", &response).to_string(),
            )),
        }
    }

    /// ETag of an event via HEAD, `None` when the server does not answer 2xx.
    #[tracing::instrument(skip(self))]
    pub async fn get_etag(&self, uid: &str) -> Result<Option<String>> {
        let request = TransportRequest::new(Method::HEAD, self.config.event_url(uid));
        let response = self.send_unbounded(request).await?;

        if !response.is_success() {
            return Ok(None);
        }
        Ok(response.etag())
    }
}

fn request_failed(operation: &'static str, response: &TransportResponse) -> CalDavError {
    CalDavError::RequestFailed {
        operation,
        status: response.status.as_u16(),
        status_text: response.status_text().to_string(),
    }
}
