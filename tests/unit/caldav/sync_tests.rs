use std::time::Duration;

use stonewall_caldav::{Change, ChangeStatus};

use super::support::{Reply, body, client, header};

const SYNC_RESPONSE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/cal/changed.ics</D:href>
    <D:propstat>
      <D:prop><D:getetag>"c2"</D:getetag></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/cal/removed.ics</D:href>
    <D:status>HTTP/1.1 404 Not Found</D:status>
  </D:response>
  <D:sync-token>http://dav.test/sync/43</D:sync-token>
</D:multistatus>"#;

#[tokio::test]
async fn initial_sync_sends_empty_token() {
    let (client, transport) = client([Reply::status(207, SYNC_RESPONSE)]);

    let result = client.sync_collection(None).await;
    assert!(result.success);
    assert!(!result.skipped);
    assert_eq!(result.sync_token.as_deref(), Some("http://dav.test/sync/43"));
    assert_eq!(
        result.changes,
        vec![
            Change {
                href: "/cal/changed.ics".into(),
                etag: Some("\"c2\"".into()),
                status: ChangeStatus::Modified,
            },
            Change {
                href: "/cal/removed.ics".into(),
                etag: None,
                status: ChangeStatus::Deleted,
            },
        ]
    );

    let request = transport.request(0);
    assert_eq!(request.method.as_str(), "REPORT");
    assert_eq!(request.url, "http://dav.test/cal/");
    assert_eq!(header(&request, "depth"), Some("0"));
    let xml = body(&request);
    assert!(xml.contains("<D:sync-token/>"));
    assert!(xml.contains("<D:sync-level>1</D:sync-level>"));
}

#[tokio::test]
async fn incremental_sync_sends_previous_token() {
    let (client, transport) = client([Reply::status(207, SYNC_RESPONSE)]);

    client.sync_collection(Some("http://dav.test/sync/42")).await;
    assert!(
        body(&transport.request(0))
            .contains("<D:sync-token>http://dav.test/sync/42</D:sync-token>")
    );
}

#[tokio::test]
async fn unsupported_sync_is_skipped() {
    for status in [501, 405, 403] {
        let (client, _) = client([Reply::status(status, "")]);
        let result = client.sync_collection(None).await;
        assert!(!result.success, "status {status}");
        assert!(result.skipped, "status {status}");
        assert!(result.error.is_none());
    }
}

#[tokio::test]
async fn other_status_reports_error() {
    let (client, _) = client([Reply::status(500, "")]);

    let result = client.sync_collection(Some("stale")).await;
    assert!(!result.success);
    assert!(!result.skipped);
    assert_eq!(
        result.error.as_deref(),
        Some("sync-collection failed: 500 Internal Server Error")
    );
}

#[tokio::test(start_paused = true)]
async fn deadline_expiry_reports_sync_timeout() {
    let (client, _) = client([Reply::status(207, SYNC_RESPONSE).after(Duration::from_secs(60))]);

    let result = client.sync_collection(None).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Sync timeout"));
}

#[tokio::test]
async fn transport_cancellation_reports_sync_timeout() {
    let (client, _) = client([Reply::timeout()]);

    let result = client.sync_collection(None).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Sync timeout"));
}

#[tokio::test]
async fn transport_failure_is_reported_not_raised() {
    let (client, _) = client([Reply::fail("dns lookup failed")]);

    let result = client.sync_collection(None).await;
    assert!(!result.success);
    assert!(!result.skipped);
    assert_eq!(result.error.as_deref(), Some("dns lookup failed"));
}

#[tokio::test]
async fn non_multistatus_body_is_invalid() {
    let (client, _) = client([Reply::status(
        200,
        r#"<D:error xmlns:D="DAV:"><D:valid-sync-token/></D:error>"#,
    )]);

    let result = client.sync_collection(Some("expired")).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Invalid sync response"));
}
