use stonewall_caldav::ChangeStatus;

use crate::util::{create_test_client, test_event, unique_uid};

#[tokio::test]
#[ignore = "needs a running CalDAV server"]
async fn test_incremental_sync_sees_create_and_delete() {
    let client = create_test_client();

    let initial = client.sync_collection(None).await;
    if initial.skipped {
        println!("server does not support sync-collection, skipping");
        return;
    }
    assert!(initial.success, "{:?}", initial.error);
    let token = initial.sync_token.expect("initial sync should return a token");

    let uid = unique_uid("sync");
    client.create_event(&test_event(&uid)).await.unwrap();

    let after_create = client.sync_collection(Some(&token)).await;
    assert!(after_create.success, "{:?}", after_create.error);
    let href_suffix = format!("{uid}.ics");
    assert!(
        after_create
            .changes
            .iter()
            .any(|c| c.href.ends_with(&href_suffix) && c.status == ChangeStatus::Modified)
    );

    client.delete_event(&uid).await.unwrap();
    let token = after_create.sync_token.expect("token after create");
    let after_delete = client.sync_collection(Some(&token)).await;
    assert!(after_delete.success, "{:?}", after_delete.error);
    assert!(
        after_delete
            .changes
            .iter()
            .any(|c| c.href.ends_with(&href_suffix) && c.status == ChangeStatus::Deleted)
    );
}

#[tokio::test]
#[ignore = "needs a running CalDAV server"]
async fn test_sync_token_probe() {
    let client = create_test_client();
    if let Some(token) = client.get_sync_token().await.expect("PROPFIND failed") {
        assert!(!token.is_empty());
    }
}
