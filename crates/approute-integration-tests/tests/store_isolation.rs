//! Independence of separately constructed stores

mod common;

use approute_core::FileOp;
use approute_store::FileStore;
use common::{expect_event, fixture, wait_for_content};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_two_stores_do_not_interfere() {
    let dir = tempfile::tempdir().unwrap();
    let shared = fixture(&dir, "shared.txt", b"v1");
    let only_a = fixture(&dir, "only_a.txt", b"a1");

    let token_a = CancellationToken::new();
    let store_a = FileStore::new(token_a.clone()).unwrap();
    let store_b = FileStore::new(CancellationToken::new()).unwrap();
    let mut events_a = store_a.rotation_events().unwrap();
    let mut events_b = store_b.rotation_events().unwrap();

    store_a.add_file(&shared).unwrap();
    store_a.add_file(&only_a).unwrap();
    store_b.add_file(&shared).unwrap();

    assert_eq!(store_a.tracked_files(), 2);
    assert_eq!(store_b.tracked_files(), 1);
    assert!(store_b.get_content(&only_a).is_none());

    // Both stores watch the overlapping path independently.
    std::fs::write(&shared, b"v2").unwrap();
    expect_event(&mut events_a, &shared, FileOp::Updated).await;
    expect_event(&mut events_b, &shared, FileOp::Updated).await;
    wait_for_content(&store_a, &shared, Some(b"v2")).await;
    wait_for_content(&store_b, &shared, Some(b"v2")).await;

    // Shutting one store down leaves the other serving.
    token_a.cancel();
    std::fs::write(&shared, b"v3").unwrap();
    expect_event(&mut events_b, &shared, FileOp::Updated).await;
    wait_for_content(&store_b, &shared, Some(b"v3")).await;
}
