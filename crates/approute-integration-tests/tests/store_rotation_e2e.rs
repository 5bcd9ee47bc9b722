//! End-to-end rotation scenario against a real filesystem

mod common;

use approute_core::{Error, FileOp};
use approute_store::FileStore;
use common::{WAIT, expect_event, fixture, wait_for_content};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_certificate_rotation_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "a.txt", b"v1");

    let token = CancellationToken::new();
    let store = FileStore::new(token.clone()).unwrap();
    let mut events = store.rotation_events().unwrap();
    let mut errors = store.errors().unwrap();

    // Initial add: content visible, no event emitted.
    store.add_file(&path).unwrap();
    assert_eq!(store.get_content(&path).as_deref(), Some(b"v1".as_slice()));
    assert!(
        timeout(std::time::Duration::from_millis(200), events.recv())
            .await
            .is_err()
    );

    // Overwrite: Updated event and fresh content.
    std::fs::write(&path, b"v2").unwrap();
    expect_event(&mut events, &path, FileOp::Updated).await;
    wait_for_content(&store, &path, Some(b"v2")).await;

    // Delete: Removed event, entry gone, removal explained on the error channel.
    std::fs::remove_file(&path).unwrap();
    expect_event(&mut events, &path, FileOp::Removed).await;
    wait_for_content(&store, &path, None).await;
    let err = timeout(WAIT, errors.recv())
        .await
        .expect("timed out waiting for removal error")
        .expect("error channel closed");
    assert!(matches!(err, Error::FileRemoved(p) if p == path));

    // Shutdown closes both channels.
    token.cancel();
    assert!(timeout(WAIT, events.recv()).await.unwrap().is_none());
    assert!(timeout(WAIT, errors.recv()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_returned_content_is_a_defensive_copy() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "a.txt", b"v1");

    let store = FileStore::new(CancellationToken::new()).unwrap();
    store.add_file(&path).unwrap();

    let mut copy = store.get_content(&path).unwrap();
    copy.fill(b'X');

    // Mutating the returned buffer must not corrupt store state.
    assert_eq!(store.get_content(&path).as_deref(), Some(b"v1".as_slice()));
}
