//! Common test utilities for integration tests

use approute_core::{FileOp, RotationEvent};
use approute_store::FileStore;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

#[allow(dead_code)]
pub const WAIT: Duration = Duration::from_secs(2);

/// Write a fixture file under a canonicalized temp root.
#[allow(dead_code)]
pub fn fixture(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().canonicalize().unwrap().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Poll `get_content` until it matches `want` or the bounded wait elapses.
#[allow(dead_code)]
pub async fn wait_for_content(store: &FileStore, path: &Path, want: Option<&[u8]>) {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let got = store.get_content(path);
        if got.as_deref() == want {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!(
                "content for {} never became {:?}, last: {:?}",
                path.display(),
                want,
                got
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Receive events until one for `path` with `op` arrives, skipping the
/// duplicates the OS layer may produce.
#[allow(dead_code)]
pub async fn expect_event(rx: &mut mpsc::Receiver<RotationEvent>, path: &Path, op: FileOp) {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let remaining = deadline
            .checked_duration_since(tokio::time::Instant::now())
            .unwrap_or_default();
        let ev = timeout(remaining, rx.recv())
            .await
            .expect("timed out waiting for rotation event")
            .expect("rotation channel closed");
        if ev.path == path && ev.op == op {
            return;
        }
    }
}
