//! Rotation event types
//!
//! A rotation event signals that a tracked file's content changed on disk or
//! that the file disappeared. The name comes from the certificate/secret
//! rotation use case these events exist to serve.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to a tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOp {
    /// Content changed on disk; the store has refreshed its snapshot.
    Updated,
    /// The file was deleted or renamed away; the store no longer tracks it.
    Removed,
}

/// Notification of an externally observed change to a tracked file.
///
/// Events are immutable values produced by the store's dispatch task. The
/// rotation channel is not fan-out: each event is consumed by whichever
/// consumer reads it first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationEvent {
    /// Path of the tracked file the event refers to.
    pub path: PathBuf,
    /// The observed operation.
    pub op: FileOp,
}

impl RotationEvent {
    pub fn updated(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            op: FileOp::Updated,
        }
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            op: FileOp::Removed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_constructors() {
        let ev = RotationEvent::updated("/etc/certs/tls.crt");
        assert_eq!(ev.op, FileOp::Updated);
        assert_eq!(ev.path, PathBuf::from("/etc/certs/tls.crt"));

        let ev = RotationEvent::removed("/etc/certs/tls.key");
        assert_eq!(ev.op, FileOp::Removed);
    }

    #[test]
    fn test_op_serialization() {
        assert_eq!(serde_json::to_string(&FileOp::Updated).unwrap(), "\"updated\"");
        assert_eq!(serde_json::to_string(&FileOp::Removed).unwrap(), "\"removed\"");
    }
}
