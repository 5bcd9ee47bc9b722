//! Rotation handler trait
//!
//! The `RotationHandler` trait is the seam between the file store and the
//! components that react to rotation: TLS reloaders, secret refreshers, and
//! the metrics-recording decorator that wraps them.

use async_trait::async_trait;

use crate::{Result, RotationEvent};

/// A consumer of rotation events.
///
/// Implementations:
/// - `TlsReloader`: rebuilds an in-memory certificate bundle
/// - `RecordedHandler`: metrics-recording decorator over any handler
///
/// Handlers must tolerate duplicate events: the OS notification layer may
/// deliver several raw events for a single logical write.
#[async_trait]
pub trait RotationHandler: Send + Sync {
    /// React to one rotation event.
    ///
    /// Errors are reported by the caller (logged and counted); they never
    /// stop the event pump.
    async fn on_rotation(&self, event: &RotationEvent) -> Result<()>;
}

#[async_trait]
impl<T: RotationHandler + ?Sized> RotationHandler for std::sync::Arc<T> {
    async fn on_rotation(&self, event: &RotationEvent) -> Result<()> {
        (**self).on_rotation(event).await
    }
}
