//! TLS certificate bundle reloading
//!
//! `TlsReloader` is the rotation consumer: it registers certificate/key
//! paths with the file store, keeps an in-memory bundle per certificate, and
//! rebuilds bundles as rotation events arrive. The store remains the source
//! of truth; a bundle exists exactly when both of its files are tracked.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use approute_core::{Error, Result, RotationEvent, RotationHandler};
use approute_observability::health::CertificateStatus;
use approute_observability::{Metrics, ReadinessChecker};
use approute_store::FileStore;

/// A certificate/key file pair registered for rotation.
#[derive(Debug, Clone)]
pub struct CertificateFiles {
    pub name: String,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// An in-memory copy of one certificate and its private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    pub name: String,
    pub cert: Vec<u8>,
    pub key: Vec<u8>,
}

/// Rotation consumer that mirrors tracked certificate pairs into complete
/// TLS bundles.
pub struct TlsReloader {
    store: Arc<FileStore>,
    certs: Vec<CertificateFiles>,
    bundles: RwLock<HashMap<String, CertificateBundle>>,
}

impl TlsReloader {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self {
            store,
            certs: Vec::new(),
            bundles: RwLock::new(HashMap::new()),
        }
    }

    /// Register a certificate pair: both files are added to the store and
    /// the initial bundle is built from their current content.
    ///
    /// Both paths are validated before either is added. The store has no
    /// remove API, so a half-registered pair could never be retried; a
    /// failed registration must leave nothing tracked.
    pub fn register(&mut self, cert: CertificateFiles) -> Result<()> {
        if self.certs.iter().any(|c| c.name == cert.name) {
            return Err(Error::Config(format!(
                "certificate '{}' is already registered",
                cert.name
            )));
        }
        for path in [&cert.cert_file, &cert.key_file] {
            self.probe(path)?;
        }
        self.store.add_file(&cert.cert_file)?;
        self.store.add_file(&cert.key_file)?;
        info!(name = %cert.name, "watching certificate pair");

        self.certs.push(cert.clone());
        self.rebuild(&cert);
        Ok(())
    }

    /// Check that `path` would be accepted by `add_file`, without touching
    /// store state.
    fn probe(&self, path: &Path) -> Result<()> {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(path.to_path_buf()));
            }
            Err(e) => {
                return Err(Error::Stat {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };
        if !metadata.is_file() {
            return Err(Error::NotAFile(path.to_path_buf()));
        }
        if self.store.get_content(path).is_some() {
            return Err(Error::AlreadyTracked(path.to_path_buf()));
        }
        Ok(())
    }

    /// Current bundle for `name`, if both files are loaded.
    pub fn bundle(&self, name: &str) -> Option<CertificateBundle> {
        self.bundles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn owner_of(&self, path: &Path) -> Option<&CertificateFiles> {
        self.certs
            .iter()
            .find(|c| c.cert_file == path || c.key_file == path)
    }

    /// Rebuild one bundle from the store's current snapshots. If either
    /// file is no longer tracked the bundle is dropped until both return.
    fn rebuild(&self, entry: &CertificateFiles) {
        let cert = self.store.get_content(&entry.cert_file);
        let key = self.store.get_content(&entry.key_file);

        let mut bundles = self.bundles.write().unwrap_or_else(PoisonError::into_inner);
        match (cert, key) {
            (Some(cert), Some(key)) => {
                info!(name = %entry.name, "certificate bundle loaded");
                bundles.insert(
                    entry.name.clone(),
                    CertificateBundle {
                        name: entry.name.clone(),
                        cert,
                        key,
                    },
                );
            }
            _ => {
                warn!(name = %entry.name, "certificate bundle incomplete, dropping");
                bundles.remove(&entry.name);
            }
        }
    }
}

#[async_trait]
impl RotationHandler for TlsReloader {
    async fn on_rotation(&self, event: &RotationEvent) -> Result<()> {
        let Some(entry) = self.owner_of(&event.path) else {
            return Ok(());
        };
        self.rebuild(entry);
        Ok(())
    }
}

impl ReadinessChecker for TlsReloader {
    fn is_ready(&self) -> bool {
        let bundles = self.bundles.read().unwrap_or_else(PoisonError::into_inner);
        self.certs.iter().all(|c| bundles.contains_key(&c.name))
    }

    fn certificate_statuses(&self) -> Vec<CertificateStatus> {
        let bundles = self.bundles.read().unwrap_or_else(PoisonError::into_inner);
        self.certs
            .iter()
            .map(|c| CertificateStatus {
                name: c.name.clone(),
                loaded: bundles.contains_key(&c.name),
            })
            .collect()
    }
}

/// Drain the store's rotation and error channels until cancellation.
///
/// Rotation events go through the handler (failures are logged and counted,
/// never fatal); store errors are logged and counted. The tracked-file gauge
/// is refreshed after each event.
pub async fn run_event_pump(
    store: Arc<FileStore>,
    handler: Arc<dyn RotationHandler>,
    metrics: Arc<Metrics>,
    token: CancellationToken,
) -> Result<()> {
    let mut events = take_receiver(store.rotation_events(), "rotation")?;
    let mut errors = take_receiver(store.errors(), "error")?;

    metrics.tracked_files.set(store.tracked_files() as f64);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            ev = events.recv() => match ev {
                Some(ev) => {
                    if let Err(e) = handler.on_rotation(&ev).await {
                        warn!(path = %ev.path.display(), "rotation handler failed: {e}");
                    }
                    metrics.tracked_files.set(store.tracked_files() as f64);
                }
                None => break,
            },
            err = errors.recv() => match err {
                Some(e) => {
                    metrics.rotation_errors_total.inc();
                    warn!("file store error: {e}");
                }
                None => break,
            },
        }
    }

    info!("event pump stopped");
    Ok(())
}

fn take_receiver<T>(rx: Option<mpsc::Receiver<T>>, which: &str) -> Result<mpsc::Receiver<T>> {
    rx.ok_or_else(|| Error::Internal(format!("{which} receiver already taken")))
}
