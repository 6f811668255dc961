//! Utilities for reading the document status dump written by a host
//!
//! A host running under test writes a JSON snapshot of its document windows
//! after every change. Tests read it back to learn which tabs are stubs
//! without scraping the UI.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use lazytab_tracker::{ObservedLoadState, ResourceObserver};

use crate::helpers::sleep_ms;

/// One document window as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentWindowStatus {
    pub caption: String,
    #[serde(default)]
    pub group: String,
    pub stub: bool,
}

/// Status dump structure for a host process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStatus {
    pub timestamp: String,
    pub solution_open: bool,
    pub documents: Vec<DocumentWindowStatus>,
}

impl HostStatus {
    pub fn new(solution_open: bool, documents: Vec<DocumentWindowStatus>) -> Self {
        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            solution_open,
            documents,
        }
    }

    pub fn document(&self, caption: &str) -> Option<&DocumentWindowStatus> {
        self.documents.iter().find(|doc| doc.caption == caption)
    }

    pub fn load_state(&self, caption: &str) -> ObservedLoadState {
        match self.document(caption) {
            Some(doc) if doc.stub => ObservedLoadState::Stub,
            Some(_) => ObservedLoadState::Loaded,
            None => ObservedLoadState::NotFound,
        }
    }
}

/// Read and parse a host status dump
pub fn read_status(path: &Path) -> Result<HostStatus> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| anyhow!("Failed to read host status file {}: {}", path.display(), err))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse host status JSON in {}", path.display()))
}

/// Write a host status dump, replacing any previous one
///
/// The dump is written to a sibling temp file first and renamed into place
/// so readers never see a half-written document.
pub fn write_status(path: &Path, status: &HostStatus) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_string_pretty(status)?)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move status dump into {}", path.display()))?;
    log::debug!("💾 Wrote host status to {}", path.display());
    Ok(())
}

/// Observer backed by a status dump file, re-read on every call
///
/// An unreadable or malformed file reads as "no documents", which makes every
/// lookup `NotFound`.
#[derive(Debug, Clone)]
pub struct StatusFileObserver {
    path: PathBuf,
}

impl StatusFileObserver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn snapshot(&self) -> Option<HostStatus> {
        match read_status(&self.path) {
            Ok(status) => Some(status),
            Err(err) => {
                log::warn!("⚠️ {err:#}");
                None
            }
        }
    }
}

impl ResourceObserver for StatusFileObserver {
    fn observe(&mut self, identity: &str) -> ObservedLoadState {
        self.snapshot()
            .map(|status| status.load_state(identity))
            .unwrap_or(ObservedLoadState::NotFound)
    }

    fn observable_names(&mut self) -> Vec<String> {
        self.snapshot()
            .map(|status| status.documents.into_iter().map(|doc| doc.caption).collect())
            .unwrap_or_default()
    }
}

/// Wait for the host to write a readable status dump
///
/// # Arguments
/// * `path` - Status dump location
/// * `timeout_secs` - Total timeout in seconds
/// * `retry_interval_ms` - Interval between retries in milliseconds (default: 500ms)
pub async fn wait_for_status_file(
    path: &Path,
    timeout_secs: u64,
    retry_interval_ms: Option<u64>,
) -> Result<HostStatus> {
    let start = Instant::now();
    let timeout = Duration::from_secs(timeout_secs);
    let interval = retry_interval_ms.unwrap_or(500);

    loop {
        match read_status(path) {
            Ok(status) => {
                log::info!("✅ Host status available at {}", path.display());
                return Ok(status);
            }
            Err(err) => log::debug!("Host status not ready yet: {err:#}"),
        }

        if start.elapsed() > timeout {
            return Err(anyhow!(
                "Timeout waiting for host status file {} (waited {}s)",
                path.display(),
                timeout_secs
            ));
        }

        sleep_ms(interval).await;
    }
}

/// Wait for a document window to reach `expected` in the status dump
///
/// # Arguments
/// * `path` - Status dump location
/// * `caption` - Window caption to look for
/// * `expected` - Load state to wait for (`NotFound` waits for the window to close)
/// * `timeout_secs` - Total timeout in seconds
/// * `retry_interval_ms` - Interval between retries in milliseconds (default: 500ms)
pub async fn wait_for_document(
    path: &Path,
    caption: &str,
    expected: ObservedLoadState,
    timeout_secs: u64,
    retry_interval_ms: Option<u64>,
) -> Result<HostStatus> {
    let start = Instant::now();
    let timeout = Duration::from_secs(timeout_secs);
    let interval = retry_interval_ms.unwrap_or(500);

    loop {
        if let Ok(status) = read_status(path) {
            let state = status.load_state(caption);
            if state == expected {
                log::info!("✅ Document '{}' is {}", caption, expected);
                return Ok(status);
            }
            log::debug!(
                "Document '{}' currently {}, waiting for {}",
                caption,
                state,
                expected
            );
        }

        if start.elapsed() > timeout {
            return Err(anyhow!(
                "Timeout waiting for document '{}' to be {} (waited {}s)",
                caption,
                expected,
                timeout_secs
            ));
        }

        sleep_ms(interval).await;
    }
}
