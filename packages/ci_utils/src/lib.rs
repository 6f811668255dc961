//! Test harness helpers for lazy-load scenarios (hidden from docs)
#![doc(hidden)]

pub mod helpers;
pub mod host;
pub mod mock_host;
pub mod status_monitor;
pub mod workspace;

pub use helpers::sleep_ms;
pub use host::DocumentHost;
pub use mock_host::{MockDocumentHost, MockDocumentSpec};
pub use status_monitor::{
    read_status, wait_for_document, wait_for_status_file, write_status, DocumentWindowStatus,
    HostStatus, StatusFileObserver,
};
pub use workspace::{remove_dir_with_retry, TestWorkspace, CLEANUP_RETRIES, CLEANUP_RETRY_DELAY};
