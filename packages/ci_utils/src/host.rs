use anyhow::Result;

use lazytab_tracker::ResourceObserver;

use crate::status_monitor::HostStatus;

/// The slice of an IDE's window management a lazy-load scenario drives.
///
/// Implementations wrap the real automation harness; tests use
/// [`crate::MockDocumentHost`].
pub trait DocumentHost: ResourceObserver {
    /// Open `name` from project `group` and return the caption the host gave
    /// its window.
    fn open_document(&mut self, name: &str, group: &str) -> Result<String>;

    /// Show the window captioned `caption` and wait until it is fully loaded.
    fn activate(&mut self, caption: &str) -> Result<()>;

    fn close_solution(&mut self) -> Result<()>;

    /// Reopen the solution with on-demand loading, restoring its tabs lazily.
    fn reopen_solution(&mut self) -> Result<()>;

    /// Snapshot of the host's document windows, as written to status dumps.
    fn status(&self) -> HostStatus;
}
