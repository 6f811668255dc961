use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Attempts after the first failed delete before giving up
pub const CLEANUP_RETRIES: u32 = 3;
pub const CLEANUP_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Remove `path` recursively, retrying transient I/O failures.
///
/// Hosts and indexers often keep handles open for a moment after a solution
/// closes, so the first delete can fail. A path that does not exist counts
/// as removed.
pub fn remove_dir_with_retry(path: &Path, max_retries: u32, delay: Duration) -> Result<()> {
    retry_remove(path, max_retries, delay, |path| std::fs::remove_dir_all(path))
}

fn retry_remove<F>(path: &Path, max_retries: u32, delay: Duration, mut remove: F) -> Result<()>
where
    F: FnMut(&Path) -> io::Result<()>,
{
    let mut attempt = 0;
    loop {
        match remove(path) {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) if attempt < max_retries => {
                attempt += 1;
                log::warn!(
                    "⚠️ Failed to remove {} ({err}), retry {attempt}/{max_retries}",
                    path.display()
                );
                std::thread::sleep(delay);
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!(
                        "Failed to remove {} after {} retries",
                        path.display(),
                        max_retries
                    )
                })
            }
        }
    }
}

/// Scratch directory for one scenario run
///
/// Holds status dumps and scratch documents. Removed on drop, with retries,
/// unless [`TestWorkspace::keep`] was called.
#[derive(Debug)]
pub struct TestWorkspace {
    root: PathBuf,
    dir: Option<TempDir>,
}

impl TestWorkspace {
    /// Create a fresh directory under the system temp dir.
    pub fn create(label: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("lazytab_{label}_"))
            .tempdir()
            .with_context(|| format!("Failed to create workspace for '{label}'"))?;
        let root = dir.path().to_path_buf();
        log::debug!("📁 Created workspace {}", root.display());
        Ok(Self {
            root,
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Write a small text document into the workspace and return its path.
    pub fn write_scratch_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.file(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Leave the directory on disk and return its path.
    pub fn keep(mut self) -> PathBuf {
        match self.dir.take() {
            Some(dir) => dir.keep(),
            None => self.root.clone(),
        }
    }

    /// Remove the directory now, reporting failures instead of logging them.
    pub fn cleanup(mut self) -> Result<()> {
        self.remove()
    }

    fn remove(&mut self) -> Result<()> {
        match self.dir.take() {
            Some(dir) => remove_dir_with_retry(&dir.keep(), CLEANUP_RETRIES, CLEANUP_RETRY_DELAY),
            None => Ok(()),
        }
    }
}

impl Drop for TestWorkspace {
    fn drop(&mut self) {
        if let Err(err) = self.remove() {
            log::warn!("⚠️ {err:#}");
        }
    }
}
