//! In-memory document host for offline scenario runs
//!
//! Models just enough of the IDE's lazy tab restore to exercise a
//! [`lazytab_tracker::LazyLoadStateTracker`]:
//! - opened windows are loaded
//! - activating a window loads it and starts materializing every other view
//!   of the same file, which finishes after `load_delay_polls` observations
//! - reopening the solution restores all windows as stubs, except the views
//!   of the last activated file, and applies any `reopen_caption`

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use lazytab_tracker::{canonicalize, ObservedLoadState, ResourceObserver};

use crate::host::DocumentHost;
use crate::status_monitor::{write_status, DocumentWindowStatus, HostStatus};

/// Behavior of one simulated document window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockDocumentSpec {
    pub caption: String,
    #[serde(default)]
    pub group: String,
    /// Observations that still report a stub after materializing starts
    #[serde(default)]
    pub load_delay_polls: u32,
    /// Caption the window gets when the solution is reopened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reopen_caption: Option<String>,
    /// Restore this window loaded instead of as a stub
    #[serde(default)]
    pub load_on_restore: bool,
}

impl MockDocumentSpec {
    pub fn new(caption: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            group: group.into(),
            load_delay_polls: 0,
            reopen_caption: None,
            load_on_restore: false,
        }
    }

    pub fn with_load_delay(mut self, polls: u32) -> Self {
        self.load_delay_polls = polls;
        self
    }

    pub fn with_reopen_caption(mut self, caption: impl Into<String>) -> Self {
        self.reopen_caption = Some(caption.into());
        self
    }

    pub fn loaded_on_restore(mut self) -> Self {
        self.load_on_restore = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockLoadState {
    Stub,
    Materializing { remaining: u32 },
    Loaded,
}

#[derive(Debug, Clone)]
struct MockDocument {
    spec: MockDocumentSpec,
    caption: String,
    open: bool,
    state: MockLoadState,
}

impl MockDocument {
    fn new(spec: MockDocumentSpec) -> Self {
        Self {
            caption: spec.caption.clone(),
            spec,
            open: false,
            state: MockLoadState::Stub,
        }
    }

    fn start_materializing(&mut self) {
        if self.state == MockLoadState::Stub {
            self.state = MockLoadState::Materializing {
                remaining: self.spec.load_delay_polls,
            };
        }
    }

    /// Observe once, advancing materialization by one step.
    fn tick(&mut self) -> ObservedLoadState {
        match self.state {
            MockLoadState::Stub => ObservedLoadState::Stub,
            MockLoadState::Loaded => ObservedLoadState::Loaded,
            MockLoadState::Materializing { remaining: 0 } => {
                self.state = MockLoadState::Loaded;
                ObservedLoadState::Loaded
            }
            MockLoadState::Materializing { remaining } => {
                self.state = MockLoadState::Materializing {
                    remaining: remaining - 1,
                };
                ObservedLoadState::Stub
            }
        }
    }
}

/// Simulated IDE window manager
#[derive(Debug, Clone, Default)]
pub struct MockDocumentHost {
    documents: Vec<MockDocument>,
    solution_open: bool,
    last_active: Option<String>,
}

impl MockDocumentHost {
    /// Host that knows how `specs` behave once opened. Nothing is open yet.
    pub fn new(specs: impl IntoIterator<Item = MockDocumentSpec>) -> Self {
        Self {
            documents: specs.into_iter().map(MockDocument::new).collect(),
            solution_open: false,
            last_active: None,
        }
    }

    pub fn is_solution_open(&self) -> bool {
        self.solution_open
    }

    /// Write the current window list as a status dump.
    pub fn dump_status(&self, path: &Path) -> Result<()> {
        write_status(path, &self.status())
    }

    fn open_window_mut(&mut self, caption: &str) -> Option<&mut MockDocument> {
        self.documents
            .iter_mut()
            .find(|doc| doc.open && doc.caption == caption)
    }
}

impl ResourceObserver for MockDocumentHost {
    fn observe(&mut self, identity: &str) -> ObservedLoadState {
        if !self.solution_open {
            return ObservedLoadState::NotFound;
        }
        match self.open_window_mut(identity) {
            Some(doc) => doc.tick(),
            None => ObservedLoadState::NotFound,
        }
    }

    fn observable_names(&mut self) -> Vec<String> {
        if !self.solution_open {
            return Vec::new();
        }
        self.documents
            .iter()
            .filter(|doc| doc.open)
            .map(|doc| doc.caption.clone())
            .collect()
    }
}

impl DocumentHost for MockDocumentHost {
    fn open_document(&mut self, name: &str, group: &str) -> Result<String> {
        self.solution_open = true;

        let index = match self
            .documents
            .iter()
            .position(|doc| doc.spec.caption == name)
        {
            Some(index) => index,
            None => {
                self.documents
                    .push(MockDocument::new(MockDocumentSpec::new(name, group)));
                self.documents.len() - 1
            }
        };

        let doc = &mut self.documents[index];
        doc.open = true;
        doc.state = MockLoadState::Loaded;
        log::debug!("📂 Opened '{}'", doc.caption);
        Ok(doc.caption.clone())
    }

    fn activate(&mut self, caption: &str) -> Result<()> {
        if !self.solution_open {
            bail!("Cannot activate '{}': no solution is open", caption);
        }
        let Some(doc) = self.open_window_mut(caption) else {
            bail!("Document window '{}' not found", caption);
        };
        doc.state = MockLoadState::Loaded;

        let canonical = canonicalize(caption).to_string();
        for doc in self
            .documents
            .iter_mut()
            .filter(|doc| doc.open && canonicalize(&doc.caption) == canonical)
        {
            doc.start_materializing();
        }

        log::debug!("🎯 Activated '{}'", caption);
        self.last_active = Some(canonical);
        Ok(())
    }

    fn close_solution(&mut self) -> Result<()> {
        if !self.solution_open {
            log::warn!("⚠️ Close requested but no solution is open");
        }
        self.solution_open = false;
        Ok(())
    }

    fn reopen_solution(&mut self) -> Result<()> {
        self.solution_open = true;

        for doc in self.documents.iter_mut().filter(|doc| doc.open) {
            if let Some(caption) = &doc.spec.reopen_caption {
                doc.caption = caption.clone();
            }

            doc.state = if doc.spec.load_on_restore {
                MockLoadState::Loaded
            } else {
                MockLoadState::Stub
            };
            if self.last_active.as_deref() == Some(canonicalize(&doc.caption)) {
                doc.start_materializing();
            }
        }

        log::debug!(
            "🔄 Reopened solution, {} window(s) restored",
            self.documents.iter().filter(|doc| doc.open).count()
        );
        Ok(())
    }

    fn status(&self) -> HostStatus {
        let documents = if self.solution_open {
            self.documents
                .iter()
                .filter(|doc| doc.open)
                .map(|doc| DocumentWindowStatus {
                    caption: doc.caption.clone(),
                    group: doc.spec.group.clone(),
                    stub: doc.state != MockLoadState::Loaded,
                })
                .collect()
        } else {
            Vec::new()
        };
        HostStatus::new(self.solution_open, documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> MockDocumentHost {
        MockDocumentHost::new([
            MockDocumentSpec::new("Form1.cs", "CSharp_Winform"),
            MockDocumentSpec::new("Form1.cs [Design]", "CSharp_Winform").with_load_delay(2),
            MockDocumentSpec::new("Program.cs", "CSharp_Console"),
        ])
    }

    fn open_all(host: &mut MockDocumentHost) -> Result<()> {
        for caption in ["Form1.cs", "Form1.cs [Design]", "Program.cs"] {
            host.open_document(caption, "")?;
        }
        Ok(())
    }

    #[test]
    fn test_opened_documents_are_loaded() -> Result<()> {
        let mut host = host();
        open_all(&mut host)?;
        assert_eq!(host.observe("Program.cs"), ObservedLoadState::Loaded);
        assert_eq!(host.observable_names().len(), 3);
        Ok(())
    }

    #[test]
    fn test_reopen_restores_stubs_except_last_active() -> Result<()> {
        let mut host = host();
        open_all(&mut host)?;
        host.activate("Program.cs")?;
        host.close_solution()?;
        assert_eq!(host.observe("Program.cs"), ObservedLoadState::NotFound);

        host.reopen_solution()?;
        assert_eq!(host.observe("Form1.cs"), ObservedLoadState::Stub);
        assert_eq!(host.observe("Form1.cs [Design]"), ObservedLoadState::Stub);
        assert_eq!(host.observe("Program.cs"), ObservedLoadState::Loaded);
        Ok(())
    }

    #[test]
    fn test_activation_materializes_sibling_views_after_delay() -> Result<()> {
        let mut host = host();
        open_all(&mut host)?;
        host.close_solution()?;
        host.reopen_solution()?;

        host.activate("Form1.cs")?;
        assert_eq!(host.observe("Form1.cs"), ObservedLoadState::Loaded);
        assert_eq!(host.observe("Form1.cs [Design]"), ObservedLoadState::Stub);
        assert_eq!(host.observe("Form1.cs [Design]"), ObservedLoadState::Stub);
        assert_eq!(host.observe("Form1.cs [Design]"), ObservedLoadState::Loaded);
        assert_eq!(host.observe("Program.cs"), ObservedLoadState::Stub);
        Ok(())
    }

    #[test]
    fn test_reopen_caption_renames_window() -> Result<()> {
        let mut host = MockDocumentHost::new([MockDocumentSpec::new(
            "Form1.cs!1 [Design]",
            "CSharp_Winform",
        )
        .with_reopen_caption("Form1.cs!2 [Design]")]);
        let caption = host.open_document("Form1.cs!1 [Design]", "CSharp_Winform")?;
        assert_eq!(caption, "Form1.cs!1 [Design]");

        host.close_solution()?;
        host.reopen_solution()?;
        assert_eq!(host.observe(&caption), ObservedLoadState::NotFound);
        assert_eq!(host.observable_names(), vec!["Form1.cs!2 [Design]".to_string()]);
        Ok(())
    }

    #[test]
    fn test_activate_unknown_caption_fails() -> Result<()> {
        let mut host = host();
        open_all(&mut host)?;
        assert!(host.activate("Missing.cs").is_err());
        Ok(())
    }

    #[test]
    fn test_status_reports_materializing_as_stub() -> Result<()> {
        let mut host = host();
        open_all(&mut host)?;
        host.close_solution()?;
        assert!(host.status().documents.is_empty());

        host.reopen_solution()?;
        host.activate("Form1.cs")?;
        let status = host.status();
        assert!(status.solution_open);
        assert_eq!(status.load_state("Form1.cs"), ObservedLoadState::Loaded);
        assert_eq!(status.load_state("Form1.cs [Design]"), ObservedLoadState::Stub);
        Ok(())
    }
}
