//! Workflow data structures
//!
//! Defines the structure of TOML workflow files.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use lazytab_ci_utils::MockDocumentSpec;
use lazytab_tracker::WaitOptions;

/// Complete workflow definition from a TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct Workflow {
    pub manifest: Manifest,

    /// Verification polling bounds
    #[serde(default)]
    pub wait: WaitOptions,

    /// Documents opened before the solution is first closed, in order
    pub documents: Vec<MockDocumentSpec>,
}

/// Workflow manifest
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub id: String,
    #[serde(default)]
    pub description: String,

    /// Caption of the document left active before each reopen.
    /// Defaults to the last document.
    #[serde(default)]
    pub active: Option<String>,
}

impl Workflow {
    pub fn parse(content: &str) -> Result<Self> {
        let workflow: Workflow =
            toml::from_str(content).context("Failed to parse workflow TOML")?;
        workflow.validate()?;
        Ok(workflow)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid workflow {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.manifest.id.trim().is_empty() {
            bail!("Workflow manifest has an empty id");
        }
        if self.documents.is_empty() {
            bail!("Workflow '{}' lists no documents", self.manifest.id);
        }

        let mut seen = HashSet::new();
        for doc in &self.documents {
            if doc.caption.trim().is_empty() {
                bail!("Workflow '{}' has a document with an empty caption", self.manifest.id);
            }
            if !seen.insert(doc.caption.as_str()) {
                bail!(
                    "Workflow '{}' lists document '{}' twice",
                    self.manifest.id,
                    doc.caption
                );
            }
        }

        self.active_index().map(|_| ())
    }

    /// Position in `documents` of the document activated before each reopen.
    pub fn active_index(&self) -> Result<usize> {
        match &self.manifest.active {
            Some(active) => self
                .documents
                .iter()
                .position(|doc| &doc.caption == active)
                .ok_or_else(|| {
                    anyhow!(
                        "Workflow '{}' marks '{}' active but does not list it",
                        self.manifest.id,
                        active
                    )
                }),
            None => self
                .documents
                .len()
                .checked_sub(1)
                .ok_or_else(|| anyhow!("Workflow '{}' lists no documents", self.manifest.id)),
        }
    }
}

/// Load every `*.toml` workflow directly under `dir`, keyed by manifest id.
pub fn load_all_workflows(dir: &Path) -> Result<BTreeMap<String, Workflow>> {
    let mut workflows = BTreeMap::new();

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read workflow directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }

        let workflow = Workflow::load(&path)?;
        let id = workflow.manifest.id.clone();
        if workflows.insert(id.clone(), workflow).is_some() {
            bail!("Duplicate workflow id '{}' in {}", id, dir.display());
        }
    }

    log::debug!("📋 Loaded {} workflow(s) from {}", workflows.len(), dir.display());
    Ok(workflows)
}
