//! Lazy-load scenario execution
//!
//! Drives a [`DocumentHost`] through open, close and lazy reopen while a
//! [`LazyLoadStateTracker`] predicts which windows must have materialized,
//! verifying the prediction after every step.

use anyhow::{Context, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;
use std::path::PathBuf;

use lazytab_ci_utils::{write_status, DocumentHost};
use lazytab_tracker::{LazyLoadStateTracker, TrackedResource, VerificationResult};

use super::workflow::Workflow;

/// Knobs that do not belong in the workflow file
#[derive(Debug, Clone, Default)]
pub struct ScenarioOptions {
    /// Shuffle both focus passes with this seed
    pub shuffle_seed: Option<u64>,
    /// Rewrite this status dump after every phase
    pub status_dump: Option<PathBuf>,
}

/// Verification outcome of one phase
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: String,
    pub result: VerificationResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle_seed: Option<u64>,
    pub phases: Vec<PhaseReport>,
    /// Tracker contents after the last phase
    pub tracked: Vec<TrackedResource>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.phases.iter().all(|phase| phase.result.passed())
    }

    pub fn failure_count(&self) -> usize {
        self.phases.iter().map(|phase| phase.result.failures.len()).sum()
    }
}

struct ScenarioRun<'a, H: ?Sized> {
    host: &'a mut H,
    tracker: LazyLoadStateTracker,
    workflow: &'a Workflow,
    options: &'a ScenarioOptions,
    phases: Vec<PhaseReport>,
}

impl<H: DocumentHost + ?Sized> ScenarioRun<'_, H> {
    fn focus(&mut self, caption: &str) -> Result<()> {
        self.host
            .activate(caption)
            .with_context(|| format!("Failed to activate '{caption}'"))?;
        let flipped = self.tracker.mark_focused(caption);
        log::debug!("🎯 Focused '{caption}', {flipped} view(s) now expected loaded");
        Ok(())
    }

    fn reopen(&mut self) -> Result<()> {
        self.host.close_solution().context("Failed to close solution")?;
        self.host.reopen_solution().context("Failed to reopen solution")?;
        Ok(())
    }

    fn verify(&mut self, phase: String) -> Result<()> {
        log::info!("🔍 Verifying: {phase}");
        let result = self
            .tracker
            .verify_against(&mut *self.host, self.workflow.wait)
            .with_context(|| format!("Verification aborted during '{phase}'"))?;

        for mismatch in &result.failures {
            log::error!("❌ [{phase}] {mismatch}");
        }
        if let Some(path) = &self.options.status_dump {
            write_status(path, &self.host.status())
                .with_context(|| format!("Failed to write status dump after '{phase}'"))?;
        }

        self.phases.push(PhaseReport { phase, result });
        Ok(())
    }

    /// Focus every tracked window in `order`, verifying after each.
    ///
    /// Positions are resolved to captions one at a time because a
    /// verification may re-caption later entries.
    fn focus_pass(&mut self, label: &str, order: &[usize]) -> Result<()> {
        for &pos in order {
            let Some(caption) = self
                .tracker
                .resources()
                .get(pos)
                .map(|res| res.identity.clone())
            else {
                continue;
            };
            self.focus(&caption)?;
            self.verify(format!("{label}: {caption}"))?;
        }
        Ok(())
    }
}

/// Run the lazy-load scenario of `workflow` against `host`.
///
/// Mismatches are collected in the report and never abort the run. A window
/// that cannot be found at all aborts with the phase in the error context.
pub fn run_lazy_load_scenario<H>(
    host: &mut H,
    workflow: &Workflow,
    options: &ScenarioOptions,
) -> Result<ScenarioReport>
where
    H: DocumentHost + ?Sized,
{
    let active_index = workflow.active_index()?;
    let mut run = ScenarioRun {
        host,
        tracker: LazyLoadStateTracker::new(),
        workflow,
        options,
        phases: Vec::new(),
    };

    log::info!("📂 Opening {} document(s)", workflow.documents.len());
    let mut active = String::new();
    for (index, doc) in workflow.documents.iter().enumerate() {
        let caption = run
            .host
            .open_document(&doc.caption, &doc.group)
            .with_context(|| format!("Failed to open '{}'", doc.caption))?;
        if index == active_index {
            active = caption.clone();
        }
        run.tracker.register(caption, doc.group.as_str());
    }

    run.focus(&active)?;
    run.reopen()?;
    run.verify("initial load".to_string())?;
    // The reopen may have re-captioned the active window.
    active = run.tracker.resources()[active_index].identity.clone();

    let mut order: Vec<usize> = (0..run.tracker.len()).collect();
    if let Some(seed) = options.shuffle_seed {
        log::info!("🎲 Shuffling focus order with seed {seed}");
        order.shuffle(&mut StdRng::seed_from_u64(seed));
    }

    run.focus_pass("forward", &order)?;

    run.tracker.reset_all_to_stub();
    run.focus(&active)?;
    run.reopen()?;
    run.verify("second load".to_string())?;

    order.reverse();
    run.focus_pass("backward", &order)?;

    run.host
        .close_solution()
        .context("Failed to close solution")?;

    let report = ScenarioReport {
        id: workflow.manifest.id.clone(),
        shuffle_seed: options.shuffle_seed,
        phases: run.phases,
        tracked: run.tracker.resources().to_vec(),
    };
    if report.passed() {
        log::info!("✅ Scenario '{}' passed {} phase(s)", report.id, report.phases.len());
    } else {
        log::error!(
            "❌ Scenario '{}' finished with {} mismatch(es)",
            report.id,
            report.failure_count()
        );
    }
    Ok(report)
}
