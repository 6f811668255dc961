//! lazytab — lazy document-load verification for IDE automation suites
//!
//! When an IDE reopens a solution it restores every tab as a stub and only
//! materializes the windows the user actually looks at. This crate predicts
//! which windows must be loaded at each step of a test session and checks
//! the prediction against what the host reports.
//!
//! The tracking model lives in [`tracker`], harness utilities (status dumps,
//! the simulated host, scratch workspaces) in [`ci_utils`]. The
//! [`scenario`] module ties both together into the open, reopen and focus
//! flow the CLI runs.

#[doc(hidden)]
pub mod boot;
pub mod scenario;

pub use lazytab_ci_utils as ci_utils;
pub use lazytab_tracker as tracker;

pub use scenario::{
    load_all_workflows, run_lazy_load_scenario, ScenarioOptions, ScenarioReport, Workflow,
};
