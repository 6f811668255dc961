use serde::Serialize;
use std::fmt;

use crate::resource::{ExpectedLoadState, ObservedLoadState};

/// A tracked entry whose observed state disagreed with the expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub identity: String,
    pub group: String,
    pub expected: ExpectedLoadState,
    pub observed: ObservedLoadState,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' expected {}, observed {}",
            self.identity, self.expected, self.observed
        )
    }
}

/// An entry whose caption was replaced during fallback resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rekey {
    pub from: String,
    pub to: String,
}

/// Outcome of one verification pass over the tracked set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub checked: usize,
    pub failures: Vec<Mismatch>,
    pub rekeyed: Vec<Rekey>,
}

impl VerificationResult {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure_for(&self, identity: &str) -> Option<&Mismatch> {
        self.failures.iter().find(|m| m.identity == identity)
    }
}

/// Why a not-found caption could not be matched to any host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The caption has no bracketed qualifier, so no prefix search applies.
    NoQualifier,
    /// No observable window starts with the caption's prefix.
    NoCandidate,
    /// A candidate was found but is not observable either.
    CandidateVanished,
}

/// Fatal divergence between the tracked set and the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedResource {
    pub identity: String,
    pub reason: UnresolvedReason,
}

impl fmt::Display for UnresolvedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            UnresolvedReason::NoQualifier => {
                write!(f, "document window '{}' not found", self.identity)
            }
            UnresolvedReason::NoCandidate => write!(
                f,
                "document window '{}' not found and no window matches its prefix",
                self.identity
            ),
            UnresolvedReason::CandidateVanished => write!(
                f,
                "document window '{}' was re-captioned but the new caption is not observable",
                self.identity
            ),
        }
    }
}

impl std::error::Error for UnresolvedResource {}
