use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::canonical::canonicalize;

/// Load state reported by the host for one caption.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ObservedLoadState {
    /// Placeholder tab, content not materialized yet.
    Stub,
    /// Fully loaded document.
    Loaded,
    /// No observable window carries this caption.
    NotFound,
}

/// Load state a tracked entry is expected to be in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExpectedLoadState {
    Stub,
    Loaded,
}

impl ExpectedLoadState {
    pub fn from_stub_flag(is_stub: bool) -> Self {
        if is_stub {
            Self::Stub
        } else {
            Self::Loaded
        }
    }

    /// Whether `observed` satisfies this expectation.
    pub fn matches(self, observed: ObservedLoadState) -> bool {
        matches!(
            (self, observed),
            (Self::Stub, ObservedLoadState::Stub) | (Self::Loaded, ObservedLoadState::Loaded)
        )
    }
}

/// One document tab tracked across open/focus/reset cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedResource {
    /// Caption as last seen on the host, decorations included.
    pub identity: String,
    /// Project that produced the document. Not used for matching.
    #[serde(default)]
    pub group: String,
    pub is_stub: bool,
}

impl TrackedResource {
    /// Fresh entries start as stubs: a lazily restored tab is a placeholder
    /// until it receives focus.
    pub fn new(identity: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            group: group.into(),
            is_stub: true,
        }
    }

    pub fn canonical_identity(&self) -> &str {
        canonicalize(&self.identity)
    }

    pub fn expected(&self) -> ExpectedLoadState {
        ExpectedLoadState::from_stub_flag(self.is_stub)
    }
}
