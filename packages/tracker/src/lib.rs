//! Expected-versus-observed bookkeeping for lazily restored document tabs
//!
//! When a solution is reopened, the host restores its document tabs as
//! stubs and only materializes a tab once it is focused. A scenario records
//! which tabs it opened and focused in a [`LazyLoadStateTracker`], then asks
//! it to verify the host's windows through a [`ResourceObserver`].

pub mod canonical;
pub mod observer;
pub mod resource;
pub mod tracker;
pub mod verify;
pub mod wait;

pub use canonical::canonicalize;
pub use observer::ResourceObserver;
pub use resource::{ExpectedLoadState, ObservedLoadState, TrackedResource};
pub use tracker::LazyLoadStateTracker;
pub use verify::{Mismatch, Rekey, UnresolvedReason, UnresolvedResource, VerificationResult};
pub use wait::{wait_until, WaitOptions};
