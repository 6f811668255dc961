//! Lazy tab restore scenarios
//!
//! Workflows are declared in TOML files under `workflows/`. Each one lists
//! the documents to open and which of them stays active across reopens; see
//! `workflows/csharp_lazy_load.toml` for a complete example.

mod executor;
mod workflow;

pub use executor::*;
pub use workflow::*;
