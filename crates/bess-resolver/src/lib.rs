//! Entity resolution and project rollups: turns many procedures into one
//! canonical project entity per municipality, with a 4-tier matching order and
//! an idempotent best-field rollup recomputed on every link.

pub mod resolve;
pub mod rollup;
pub mod signature;

pub use resolve::{resolve, ExistingProject, MatchOutcome, Resolution};
pub use rollup::{recompute as recompute_rollup, Rollup};
pub use signature::Signature;
