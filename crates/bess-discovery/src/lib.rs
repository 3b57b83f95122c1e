//! Source-specific discovery adapters (RIS, Amtsblatt, municipal website), all
//! built on the shared site-driven link-discovery primitive. Every adapter
//! degrades gracefully: a failed fetch is recorded as a diagnostic, never a
//! panic or an aborted run.

pub mod amtsblatt;
pub mod diagnostics;
pub mod municipal;
pub mod ris;
pub mod site_driven;

pub use diagnostics::{Diagnostics, DiscoveryMethod, ReasonCode};
