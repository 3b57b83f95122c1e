//! Typed errors for the core crate.
//!
//! Uses `thiserror`, not `anyhow`: this is a library, and callers in `bess-worker`
//! decide how to surface or wrap these.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid procedure id input: {reason}")]
    InvalidProcedureIdInput { reason: String },

    #[error("regex compilation failed for term {term:?}: {source}")]
    LatticeCompile {
        term: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;
