//! Thin re-export of [`bess_core::model::Job`]: the wire shape lives in
//! `bess-core` since extraction jobs reference it too. The queue only ever
//! carries [`Job::Municipality`] — `run_municipality` fans out to the three
//! discovery adapters itself (concurrently, via `tokio::join!`), so there is
//! no per-source job variant to dispatch separately.

pub use bess_core::model::{ExtractionJob, Job, JobCommon, Mode};
