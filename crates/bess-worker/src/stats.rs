//! Per-(run, municipality, source) crawl stats, and the one-line
//! `MUNICIPALITY_SUMMARY` logged when all three discovery sources for a
//! municipality have finished.

use chrono::Utc;
use tracing::info;

use bess_core::model::{CrawlStats, CrawlStatsCounts, DiscoveryDiagnostics, DiscoverySource, SourceStatus};
use bess_discovery::Diagnostics;

pub fn build_crawl_stats(
    run_id: &str,
    municipality_key: &str,
    source_type: DiscoverySource,
    candidates_found: u32,
    procedures_saved: u32,
    procedures_skipped: u32,
    source_status: SourceStatus,
    error_message: Option<String>,
    diagnostics: Option<&Diagnostics>,
) -> CrawlStats {
    let now = Utc::now();
    CrawlStats {
        run_id: run_id.to_string(),
        municipality_key: municipality_key.to_string(),
        source_type,
        counts: CrawlStatsCounts {
            candidates_found,
            procedures_saved,
            procedures_skipped,
            source_status,
            error_message,
            discovery_diagnostics: diagnostics.map(to_model_diagnostics),
        },
        started_at: now,
        finished_at: Some(now),
    }
}

fn to_model_diagnostics(d: &Diagnostics) -> DiscoveryDiagnostics {
    d.to_model()
}

/// One stable, grep-able line per municipality once all three discovery
/// sources have finished: per-source status and cumulative procedures saved.
pub fn log_municipality_summary(run_id: &str, municipality_key: &str, per_source: &[CrawlStats]) {
    let total_saved: u32 = per_source.iter().map(|s| s.counts.procedures_saved).sum();
    let statuses: Vec<String> = per_source.iter().map(|s| format!("{:?}={:?}", s.source_type, s.counts.source_status)).collect();
    info!(
        run_id = %run_id,
        municipality_key = %municipality_key,
        sources = %statuses.join(","),
        procedures_saved = total_saved,
        "MUNICIPALITY_SUMMARY"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_crawl_stats_stamps_started_and_finished() {
        let stats = build_crawl_stats("run-1", "musterstadt", DiscoverySource::Ris, 5, 2, 1, SourceStatus::Success, None, None);
        assert_eq!(stats.counts.candidates_found, 5);
        assert!(stats.finished_at.is_some());
    }
}
