//! Prefilter: a fast score over title + URL + discovery source that gates
//! extraction before any fetch of the full document happens.

use crate::lattice::{BESS_EXPLICIT, CONTAINER_TITLE_MARKERS, PERMIT_STRONG, PLANNING_STEPS, PLANNING_STRONG};
use crate::model::{DiscoverySource, Mode};
use crate::normalize::normalize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefilterResult {
    pub score: f32,
    pub passes: bool,
}

fn has_procedure_term(text: &str) -> bool {
    PLANNING_STRONG.any_match(text) || PLANNING_STEPS.any_match(text) || PERMIT_STRONG.any_match(text)
}

fn is_container_like(norm_title: &str) -> bool {
    CONTAINER_TITLE_MARKERS.iter().any(|marker| norm_title.contains(marker))
}

/// The source/mode-specific score a candidate must meet to be eligible for
/// extraction. Exposed so callers outside this crate (the job pipeline) can
/// filter candidates the same way [`should_extract`] does internally.
pub fn threshold(source: DiscoverySource, mode: Mode) -> f32 {
    match (source, mode) {
        (DiscoverySource::Ris, Mode::Fast) => 0.35,
        (DiscoverySource::Ris, Mode::Deep) => 0.20,
        (DiscoverySource::Amtsblatt, Mode::Fast) => 0.50,
        (DiscoverySource::Amtsblatt, Mode::Deep) => 0.30,
        (DiscoverySource::MunicipalWebsite, Mode::Fast) => 0.60,
        (DiscoverySource::MunicipalWebsite, Mode::Deep) => 0.50,
        (_, Mode::Fast) => 0.60,
        (_, Mode::Deep) => 0.30,
    }
}

/// `should_extract(title, url, discovery_source, mode) → (score, passes)`.
pub fn should_extract(title: &str, url: &str, discovery_source: DiscoverySource, mode: Mode) -> PrefilterResult {
    let norm_title = normalize(title);
    let norm_url = normalize(url);

    let mut score: f32 = 0.0;
    if BESS_EXPLICIT.any_match(&norm_title.text) {
        score += 0.6;
    }
    if has_procedure_term(&norm_title.text) {
        score += 0.3;
    }
    if has_procedure_term(&norm_url.text) {
        score += 0.2;
    }
    if is_container_like(&norm_title.text) {
        score -= 0.7;
    }

    let score = score.clamp(-1.0, 1.0);
    let passes = score >= threshold(discovery_source, mode);

    PrefilterResult { score, passes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_1_passes_both_modes() {
        let title = "Aufstellungsbeschluss Bebauungsplan Nr. 12/2024 Batteriespeicheranlage Metzdorf";
        let fast = should_extract(title, "https://ris.example.de/vo0123", DiscoverySource::Ris, Mode::Fast);
        let deep = should_extract(title, "https://ris.example.de/vo0123", DiscoverySource::Ris, Mode::Deep);
        assert!(fast.passes);
        assert!(deep.passes);
    }

    #[test]
    fn scenario_5_below_threshold() {
        let title = "Satzung ueber die oeffentliche Bekanntmachung — Waermespeicher Stadtwerke";
        let result = should_extract(title, "https://example.de/bekanntmachung", DiscoverySource::MunicipalWebsite, Mode::Fast);
        assert!(!result.passes);
    }

    #[test]
    fn container_title_penalized() {
        let result = should_extract(
            "Amtsblatt Nr. 07/2024 der Stadt Beispielstadt",
            "https://example.de/amtsblatt/7",
            DiscoverySource::Amtsblatt,
            Mode::Fast,
        );
        assert!(result.score < 0.0);
        assert!(!result.passes);
    }

    #[test]
    fn ris_deep_threshold_is_more_permissive_than_fast() {
        assert!(threshold(DiscoverySource::Ris, Mode::Deep) < threshold(DiscoverySource::Ris, Mode::Fast));
    }

    #[test]
    fn prefilter_gating_property_matches_threshold_table() {
        for (source, mode, expected) in [
            (DiscoverySource::Ris, Mode::Fast, 0.35),
            (DiscoverySource::Ris, Mode::Deep, 0.20),
            (DiscoverySource::Amtsblatt, Mode::Fast, 0.50),
            (DiscoverySource::Amtsblatt, Mode::Deep, 0.30),
            (DiscoverySource::MunicipalWebsite, Mode::Fast, 0.60),
            (DiscoverySource::MunicipalWebsite, Mode::Deep, 0.50),
            (DiscoverySource::Landkreis, Mode::Fast, 0.60),
            (DiscoverySource::Landkreis, Mode::Deep, 0.30),
        ] {
            assert_eq!(threshold(source, mode), expected);
        }
    }
}
