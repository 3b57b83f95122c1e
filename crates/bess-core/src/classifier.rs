//! Deterministic relevance classifier. Pure function of its inputs: same
//! `(text, title, date, discovery_source)` always yields a byte-equal result.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::lattice::{
    BESS_CONTAINER_GRID, BESS_EXPLICIT, CONTAINER_TITLE_MARKERS, GRID_MEDIUM, GRID_STRONG, LEGAL_BASIS_TERMS,
    NEGATIVE_STORAGE, PERMIT_STRONG, PLANNING_STEPS, PLANNING_STRONG, PROCEDURE_SIGNAL,
};
use crate::model::{DiscoverySource, LegalBasis, ProcedureType, ProjectComponents};
use crate::normalize::normalize;

const EVIDENCE_WINDOW_RADIUS: usize = 80;
const MAX_EVIDENCE_SNIPPETS: usize = 6;

/// The earliest date at which a date-bearing candidate still counts for Rule R2.
const R2_DATE_FLOOR: NaiveDate = match NaiveDate::from_ymd_opt(2023, 1, 1) {
    Some(d) => d,
    None => unreachable!(),
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierResult {
    pub relevant: bool,
    pub ambiguity_flag: bool,
    pub procedure_type: ProcedureType,
    pub legal_basis: LegalBasis,
    pub project_components: ProjectComponents,
    pub confidence: f32,
    pub review_recommended: bool,
    pub evidence_snippets: Vec<String>,
    pub is_container: bool,
}

/// Classify a piece of discovered text. Pure: never performs I/O, never reads
/// wall-clock time.
pub fn classify(text_raw: &str, title: &str, date: Option<NaiveDate>, discovery_source: DiscoverySource) -> ClassifierResult {
    let norm_text = normalize(text_raw);
    let norm_title = normalize(title);
    let combined = format!("{} {}", norm_title.text, norm_text.text);

    let has_bess_explicit = BESS_EXPLICIT.any_match(&combined);
    let has_procedure_term = PLANNING_STEPS.any_match(&combined)
        || PLANNING_STRONG.any_match(&combined)
        || PERMIT_STRONG.any_match(&combined);

    let rule_r1 = has_bess_explicit && has_procedure_term;

    let bess_in_title = BESS_EXPLICIT.any_match(&norm_title.text);
    let date_ok = date.map(|d| d >= R2_DATE_FLOOR).unwrap_or(true);
    let rule_r2 = bess_in_title && date_ok;

    let has_speicher = combined.contains("speicher");
    let grid_signal_count =
        BESS_CONTAINER_GRID.count_distinct_matches(&combined) + GRID_STRONG.count_distinct_matches(&combined) + GRID_MEDIUM.count_distinct_matches(&combined);
    let has_negative_storage = NEGATIVE_STORAGE.any_match(&combined);
    let rule_r3 = has_speicher && grid_signal_count >= 2 && has_procedure_term && !has_negative_storage;

    let relevant = rule_r1 || rule_r2 || rule_r3;
    let ambiguity_flag = rule_r3;

    let (procedure_type, mut review_recommended) = tag_procedure_type(&combined);
    let legal_basis = tag_legal_basis(&combined);
    // R3's generic "speicher" + grid-signal match is exactly the ambiguous
    // storage case the component tag needs to count as BESS-related — it has
    // no explicit BESS term, but neither does it belong in OTHER/UNCLEAR.
    let project_components = tag_components(&combined, rule_r3);

    let confidence = score_confidence(has_bess_explicit, has_procedure_term, &combined, has_negative_storage, ambiguity_flag, date);

    if !relevant {
        review_recommended = review_recommended && procedure_type == ProcedureType::Unknown;
    }

    let evidence_snippets = collect_evidence_snippets(text_raw, &norm_text);

    let is_container = is_container_title(title) && !(relevant && has_bess_explicit)
        && !(discovery_source == DiscoverySource::Ris && PROCEDURE_SIGNAL.any_match(&combined));

    ClassifierResult {
        relevant,
        ambiguity_flag,
        procedure_type,
        legal_basis,
        project_components,
        confidence,
        review_recommended,
        evidence_snippets,
        is_container,
    }
}

/// First match in the documented priority order; falls back to `UNKNOWN` with
/// `review_recommended = true`.
fn tag_procedure_type(combined_norm: &str) -> (ProcedureType, bool) {
    let contains =
        |w: &'static str| crate::lattice::TermSet::build("adhoc", &[w]).expect("ad hoc term compiles").any_match(combined_norm);

    if contains("aufstellungsbeschluss") {
        return (ProcedureType::BplanAufstellung, false);
    }
    if contains("fruehzeitige beteiligung") {
        return (ProcedureType::BplanFruehzeitig31, false);
    }
    if contains("auslegung") {
        return (ProcedureType::BplanAuslegung32, false);
    }
    if contains("satzungsbeschluss") {
        return (ProcedureType::BplanSatzung, false);
    }
    if PLANNING_STRONG.any_match(combined_norm) {
        return (ProcedureType::BplanOther, false);
    }
    if contains("bauvorbescheid") || contains("bauvoranfrage") || contains("bauvorantrag") {
        return (ProcedureType::PermitBauvorbescheid, false);
    }
    if contains("baugenehmigung") {
        return (ProcedureType::PermitBaugenehmigung, false);
    }
    if contains("einvernehmen §36") || contains("§36") {
        return (ProcedureType::Permit36Einvernehmen, false);
    }
    if PERMIT_STRONG.any_match(combined_norm) {
        return (ProcedureType::PermitOther, false);
    }
    (ProcedureType::Unknown, true)
}

fn tag_legal_basis(combined_norm: &str) -> LegalBasis {
    for (label, term) in LEGAL_BASIS_TERMS.iter() {
        if term.is_match(combined_norm) {
            return match *label {
                "§34" => LegalBasis::Para34,
                "§35" => LegalBasis::Para35,
                "§36" => LegalBasis::Para36,
                _ => LegalBasis::Unknown,
            };
        }
    }
    LegalBasis::Unknown
}

fn tag_components(combined_norm: &str, ambiguous_storage: bool) -> ProjectComponents {
    let has_pv = combined_norm.contains("pv") || combined_norm.contains("photovoltaik");
    let has_wind = combined_norm.contains("wind");
    let has_bess = BESS_EXPLICIT.any_match(combined_norm) || BESS_CONTAINER_GRID.any_match(combined_norm) || ambiguous_storage;

    match (has_pv, has_wind, has_bess) {
        (true, _, true) => ProjectComponents::PvBess,
        (_, true, true) => ProjectComponents::WindBess,
        (false, false, true) => ProjectComponents::BessOnly,
        _ => ProjectComponents::OtherUnclear,
    }
}

fn score_confidence(
    has_bess_explicit: bool,
    has_procedure_term: bool,
    combined_norm: &str,
    has_negative_storage: bool,
    ambiguity_flag: bool,
    date: Option<NaiveDate>,
) -> f32 {
    let mut score: f32 = 0.0;
    if has_bess_explicit {
        score += 0.55;
    }
    if PLANNING_STEPS.any_match(combined_norm) || PERMIT_STRONG.any_match(combined_norm) {
        score += 0.25;
    }
    let _ = has_procedure_term;
    if GRID_STRONG.any_match(combined_norm) {
        score += 0.10;
    }
    if has_negative_storage && !has_bess_explicit {
        score -= 0.60;
    }
    if ambiguity_flag {
        score -= 0.25;
    }
    if date.is_none() {
        score -= 0.15;
    }
    score.clamp(0.0, 1.0)
}

/// Up to [`MAX_EVIDENCE_SNIPPETS`] windows of `±EVIDENCE_WINDOW_RADIUS` chars
/// around the earliest occurrence of each matched strong term, sliced from the
/// original (not normalized) text.
fn collect_evidence_snippets(original: &str, norm: &crate::normalize::Normalized) -> Vec<String> {
    use crate::lattice::{TermSetName, by_name};

    let sets = [
        TermSetName::BessExplicit,
        TermSetName::PlanningStrong,
        TermSetName::PlanningSteps,
        TermSetName::PermitStrong,
        TermSetName::GridStrong,
        TermSetName::BessContainerGrid,
    ];

    let mut snippets = Vec::new();
    for set_name in sets {
        if snippets.len() >= MAX_EVIDENCE_SNIPPETS {
            break;
        }
        let set = by_name(set_name);
        for term in &set.terms {
            if snippets.len() >= MAX_EVIDENCE_SNIPPETS {
                break;
            }
            if let Some(range) = term.find_earliest(&norm.text) {
                let char_start = norm.text[..range.start].chars().count();
                let char_end = char_start + norm.text[range.start..range.end].chars().count();
                let window_start = char_start.saturating_sub(EVIDENCE_WINDOW_RADIUS);
                let window_end = char_end + EVIDENCE_WINDOW_RADIUS;
                let byte_range = norm.original_byte_range(original, window_start..window_end.min(norm.offsets.len().max(1)));
                if byte_range.start < byte_range.end && byte_range.end <= original.len() {
                    snippets.push(original[byte_range].to_string());
                }
            }
        }
    }
    snippets
}

fn is_container_title(title: &str) -> bool {
    let norm = normalize(title);
    CONTAINER_TITLE_MARKERS.iter().any(|marker| norm.text.contains(marker))
}

/// Container/rejection gate: container titles are only kept as a real procedure
/// when either a BESS signal is present, or (RIS-only) the text carries one of
/// the procedure-signal terms.
pub fn is_valid_procedure(result: &ClassifierResult, discovery_source: DiscoverySource, combined_has_bess_signal: bool) -> bool {
    if !result.is_container {
        return true;
    }
    if result.relevant && combined_has_bess_signal {
        return true;
    }
    discovery_source == DiscoverySource::Ris
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_1_bplan_aufstellung() {
        let r = classify(
            "Der Ausschuss beschliesst die Aufstellung des Bebauungsplans fuer die Batteriespeicheranlage.",
            "Aufstellungsbeschluss Bebauungsplan Nr. 12/2024 Batteriespeicheranlage Metzdorf",
            NaiveDate::from_ymd_opt(2024, 3, 1),
            DiscoverySource::Ris,
        );
        assert!(r.relevant);
        assert_eq!(r.procedure_type, ProcedureType::BplanAufstellung);
        assert_eq!(r.legal_basis, LegalBasis::Unknown);
        assert_eq!(r.project_components, ProjectComponents::BessOnly);
        assert!((r.confidence - 0.80).abs() < 0.01);
    }

    #[test]
    fn scenario_2_amtsblatt_container_rejected() {
        let r = classify(
            "Inhaltsverzeichnis: Satzungen, Stellenausschreibungen, Sonstige Bekanntmachungen.",
            "Amtsblatt Nr. 07/2024 der Stadt Beispielstadt",
            None,
            DiscoverySource::Amtsblatt,
        );
        assert!(r.is_container);
        assert!(!is_valid_procedure(&r, DiscoverySource::Amtsblatt, r.relevant));
    }

    #[test]
    fn scenario_3_paragraph_36_einvernehmen() {
        let r = classify(
            "Die Gemeinde erteilt ihr Einvernehmen §36 zur Errichtung einer Batteriespeicheranlage auf Flurstueck 123/4.",
            "Einvernehmen gemaess §36 BauGB — Errichtung einer Batteriespeicheranlage auf Flurstueck 123/4",
            None,
            DiscoverySource::Ris,
        );
        assert!(r.relevant);
        assert_eq!(r.procedure_type, ProcedureType::Permit36Einvernehmen);
        assert_eq!(r.legal_basis, LegalBasis::Para36);
    }

    #[test]
    fn scenario_4_ambiguous_with_grid() {
        let r = classify(
            "Das Sondergebiet Photovoltaik umfasst eine Speicheranlage, Anschluss erfolgt ueber ein Umspannwerk mit 110 kV.",
            "Bauleitplanung — Sondergebiet Photovoltaik mit Speicheranlage, Umspannwerk Anschluss 110 kV",
            None,
            DiscoverySource::MunicipalWebsite,
        );
        assert!(r.ambiguity_flag);
        assert_eq!(r.project_components, ProjectComponents::PvBess);
    }

    #[test]
    fn scenario_5_negative_storage_not_relevant() {
        let r = classify(
            "Die Stadtwerke betreiben einen Waermespeicher zur Fernwaerme.",
            "Satzung ueber die oeffentliche Bekanntmachung — Waermespeicher Stadtwerke",
            None,
            DiscoverySource::MunicipalWebsite,
        );
        assert!(!r.relevant);
        assert!(r.confidence < 0.05);
    }

    #[test]
    fn classifier_is_pure() {
        let a = classify("Batteriespeicher und Bebauungsplan", "Titel", NaiveDate::from_ymd_opt(2024, 1, 1), DiscoverySource::Ris);
        let b = classify("Batteriespeicher und Bebauungsplan", "Titel", NaiveDate::from_ymd_opt(2024, 1, 1), DiscoverySource::Ris);
        assert_eq!(a, b);
    }

    #[test]
    fn evidence_snippets_come_from_original_not_normalized_text() {
        let r = classify(
            "Vorbemerkung.\n\nDer Antrag betrifft einen Batteriespeicher am Standort X.",
            "Antrag Batteriespeicher",
            None,
            DiscoverySource::Ris,
        );
        assert!(r.evidence_snippets.iter().any(|s| s.contains("Batteriespeicher")));
    }
}
