//! Project rollups: idempotent best-field aggregation recomputed from the full
//! set of linked procedures on every link.

use chrono::NaiveDate;

use bess_core::model::{LegalBasis, MaturityStage, Procedure, ProcedureType, ProjectComponents};

#[derive(Debug, Clone, PartialEq)]
pub struct Rollup {
    pub maturity_stage: MaturityStage,
    pub canonical_project_name: String,
    pub site_location_best: Option<String>,
    pub developer_company_best: Option<String>,
    pub capacity_mw_best: Option<f64>,
    pub capacity_mwh_best: Option<f64>,
    pub area_hectares_best: Option<f64>,
    pub legal_basis_best: LegalBasis,
    pub project_components_best: ProjectComponents,
    pub first_seen_date: NaiveDate,
    pub last_seen_date: NaiveDate,
    pub max_confidence: f32,
    pub needs_review: bool,
}

fn legal_basis_rank(basis: LegalBasis) -> u8 {
    match basis {
        LegalBasis::Para35 => 3,
        LegalBasis::Para34 => 2,
        LegalBasis::Para36 => 1,
        LegalBasis::Unknown => 0,
    }
}

/// Recomputes the full rollup from scratch given the current set of linked
/// procedures. Idempotent: calling this twice on the same set yields the same
/// result, and it never reads any prior rollup state.
pub fn recompute(procedures: &[&Procedure], plan_tokens: &[Option<&str>]) -> Option<Rollup> {
    if procedures.is_empty() {
        return None;
    }

    let maturity_stage = procedures
        .iter()
        .map(|p| MaturityStage::from_procedure_type(p.procedure_type))
        .max()
        .unwrap_or(MaturityStage::Discovered);

    let canonical_project_name = plan_tokens
        .iter()
        .find_map(|t| *t)
        .map(str::to_string)
        .unwrap_or_else(|| {
            procedures
                .iter()
                .filter(|p| p.confidence > 0.0)
                .max_by_key(|p| p.title.chars().count())
                .map(|p| p.title.clone())
                .unwrap_or_else(|| procedures[0].title.clone())
        });

    let site_location_best = procedures
        .iter()
        .filter_map(|p| p.site_location_raw.as_deref())
        .max_by_key(|s| s.chars().count())
        .map(str::to_string);

    let developer_company_best = most_frequent_non_empty(procedures.iter().filter_map(|p| p.developer_company.as_deref()));

    let capacity_mw_best = procedures.iter().filter_map(|p| p.capacity_mw).fold(None, max_option);
    let capacity_mwh_best = procedures.iter().filter_map(|p| p.capacity_mwh).fold(None, max_option);
    let area_hectares_best = procedures.iter().filter_map(|p| p.area_hectares).fold(None, max_option);

    let legal_basis_best = procedures
        .iter()
        .map(|p| p.legal_basis)
        .max_by_key(|b| legal_basis_rank(*b))
        .unwrap_or(LegalBasis::Unknown);

    let project_components_best = dominant_components(procedures);

    let dates: Vec<NaiveDate> = procedures.iter().map(|p| p.decision_date.unwrap_or_else(|| p.created_at.date_naive())).collect();
    let first_seen_date = *dates.iter().min().expect("non-empty procedures");
    let last_seen_date = *dates.iter().max().expect("non-empty procedures");

    let max_confidence = procedures.iter().map(|p| p.confidence).fold(0.0_f32, f32::max);
    let needs_review = procedures.iter().any(|p| p.review_recommended);

    Some(Rollup {
        maturity_stage,
        canonical_project_name,
        site_location_best,
        developer_company_best,
        capacity_mw_best,
        capacity_mwh_best,
        area_hectares_best,
        legal_basis_best,
        project_components_best,
        first_seen_date,
        last_seen_date,
        max_confidence,
        needs_review,
    })
}

fn max_option(acc: Option<f64>, value: f64) -> Option<f64> {
    Some(acc.map_or(value, |a| a.max(value)))
}

fn most_frequent_non_empty<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    use std::collections::HashMap;
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for v in values.filter(|v| !v.is_empty()) {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts.into_iter().max_by_key(|(_, count)| *count).map(|(v, _)| v.to_string())
}

fn dominant_components(procedures: &[&Procedure]) -> ProjectComponents {
    use std::collections::HashMap;
    let mut counts: HashMap<ProjectComponents, u32> = HashMap::new();
    for p in procedures {
        *counts.entry(p.project_components).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(component, count)| (*count, component_priority(*component)))
        .map(|(c, _)| c)
        .unwrap_or(ProjectComponents::OtherUnclear)
}

fn component_priority(c: ProjectComponents) -> u8 {
    match c {
        ProjectComponents::PvBess => 3,
        ProjectComponents::WindBess => 2,
        ProjectComponents::BessOnly => 1,
        ProjectComponents::OtherUnclear => 0,
    }
}

/// Asserts the monotonicity invariants that must hold across any rollup
/// transition: max_confidence never decreases, maturity never regresses,
/// first_seen stays ≤ last_seen.
pub fn is_monotonic_transition(before: Option<&Rollup>, after: &Rollup) -> bool {
    let monotonic = match before {
        None => true,
        Some(before) => after.max_confidence >= before.max_confidence && after.maturity_stage >= before.maturity_stage,
    };
    monotonic && after.first_seen_date <= after.last_seen_date
}

#[cfg(test)]
mod tests {
    use super::*;
    use bess_core::model::{ProcedureId, ProcedureType};
    use chrono::Utc;

    fn procedure(procedure_type: ProcedureType, confidence: f32, decision_date: Option<NaiveDate>, review: bool) -> Procedure {
        Procedure {
            id: ProcedureId::new(),
            title: "Title".to_string(),
            title_norm: "title".to_string(),
            municipality_key: "musterstadt".to_string(),
            state: "Brandenburg".to_string(),
            county: "Musterkreis".to_string(),
            procedure_type,
            legal_basis: LegalBasis::Unknown,
            project_components: ProjectComponents::BessOnly,
            ambiguity_flag: false,
            review_recommended: review,
            confidence,
            bess_score: 0.5,
            grid_score: 0.0,
            decision_date,
            site_location_raw: None,
            geometry: None,
            bbox: None,
            developer_company: None,
            capacity_mw: None,
            capacity_mwh: None,
            area_hectares: None,
            evidence_snippets: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn maturity_is_max_over_linked_procedures() {
        let a = procedure(ProcedureType::BplanAufstellung, 0.8, NaiveDate::from_ymd_opt(2024, 1, 1), false);
        let b = procedure(ProcedureType::PermitBaugenehmigung, 0.9, NaiveDate::from_ymd_opt(2024, 6, 1), false);
        let refs = vec![&a, &b];
        let rollup = recompute(&refs, &[None, None]).unwrap();
        assert_eq!(rollup.maturity_stage, MaturityStage::PermitBaugenehmigung);
    }

    #[test]
    fn needs_review_is_or_of_linked_procedures() {
        let a = procedure(ProcedureType::BplanAufstellung, 0.8, None, false);
        let b = procedure(ProcedureType::Unknown, 0.2, None, true);
        let refs = vec![&a, &b];
        let rollup = recompute(&refs, &[None, None]).unwrap();
        assert!(rollup.needs_review);
    }

    #[test]
    fn max_confidence_is_max_not_sum() {
        let a = procedure(ProcedureType::BplanAufstellung, 0.4, None, false);
        let b = procedure(ProcedureType::BplanAufstellung, 0.9, None, false);
        let refs = vec![&a, &b];
        let rollup = recompute(&refs, &[None, None]).unwrap();
        assert_eq!(rollup.max_confidence, 0.9);
    }

    #[test]
    fn first_seen_before_last_seen() {
        let a = procedure(ProcedureType::BplanAufstellung, 0.8, NaiveDate::from_ymd_opt(2024, 6, 1), false);
        let b = procedure(ProcedureType::BplanSatzung, 0.9, NaiveDate::from_ymd_opt(2024, 1, 1), false);
        let refs = vec![&a, &b];
        let rollup = recompute(&refs, &[None, None]).unwrap();
        assert!(rollup.first_seen_date <= rollup.last_seen_date);
        assert_eq!(rollup.last_seen_date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn rollup_is_idempotent() {
        let a = procedure(ProcedureType::BplanAufstellung, 0.8, NaiveDate::from_ymd_opt(2024, 1, 1), false);
        let refs = vec![&a];
        let once = recompute(&refs, &[None]).unwrap();
        let twice = recompute(&refs, &[None]).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn monotonic_transition_rejects_confidence_decrease() {
        let before = Rollup {
            maturity_stage: MaturityStage::BplanAufstellung,
            canonical_project_name: "x".into(),
            site_location_best: None,
            developer_company_best: None,
            capacity_mw_best: None,
            capacity_mwh_best: None,
            area_hectares_best: None,
            legal_basis_best: LegalBasis::Unknown,
            project_components_best: ProjectComponents::BessOnly,
            first_seen_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            last_seen_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            max_confidence: 0.9,
            needs_review: false,
        };
        let mut after = before.clone();
        after.max_confidence = 0.5;
        assert!(!is_monotonic_transition(Some(&before), &after));
    }
}
