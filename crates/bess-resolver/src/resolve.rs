//! `resolve(procedure) → (project_id, match_level)`: the 4-tier matching order
//! plus the §36 special path.

use bess_core::model::{MatchLevel, ProcedureType, ProjectEntityId};

use crate::signature::{jaccard, Signature};

const DEV_TITLE_JACCARD_THRESHOLD: f64 = 0.6;
const TITLE_SIG_JACCARD_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome {
    pub match_level: MatchLevel,
    pub confidence: f32,
}

impl MatchOutcome {
    fn new(match_level: MatchLevel, confidence: f32) -> Self {
        Self { match_level, confidence }
    }
}

/// An existing project's signature plus its id, as presented to the resolver.
pub struct ExistingProject<'a> {
    pub project_id: ProjectEntityId,
    pub signature: &'a Signature,
}

/// Finds the first existing project that matches `incoming`, scoped to the
/// same `municipality_key` (callers are expected to have already filtered
/// `candidates` down to that municipality — the resolver doesn't re-check it
/// beyond the signature's own `municipality_key` field, to keep this a pure
/// function over whatever slice it's given).
///
/// Matching order: PARCEL (0.95) > PLAN (0.90) > DEV_TITLE (0.80) > TITLE_SIG
/// (0.70). First hit wins.
pub fn find_match(incoming: &Signature, candidates: &[ExistingProject<'_>]) -> Option<(ProjectEntityId, MatchOutcome)> {
    let same_municipality = |c: &&ExistingProject| c.signature.municipality_key == incoming.municipality_key;

    if let Some(parcel) = &incoming.parcel_token {
        if let Some(hit) = candidates
            .iter()
            .filter(same_municipality)
            .find(|c| c.signature.parcel_token.as_deref() == Some(parcel.as_str()))
        {
            return Some((hit.project_id, MatchOutcome::new(MatchLevel::Parcel, 0.95)));
        }
    }

    if let Some(plan) = &incoming.plan_token {
        if let Some(hit) = candidates.iter().filter(same_municipality).find(|c| c.signature.plan_token.as_deref() == Some(plan.as_str())) {
            return Some((hit.project_id, MatchOutcome::new(MatchLevel::Plan, 0.90)));
        }
    }

    if let Some(dev) = &incoming.developer_norm {
        if let Some(hit) = candidates.iter().filter(same_municipality).find(|c| {
            c.signature.developer_norm.as_deref() == Some(dev.as_str())
                && jaccard(&c.signature.title_signature, &incoming.title_signature) >= DEV_TITLE_JACCARD_THRESHOLD
        }) {
            return Some((hit.project_id, MatchOutcome::new(MatchLevel::DevTitle, 0.80)));
        }
    }

    if let Some(hit) = candidates
        .iter()
        .filter(same_municipality)
        .find(|c| jaccard(&c.signature.title_signature, &incoming.title_signature) >= TITLE_SIG_JACCARD_THRESHOLD)
    {
        return Some((hit.project_id, MatchOutcome::new(MatchLevel::TitleSig, 0.70)));
    }

    None
}

/// Resolution result for a procedure: either it joined an existing project, or
/// a new one must be created (§36 special path: always create when no
/// PARCEL/PLAN match was found, since §36 Einvernehmen is frequently the
/// earliest signal of a §35 project and nothing to link to exists yet).
pub enum Resolution {
    Linked { project_id: ProjectEntityId, outcome: MatchOutcome },
    CreateNew { match_level: MatchLevel },
}

pub fn resolve(incoming: &Signature, procedure_type: ProcedureType, candidates: &[ExistingProject<'_>]) -> Resolution {
    if let Some((project_id, outcome)) = find_match(incoming, candidates) {
        return Resolution::Linked { project_id, outcome };
    }

    if procedure_type == ProcedureType::Permit36Einvernehmen {
        return Resolution::CreateNew {
            match_level: MatchLevel::Para36New,
        };
    }

    // No existing project matched. The link recorded for the procedure that
    // founds a project reflects the strongest identity it was founded on, so
    // a later arrival with the same token still lands in the PARCEL/PLAN tier
    // rather than silently falling through to TITLE_SIG.
    let match_level = if incoming.parcel_token.is_some() {
        MatchLevel::Parcel
    } else if incoming.plan_token.is_some() {
        MatchLevel::Plan
    } else if incoming.developer_norm.is_some() {
        MatchLevel::DevTitle
    } else {
        MatchLevel::TitleSig
    };

    Resolution::CreateNew { match_level }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sig(municipality: &str, parcel: Option<&str>, plan: Option<&str>, dev: Option<&str>, title_words: &[&str]) -> Signature {
        Signature {
            municipality_key: municipality.to_string(),
            plan_token: plan.map(str::to_string),
            parcel_token: parcel.map(str::to_string),
            developer_norm: dev.map(str::to_string),
            title_signature: title_words.iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
        }
    }

    #[test]
    fn scenario_6_parcel_match_wins_across_sources() {
        let existing = sig("musterstadt", Some("x|3|12"), None, None, &["erste", "meldung"]);
        let incoming = sig("musterstadt", Some("x|3|12"), None, None, &["zweite", "anzeige"]);
        let candidates = vec![ExistingProject {
            project_id: ProjectEntityId::new(),
            signature: &existing,
        }];

        let (_, outcome) = find_match(&incoming, &candidates).expect("parcel match");
        assert_eq!(outcome.match_level, MatchLevel::Parcel);
        assert_eq!(outcome.confidence, 0.95);
    }

    #[test]
    fn plan_match_used_when_no_parcel() {
        let existing = sig("musterstadt", None, Some("bp-12-2024"), None, &[]);
        let incoming = sig("musterstadt", None, Some("bp-12-2024"), None, &[]);
        let candidates = vec![ExistingProject {
            project_id: ProjectEntityId::new(),
            signature: &existing,
        }];
        let (_, outcome) = find_match(&incoming, &candidates).expect("plan match");
        assert_eq!(outcome.match_level, MatchLevel::Plan);
    }

    #[test]
    fn dev_title_requires_both_developer_and_jaccard() {
        let existing = sig("musterstadt", None, None, Some("muster energie"), &["batteriespeicher", "anlage", "musterfeld"]);
        let incoming = sig("musterstadt", None, None, Some("muster energie"), &["batteriespeicher", "anlage", "musterfeld"]);
        let candidates = vec![ExistingProject {
            project_id: ProjectEntityId::new(),
            signature: &existing,
        }];
        let (_, outcome) = find_match(&incoming, &candidates).expect("dev_title match");
        assert_eq!(outcome.match_level, MatchLevel::DevTitle);
    }

    #[test]
    fn no_match_scoped_outside_municipality() {
        let existing = sig("anderestadt", Some("x|3|12"), None, None, &[]);
        let incoming = sig("musterstadt", Some("x|3|12"), None, None, &[]);
        let candidates = vec![ExistingProject {
            project_id: ProjectEntityId::new(),
            signature: &existing,
        }];
        assert!(find_match(&incoming, &candidates).is_none());
    }

    #[test]
    fn paragraph_36_creates_project_absent_plan_token() {
        let incoming = sig("musterstadt", None, None, None, &["einvernehmen"]);
        let resolution = resolve(&incoming, ProcedureType::Permit36Einvernehmen, &[]);
        match resolution {
            Resolution::CreateNew { match_level } => assert_eq!(match_level, MatchLevel::Para36New),
            _ => panic!("expected CreateNew"),
        }
    }

    #[test]
    fn parcel_and_plan_preferred_over_paragraph_36_path_when_available() {
        let existing = sig("musterstadt", Some("x|3|12"), None, None, &[]);
        let incoming = sig("musterstadt", Some("x|3|12"), None, None, &[]);
        let candidates = vec![ExistingProject {
            project_id: ProjectEntityId::new(),
            signature: &existing,
        }];
        let resolution = resolve(&incoming, ProcedureType::Permit36Einvernehmen, &candidates);
        match resolution {
            Resolution::Linked { outcome, .. } => assert_eq!(outcome.match_level, MatchLevel::Parcel),
            _ => panic!("expected Linked via PARCEL"),
        }
    }
}
