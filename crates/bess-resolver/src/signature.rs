//! Signature computation: the four fields a procedure is matched on.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use bess_core::normalize::normalize;

/// Stopwords excluded from `title_signature` — procedural scaffolding words
/// that would otherwise dominate the Jaccard comparison between any two
/// planning-procedure titles regardless of what they're actually about.
const TITLE_STOPWORDS: &[&str] = &[
    "stadt", "gemeinde", "amtsblatt", "bekanntmachung", "beschluss", "nummer", "nr.", "nr", "ueber", "und", "der", "die", "das",
    "fuer", "von", "zur", "zum", "einer", "eines",
];

static PLAN_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:bebauungsplan|b[\s-]?plan)\D{0,15}?(\d+[a-z]?/\d{2,4})").expect("static regex compiles"));

static QUOTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["\u{201e}\u{201c}]([^"\u{201c}\u{201d}]{4,})["\u{201c}\u{201d}]"#).expect("static regex compiles"));

static PARCEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)gemarkung\s+([\p{L}\s]+?),?\s+flur\s+(\d+),?\s+flurst(?:ue|\u{00fc})ck\s+(\d+(?:/\d+)?)").expect("static regex compiles"));

const LEGAL_SUFFIXES: &[&str] = &["gmbh co kg", "gmbh", "ag", "ug", "kg", "se", "mbh", "ohg", "gbr"];

/// A procedure's matching signature, scoped to a municipality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub municipality_key: String,
    pub plan_token: Option<String>,
    pub parcel_token: Option<String>,
    pub developer_norm: Option<String>,
    pub title_signature: HashSet<String>,
}

/// `plan_token`: a B-Plan number pattern (e.g. "BP-12/2023"), or else the
/// largest quoted string in the title.
pub fn plan_token(title: &str) -> Option<String> {
    if let Some(caps) = PLAN_TOKEN_RE.captures(title) {
        return Some(format!("bp-{}", caps[1].to_lowercase()));
    }
    QUOTED_RE
        .captures_iter(title)
        .map(|c| c[1].trim().to_string())
        .max_by_key(|s| s.len())
        .filter(|s| !s.is_empty())
}

/// `parcel_token`: the (Gemarkung, Flur, Flurstück) triple, normalized, or a
/// free-text location string if the triple isn't present.
pub fn parcel_token(text: &str, free_text_location: Option<&str>) -> Option<String> {
    if let Some(caps) = PARCEL_RE.captures(text) {
        let gemarkung = caps[1].trim().to_lowercase();
        let flur = caps[2].trim();
        let flurstueck = caps[3].trim();
        return Some(format!("{gemarkung}|{flur}|{flurstueck}"));
    }
    free_text_location.map(|s| normalize(s).text).filter(|s| !s.is_empty())
}

/// `developer_norm`: lowercase, strip legal suffixes (GmbH/AG/UG/KG/...), drop
/// punctuation.
pub fn developer_norm(raw: &str) -> Option<String> {
    let mut norm = normalize(raw).text;
    norm.retain(|c| c.is_alphanumeric() || c.is_whitespace());
    let mut words: Vec<&str> = norm.split_whitespace().collect();

    for suffix in LEGAL_SUFFIXES {
        let suffix_words: Vec<&str> = suffix.split_whitespace().collect();
        if words.len() >= suffix_words.len() && words[words.len() - suffix_words.len()..] == suffix_words[..] {
            words.truncate(words.len() - suffix_words.len());
        }
    }

    let result = words.join(" ").trim().to_string();
    if result.is_empty() {
        None
    } else {
        Some(result)
    }
}

/// `title_signature`: the set of content tokens of length ≥ 4, excluding
/// procedural stopwords, used for Jaccard comparison.
pub fn title_signature(title: &str) -> HashSet<String> {
    let norm = normalize(title);
    norm.text
        .split_whitespace()
        .filter(|w| w.len() >= 4)
        .filter(|w| !TITLE_STOPWORDS.contains(w))
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_token_extracts_bplan_number() {
        let t = plan_token("Aufstellungsbeschluss Bebauungsplan Nr. 12/2024 Batteriespeicheranlage Metzdorf");
        assert!(t.is_some());
    }

    #[test]
    fn plan_token_falls_back_to_longest_quoted_string() {
        let t = plan_token(r#"Satzungsbeschluss fuer das Vorhaben "Windpark Suedfeld Erweiterung""#);
        assert_eq!(t.as_deref(), Some("Windpark Suedfeld Erweiterung"));
    }

    #[test]
    fn parcel_token_extracts_triple() {
        let t = parcel_token("gelegen in Gemarkung Musterdorf, Flur 3, Flurstueck 12", None);
        assert_eq!(t.as_deref(), Some("musterdorf|3|12"));
    }

    #[test]
    fn parcel_token_equal_across_different_titles() {
        let a = parcel_token("Antrag fuer Gemarkung X, Flur 3, Flurstueck 12", None);
        let b = parcel_token("Stellungnahme betreffend Gemarkung X, Flur 3, Flurstueck 12", None);
        assert_eq!(a, b);
        assert!(a.is_some());
    }

    #[test]
    fn developer_norm_strips_legal_suffix() {
        assert_eq!(developer_norm("Muster Energie GmbH").as_deref(), Some("muster energie"));
        assert_eq!(developer_norm("Beispiel Speicher AG").as_deref(), Some("beispiel speicher"));
    }

    #[test]
    fn title_signature_drops_stopwords_and_short_tokens() {
        let sig = title_signature("Satzung der Stadt ueber die Bekanntmachung des Windparks");
        assert!(!sig.contains("der"));
        assert!(!sig.contains("stadt"));
        assert!(sig.contains("windparks"));
    }

    #[test]
    fn jaccard_similarity_of_identical_sets_is_one() {
        let a: HashSet<String> = ["alpha".into(), "beta".into()].into_iter().collect();
        assert_eq!(jaccard(&a, &a.clone()), 1.0);
    }

    #[test]
    fn jaccard_similarity_threshold_example() {
        let a: HashSet<String> = ["batteriespeicheranlage".into(), "metzdorf".into(), "aufstellungsbeschluss".into()].into_iter().collect();
        let b: HashSet<String> = ["batteriespeicheranlage".into(), "metzdorf".into()].into_iter().collect();
        assert!(jaccard(&a, &b) >= 0.6);
    }
}
