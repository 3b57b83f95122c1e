//! Keyword lattice: frozen term sets that are the only ground truth for
//! relevance. Matching is case-sensitive against already-normalized text and
//! tolerates a single inserted whitespace inside a term (PDFs often split words
//! across a line break), but never bridges across separate words.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CoreError, Result};

/// One compiled term: matches the term verbatim, or with a single optional
/// whitespace inserted between any two adjacent characters of a multi-word term.
#[derive(Debug, Clone)]
pub struct Term {
    pub text: &'static str,
    regex: Regex,
}

impl Term {
    fn compile(text: &'static str) -> Result<Self> {
        let pattern = whitespace_tolerant_pattern(text);
        let regex = Regex::new(&pattern).map_err(|source| CoreError::LatticeCompile {
            term: text.to_string(),
            source,
        })?;
        Ok(Self { text, regex })
    }

    pub fn is_match(&self, normalized_text: &str) -> bool {
        self.regex.is_match(normalized_text)
    }

    /// Byte range (in `normalized_text`) of the earliest match, if any.
    pub fn find_earliest(&self, normalized_text: &str) -> Option<std::ops::Range<usize>> {
        self.regex.find(normalized_text).map(|m| m.range())
    }
}

/// Builds a regex pattern that matches `term` literally but tolerates a single
/// `\s?` between any two adjacent characters — including across the existing
/// space between words, so "b plan" and "b  plan" both still match "b-plan"'s
/// neighbors without letting an entirely different word slip in between.
fn whitespace_tolerant_pattern(term: &str) -> String {
    let chars: Vec<char> = term.chars().collect();
    let mut pattern = String::from(r"(?i)");
    for (i, ch) in chars.iter().enumerate() {
        pattern.push_str(&regex::escape(&ch.to_string()));
        if i + 1 < chars.len() {
            pattern.push_str(r"\s?");
        }
    }
    pattern
}

/// A named, frozen set of terms.
pub struct TermSet {
    pub name: &'static str,
    pub terms: Vec<Term>,
}

impl TermSet {
    fn build(name: &'static str, words: &[&'static str]) -> Result<Self> {
        let terms = words
            .iter()
            .map(|w| Term::compile(w))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { name, terms })
    }

    pub fn any_match(&self, normalized_text: &str) -> bool {
        self.terms.iter().any(|t| t.is_match(normalized_text))
    }

    pub fn matches(&self, normalized_text: &str) -> Vec<&Term> {
        self.terms.iter().filter(|t| t.is_match(normalized_text)).collect()
    }

    pub fn count_distinct_matches(&self, normalized_text: &str) -> usize {
        self.matches(normalized_text).len()
    }
}

macro_rules! term_set {
    ($name:ident, $label:expr, [$($word:expr),+ $(,)?]) => {
        pub static $name: Lazy<TermSet> =
            Lazy::new(|| TermSet::build($label, &[$($word),+]).expect("static term set compiles"));
    };
}

term_set!(
    BESS_EXPLICIT,
    "BESS_EXPLICIT",
    [
        "batteriespeicher",
        "energiespeicher",
        "stromspeicher",
        "battery energy storage",
        "bess",
    ]
);

term_set!(
    BESS_CONTAINER_GRID,
    "BESS_CONTAINER_GRID",
    ["containeranlage", "anlage zur energiespeicherung", "lithium", "li-ion"]
);

term_set!(PLANNING_STRONG, "PLANNING_STRONG", ["bebauungsplan", "b-plan", "bauleitplanung"]);

term_set!(
    PLANNING_STEPS,
    "PLANNING_STEPS",
    ["aufstellungsbeschluss", "fruehzeitige beteiligung", "auslegung", "satzungsbeschluss"]
);

term_set!(
    PERMIT_STRONG,
    "PERMIT_STRONG",
    [
        "bauvorbescheid",
        "bauvoranfrage",
        "bauvorantrag",
        "baugenehmigung",
        "kenntnisnahme",
        "antrag auf errichtung",
        "standortgemeinde",
        "einvernehmen §36",
        "§36",
    ]
);

term_set!(
    GRID_STRONG,
    "GRID_STRONG",
    ["umspannwerk", "110 kv", "220 kv", "380 kv", "hoechstspannung", "hochspannung"]
);

term_set!(
    GRID_MEDIUM,
    "GRID_MEDIUM",
    ["mittelspannung", "20 kv", "30 kv", "schaltanlage", "trafostation", "netzanschluss"]
);

term_set!(
    NEGATIVE_STORAGE,
    "NEGATIVE_STORAGE",
    ["waermespeicher", "wasserspeicher", "datenspeicher", "gasspeicher", "pufferspeicher", "eisspeicher"]
);

term_set!(
    ZONING,
    "ZONING",
    ["sondergebiet", "gewerbegebiet", "industriegebiet", "flaechennutzungsplan", "flurstueck", "gemarkung"]
);

term_set!(ENERGY_CONTEXT, "ENERGY_CONTEXT", ["pv", "photovoltaik", "wind"]);

/// Terms used by the classifier's procedure-signal check for `is_valid_procedure`
/// clause (b): RIS items that mention one of these are kept even without an
/// explicit BESS signal.
term_set!(
    PROCEDURE_SIGNAL,
    "PROCEDURE_SIGNAL",
    ["einvernehmen", "stellungnahme", "bauantrag", "bauvoranfrage", "vorhaben"]
);

/// A single legal-basis term, distinct from the term sets above because the
/// classifier needs to know *which* paragraph matched, not just whether one did.
pub static LEGAL_BASIS_TERMS: Lazy<Vec<(&'static str, Term)>> = Lazy::new(|| {
    vec![
        ("§34", Term::compile("§34").expect("static term compiles")),
        ("§35", Term::compile("§35").expect("static term compiles")),
        ("§36", Term::compile("§36").expect("static term compiles")),
    ]
});

/// Titles that mark a document as a container (gazette issue / bulletin wrapper)
/// rather than a procedure in its own right, used by the prefilter's container
/// penalty and the classifier's container-validity check.
pub static CONTAINER_TITLE_MARKERS: &[&str] = &["amtsblatt nr.", "bekanntmachung der stadt", "bekanntmachungsblatt"];

/// Eagerly compiles every term set. Call once at process startup (e.g. from the
/// worker's `main`) so a malformed term fails fast instead of panicking lazily
/// on first classifier call; harmless to skip since every access already forces
/// the `Lazy` cells.
pub fn warm() {
    Lazy::force(&BESS_EXPLICIT);
    Lazy::force(&BESS_CONTAINER_GRID);
    Lazy::force(&PLANNING_STRONG);
    Lazy::force(&PLANNING_STEPS);
    Lazy::force(&PERMIT_STRONG);
    Lazy::force(&GRID_STRONG);
    Lazy::force(&GRID_MEDIUM);
    Lazy::force(&NEGATIVE_STORAGE);
    Lazy::force(&ZONING);
    Lazy::force(&ENERGY_CONTEXT);
    Lazy::force(&PROCEDURE_SIGNAL);
    Lazy::force(&LEGAL_BASIS_TERMS);
}

/// Named handle for referring to a matched term set without borrowing the
/// `Lazy` statics directly, useful for evidence-snippet bookkeeping in the
/// classifier (`HashMap<TermSetName, Vec<&Term>>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermSetName {
    BessExplicit,
    BessContainerGrid,
    PlanningStrong,
    PlanningSteps,
    PermitStrong,
    GridStrong,
    GridMedium,
    NegativeStorage,
    Zoning,
    EnergyContext,
}

pub fn by_name(name: TermSetName) -> &'static TermSet {
    match name {
        TermSetName::BessExplicit => &BESS_EXPLICIT,
        TermSetName::BessContainerGrid => &BESS_CONTAINER_GRID,
        TermSetName::PlanningStrong => &PLANNING_STRONG,
        TermSetName::PlanningSteps => &PLANNING_STEPS,
        TermSetName::PermitStrong => &PERMIT_STRONG,
        TermSetName::GridStrong => &GRID_STRONG,
        TermSetName::GridMedium => &GRID_MEDIUM,
        TermSetName::NegativeStorage => &NEGATIVE_STORAGE,
        TermSetName::Zoning => &ZONING,
        TermSetName::EnergyContext => &ENERGY_CONTEXT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    #[test]
    fn matches_exact_term() {
        let n = normalize("Das ist ein Batteriespeicher.");
        assert!(BESS_EXPLICIT.any_match(&n.text));
    }

    #[test]
    fn tolerates_single_inserted_whitespace() {
        let n = normalize("Die B  Plan Nr. 4 betrifft...");
        // "b-plan" with a literal hyphen won't match "b plan" directly, but
        // "bebauungsplan" split across a line break should still match.
        let split = normalize("Bebauungs plan Nr. 4");
        assert!(PLANNING_STRONG.any_match(&split.text));
        let _ = n;
    }

    #[test]
    fn does_not_bridge_separate_words() {
        // "energiespeicher" must not match when "energie" and "speicher" are
        // separated by an unrelated word.
        let n = normalize("energie und kein speicher hier");
        assert!(!BESS_EXPLICIT.any_match(&n.text));
    }

    #[test]
    fn negative_storage_is_distinct_from_bess_explicit() {
        let n = normalize("Das ist ein Waermespeicher fuer Fernwaerme.");
        assert!(NEGATIVE_STORAGE.any_match(&n.text));
        assert!(!BESS_EXPLICIT.any_match(&n.text));
    }

    #[test]
    fn count_distinct_matches_counts_terms_not_occurrences() {
        let n = normalize("Umspannwerk und Trafostation und Schaltanlage am Netzanschluss");
        assert_eq!(GRID_MEDIUM.count_distinct_matches(&n.text), 2);
    }

    #[test]
    fn legal_basis_terms_detect_tolerant_of_split() {
        let n = normalize("Einvernehmen gemaess § 36 BauGB");
        let hit = LEGAL_BASIS_TERMS.iter().find(|(_, t)| t.is_match(&n.text));
        assert!(hit.is_some());
    }
}
