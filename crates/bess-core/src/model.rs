//! Data model for the discovery → extraction → classification → entity-resolution
//! pipeline: municipality seeds, jobs, candidates, sources, documents, field-level
//! extractions, procedures, project entities, and crawl stats.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

uuid_id!(CandidateId);
uuid_id!(SourceId);
uuid_id!(DocumentId);
uuid_id!(ExtractionId);
uuid_id!(ProcedureId);
uuid_id!(ProjectEntityId);

/// Content hash identity for a document. Same bytes ⇒ same document, regardless of URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }
}

/// Stable procedure identity, derived from the one centralized function so every
/// caller produces the same id for the same logical procedure.
///
/// `key_tokens` should be the sorted, deduplicated set of tokens that distinguish
/// this procedure from others sharing the same title_norm/municipality (e.g. a
/// plan_token or parcel_token) — callers decide what's distinguishing, this
/// function only guarantees a stable hash over whatever they pass.
pub fn make_procedure_id(title_norm: &str, municipality_key: &str, key_tokens: &[String]) -> ProcedureId {
    let mut hasher = Sha256::new();
    hasher.update(title_norm.as_bytes());
    hasher.update(b"\0");
    hasher.update(municipality_key.as_bytes());
    for token in key_tokens {
        hasher.update(b"\0");
        hasher.update(token.as_bytes());
    }
    let digest = hasher.finalize();
    // Fold the sha256 digest into a UUID so ProcedureId stays a Uuid newtype like
    // every other id in this model, while remaining a pure function of the inputs.
    let bytes: [u8; 16] = digest[0..16].try_into().expect("sha256 digest is 32 bytes");
    ProcedureId(Uuid::from_bytes(bytes))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Fast,
    Deep,
}

/// Immutable seed row for a municipality to crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MunicipalitySeed {
    pub key: String,
    pub name: String,
    pub county: String,
    pub state: String,
    pub official_website_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiscoverySource {
    Ris,
    Amtsblatt,
    MunicipalWebsite,
    Landkreis,
    Diplanung,
    Xplanung,
}

/// A job payload as it travels through the queue. Mirrors the wire shape exactly
/// (`type` tag, flat fields) rather than an internal enum-with-struct-variants
/// shape, since this is the literal thing that gets serialized onto the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Job {
    Municipality(JobCommon),
    DiscoveryRIS(JobCommon),
    DiscoveryGazette(JobCommon),
    DiscoveryMunicipal(JobCommon),
    Extraction(ExtractionJob),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCommon {
    pub run_id: String,
    pub municipality_key: String,
    pub municipality_name: String,
    pub entrypoint: Option<String>,
    pub mode: Mode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionJob {
    #[serde(flatten)]
    pub common: JobCommon,
    pub candidate_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CandidateStatus {
    Pending,
    Extracting,
    Done,
    Skipped,
    Error,
}

/// A lightweight discovery hit, scored by the prefilter, consumed at most once by
/// extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub run_id: String,
    pub municipality_key: String,
    pub discovery_source: DiscoverySource,
    pub title: String,
    pub url: String,
    pub date: Option<NaiveDate>,
    pub doc_urls: Vec<String>,
    pub prefilter_score: f32,
    pub status: CandidateStatus,
}

impl Candidate {
    /// A candidate is eligible for extraction iff its score met the
    /// source/mode-specific threshold at prefilter time.
    pub fn is_eligible(&self, threshold: f32) -> bool {
        self.prefilter_score >= threshold
    }
}

/// An audit-only or procedure-evidencing fetch record. `procedure_id = None` marks
/// a container or rejected item — audit trail without a procedure attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub procedure_id: Option<ProcedureId>,
    pub source_url: String,
    pub retrieved_at: DateTime<Utc>,
    pub http_status: u16,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub discovery_source: DiscoverySource,
    pub discovery_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mime {
    Html,
    Pdf,
    Other,
}

/// A content-addressed fetched document. Identity is `content_sha256`, not the
/// URL it was fetched from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub source_id: SourceId,
    pub content_sha256: ContentHash,
    pub bytes: u64,
    pub mime: Mime,
    pub storage_path: String,
    pub has_text_layer: bool,
    pub page_map: Option<Vec<u32>>,
    pub extracted_text: String,
}

/// A single field-level extraction. Append-only per (document, field, method).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub id: ExtractionId,
    pub document_id: DocumentId,
    pub field: String,
    pub value: String,
    pub method: String,
    pub evidence_snippet: String,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcedureType {
    BplanAufstellung,
    BplanFruehzeitig31,
    BplanAuslegung32,
    BplanSatzung,
    BplanOther,
    PermitBauvorbescheid,
    PermitBaugenehmigung,
    Permit36Einvernehmen,
    PermitOther,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegalBasis {
    #[serde(rename = "§34")]
    Para34,
    #[serde(rename = "§35")]
    Para35,
    #[serde(rename = "§36")]
    Para36,
    #[serde(rename = "unknown")]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectComponents {
    PvBess,
    WindBess,
    BessOnly,
    OtherUnclear,
}

/// A classified, persisted planning procedure. Only created when
/// `is_valid_procedure` holds; container items are stored as [`Source`] only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Procedure {
    pub id: ProcedureId,
    pub title: String,
    pub title_norm: String,
    pub municipality_key: String,
    pub state: String,
    pub county: String,
    pub procedure_type: ProcedureType,
    pub legal_basis: LegalBasis,
    pub project_components: ProjectComponents,
    pub ambiguity_flag: bool,
    pub review_recommended: bool,
    pub confidence: f32,
    pub bess_score: f32,
    pub grid_score: f32,
    pub decision_date: Option<NaiveDate>,
    pub site_location_raw: Option<String>,
    pub geometry: Option<String>,
    pub bbox: Option<[f64; 4]>,
    pub developer_company: Option<String>,
    pub capacity_mw: Option<f64>,
    pub capacity_mwh: Option<f64>,
    pub area_hectares: Option<f64>,
    pub evidence_snippets: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaturityStage {
    Discovered,
    BplanAufstellung,
    BplanAuslegung,
    BplanSatzung,
    Permit36,
    PermitBauvorbescheid,
    PermitBaugenehmigung,
}

impl MaturityStage {
    /// Maps a procedure type onto the maturity ladder. Procedure types with no
    /// rung of their own (BPLAN_OTHER, PERMIT_OTHER, UNKNOWN,
    /// BPLAN_FRUEHZEITIG_3_1) stay at `DISCOVERED` — they're real procedures, just
    /// not a step the ladder distinguishes.
    pub fn from_procedure_type(pt: ProcedureType) -> Self {
        match pt {
            ProcedureType::BplanAufstellung => Self::BplanAufstellung,
            ProcedureType::BplanAuslegung32 => Self::BplanAuslegung,
            ProcedureType::BplanSatzung => Self::BplanSatzung,
            ProcedureType::Permit36Einvernehmen => Self::Permit36,
            ProcedureType::PermitBauvorbescheid => Self::PermitBauvorbescheid,
            ProcedureType::PermitBaugenehmigung => Self::PermitBaugenehmigung,
            ProcedureType::BplanFruehzeitig31
            | ProcedureType::BplanOther
            | ProcedureType::PermitOther
            | ProcedureType::Unknown => Self::Discovered,
        }
    }
}

/// The canonical entity that one or more procedures resolve to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEntity {
    pub id: ProjectEntityId,
    pub municipality_key: String,
    pub canonical_project_name: String,
    pub maturity_stage: MaturityStage,
    pub legal_basis_best: LegalBasis,
    pub project_components_best: ProjectComponents,
    pub developer_company_best: Option<String>,
    pub site_location_best: Option<String>,
    pub capacity_mw_best: Option<f64>,
    pub capacity_mwh_best: Option<f64>,
    pub area_hectares_best: Option<f64>,
    pub first_seen_date: NaiveDate,
    pub last_seen_date: NaiveDate,
    pub max_confidence: f32,
    pub needs_review: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchLevel {
    Parcel,
    Plan,
    DevTitle,
    TitleSig,
    #[serde(rename = "§36_NEW")]
    Para36New,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectProcedureLink {
    pub procedure_id: ProcedureId,
    pub project_id: ProjectEntityId,
    pub match_level: MatchLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceStatus {
    Success,
    ErrorSsl,
    ErrorNetwork,
    ErrorOther,
    NotRun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryDiagnostics {
    pub method: String,
    pub attempted_urls: Vec<String>,
    pub failed_urls: HashMap<String, String>,
    pub reason_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStatsCounts {
    pub candidates_found: u32,
    pub procedures_saved: u32,
    pub procedures_skipped: u32,
    pub source_status: SourceStatus,
    pub error_message: Option<String>,
    pub discovery_diagnostics: Option<DiscoveryDiagnostics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStats {
    pub run_id: String,
    pub municipality_key: String,
    pub source_type: DiscoverySource,
    pub counts: CrawlStatsCounts,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_identity_for_same_bytes() {
        let a = ContentHash::of_bytes(b"same bytes");
        let b = ContentHash::of_bytes(b"same bytes");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_differs_for_different_bytes() {
        let a = ContentHash::of_bytes(b"alpha");
        let b = ContentHash::of_bytes(b"beta");
        assert_ne!(a, b);
    }

    #[test]
    fn make_procedure_id_is_stable() {
        let tokens = vec!["bp-12-2024".to_string()];
        let a = make_procedure_id("bebauungsplan nr. 12/2024", "musterstadt", &tokens);
        let b = make_procedure_id("bebauungsplan nr. 12/2024", "musterstadt", &tokens);
        assert_eq!(a, b);
    }

    #[test]
    fn make_procedure_id_distinguishes_inputs() {
        let tokens = vec!["bp-12-2024".to_string()];
        let a = make_procedure_id("bebauungsplan nr. 12/2024", "musterstadt", &tokens);
        let b = make_procedure_id("bebauungsplan nr. 13/2024", "musterstadt", &tokens);
        assert_ne!(a, b);
    }

    #[test]
    fn maturity_ladder_orders_as_specified() {
        assert!(MaturityStage::Discovered < MaturityStage::BplanAufstellung);
        assert!(MaturityStage::BplanAufstellung < MaturityStage::BplanAuslegung);
        assert!(MaturityStage::BplanAuslegung < MaturityStage::BplanSatzung);
        assert!(MaturityStage::BplanSatzung < MaturityStage::Permit36);
        assert!(MaturityStage::Permit36 < MaturityStage::PermitBauvorbescheid);
        assert!(MaturityStage::PermitBauvorbescheid < MaturityStage::PermitBaugenehmigung);
    }

    #[test]
    fn candidate_eligibility_is_threshold_inclusive() {
        let candidate = Candidate {
            id: CandidateId::new(),
            run_id: "run-1".into(),
            municipality_key: "musterstadt".into(),
            discovery_source: DiscoverySource::Ris,
            title: "t".into(),
            url: "https://example.org".into(),
            date: None,
            doc_urls: vec![],
            prefilter_score: 0.35,
            status: CandidateStatus::Pending,
        };
        assert!(candidate.is_eligible(0.35));
        assert!(!candidate.is_eligible(0.351));
    }

    #[test]
    fn job_serializes_with_type_tag() {
        let job = Job::DiscoveryRIS(JobCommon {
            run_id: "run-1".into(),
            municipality_key: "musterstadt".into(),
            municipality_name: "Musterstadt".into(),
            entrypoint: None,
            mode: Mode::Fast,
        });
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["type"], "DiscoveryRIS");
        assert_eq!(json["mode"], "fast");
    }
}
