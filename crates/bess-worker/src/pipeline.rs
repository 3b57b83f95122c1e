//! Orchestrates one municipality end to end: fan out to the three discovery
//! adapters, prefilter-gate their candidates into extraction, run the
//! classifier, persist, and resolve into project entities.

use chrono::Utc;
use tracing::{info, warn};

use bess_core::classifier::ClassifierResult;
use bess_core::model::{
    Candidate, Document, DocumentId, DiscoverySource, Mime, Mode, MunicipalitySeed, Procedure, ProjectEntity, ProjectEntityId,
    ProjectProcedureLink, Source, SourceId, SourceStatus,
};
use bess_core::{classifier, make_procedure_id, normalize_text, prefilter_threshold};
use bess_discovery::{amtsblatt, municipal, ris, Diagnostics, ReasonCode};
use bess_http::HttpClient;
use bess_pdf::{ExtractMode, TextCache};
use bess_resolver::resolve::{resolve, ExistingProject, Resolution};
use bess_resolver::rollup::recompute as recompute_rollup;
use bess_resolver::signature::{developer_norm, parcel_token, plan_token, title_signature, Signature};
use bess_store::BessDao;

use crate::htmltext::html_to_text;
use crate::stats::{build_crawl_stats, log_municipality_summary};

const LOW_CONFIDENCE_FLOOR: f32 = 0.3;

pub struct Pipeline<'a> {
    pub client: &'a HttpClient,
    pub text_cache: &'a TextCache,
    pub dao: &'a dyn BessDao,
}

impl<'a> Pipeline<'a> {
    pub async fn run_municipality(&self, seed: &MunicipalitySeed, run_id: &str, mode: Mode) -> Vec<bess_core::model::CrawlStats> {
        let (ris_result, amts_result, muni_result) = tokio::join!(
            ris::discover(self.client, seed, run_id, mode),
            amtsblatt::discover(self.client, seed, run_id, mode),
            municipal::discover(self.client, seed, run_id, mode),
        );
        let (ris_candidates, ris_diag) = ris_result;
        let (amts_candidates, amts_diag) = amts_result;
        let (muni_candidates, muni_diag) = muni_result;

        let ris_stats = self.process_source(seed, run_id, mode, ris_candidates, &ris_diag).await;
        let amts_stats = self.process_source(seed, run_id, mode, amts_candidates, &amts_diag).await;
        let muni_stats = self.process_source(seed, run_id, mode, muni_candidates, &muni_diag).await;

        let all_stats = vec![ris_stats, amts_stats, muni_stats];
        if let Err(err) = self.dao.upsert_crawl_stats(&all_stats).await {
            warn!(error = %err, "failed to persist crawl stats");
        }
        log_municipality_summary(run_id, &seed.key, &all_stats);
        all_stats
    }

    async fn process_source(
        &self,
        seed: &MunicipalitySeed,
        run_id: &str,
        mode: Mode,
        candidates: Vec<Candidate>,
        diagnostics: &Diagnostics,
    ) -> bess_core::model::CrawlStats {
        let source_status = source_status_from_diagnostics(diagnostics, !candidates.is_empty());
        let candidates_found = candidates.len() as u32;

        if let Err(err) = self.dao.upsert_candidates(&candidates).await {
            warn!(error = %err, "failed to persist candidates");
        }

        let mut procedures_saved = 0u32;
        let mut procedures_skipped = 0u32;

        for candidate in &candidates {
            let threshold = prefilter_threshold(candidate.discovery_source, mode);
            if !candidate.is_eligible(threshold) {
                continue;
            }
            match self.extract_and_classify(candidate, mode).await {
                Ok(true) => procedures_saved += 1,
                Ok(false) => procedures_skipped += 1,
                Err(err) => {
                    warn!(url = %candidate.url, error = %err, "extraction failed for candidate");
                    procedures_skipped += 1;
                }
            }
        }

        build_crawl_stats(
            run_id,
            &seed.key,
            candidates.first().map(|c| c.discovery_source).unwrap_or(bess_core::model::DiscoverySource::MunicipalWebsite),
            candidates_found,
            procedures_saved,
            procedures_skipped,
            source_status,
            None,
            Some(diagnostics),
        )
    }

    /// Fetches the candidate's document, classifies it, and persists either a
    /// container-only audit `Source` or a full `Procedure` + project link.
    /// Returns `Ok(true)` iff a procedure was saved.
    async fn extract_and_classify(&self, candidate: &Candidate, mode: Mode) -> anyhow::Result<bool> {
        let fetch_url = candidate.doc_urls.first().cloned().unwrap_or_else(|| candidate.url.clone());

        // HEAD-before-GET size guard: a likely-PDF URL over the size limit is
        // skipped in fast mode rather than fetched in full.
        if mode == Mode::Fast && fetch_url.to_lowercase().ends_with(".pdf") && self.client.pdf_exceeds_size_guard(&fetch_url).await? {
            info!(url = %fetch_url, "SKIP_PDF_TOO_LARGE");
            return Ok(false);
        }

        let response = self.client.get(&fetch_url).await?;

        let is_pdf = fetch_url.to_lowercase().ends_with(".pdf") || response.body.starts_with(b"%PDF");
        let (text, has_text_layer, page_map, mime) = if is_pdf {
            let extract_mode = match mode {
                Mode::Fast => ExtractMode::Fast,
                Mode::Deep => ExtractMode::Deep,
            };
            let cache_key = bess_pdf::cache_key(&fetch_url, response.body.len() as u64);
            let extracted = match self.text_cache.get(&cache_key).await? {
                Some(cached) => cached,
                None => {
                    let extracted = bess_pdf::extract_text(&response.body, extract_mode)?;
                    self.text_cache.put(&cache_key, &extracted).await?;
                    extracted
                }
            };
            if !extracted.has_text_layer {
                warn!(url = %fetch_url, "OCR_NEEDED");
            }
            (extracted.text, extracted.has_text_layer, Some(extracted.page_map), Mime::Pdf)
        } else {
            (html_to_text(&String::from_utf8_lossy(&response.body)), true, None, Mime::Html)
        };

        let content_hash = bess_core::model::ContentHash::of_bytes(&response.body);
        let document_id = DocumentId::new();
        let document = Document {
            id: document_id,
            source_id: SourceId::new(),
            content_sha256: content_hash,
            bytes: response.body.len() as u64,
            mime,
            storage_path: format!("docs/{}", fetch_url),
            has_text_layer,
            page_map,
            extracted_text: text.clone(),
        };

        let result = classifier::classify(&text, &candidate.title, candidate.date, candidate.discovery_source);

        let source = Source {
            id: document.source_id,
            procedure_id: None,
            source_url: fetch_url.clone(),
            retrieved_at: Utc::now(),
            http_status: response.status,
            etag: None,
            last_modified: None,
            discovery_source: candidate.discovery_source,
            discovery_path: candidate.url.clone(),
        };

        if let Some(skip) = skip_reason(&result, candidate.discovery_source) {
            info!(url = %fetch_url, "{}", skip.as_str());
            self.dao.upsert_sources(&[source]).await?;
            self.dao.upsert_documents(&[document]).await?;
            return Ok(false);
        }

        let title_norm = normalize_text(&candidate.title).text;
        let signature = Signature {
            municipality_key: candidate.municipality_key.clone(),
            plan_token: plan_token(&candidate.title),
            parcel_token: parcel_token(&text, None),
            developer_norm: developer_norm(&text),
            title_signature: title_signature(&candidate.title),
        };
        let mut key_tokens: Vec<String> = [&signature.plan_token, &signature.parcel_token]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        key_tokens.sort();

        let procedure_id = make_procedure_id(&title_norm, &candidate.municipality_key, &key_tokens);
        let procedure = Procedure {
            id: procedure_id,
            title: candidate.title.clone(),
            title_norm,
            municipality_key: candidate.municipality_key.clone(),
            state: String::new(),
            county: String::new(),
            procedure_type: result.procedure_type,
            legal_basis: result.legal_basis,
            project_components: result.project_components,
            ambiguity_flag: result.ambiguity_flag,
            review_recommended: result.review_recommended,
            confidence: result.confidence,
            bess_score: 0.0,
            grid_score: 0.0,
            decision_date: candidate.date,
            site_location_raw: signature.parcel_token.clone(),
            geometry: None,
            bbox: None,
            developer_company: signature.developer_norm.clone(),
            capacity_mw: None,
            capacity_mwh: None,
            area_hectares: None,
            evidence_snippets: result.evidence_snippets.clone(),
            created_at: Utc::now(),
        };

        let linked_source = Source {
            procedure_id: Some(procedure_id),
            ..source
        };
        self.dao.upsert_sources(&[linked_source]).await?;
        self.dao.upsert_documents(&[document]).await?;
        self.dao.upsert_procedures(&[procedure.clone()]).await?;

        self.attach_to_project(&procedure, &signature).await?;
        Ok(true)
    }

    async fn attach_to_project(&self, procedure: &Procedure, signature: &Signature) -> anyhow::Result<()> {
        let existing_projects = self.dao.projects_for_municipality(&procedure.municipality_key).await?;

        let mut project_signatures: Vec<(ProjectEntityId, Signature)> = Vec::new();
        for project in &existing_projects {
            let linked = self.dao.procedures_for_project(project.id).await?;
            if let Some(sig) = representative_signature(&procedure.municipality_key, &linked) {
                project_signatures.push((project.id, sig));
            }
        }

        let candidates: Vec<ExistingProject<'_>> = project_signatures
            .iter()
            .map(|(project_id, sig)| ExistingProject { project_id: *project_id, signature: sig })
            .collect();

        let resolution = resolve(signature, procedure.procedure_type, &candidates);

        let project_id = match resolution {
            Resolution::Linked { project_id, .. } => project_id,
            Resolution::CreateNew { .. } => ProjectEntityId::new(),
        };
        let match_level = match resolution {
            Resolution::Linked { outcome, .. } => outcome.match_level,
            Resolution::CreateNew { match_level } => match_level,
        };

        let link = ProjectProcedureLink {
            procedure_id: procedure.id,
            project_id,
            match_level,
        };
        self.dao.upsert_project_procedure_links(&[link]).await?;

        let mut linked_procedures = self.dao.procedures_for_project(project_id).await?;
        if !linked_procedures.iter().any(|p| p.id == procedure.id) {
            linked_procedures.push(procedure.clone());
        }
        let refs: Vec<&Procedure> = linked_procedures.iter().collect();
        let plan_tokens: Vec<Option<&str>> = linked_procedures.iter().map(|_| None).collect();

        if let Some(rollup) = recompute_rollup(&refs, &plan_tokens) {
            let project = ProjectEntity {
                id: project_id,
                municipality_key: procedure.municipality_key.clone(),
                canonical_project_name: rollup.canonical_project_name,
                maturity_stage: rollup.maturity_stage,
                legal_basis_best: rollup.legal_basis_best,
                project_components_best: rollup.project_components_best,
                developer_company_best: rollup.developer_company_best,
                site_location_best: rollup.site_location_best,
                capacity_mw_best: rollup.capacity_mw_best,
                capacity_mwh_best: rollup.capacity_mwh_best,
                area_hectares_best: rollup.area_hectares_best,
                first_seen_date: rollup.first_seen_date,
                last_seen_date: rollup.last_seen_date,
                max_confidence: rollup.max_confidence,
                needs_review: rollup.needs_review,
            };
            self.dao.upsert_project_entities(&[project]).await?;
        }

        Ok(())
    }
}

/// Builds one signature representing a project's already-linked procedures,
/// for the resolver's candidate scan. `plan_token`/`title_signature` are
/// recomputed from title (pure functions); `parcel_token`/`developer_norm`
/// are read back from the fields a linked `Procedure` was persisted with,
/// since those are themselves the signature values computed at save time.
fn representative_signature(municipality_key: &str, linked: &[Procedure]) -> Option<Signature> {
    if linked.is_empty() {
        return None;
    }
    let parcel_tok = linked.iter().find_map(|p| p.site_location_raw.clone());
    let plan_tok = linked.iter().find_map(|p| plan_token(&p.title));
    let developer_tok = linked.iter().find_map(|p| p.developer_company.clone());
    let mut title_sig = std::collections::HashSet::new();
    for p in linked {
        title_sig.extend(title_signature(&p.title));
    }
    Some(Signature {
        municipality_key: municipality_key.to_string(),
        plan_token: plan_tok,
        parcel_token: parcel_tok,
        developer_norm: developer_tok,
        title_signature: title_sig,
    })
}

fn source_status_from_diagnostics(diagnostics: &Diagnostics, found_any: bool) -> SourceStatus {
    if found_any {
        return SourceStatus::Success;
    }
    match diagnostics.reason_code {
        ReasonCode::AllUrls404 => SourceStatus::ErrorNetwork,
        ReasonCode::SslBlocked => SourceStatus::ErrorSsl,
        ReasonCode::NoSeedUrl => SourceStatus::ErrorOther,
        ReasonCode::NoMarkersFound | ReasonCode::FoundButEmpty | ReasonCode::Found => SourceStatus::Success,
    }
}

/// The three stable skip outcomes a classified candidate can hit before it
/// would otherwise become a persisted `Procedure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    Container,
    NoProcedureSignal,
    LowConfidenceNoSignal,
}

impl SkipReason {
    fn as_str(self) -> &'static str {
        match self {
            SkipReason::Container => "SKIP_CONTAINER",
            SkipReason::NoProcedureSignal => "SKIP_NO_PROCEDURE_SIGNAL",
            SkipReason::LowConfidenceNoSignal => "SKIP_LOW_CONFIDENCE_NO_SIGNAL",
        }
    }
}

/// Decides whether a classified candidate should be skipped (audited as a
/// bare `Source`/`Document` with no `Procedure`) rather than persisted. Pure:
/// a container classification, or the absence of any procedure signal, can
/// never fall through to persistence, regardless of discovery source.
fn skip_reason(result: &ClassifierResult, discovery_source: DiscoverySource) -> Option<SkipReason> {
    // `is_valid_procedure` alone only arbitrates the container exception; a
    // document the classifier never found a BESS/procedure signal in at all
    // must still be rejected regardless of how that check reads.
    let valid = result.relevant && classifier::is_valid_procedure(result, discovery_source, result.relevant);
    if !valid {
        return Some(if result.is_container {
            SkipReason::Container
        } else {
            SkipReason::NoProcedureSignal
        });
    }

    // Rule R3 (speicher + grid signals, no explicit BESS/procedure term) is the
    // weakest path to `relevant = true`; below the confidence floor it's too
    // thin to persist as a procedure on its own.
    if result.ambiguity_flag && result.confidence < LOW_CONFIDENCE_FLOOR {
        return Some(SkipReason::LowConfidenceNoSignal);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use bess_core::model::{LegalBasis, ProcedureType, ProjectComponents};

    fn result(relevant: bool, is_container: bool, ambiguity_flag: bool, confidence: f32) -> ClassifierResult {
        ClassifierResult {
            relevant,
            ambiguity_flag,
            procedure_type: ProcedureType::BplanAufstellung,
            legal_basis: LegalBasis::Para34,
            project_components: ProjectComponents::BessOnly,
            confidence,
            review_recommended: false,
            evidence_snippets: Vec::new(),
            is_container,
        }
    }

    #[test]
    fn container_never_falls_through_to_persistence() {
        let r = result(false, true, false, 0.9);
        assert_eq!(skip_reason(&r, DiscoverySource::MunicipalWebsite), Some(SkipReason::Container));
    }

    #[test]
    fn no_signal_non_container_is_skipped() {
        let r = result(false, false, false, 0.1);
        assert_eq!(skip_reason(&r, DiscoverySource::MunicipalWebsite), Some(SkipReason::NoProcedureSignal));
    }

    #[test]
    fn low_confidence_ambiguous_match_is_skipped() {
        let r = result(true, false, true, LOW_CONFIDENCE_FLOOR - 0.01);
        assert_eq!(skip_reason(&r, DiscoverySource::MunicipalWebsite), Some(SkipReason::LowConfidenceNoSignal));
    }

    #[test]
    fn confident_relevant_match_is_not_skipped() {
        let r = result(true, false, false, 0.9);
        assert_eq!(skip_reason(&r, DiscoverySource::MunicipalWebsite), None);
    }

    #[test]
    fn ambiguous_but_above_floor_is_not_skipped() {
        let r = result(true, false, true, LOW_CONFIDENCE_FLOOR + 0.1);
        assert_eq!(skip_reason(&r, DiscoverySource::MunicipalWebsite), None);
    }
}
