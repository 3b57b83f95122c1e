//! In-memory DAO used by tests and by `bess-worker` when no `DATABASE_URL` is
//! configured. Keyed maps guarded by a single `RwLock` each; upserts key on the
//! entity's own id, so replaying a batch is naturally idempotent.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use bess_core::model::{
    Candidate, CandidateId, CrawlStats, Document, DocumentId, Extraction, ExtractionId, Procedure, ProcedureId, ProjectEntity,
    ProjectEntityId, ProjectProcedureLink, Source, SourceId,
};

use crate::error::Result;
use crate::traits::BessDao;

#[derive(Default)]
pub struct MemoryDao {
    candidates: RwLock<HashMap<CandidateId, Candidate>>,
    sources: RwLock<HashMap<SourceId, Source>>,
    documents: RwLock<HashMap<DocumentId, Document>>,
    extractions: RwLock<HashMap<ExtractionId, Extraction>>,
    procedures: RwLock<HashMap<ProcedureId, Procedure>>,
    projects: RwLock<HashMap<ProjectEntityId, ProjectEntity>>,
    /// Keyed by (procedure_id, project_id) since a link is the pair itself.
    links: RwLock<HashMap<(ProcedureId, ProjectEntityId), ProjectProcedureLink>>,
    /// Keyed by (run_id, municipality_key, source_type) — one row per
    /// municipality/source within a run, overwritten as the run progresses.
    crawl_stats: RwLock<HashMap<String, CrawlStats>>,
}

impl MemoryDao {
    pub fn new() -> Self {
        Self::default()
    }
}

fn crawl_stats_key(stats: &CrawlStats) -> String {
    format!("{}\0{}\0{:?}", stats.run_id, stats.municipality_key, stats.source_type)
}

#[async_trait]
impl BessDao for MemoryDao {
    async fn upsert_candidates(&self, candidates: &[Candidate]) -> Result<()> {
        let mut map = self.candidates.write().expect("lock not poisoned");
        for c in candidates {
            map.insert(c.id, c.clone());
        }
        Ok(())
    }

    async fn upsert_sources(&self, sources: &[Source]) -> Result<()> {
        let mut map = self.sources.write().expect("lock not poisoned");
        for s in sources {
            map.insert(s.id, s.clone());
        }
        Ok(())
    }

    async fn upsert_documents(&self, documents: &[Document]) -> Result<()> {
        let mut map = self.documents.write().expect("lock not poisoned");
        for d in documents {
            map.insert(d.id, d.clone());
        }
        Ok(())
    }

    async fn upsert_extractions(&self, extractions: &[Extraction]) -> Result<()> {
        let mut map = self.extractions.write().expect("lock not poisoned");
        for e in extractions {
            map.insert(e.id, e.clone());
        }
        Ok(())
    }

    async fn upsert_procedures(&self, procedures: &[Procedure]) -> Result<()> {
        let mut map = self.procedures.write().expect("lock not poisoned");
        for p in procedures {
            map.insert(p.id, p.clone());
        }
        Ok(())
    }

    async fn upsert_project_entities(&self, projects: &[ProjectEntity]) -> Result<()> {
        let mut map = self.projects.write().expect("lock not poisoned");
        for p in projects {
            map.insert(p.id, p.clone());
        }
        Ok(())
    }

    async fn upsert_project_procedure_links(&self, links: &[ProjectProcedureLink]) -> Result<()> {
        let mut map = self.links.write().expect("lock not poisoned");
        for l in links {
            map.insert((l.procedure_id, l.project_id), l.clone());
        }
        Ok(())
    }

    async fn upsert_crawl_stats(&self, stats: &[CrawlStats]) -> Result<()> {
        let mut map = self.crawl_stats.write().expect("lock not poisoned");
        for s in stats {
            map.insert(crawl_stats_key(s), s.clone());
        }
        Ok(())
    }

    async fn procedures_for_municipality(&self, municipality_key: &str) -> Result<Vec<Procedure>> {
        let map = self.procedures.read().expect("lock not poisoned");
        Ok(map.values().filter(|p| p.municipality_key == municipality_key).cloned().collect())
    }

    async fn projects_for_municipality(&self, municipality_key: &str) -> Result<Vec<ProjectEntity>> {
        let map = self.projects.read().expect("lock not poisoned");
        Ok(map.values().filter(|p| p.municipality_key == municipality_key).cloned().collect())
    }

    async fn procedures_for_project(&self, project_id: ProjectEntityId) -> Result<Vec<Procedure>> {
        let links = self.links.read().expect("lock not poisoned");
        let procedure_ids: Vec<ProcedureId> = links.values().filter(|l| l.project_id == project_id).map(|l| l.procedure_id).collect();
        let procedures = self.procedures.read().expect("lock not poisoned");
        Ok(procedure_ids.into_iter().filter_map(|id| procedures.get(&id).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bess_core::model::{CandidateStatus, DiscoverySource};

    fn candidate(id: CandidateId) -> Candidate {
        Candidate {
            id,
            run_id: "run-1".into(),
            municipality_key: "musterstadt".into(),
            discovery_source: DiscoverySource::Ris,
            title: "Title".into(),
            url: "https://example.de".into(),
            date: None,
            doc_urls: vec![],
            prefilter_score: 0.5,
            status: CandidateStatus::Pending,
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_replay() {
        let dao = MemoryDao::new();
        let id = CandidateId::new();
        let c = candidate(id);
        dao.upsert_candidates(&[c.clone()]).await.unwrap();
        dao.upsert_candidates(&[c]).await.unwrap();
        let map = dao.candidates.read().unwrap();
        assert_eq!(map.len(), 1);
    }
}
