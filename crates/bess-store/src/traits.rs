//! The `BessDao` trait: one batch-upsert method per entity family. Every
//! implementation (in-memory or Postgres) must make upserts idempotent —
//! replaying the same batch twice must not duplicate rows or double-count
//! stats.

use async_trait::async_trait;

use bess_core::model::{Candidate, CrawlStats, Document, Extraction, Procedure, ProjectEntity, ProjectProcedureLink, Source};

use crate::error::Result;

#[async_trait]
pub trait BessDao: Send + Sync {
    async fn upsert_candidates(&self, candidates: &[Candidate]) -> Result<()>;
    async fn upsert_sources(&self, sources: &[Source]) -> Result<()>;
    async fn upsert_documents(&self, documents: &[Document]) -> Result<()>;
    async fn upsert_extractions(&self, extractions: &[Extraction]) -> Result<()>;
    async fn upsert_procedures(&self, procedures: &[Procedure]) -> Result<()>;
    async fn upsert_project_entities(&self, projects: &[ProjectEntity]) -> Result<()>;
    async fn upsert_project_procedure_links(&self, links: &[ProjectProcedureLink]) -> Result<()>;
    async fn upsert_crawl_stats(&self, stats: &[CrawlStats]) -> Result<()>;

    /// Procedures already linked to a project in `municipality_key`, used by the
    /// entity resolver to find match candidates for a newly classified
    /// procedure without the resolver needing to know about storage at all.
    async fn procedures_for_municipality(&self, municipality_key: &str) -> Result<Vec<Procedure>>;

    /// Existing project entities in a municipality, for resolver candidate scans.
    async fn projects_for_municipality(&self, municipality_key: &str) -> Result<Vec<ProjectEntity>>;

    /// All procedures currently linked to one project, for rollup recomputation.
    async fn procedures_for_project(&self, project_id: bess_core::model::ProjectEntityId) -> Result<Vec<Procedure>>;
}
