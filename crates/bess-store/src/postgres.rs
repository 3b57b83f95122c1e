//! Postgres-backed DAO. Each entity family gets one table keyed by its own id;
//! the full row is stored as JSONB alongside a handful of indexed columns used
//! by the resolver's municipality/project scans, so upserts stay a single
//! `INSERT ... ON CONFLICT (id) DO UPDATE` per row regardless of how the model
//! evolves.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::{debug, instrument};

use bess_core::model::{Candidate, CrawlStats, Document, Extraction, Procedure, ProjectEntity, ProjectEntityId, ProjectProcedureLink, Source};

use crate::error::{Result, StoreError};
use crate::traits::BessDao;

pub struct PostgresDao {
    pool: PgPool,
}

impl PostgresDao {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await.map_err(StoreError::Sqlx)?;
        let dao = Self { pool };
        dao.run_migrations().await?;
        Ok(dao)
    }

    #[instrument(skip(self))]
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bess_candidates (
                id UUID PRIMARY KEY,
                municipality_key TEXT NOT NULL,
                run_id TEXT NOT NULL,
                row JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bess_sources (
                id UUID PRIMARY KEY,
                procedure_id UUID,
                row JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bess_documents (
                id UUID PRIMARY KEY,
                content_sha256 TEXT NOT NULL,
                row JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bess_extractions (
                id UUID PRIMARY KEY,
                document_id UUID NOT NULL,
                row JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bess_procedures (
                id UUID PRIMARY KEY,
                municipality_key TEXT NOT NULL,
                row JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bess_procedures_municipality ON bess_procedures(municipality_key)")
            .execute(&self.pool)
            .await
            .ok();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bess_project_entities (
                id UUID PRIMARY KEY,
                municipality_key TEXT NOT NULL,
                row JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bess_projects_municipality ON bess_project_entities(municipality_key)")
            .execute(&self.pool)
            .await
            .ok();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bess_project_procedure_links (
                procedure_id UUID NOT NULL,
                project_id UUID NOT NULL,
                row JSONB NOT NULL,
                PRIMARY KEY (procedure_id, project_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bess_links_project ON bess_project_procedure_links(project_id)")
            .execute(&self.pool)
            .await
            .ok();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bess_crawl_stats (
                run_id TEXT NOT NULL,
                municipality_key TEXT NOT NULL,
                source_type TEXT NOT NULL,
                row JSONB NOT NULL,
                PRIMARY KEY (run_id, municipality_key, source_type)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("bess-store migrations applied");
        Ok(())
    }
}

#[async_trait]
impl BessDao for PostgresDao {
    async fn upsert_candidates(&self, candidates: &[Candidate]) -> Result<()> {
        for c in candidates {
            let row = serde_json::to_value(c)?;
            sqlx::query(
                r#"
                INSERT INTO bess_candidates (id, municipality_key, run_id, row)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (id) DO UPDATE SET row = EXCLUDED.row
                "#,
            )
            .bind(c.id.0)
            .bind(&c.municipality_key)
            .bind(&c.run_id)
            .bind(row)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn upsert_sources(&self, sources: &[Source]) -> Result<()> {
        for s in sources {
            let row = serde_json::to_value(s)?;
            sqlx::query(
                r#"
                INSERT INTO bess_sources (id, procedure_id, row)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET row = EXCLUDED.row
                "#,
            )
            .bind(s.id.0)
            .bind(s.procedure_id.map(|p| p.0))
            .bind(row)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn upsert_documents(&self, documents: &[Document]) -> Result<()> {
        for d in documents {
            let row = serde_json::to_value(d)?;
            sqlx::query(
                r#"
                INSERT INTO bess_documents (id, content_sha256, row)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET row = EXCLUDED.row
                "#,
            )
            .bind(d.id.0)
            .bind(&d.content_sha256.0)
            .bind(row)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn upsert_extractions(&self, extractions: &[Extraction]) -> Result<()> {
        for e in extractions {
            let row = serde_json::to_value(e)?;
            sqlx::query(
                r#"
                INSERT INTO bess_extractions (id, document_id, row)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET row = EXCLUDED.row
                "#,
            )
            .bind(e.id.0)
            .bind(e.document_id.0)
            .bind(row)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn upsert_procedures(&self, procedures: &[Procedure]) -> Result<()> {
        for p in procedures {
            let row = serde_json::to_value(p)?;
            sqlx::query(
                r#"
                INSERT INTO bess_procedures (id, municipality_key, row)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET row = EXCLUDED.row
                "#,
            )
            .bind(p.id.0)
            .bind(&p.municipality_key)
            .bind(row)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn upsert_project_entities(&self, projects: &[ProjectEntity]) -> Result<()> {
        for p in projects {
            let row = serde_json::to_value(p)?;
            sqlx::query(
                r#"
                INSERT INTO bess_project_entities (id, municipality_key, row)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET row = EXCLUDED.row
                "#,
            )
            .bind(p.id.0)
            .bind(&p.municipality_key)
            .bind(row)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn upsert_project_procedure_links(&self, links: &[ProjectProcedureLink]) -> Result<()> {
        for l in links {
            let row = serde_json::to_value(l)?;
            sqlx::query(
                r#"
                INSERT INTO bess_project_procedure_links (procedure_id, project_id, row)
                VALUES ($1, $2, $3)
                ON CONFLICT (procedure_id, project_id) DO UPDATE SET row = EXCLUDED.row
                "#,
            )
            .bind(l.procedure_id.0)
            .bind(l.project_id.0)
            .bind(row)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn upsert_crawl_stats(&self, stats: &[CrawlStats]) -> Result<()> {
        for s in stats {
            let row = serde_json::to_value(s)?;
            let source_type = serde_json::to_value(s.source_type)?.as_str().unwrap_or("unknown").to_string();
            sqlx::query(
                r#"
                INSERT INTO bess_crawl_stats (run_id, municipality_key, source_type, row)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (run_id, municipality_key, source_type) DO UPDATE SET row = EXCLUDED.row
                "#,
            )
            .bind(&s.run_id)
            .bind(&s.municipality_key)
            .bind(source_type)
            .bind(row)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn procedures_for_municipality(&self, municipality_key: &str) -> Result<Vec<Procedure>> {
        let rows = sqlx::query("SELECT row FROM bess_procedures WHERE municipality_key = $1")
            .bind(municipality_key)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|r| Ok(serde_json::from_value(r.get("row"))?)).collect()
    }

    async fn projects_for_municipality(&self, municipality_key: &str) -> Result<Vec<ProjectEntity>> {
        let rows = sqlx::query("SELECT row FROM bess_project_entities WHERE municipality_key = $1")
            .bind(municipality_key)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|r| Ok(serde_json::from_value(r.get("row"))?)).collect()
    }

    async fn procedures_for_project(&self, project_id: ProjectEntityId) -> Result<Vec<Procedure>> {
        let rows = sqlx::query(
            r#"
            SELECT p.row AS row
            FROM bess_procedures p
            JOIN bess_project_procedure_links l ON l.procedure_id = p.id
            WHERE l.project_id = $1
            "#,
        )
        .bind(project_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| Ok(serde_json::from_value(r.get("row"))?)).collect()
    }
}
