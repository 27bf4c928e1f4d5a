// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! SQLite-backed catalog store.
//!
//! All writes go through the single pooled connection, serializing them the
//! way the API contract requires; each write endpoint runs in one
//! transaction so a failed write is never partially applied.

use crate::error::StoreError;
use crate::revision::compute_revision;
use chrono::{DateTime, Utc};
use observix_model::api::{CreateAssignmentRequest, CreatePipelineRequest, UpdatePipelineRequest};
use observix_model::catalog::{
    AgentRecord, AgentStatus, AssignedPipeline, Assignment, AssignmentView, Pipeline,
};
use observix_model::spec::PipelineSpec;
use observix_model::{AgentId, PipelineId, Region};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS pipelines (
        pipeline_id TEXT PRIMARY KEY,
        name        TEXT NOT NULL,
        enabled     INTEGER NOT NULL,
        spec_json   TEXT NOT NULL,
        version     INTEGER NOT NULL,
        updated_at  TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS assignments (
        assignment_id TEXT PRIMARY KEY,
        agent_id      TEXT NOT NULL,
        region        TEXT NOT NULL,
        pipeline_id   TEXT NOT NULL REFERENCES pipelines(pipeline_id) ON DELETE CASCADE,
        created_at    TEXT NOT NULL,
        UNIQUE(agent_id, region, pipeline_id)
    )",
    "CREATE TABLE IF NOT EXISTS agents (
        agent_id      TEXT PRIMARY KEY,
        region        TEXT NOT NULL,
        first_seen_at TEXT NOT NULL,
        last_seen_at  TEXT NOT NULL
    )",
];

/// The catalog store: pipelines, assignments, and agent registrations.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Opens the database at `database_url`, creating the file and schema
    /// when missing.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StoreError::from)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        for statement in SCHEMA {
            let _ = sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    /// Verifies the store answers queries. Backs the health endpoint.
    pub async fn healthcheck(&self) -> Result<(), StoreError> {
        let _ = sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    /// Creates a pipeline with `version = 1`. The spec is validated first.
    pub async fn create_pipeline(
        &self,
        request: CreatePipelineRequest,
    ) -> Result<Pipeline, StoreError> {
        request.spec.validate()?;
        let pipeline = Pipeline {
            pipeline_id: uuid::Uuid::new_v4().to_string(),
            name: request.name,
            enabled: request.enabled,
            spec: request.spec,
            version: 1,
            updated_at: Utc::now(),
        };
        let _ = sqlx::query(
            "INSERT INTO pipelines (pipeline_id, name, enabled, spec_json, version, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&pipeline.pipeline_id)
        .bind(&pipeline.name)
        .bind(pipeline.enabled)
        .bind(encode_spec(&pipeline.spec)?)
        .bind(pipeline.version)
        .bind(pipeline.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(pipeline)
    }

    /// Lists all pipelines, newest update first.
    pub async fn list_pipelines(&self) -> Result<Vec<Pipeline>, StoreError> {
        let rows = sqlx::query(
            "SELECT pipeline_id, name, enabled, spec_json, version, updated_at
             FROM pipelines ORDER BY updated_at DESC, pipeline_id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(pipeline_from_row).collect()
    }

    /// Fetches one pipeline.
    pub async fn get_pipeline(&self, pipeline_id: &str) -> Result<Pipeline, StoreError> {
        let row = sqlx::query(
            "SELECT pipeline_id, name, enabled, spec_json, version, updated_at
             FROM pipelines WHERE pipeline_id = ?",
        )
        .bind(pipeline_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            what: "pipeline",
            id: pipeline_id.to_owned(),
        })?;
        pipeline_from_row(&row)
    }

    /// Applies a partial update. Any actual change bumps the version by one;
    /// a byte-identical update leaves the record untouched. Returns the
    /// version after the update.
    pub async fn update_pipeline(
        &self,
        pipeline_id: &str,
        request: UpdatePipelineRequest,
    ) -> Result<i64, StoreError> {
        if let Some(spec) = &request.spec {
            spec.validate()?;
        }

        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "SELECT pipeline_id, name, enabled, spec_json, version, updated_at
             FROM pipelines WHERE pipeline_id = ?",
        )
        .bind(pipeline_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            what: "pipeline",
            id: pipeline_id.to_owned(),
        })?;
        let current = pipeline_from_row(&row)?;

        let name = request.name.unwrap_or_else(|| current.name.clone());
        let enabled = request.enabled.unwrap_or(current.enabled);
        let spec = request.spec.unwrap_or_else(|| current.spec.clone());

        if name == current.name && enabled == current.enabled && spec == current.spec {
            tx.commit().await?;
            return Ok(current.version);
        }

        let version = current.version + 1;
        let _ = sqlx::query(
            "UPDATE pipelines SET name = ?, enabled = ?, spec_json = ?, version = ?, updated_at = ?
             WHERE pipeline_id = ?",
        )
        .bind(&name)
        .bind(enabled)
        .bind(encode_spec(&spec)?)
        .bind(version)
        .bind(Utc::now().to_rfc3339())
        .bind(pipeline_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(version)
    }

    /// Deletes a pipeline and, in the same transaction, every assignment
    /// referencing it.
    pub async fn delete_pipeline(&self, pipeline_id: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let _ = sqlx::query("DELETE FROM assignments WHERE pipeline_id = ?")
            .bind(pipeline_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM pipelines WHERE pipeline_id = ?")
            .bind(pipeline_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                what: "pipeline",
                id: pipeline_id.to_owned(),
            });
        }
        tx.commit().await?;
        Ok(())
    }

    /// Creates an assignment. The referenced pipeline must exist and the
    /// `(agent, region, pipeline)` triple must be new.
    pub async fn create_assignment(
        &self,
        request: CreateAssignmentRequest,
    ) -> Result<Assignment, StoreError> {
        let mut tx = self.pool.begin().await?;
        let pipeline_exists = sqlx::query("SELECT 1 FROM pipelines WHERE pipeline_id = ?")
            .bind(&request.pipeline_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !pipeline_exists {
            return Err(StoreError::NotFound {
                what: "pipeline",
                id: request.pipeline_id,
            });
        }

        let assignment = Assignment {
            assignment_id: uuid::Uuid::new_v4().to_string(),
            agent_id: request.agent_id,
            region: request.region,
            pipeline_id: request.pipeline_id,
            created_at: Utc::now(),
        };
        let inserted = sqlx::query(
            "INSERT INTO assignments (assignment_id, agent_id, region, pipeline_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&assignment.assignment_id)
        .bind(&assignment.agent_id)
        .bind(&assignment.region)
        .bind(&assignment.pipeline_id)
        .bind(assignment.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await;
        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(StoreError::DuplicateAssignment {
                    agent_id: assignment.agent_id,
                    region: assignment.region,
                    pipeline_id: assignment.pipeline_id,
                });
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;
        Ok(assignment)
    }

    /// Deletes an assignment.
    pub async fn delete_assignment(&self, assignment_id: &str) -> Result<(), StoreError> {
        let deleted = sqlx::query("DELETE FROM assignments WHERE assignment_id = ?")
            .bind(assignment_id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                what: "assignment",
                id: assignment_id.to_owned(),
            });
        }
        Ok(())
    }

    /// Lists all registered agents with their liveness computed against
    /// `now` and the offline threshold.
    pub async fn list_agents(
        &self,
        offline_threshold: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<AgentRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT agent_id, region, first_seen_at, last_seen_at FROM agents ORDER BY agent_id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                let mut agent = agent_from_row(row)?;
                let silent = now.signed_duration_since(agent.last_seen_at);
                let online = silent.to_std().map_or(true, |d| d <= offline_threshold);
                agent.status = Some(if online {
                    AgentStatus::Online
                } else {
                    AgentStatus::Offline
                });
                Ok(agent)
            })
            .collect()
    }

    /// Serves one poll: upserts the agent record (refreshing
    /// `last_seen_at`), then assembles the assignment view for
    /// `(agent_id, region)`.
    pub async fn poll_assignments(
        &self,
        agent_id: &AgentId,
        region: &Region,
        now: DateTime<Utc>,
    ) -> Result<AssignmentView, StoreError> {
        let _ = sqlx::query(
            "INSERT INTO agents (agent_id, region, first_seen_at, last_seen_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(agent_id) DO UPDATE SET region = excluded.region,
                                                 last_seen_at = excluded.last_seen_at",
        )
        .bind(agent_id)
        .bind(region)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT p.pipeline_id, p.name, p.enabled, p.spec_json, p.version, p.updated_at
             FROM assignments a
             JOIN pipelines p ON p.pipeline_id = a.pipeline_id
             WHERE a.agent_id = ? AND a.region = ?
             ORDER BY p.pipeline_id",
        )
        .bind(agent_id)
        .bind(region)
        .fetch_all(&self.pool)
        .await?;

        let mut tuples: Vec<(PipelineId, i64, bool)> = Vec::with_capacity(rows.len());
        let mut pipelines = Vec::with_capacity(rows.len());
        for row in &rows {
            let pipeline = pipeline_from_row(row)?;
            tuples.push((
                pipeline.pipeline_id.clone(),
                pipeline.version,
                pipeline.enabled,
            ));
            pipelines.push(AssignedPipeline {
                pipeline_id: pipeline.pipeline_id,
                version: pipeline.version,
                enabled: pipeline.enabled,
                spec: pipeline.spec,
            });
        }

        Ok(AssignmentView {
            revision: compute_revision(&tuples),
            pipelines,
        })
    }

    /// Lists all assignments, for operator inspection.
    pub async fn list_assignments(&self) -> Result<Vec<Assignment>, StoreError> {
        let rows = sqlx::query(
            "SELECT assignment_id, agent_id, region, pipeline_id, created_at
             FROM assignments ORDER BY created_at, assignment_id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(Assignment {
                    assignment_id: row.try_get::<String, _>("assignment_id")?,
                    agent_id: row.try_get::<String, _>("agent_id")?,
                    region: row.try_get::<String, _>("region")?,
                    pipeline_id: row.try_get::<String, _>("pipeline_id")?,
                    created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
                })
            })
            .collect()
    }
}

fn encode_spec(spec: &PipelineSpec) -> Result<String, StoreError> {
    serde_json::to_string(spec).map_err(|e| StoreError::Backend {
        details: format!("failed to encode spec: {e}"),
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend {
            details: format!("corrupt timestamp '{value}': {e}"),
        })
}

fn pipeline_from_row(row: &SqliteRow) -> Result<Pipeline, StoreError> {
    let spec_json = row.try_get::<String, _>("spec_json")?;
    let spec = serde_json::from_str(&spec_json).map_err(|e| StoreError::Backend {
        details: format!("corrupt spec_json: {e}"),
    })?;
    Ok(Pipeline {
        pipeline_id: row.try_get::<String, _>("pipeline_id")?,
        name: row.try_get::<String, _>("name")?,
        enabled: row.try_get::<bool, _>("enabled")?,
        spec,
        version: row.try_get::<i64, _>("version")?,
        updated_at: parse_timestamp(&row.try_get::<String, _>("updated_at")?)?,
    })
}

fn agent_from_row(row: &SqliteRow) -> Result<AgentRecord, StoreError> {
    Ok(AgentRecord {
        agent_id: row.try_get::<String, _>("agent_id")?,
        region: row.try_get::<String, _>("region")?,
        first_seen_at: parse_timestamp(&row.try_get::<String, _>("first_seen_at")?)?,
        last_seen_at: parse_timestamp(&row.try_get::<String, _>("last_seen_at")?)?,
        status: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use observix_model::spec::{DestinationSpec, ProcessorSpec, SourceSpec};

    async fn store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite:{}", dir.path().join("catalog.db").display());
        let store = Store::connect(&url).await.expect("connect");
        (store, dir)
    }

    fn spec(port: u16) -> PipelineSpec {
        PipelineSpec {
            source: SourceSpec::SyslogUdp {
                host: "127.0.0.1".into(),
                port,
            },
            processor: ProcessorSpec::Raw,
            destination: DestinationSpec::Console,
            batch_max_events: 8,
            batch_max_seconds: 0.5,
            max_queue_size: 64,
        }
    }

    fn create_request(name: &str) -> CreatePipelineRequest {
        CreatePipelineRequest {
            name: name.to_owned(),
            enabled: true,
            spec: spec(15514),
        }
    }

    #[tokio::test]
    async fn create_starts_at_version_one() {
        let (store, _dir) = store().await;
        let p = store
            .create_pipeline(create_request("edge"))
            .await
            .expect("create");
        assert_eq!(p.version, 1);

        let fetched = store.get_pipeline(&p.pipeline_id).await.expect("get");
        assert_eq!(fetched.name, "edge");
        assert_eq!(fetched.spec, p.spec);
    }

    #[tokio::test]
    async fn invalid_spec_is_rejected() {
        let (store, _dir) = store().await;
        let mut request = create_request("bad");
        request.spec.batch_max_events = 0;
        assert!(matches!(
            store.create_pipeline(request).await,
            Err(StoreError::InvalidSpec(_))
        ));
    }

    #[tokio::test]
    async fn version_bumps_only_on_actual_change() {
        let (store, _dir) = store().await;
        let p = store
            .create_pipeline(create_request("edge"))
            .await
            .expect("create");

        // Byte-identical update: no bump.
        let v = store
            .update_pipeline(&p.pipeline_id, UpdatePipelineRequest::default())
            .await
            .expect("noop update");
        assert_eq!(v, 1);

        let v = store
            .update_pipeline(
                &p.pipeline_id,
                UpdatePipelineRequest {
                    name: Some("edge".into()),
                    enabled: Some(true),
                    spec: Some(p.spec.clone()),
                },
            )
            .await
            .expect("identical update");
        assert_eq!(v, 1);

        // Actual changes bump strictly.
        let v = store
            .update_pipeline(
                &p.pipeline_id,
                UpdatePipelineRequest {
                    name: Some("edge-2".into()),
                    ..Default::default()
                },
            )
            .await
            .expect("rename");
        assert_eq!(v, 2);

        let v = store
            .update_pipeline(
                &p.pipeline_id,
                UpdatePipelineRequest {
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .expect("disable");
        assert_eq!(v, 3);
    }

    #[tokio::test]
    async fn update_unknown_pipeline_is_not_found() {
        let (store, _dir) = store().await;
        assert!(matches!(
            store
                .update_pipeline("ghost", UpdatePipelineRequest::default())
                .await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn assignment_requires_pipeline_and_uniqueness() {
        let (store, _dir) = store().await;
        let p = store
            .create_pipeline(create_request("edge"))
            .await
            .expect("create");

        let request = CreateAssignmentRequest {
            agent_id: "agent-a".into(),
            region: "eu-west-1".into(),
            pipeline_id: p.pipeline_id.clone(),
        };
        let _ = store
            .create_assignment(request.clone())
            .await
            .expect("assign");
        assert!(matches!(
            store.create_assignment(request.clone()).await,
            Err(StoreError::DuplicateAssignment { .. })
        ));

        let missing = CreateAssignmentRequest {
            pipeline_id: "ghost".into(),
            ..request
        };
        assert!(matches!(
            store.create_assignment(missing).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_pipeline_cascades_assignments() {
        let (store, _dir) = store().await;
        let p = store
            .create_pipeline(create_request("edge"))
            .await
            .expect("create");
        let _ = store
            .create_assignment(CreateAssignmentRequest {
                agent_id: "agent-a".into(),
                region: "eu-west-1".into(),
                pipeline_id: p.pipeline_id.clone(),
            })
            .await
            .expect("assign");

        store.delete_pipeline(&p.pipeline_id).await.expect("delete");
        assert!(store.list_assignments().await.expect("list").is_empty());

        let view = store
            .poll_assignments(&"agent-a".into(), &"eu-west-1".into(), Utc::now())
            .await
            .expect("poll");
        assert!(view.pipelines.is_empty());
    }

    #[tokio::test]
    async fn revision_is_stable_and_scoped_to_the_agent() {
        let (store, _dir) = store().await;
        let p = store
            .create_pipeline(create_request("edge"))
            .await
            .expect("create");
        let _ = store
            .create_assignment(CreateAssignmentRequest {
                agent_id: "agent-a".into(),
                region: "eu-west-1".into(),
                pipeline_id: p.pipeline_id.clone(),
            })
            .await
            .expect("assign");

        let agent = "agent-a".to_owned();
        let region = "eu-west-1".to_owned();
        let first = store
            .poll_assignments(&agent, &region, Utc::now())
            .await
            .expect("poll");
        let second = store
            .poll_assignments(&agent, &region, Utc::now())
            .await
            .expect("poll");
        assert_eq!(first.revision, second.revision);

        // A pipeline assigned to a different agent does not move the revision.
        let other = store
            .create_pipeline(create_request("other"))
            .await
            .expect("create");
        let _ = store
            .create_assignment(CreateAssignmentRequest {
                agent_id: "agent-b".into(),
                region: "eu-west-1".into(),
                pipeline_id: other.pipeline_id.clone(),
            })
            .await
            .expect("assign");
        let third = store
            .poll_assignments(&agent, &region, Utc::now())
            .await
            .expect("poll");
        assert_eq!(first.revision, third.revision);

        // Updating the assigned pipeline does.
        let _ = store
            .update_pipeline(
                &p.pipeline_id,
                UpdatePipelineRequest {
                    name: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        let fourth = store
            .poll_assignments(&agent, &region, Utc::now())
            .await
            .expect("poll");
        assert_ne!(first.revision, fourth.revision);
    }

    #[tokio::test]
    async fn agent_status_follows_last_seen() {
        let (store, _dir) = store().await;
        let now = Utc::now();
        let _ = store
            .poll_assignments(&"agent-a".into(), &"eu-west-1".into(), now)
            .await
            .expect("poll");

        let threshold = Duration::from_secs(20);
        let agents = store.list_agents(threshold, now).await.expect("list");
        assert_eq!(agents[0].status, Some(AgentStatus::Online));

        let later = now + chrono::Duration::seconds(21);
        let agents = store.list_agents(threshold, later).await.expect("list");
        assert_eq!(agents[0].status, Some(AgentStatus::Offline));

        // A fresh poll flips it back.
        let _ = store
            .poll_assignments(&"agent-a".into(), &"eu-west-1".into(), later)
            .await
            .expect("poll");
        let agents = store.list_agents(threshold, later).await.expect("list");
        assert_eq!(agents[0].status, Some(AgentStatus::Online));
    }
}
