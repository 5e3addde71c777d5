// rmos-store-sqlite/src/store.rs
// ============================================================================
// Module: RMOS SQLite Store
// Description: Durable artifact and blob store backed by SQLite WAL.
// Purpose: Persist the artifact chain and content-addressed blobs with
//          deterministic serialization and hash verification on read.
// Dependencies: rmos-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`SqliteStore`] implements both [`ArtifactStore`] and [`BlobStore`]
//! against a single `SQLite` database. Artifacts are kept write-once: the
//! ancestry invariants (required parent links, `batch_label`/`session_id`
//! inheritance, per-stage duplicate forbidding) are enforced inside the same
//! transaction as the insert, so a concurrent writer can never observe a
//! half-enforced invariant. Blobs are content-addressed and idempotent.
//! Security posture: database contents are untrusted; every read
//! recomputes and checks the stored hash before returning.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use rmos_core::Artifact;
use rmos_core::ArtifactId;
use rmos_core::ArtifactStatus;
use rmos_core::AttachmentKind;
use rmos_core::HashAlgorithm;
use rmos_core::PrincipalId;
use rmos_core::Sha256Hex;
use rmos_core::Stage;
use rmos_core::hashing::hash_bytes;
use rmos_core::hashing::hash_canonical_json;
use rmos_core::interfaces::ArtifactQuery;
use rmos_core::interfaces::ArtifactStore;
use rmos_core::interfaces::ArtifactStoreError;
use rmos_core::interfaces::BlobStore;
use rmos_core::interfaces::BlobStoreError;
use rmos_core::interfaces::MetaIndexEntry;
use rmos_core::interfaces::MetaIndexPage;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite`-backed store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// A referenced parent artifact does not resolve.
    #[error("missing parent: {0}")]
    MissingParent(String),
    /// An artifact with identical `(kind, parent_ids, payload_sha256)`
    /// already exists and duplicates are forbidden for this stage.
    #[error("duplicate parent: {0}")]
    DuplicateParent(String),
    /// `batch_label`/`session_id` do not match the root SPEC's values.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// The requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<SqliteStoreError> for ArtifactStoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message)
            | SqliteStoreError::Corrupt(message)
            | SqliteStoreError::VersionMismatch(message)
            | SqliteStoreError::Invalid(message) => Self::Store(message),
            SqliteStoreError::MissingParent(message) => Self::MissingParent(message),
            SqliteStoreError::DuplicateParent(message) => Self::DuplicateParent(message),
            SqliteStoreError::InvariantViolation(message) => Self::InvariantViolation(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
        }
    }
}

impl From<SqliteStoreError> for BlobStoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            other => Self::Store(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Label Helpers
// ============================================================================

/// Maps a [`Stage`] to its storage label, matching the type's own
/// `SCREAMING_SNAKE_CASE` serde rename.
const fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Spec => "SPEC",
        Stage::Plan => "PLAN",
        Stage::Decision => "DECISION",
        Stage::Execution => "EXECUTION",
        Stage::JobLog => "JOB_LOG",
        Stage::Rollup => "ROLLUP",
        Stage::LearningEvent => "LEARNING_EVENT",
        Stage::LearningDecision => "LEARNING_DECISION",
    }
}

/// Maps an [`AttachmentKind`] to its storage label, matching the type's own
/// `snake_case` serde rename.
const fn attachment_kind_label(kind: AttachmentKind) -> &'static str {
    match kind {
        AttachmentKind::GcodeOutput => "gcode_output",
        AttachmentKind::DxfInput => "dxf_input",
        AttachmentKind::CamPlan => "cam_plan",
        AttachmentKind::AdvisoryPayload => "advisory_payload",
        AttachmentKind::JobLog => "job_log",
    }
}

/// Parses an attachment kind storage label.
fn parse_attachment_kind(label: &str) -> Result<AttachmentKind, SqliteStoreError> {
    match label {
        "gcode_output" => Ok(AttachmentKind::GcodeOutput),
        "dxf_input" => Ok(AttachmentKind::DxfInput),
        "cam_plan" => Ok(AttachmentKind::CamPlan),
        "advisory_payload" => Ok(AttachmentKind::AdvisoryPayload),
        "job_log" => Ok(AttachmentKind::JobLog),
        other => Err(SqliteStoreError::Corrupt(format!("unknown attachment kind label: {other}"))),
    }
}

/// Returns the stage contract's required parent-link relationship names.
fn required_relationships(stage: Stage) -> &'static [&'static str] {
    match stage {
        Stage::Spec => &[],
        Stage::Plan => &["parent_spec_artifact_id"],
        Stage::Decision => &["parent_plan_artifact_id", "parent_spec_artifact_id"],
        Stage::Execution => &["parent_decision_artifact_id"],
        Stage::JobLog | Stage::Rollup => {
            &["parent_execution_artifact_id", "parent_decision_artifact_id"]
        }
        Stage::LearningEvent => &["parent_job_log_artifact_id"],
        Stage::LearningDecision => &["parent_learning_event_artifact_id"],
    }
}

/// Returns the relationship linking `stage` to its immediate predecessor.
fn primary_relationship(stage: Stage) -> Option<&'static str> {
    required_relationships(stage).first().copied()
}

/// SPEC creation may legitimately repeat identical payloads; every
/// downstream stage is write-once per distinct input.
fn forbids_duplicates(stage: Stage) -> bool {
    stage != Stage::Spec
}

/// Builds the dedup key string for an artifact's `(kind, parent_ids,
/// payload_sha256)` tuple.
fn dedup_key(artifact: &Artifact) -> String {
    let parents = artifact
        .parent_ids
        .iter()
        .map(|(relationship, id)| format!("{relationship}={id}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("{}\u{1}{parents}\u{1}{}", artifact.kind, artifact.payload_sha256)
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed artifact and blob store with WAL support.
#[derive(Clone)]
pub struct SqliteStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens a `SQLite`-backed store, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection, translating mutex poisoning.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("store mutex poisoned".to_string()))
    }

    /// Returns the schema version this store was initialized with.
    #[must_use]
    pub const fn schema_version() -> i64 {
        SCHEMA_VERSION
    }
}

impl ArtifactStore for SqliteStore {
    fn put_artifact(&self, artifact: Artifact) -> Result<ArtifactId, ArtifactStoreError> {
        self.put_artifact_inner(artifact).map_err(ArtifactStoreError::from)
    }

    fn get_artifact(&self, artifact_id: &ArtifactId) -> Result<Artifact, ArtifactStoreError> {
        self.get_artifact_inner(artifact_id).map_err(ArtifactStoreError::from)
    }

    fn query_artifacts(&self, query: &ArtifactQuery) -> Result<Vec<Artifact>, ArtifactStoreError> {
        self.query_artifacts_inner(query).map_err(ArtifactStoreError::from)
    }

    fn list_executions_for_decision(
        &self,
        decision_id: &ArtifactId,
    ) -> Result<Vec<Artifact>, ArtifactStoreError> {
        self.list_executions_for_decision_inner(decision_id).map_err(ArtifactStoreError::from)
    }

    fn get_lineage(&self, artifact_id: &ArtifactId) -> Result<Vec<Artifact>, ArtifactStoreError> {
        self.get_lineage_inner(artifact_id).map_err(ArtifactStoreError::from)
    }
}

impl SqliteStore {
    /// Persists `artifact`, enforcing ancestry invariants inside one
    /// transaction.
    fn put_artifact_inner(&self, artifact: Artifact) -> Result<ArtifactId, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;

        for relationship in required_relationships(artifact.stage) {
            let Some(parent_id) = artifact.parent_ids.get(relationship) else {
                return Err(SqliteStoreError::MissingParent(format!(
                    "{} requires parent link `{relationship}`",
                    artifact.kind
                )));
            };
            let parent_meta: Option<(String, String)> = tx
                .query_row(
                    "SELECT session_id, batch_label FROM artifacts WHERE artifact_id = ?1",
                    params![parent_id.as_str()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            let Some((parent_session_id, parent_batch_label)) = parent_meta else {
                return Err(SqliteStoreError::MissingParent(format!(
                    "parent `{parent_id}` referenced by `{relationship}` does not resolve"
                )));
            };
            if parent_session_id != artifact.index_meta.session_id.as_str()
                || parent_batch_label != artifact.index_meta.batch_label.as_str()
            {
                return Err(SqliteStoreError::InvariantViolation(format!(
                    "batch_label/session_id of `{}` do not match root SPEC's values",
                    artifact.artifact_id
                )));
            }
        }

        if forbids_duplicates(artifact.stage) {
            let key = dedup_key(&artifact);
            let inserted = tx
                .execute("INSERT OR IGNORE INTO dedup_keys (dedup_key) VALUES (?1)", params![key])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            if inserted == 0 {
                return Err(SqliteStoreError::DuplicateParent(format!(
                    "an artifact with identical (kind, parent_ids, payload_sha256) already exists for `{}`",
                    artifact.kind
                )));
            }
        }

        let artifact_json = serde_json::to_vec(&artifact)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let created_by = artifact.created_by.as_ref().map(PrincipalId::as_str);
        let insert_result = tx.execute(
            "INSERT INTO artifacts (
                artifact_id, kind, stage, created_at_utc, created_by,
                session_id, batch_label, tool_kind, payload_sha256, status,
                artifact_json
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                artifact.artifact_id.as_str(),
                artifact.kind,
                stage_label(artifact.stage),
                artifact.created_at_utc,
                created_by,
                artifact.index_meta.session_id.as_str(),
                artifact.index_meta.batch_label.as_str(),
                artifact.index_meta.tool_kind.as_str(),
                artifact.payload_sha256,
                status_label(artifact.status),
                artifact_json,
            ],
        );
        match insert_result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(SqliteStoreError::Db(format!(
                    "artifact_id already exists: {}",
                    artifact.artifact_id
                )));
            }
            Err(err) => return Err(SqliteStoreError::Db(err.to_string())),
        }

        for (relationship, parent_id) in artifact.parent_ids.iter() {
            tx.execute(
                "INSERT INTO parent_links (artifact_id, relationship, parent_artifact_id) \
                 VALUES (?1, ?2, ?3)",
                params![artifact.artifact_id.as_str(), relationship, parent_id.as_str()],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }

        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        Ok(artifact.artifact_id)
    }

    /// Fetches and deserializes a single artifact row.
    fn fetch_artifact_row(
        tx: &rusqlite::Connection,
        artifact_id: &str,
    ) -> Result<Option<Vec<u8>>, SqliteStoreError> {
        tx.query_row(
            "SELECT artifact_json FROM artifacts WHERE artifact_id = ?1",
            params![artifact_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))
    }

    /// Deserializes and hash-verifies a stored artifact.
    fn decode_artifact(bytes: &[u8]) -> Result<Artifact, SqliteStoreError> {
        let artifact: Artifact =
            serde_json::from_slice(bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let digest = hash_canonical_json(HashAlgorithm::Sha256, &artifact.payload)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if digest.value != artifact.payload_sha256 {
            return Err(SqliteStoreError::Corrupt(format!(
                "payload hash mismatch for artifact {}",
                artifact.artifact_id
            )));
        }
        Ok(artifact)
    }

    /// Retrieves an artifact by identifier, verifying its payload hash.
    fn get_artifact_inner(&self, artifact_id: &ArtifactId) -> Result<Artifact, SqliteStoreError> {
        let guard = self.lock()?;
        let bytes = Self::fetch_artifact_row(&guard, artifact_id.as_str())?
            .ok_or_else(|| SqliteStoreError::NotFound(artifact_id.to_string()))?;
        drop(guard);
        Self::decode_artifact(&bytes)
    }

    /// Returns artifacts matching `query`, ordered by
    /// `(created_at_utc, artifact_id)`.
    fn query_artifacts_inner(
        &self,
        query: &ArtifactQuery,
    ) -> Result<Vec<Artifact>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut sql = "SELECT artifact_json FROM artifacts WHERE 1 = 1".to_string();
        let mut bind: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(kind) = &query.kind {
            sql.push_str(" AND kind = ?");
            bind.push(Box::new(kind.clone()));
        }
        if let Some(stage) = query.stage {
            sql.push_str(" AND stage = ?");
            bind.push(Box::new(stage_label(stage).to_string()));
        }
        if let Some(session_id) = &query.session_id {
            sql.push_str(" AND session_id = ?");
            bind.push(Box::new(session_id.as_str().to_string()));
        }
        if let Some(batch_label) = &query.batch_label {
            sql.push_str(" AND batch_label = ?");
            bind.push(Box::new(batch_label.as_str().to_string()));
        }
        if let Some(tool_kind) = &query.tool_kind {
            sql.push_str(" AND tool_kind = ?");
            bind.push(Box::new(tool_kind.as_str().to_string()));
        }
        if let Some(after) = &query.created_after {
            sql.push_str(" AND created_at_utc >= ?");
            bind.push(Box::new(after.clone()));
        }
        if let Some(before) = &query.created_before {
            sql.push_str(" AND created_at_utc <= ?");
            bind.push(Box::new(before.clone()));
        }
        sql.push_str(" ORDER BY created_at_utc, artifact_id");

        let mut stmt = guard.prepare(&sql).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let params: Vec<&dyn rusqlite::ToSql> = bind.iter().map(AsRef::as_ref).collect();
        let rows = stmt
            .query_map(params.as_slice(), |row| row.get::<_, Vec<u8>>(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let mut artifacts = Vec::new();
        for row in rows {
            let bytes = row.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            artifacts.push(Self::decode_artifact(&bytes)?);
        }
        drop(stmt);
        drop(guard);

        if let Some(parent_artifact_id) = &query.parent_artifact_id {
            artifacts.retain(|artifact| {
                artifact.parent_ids.iter().any(|(_, id)| id == parent_artifact_id)
            });
        }
        Ok(artifacts)
    }

    /// Returns every EXECUTION artifact whose ancestry includes
    /// `decision_id`.
    fn list_executions_for_decision_inner(
        &self,
        decision_id: &ArtifactId,
    ) -> Result<Vec<Artifact>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare(
                "SELECT a.artifact_json FROM artifacts a
                 JOIN parent_links p ON p.artifact_id = a.artifact_id
                 WHERE a.stage = 'EXECUTION'
                   AND p.relationship = 'parent_decision_artifact_id'
                   AND p.parent_artifact_id = ?1
                 ORDER BY a.created_at_utc, a.artifact_id",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = stmt
            .query_map(params![decision_id.as_str()], |row| row.get::<_, Vec<u8>>(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let mut artifacts = Vec::new();
        for row in rows {
            let bytes = row.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            artifacts.push(Self::decode_artifact(&bytes)?);
        }
        Ok(artifacts)
    }

    /// Returns the full parent chain from `artifact_id` back to the root
    /// SPEC, root first.
    fn get_lineage_inner(&self, artifact_id: &ArtifactId) -> Result<Vec<Artifact>, SqliteStoreError> {
        let mut chain = Vec::new();
        let mut current = self.get_artifact_inner(artifact_id)?;
        loop {
            let next_relationship = primary_relationship(current.stage);
            let current_parent = next_relationship.and_then(|relationship| current.parent(relationship).cloned());
            chain.push(current);
            let Some(parent_id) = current_parent else {
                break;
            };
            current = self.get_artifact_inner(&parent_id)?;
        }
        chain.reverse();
        Ok(chain)
    }
}

impl BlobStore for SqliteStore {
    fn put_blob(
        &self,
        bytes: &[u8],
        mime: &str,
        kind: AttachmentKind,
        filename: Option<&str>,
    ) -> Result<Sha256Hex, BlobStoreError> {
        self.put_blob_inner(bytes, mime, kind, filename).map_err(BlobStoreError::from)
    }

    fn get_blob(&self, sha256: &Sha256Hex) -> Result<Vec<u8>, BlobStoreError> {
        self.get_blob_inner(sha256).map_err(BlobStoreError::from)
    }

    fn meta_index_query(
        &self,
        kind: Option<AttachmentKind>,
        mime_prefix: Option<&str>,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<MetaIndexPage, BlobStoreError> {
        self.meta_index_query_inner(kind, mime_prefix, cursor, limit).map_err(BlobStoreError::from)
    }
}

impl SqliteStore {
    /// Stores `bytes` under its SHA-256 digest, idempotently.
    fn put_blob_inner(
        &self,
        bytes: &[u8],
        mime: &str,
        kind: AttachmentKind,
        filename: Option<&str>,
    ) -> Result<Sha256Hex, SqliteStoreError> {
        let digest = hash_bytes(HashAlgorithm::Sha256, bytes);
        let sha256 = digest.as_sha256_hex();
        let guard = self.lock()?;
        let size_bytes = i64::try_from(bytes.len())
            .map_err(|_| SqliteStoreError::Invalid("blob exceeds representable size".to_string()))?;
        guard
            .execute(
                "INSERT OR IGNORE INTO blobs (sha256, bytes, mime, kind, filename, size_bytes) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    sha256.as_str(),
                    bytes,
                    mime,
                    attachment_kind_label(kind),
                    filename,
                    size_bytes
                ],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(sha256)
    }

    /// Retrieves blob bytes by digest.
    fn get_blob_inner(&self, sha256: &Sha256Hex) -> Result<Vec<u8>, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT bytes FROM blobs WHERE sha256 = ?1",
                params![sha256.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?
            .ok_or_else(|| SqliteStoreError::NotFound(sha256.to_string()))
    }

    /// Paginated scan over the blob meta-index, ordered by digest.
    fn meta_index_query_inner(
        &self,
        kind: Option<AttachmentKind>,
        mime_prefix: Option<&str>,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<MetaIndexPage, SqliteStoreError> {
        let guard = self.lock()?;
        let mut sql =
            "SELECT sha256, mime, kind, size_bytes FROM blobs WHERE 1 = 1".to_string();
        let mut bind: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(kind) = kind {
            sql.push_str(" AND kind = ?");
            bind.push(Box::new(attachment_kind_label(kind).to_string()));
        }
        if let Some(prefix) = mime_prefix {
            sql.push_str(" AND mime LIKE ?");
            bind.push(Box::new(format!("{prefix}%")));
        }
        if let Some(cursor) = cursor {
            sql.push_str(" AND sha256 > ?");
            bind.push(Box::new(cursor.to_string()));
        }
        sql.push_str(" ORDER BY sha256 LIMIT ?");
        let fetch_limit = i64::try_from(limit.saturating_add(1))
            .map_err(|_| SqliteStoreError::Invalid("limit too large".to_string()))?;
        bind.push(Box::new(fetch_limit));

        let mut stmt = guard.prepare(&sql).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let params: Vec<&dyn rusqlite::ToSql> = bind.iter().map(AsRef::as_ref).collect();
        let rows = stmt
            .query_map(params.as_slice(), |row| {
                let sha256: String = row.get(0)?;
                let mime: String = row.get(1)?;
                let kind: String = row.get(2)?;
                let size_bytes: i64 = row.get(3)?;
                Ok((sha256, mime, kind, size_bytes))
            })
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            let (sha256, mime, kind_label, size_bytes) =
                row.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            let kind = parse_attachment_kind(&kind_label)?;
            let size_bytes = u64::try_from(size_bytes)
                .map_err(|_| SqliteStoreError::Corrupt("negative blob size".to_string()))?;
            entries.push(MetaIndexEntry {
                sha256: Sha256Hex::new(sha256),
                mime,
                kind,
                size_bytes,
            });
        }

        let next_cursor = if entries.len() > limit {
            entries.truncate(limit);
            entries.last().map(|entry| entry.sha256.to_string())
        } else {
            None
        };
        Ok(MetaIndexPage { entries, next_cursor })
    }
}

/// Maps an [`ArtifactStatus`] to its storage label.
const fn status_label(status: ArtifactStatus) -> &'static str {
    match status {
        ArtifactStatus::Created => "CREATED",
        ArtifactStatus::Ok => "OK",
        ArtifactStatus::Blocked => "BLOCKED",
        ArtifactStatus::Error => "ERROR",
        ArtifactStatus::Approved => "APPROVED",
        ArtifactStatus::Rejected => "REJECTED",
    }
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(connection: &Connection, config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates an existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS artifacts (
                    artifact_id TEXT PRIMARY KEY,
                    kind TEXT NOT NULL,
                    stage TEXT NOT NULL,
                    created_at_utc TEXT NOT NULL,
                    created_by TEXT,
                    session_id TEXT NOT NULL,
                    batch_label TEXT NOT NULL,
                    tool_kind TEXT NOT NULL,
                    payload_sha256 TEXT NOT NULL,
                    status TEXT NOT NULL,
                    artifact_json BLOB NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_artifacts_session
                     ON artifacts (session_id, batch_label);
                 CREATE INDEX IF NOT EXISTS idx_artifacts_kind_stage
                     ON artifacts (kind, stage);
                 CREATE INDEX IF NOT EXISTS idx_artifacts_created
                     ON artifacts (created_at_utc, artifact_id);
                 CREATE TABLE IF NOT EXISTS parent_links (
                     artifact_id TEXT NOT NULL,
                     relationship TEXT NOT NULL,
                     parent_artifact_id TEXT NOT NULL,
                     PRIMARY KEY (artifact_id, relationship),
                     FOREIGN KEY (artifact_id) REFERENCES artifacts(artifact_id)
                 );
                 CREATE INDEX IF NOT EXISTS idx_parent_links_parent
                     ON parent_links (parent_artifact_id);
                 CREATE TABLE IF NOT EXISTS dedup_keys (
                     dedup_key TEXT PRIMARY KEY
                 );
                 CREATE TABLE IF NOT EXISTS blobs (
                     sha256 TEXT PRIMARY KEY,
                     bytes BLOB NOT NULL,
                     mime TEXT NOT NULL,
                     kind TEXT NOT NULL,
                     filename TEXT,
                     size_bytes INTEGER NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_blobs_kind_mime ON blobs (kind, mime);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panics are acceptable."
    )]

    use rmos_core::BatchLabel as CoreBatchLabel;
    use rmos_core::IndexMeta;
    use rmos_core::ParentLinks;
    use rmos_core::SessionId as CoreSessionId;
    use rmos_core::ToolKind as CoreToolKind;
    use rmos_core::VersionStamps;

    use super::*;

    fn store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = SqliteStoreConfig {
            path: dir.path().join("rmos.sqlite3"),
            busy_timeout_ms: 1_000,
            journal_mode: SqliteStoreMode::Wal,
            sync_mode: SqliteSyncMode::Full,
        };
        (SqliteStore::new(&config).expect("open store"), dir)
    }

    fn spec_artifact(id: &str, payload_sha256: &str) -> Artifact {
        Artifact {
            artifact_id: ArtifactId::new(id),
            kind: "saw_batch_spec".to_string(),
            stage: Stage::Spec,
            created_at_utc: "2026-01-01T00:00:00Z".to_string(),
            created_by: None,
            parent_ids: ParentLinks::new(),
            index_meta: IndexMeta::root(
                CoreToolKind::new("saw_batch"),
                CoreBatchLabel::new("b1"),
                CoreSessionId::new("s1"),
            ),
            payload_sha256: payload_sha256.to_string(),
            version_stamps: VersionStamps::default(),
            status: ArtifactStatus::Created,
            payload: serde_json::json!({}),
        }
    }

    fn payload_hash() -> String {
        hash_canonical_json(HashAlgorithm::Sha256, &serde_json::json!({})).expect("hash").value
    }

    #[test]
    fn put_and_get_round_trips() {
        let (store, _dir) = store();
        let hash = payload_hash();
        let artifact = spec_artifact("spec_1", &hash);
        store.put_artifact(artifact.clone()).expect("put");
        let fetched = store.get_artifact(&artifact.artifact_id).expect("get");
        assert_eq!(fetched, artifact);
    }

    #[test]
    fn missing_parent_is_rejected() {
        let (store, _dir) = store();
        let hash = payload_hash();
        let mut plan = spec_artifact("plan_1", &hash);
        plan.stage = Stage::Plan;
        plan.kind = "saw_batch_plan".to_string();
        plan.parent_ids =
            ParentLinks::new().with("parent_spec_artifact_id", ArtifactId::new("does_not_exist"));
        let result = store.put_artifact(plan);
        assert!(matches!(result, Err(ArtifactStoreError::MissingParent(_))));
    }

    #[test]
    fn duplicate_plan_is_rejected() {
        let (store, _dir) = store();
        let hash = payload_hash();
        let spec = spec_artifact("spec_1", &hash);
        store.put_artifact(spec.clone()).expect("put spec");

        let mut plan = spec.clone();
        plan.artifact_id = ArtifactId::new("plan_1");
        plan.stage = Stage::Plan;
        plan.kind = "saw_batch_plan".to_string();
        plan.parent_ids =
            ParentLinks::new().with("parent_spec_artifact_id", spec.artifact_id.clone());
        store.put_artifact(plan.clone()).expect("put first plan");

        let mut plan2 = plan.clone();
        plan2.artifact_id = ArtifactId::new("plan_2");
        let result = store.put_artifact(plan2);
        assert!(matches!(result, Err(ArtifactStoreError::DuplicateParent(_))));
    }

    #[test]
    fn lineage_is_root_first() {
        let (store, _dir) = store();
        let hash = payload_hash();
        let spec = spec_artifact("spec_1", &hash);
        store.put_artifact(spec.clone()).expect("put spec");

        let mut plan = spec.clone();
        plan.artifact_id = ArtifactId::new("plan_1");
        plan.stage = Stage::Plan;
        plan.kind = "saw_batch_plan".to_string();
        plan.parent_ids =
            ParentLinks::new().with("parent_spec_artifact_id", spec.artifact_id.clone());
        store.put_artifact(plan.clone()).expect("put plan");

        let lineage = store.get_lineage(&plan.artifact_id).expect("lineage");
        assert_eq!(lineage.len(), 2);
        assert_eq!(lineage[0].artifact_id, spec.artifact_id);
        assert_eq!(lineage[1].artifact_id, plan.artifact_id);
    }

    #[test]
    fn blob_put_is_idempotent_and_content_addressed() {
        let (store, _dir) = store();
        let bytes = b"G0 X0 Y0";
        let first = store.put_blob(bytes, "text/plain", AttachmentKind::GcodeOutput, Some("a.gcode")).expect("put");
        let second = store.put_blob(bytes, "text/plain", AttachmentKind::GcodeOutput, Some("a.gcode")).expect("put");
        assert_eq!(first, second);
        let fetched = store.get_blob(&first).expect("get");
        assert_eq!(fetched, bytes);
    }

    #[test]
    fn meta_index_query_paginates_by_digest() {
        let (store, _dir) = store();
        for n in 0..3 {
            store
                .put_blob(format!("payload {n}").as_bytes(), "text/plain", AttachmentKind::GcodeOutput, None)
                .expect("put");
        }
        let page = store.meta_index_query(None, None, None, 2).expect("query");
        assert_eq!(page.entries.len(), 2);
        assert!(page.next_cursor.is_some());
    }
}
