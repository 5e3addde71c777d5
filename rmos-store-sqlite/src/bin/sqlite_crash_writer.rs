//! `SQLite` crash writer for store durability tests.
// rmos-store-sqlite/src/bin/sqlite_crash_writer.rs
// ============================================================================
// Binary: SQLite Crash Writer
// Description: Simulates a crash during an uncommitted artifact write.
// Purpose: Support durability tests for rollback/crash recovery behavior.
// Dependencies: rmos-core, rmos-store-sqlite, rusqlite
// ============================================================================

use std::env;
use std::path::PathBuf;

use rmos_core::hashing::DEFAULT_HASH_ALGORITHM;
use rmos_core::hashing::hash_canonical_json;
use rmos_store_sqlite::SqliteStore;
use rmos_store_sqlite::SqliteStoreConfig;
use rmos_store_sqlite::SqliteStoreMode;
use rmos_store_sqlite::SqliteSyncMode;
use rusqlite::params;
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let path = args.next().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "missing sqlite path")
    })?;
    let artifact_id = args.next().unwrap_or_else(|| "spec_1".to_string());
    let path = PathBuf::from(path);

    let config = SqliteStoreConfig {
        path: path.clone(),
        busy_timeout_ms: 1_000,
        journal_mode: SqliteStoreMode::Wal,
        sync_mode: SqliteSyncMode::Full,
    };
    // Opening the store once lets it create the schema; the connection is
    // then dropped so a second, independent connection can abort mid-write.
    let _store = SqliteStore::new(&config)?;

    let payload = json!({});
    let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &payload)?;
    let artifact_json = serde_json::to_vec(&json!({
        "artifact_id": artifact_id,
        "kind": "saw_batch_spec",
        "stage": "SPEC",
        "created_at_utc": "2026-01-01T00:00:00Z",
        "created_by": null,
        "parent_ids": {},
        "index_meta": {
            "tool_kind": "saw_batch",
            "batch_label": "crash-batch",
            "session_id": "crash-session",
        },
        "payload_sha256": digest.value,
        "version_stamps": {},
        "status": "CREATED",
        "payload": payload,
    }))?;

    let mut conn = rusqlite::Connection::open(&path)?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON; PRAGMA journal_mode = wal; PRAGMA synchronous = full;",
    )?;
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO artifacts (
            artifact_id, kind, stage, created_at_utc, created_by,
            session_id, batch_label, tool_kind, payload_sha256, status,
            artifact_json
         ) VALUES (?1, 'saw_batch_spec', 'SPEC', '2026-01-01T00:00:00Z', NULL, \
         'crash-session', 'crash-batch', 'saw_batch', ?2, 'CREATED', ?3)",
        params![artifact_id.as_str(), digest.value, artifact_json],
    )?;

    // Abort before the transaction commits. A reader opening the database
    // afterward must see no trace of this artifact.
    std::process::abort();
}
