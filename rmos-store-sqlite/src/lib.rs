// rmos-store-sqlite/src/lib.rs
// ============================================================================
// Module: RMOS SQLite Store
// Description: Durable artifact and blob store backed by SQLite WAL.
// Purpose: Provide production-grade persistence for the pipeline's artifact
//          chain and content-addressed blobs.
// Dependencies: rmos-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a `SQLite`-backed [`ArtifactStore`]/[`BlobStore`]
//! implementation. Every write happens inside a transaction that also
//! enforces the ancestry invariants ([`ArtifactStore::put_artifact`]'s
//! required-parent and duplicate-forbidding rules); reads verify payload
//! hashes before returning, failing closed on corruption.
//!
//! [`ArtifactStore`]: rmos_core::interfaces::ArtifactStore
//! [`BlobStore`]: rmos_core::interfaces::BlobStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
