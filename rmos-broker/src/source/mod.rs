// rmos-broker/src/source/mod.rs
// ============================================================================
// Module: RMOS Content Sources
// Description: Source traits and reference implementations for resolving
//              advisory content references into bytes.
// Purpose: Resolve `ContentRef` URIs into payload bytes for the attachment
//          resolver.
// Dependencies: rmos-core, thiserror
// ============================================================================

//! ## Overview
//! Sources fetch the bytes an [`rmos_core::ContentRef`] points at. Every
//! implementation must fail closed on invalid URIs or fetch errors; hash
//! verification happens one layer up, in [`crate::resolver::AttachmentResolver`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Source Payload
// ============================================================================

/// Payload bytes resolved from an external source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePayload {
    /// Raw payload bytes.
    pub bytes: Vec<u8>,
    /// Optional content type hint.
    pub content_type: Option<String>,
}

// ============================================================================
// SECTION: Source Errors
// ============================================================================

/// Errors emitted by content sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Unsupported or missing URI scheme.
    #[error("unsupported uri scheme: {0}")]
    UnsupportedScheme(String),
    /// URI failed to parse or resolve.
    #[error("invalid uri: {0}")]
    InvalidUri(String),
    /// Resource was not found.
    #[error("resource not found: {0}")]
    NotFound(String),
    /// Source reported an I/O failure.
    #[error("io failure: {0}")]
    Io(String),
    /// The resolved content exceeds the configured size limit.
    #[error("resolved content exceeds the {limit}-byte source limit")]
    LimitOverflow {
        /// Configured byte limit.
        limit: u64,
    },
    /// Inline source failed to decode payload.
    #[error("inline decode failure: {0}")]
    Decode(String),
}

// ============================================================================
// SECTION: Source Trait
// ============================================================================

/// Resolves a content reference URI into payload bytes.
pub trait Source: Send + Sync {
    /// Fetches payload bytes for the provided content reference.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the content cannot be resolved.
    fn fetch(&self, content_ref: &rmos_core::ContentRef) -> Result<SourcePayload, SourceError>;
}

// ============================================================================
// SECTION: Size Limit Helpers
// ============================================================================

/// Maximum bytes a single resolved source payload may occupy.
pub const MAX_SOURCE_BYTES: u64 = 64 * 1024 * 1024;

/// Returns the configured maximum source size in bytes.
pub fn max_source_bytes_u64() -> Result<u64, SourceError> {
    Ok(MAX_SOURCE_BYTES)
}

/// Fails closed when `len` exceeds [`MAX_SOURCE_BYTES`].
pub fn enforce_max_bytes(len: usize) -> Result<(), SourceError> {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "usize to u64 widening is lossless on the 64-bit targets this crate supports"
    )]
    let len_u64 = len as u64;
    if len_u64 > MAX_SOURCE_BYTES {
        return Err(SourceError::LimitOverflow {
            limit: MAX_SOURCE_BYTES,
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Implementations
// ============================================================================

pub mod file;
pub mod inline;

pub use file::FileSource;
pub use inline::InlineSource;
