// rmos-broker/src/broker.rs
// ============================================================================
// Module: RMOS Attachment Resolver
// Description: Scheme-dispatching content resolution and hash verification
//              for the Advisory / Attach Subsystem.
// Purpose: Resolve a `ContentRef` into bytes, verify its declared SHA-256, and
//          admit it into a blob store as an Attachment.
// Dependencies: rmos-core, url
// ============================================================================

//! ## Overview
//! [`AttachmentResolver`] resolves the `uri` of a caller-supplied
//! [`ContentRef`] to the registered [`Source`] for its scheme, verifies the
//! resolved bytes hash to the caller's declared `sha256`, and writes them
//! into a [`BlobStore`]. This is the one point where a caller-declared digest
//! is checked against freshly fetched bytes before anything is admitted as an
//! authoritative attachment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use rmos_core::AttachmentKind;
use rmos_core::BlobStoreError;
use rmos_core::ContentRef;
use rmos_core::HashAlgorithm;
use rmos_core::Sha256Hex;
use rmos_core::hashing::hash_bytes;
use rmos_core::interfaces::BlobStore;
use thiserror::Error;
use url::Url;

use crate::source::Source;
use crate::source::SourceError;

// ============================================================================
// SECTION: Resolver Errors
// ============================================================================

/// Errors returned while resolving and admitting a [`ContentRef`].
#[derive(Debug, Error)]
pub enum ResolverError {
    /// No source is registered for the URI's scheme.
    #[error("missing source for scheme: {0}")]
    MissingSource(String),
    /// URI failed to parse.
    #[error("invalid uri: {0}")]
    InvalidUri(String),
    /// Resolved bytes did not hash to the caller-declared digest.
    #[error("content hash mismatch (declared {declared}, resolved {resolved})")]
    HashMismatch {
        /// Digest the caller declared in the `ContentRef`.
        declared: String,
        /// Digest actually computed over the resolved bytes.
        resolved: String,
    },
    /// The source failed to resolve the reference.
    #[error("source failure: {0}")]
    Source(#[from] SourceError),
    /// The blob store rejected the resolved bytes.
    #[error("blob store failure: {0}")]
    Blob(#[from] BlobStoreError),
}

// ============================================================================
// SECTION: Attachment Resolver
// ============================================================================

/// Builder for an [`AttachmentResolver`].
#[derive(Default)]
pub struct AttachmentResolverBuilder {
    sources: BTreeMap<String, Arc<dyn Source>>,
}

impl AttachmentResolverBuilder {
    /// Registers a source for the provided URI scheme.
    #[must_use]
    pub fn source(mut self, scheme: impl Into<String>, source: impl Source + 'static) -> Self {
        self.sources.insert(scheme.into(), Arc::new(source));
        self
    }

    /// Builds the resolver.
    #[must_use]
    pub fn build(self) -> AttachmentResolver {
        AttachmentResolver {
            sources: self.sources,
        }
    }
}

/// Resolves `ContentRef`s against registered schemes and admits verified
/// bytes into a blob store.
pub struct AttachmentResolver {
    sources: BTreeMap<String, Arc<dyn Source>>,
}

impl AttachmentResolver {
    /// Returns a builder for the resolver.
    #[must_use]
    pub fn builder() -> AttachmentResolverBuilder {
        AttachmentResolverBuilder::default()
    }

    /// Resolves the configured source for a content URI scheme.
    fn resolve_source(&self, uri: &str) -> Result<Arc<dyn Source>, ResolverError> {
        let scheme = Url::parse(uri)
            .map_err(|err| ResolverError::InvalidUri(err.to_string()))?
            .scheme()
            .to_string();
        self.sources
            .get(&scheme)
            .map(Arc::clone)
            .ok_or(ResolverError::MissingSource(scheme))
    }

    /// Resolves `content_ref`, verifies its declared hash, and stores the
    /// bytes as an attachment of the given `kind`, returning the blob's
    /// SHA-256 identity.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::HashMismatch`] if the resolved bytes do not
    /// hash to `content_ref.sha256`; [`ResolverError::MissingSource`] or
    /// [`ResolverError::Source`] if resolution fails.
    pub fn resolve_and_store(
        &self,
        content_ref: &ContentRef,
        kind: AttachmentKind,
        filename: Option<&str>,
        blobs: &dyn BlobStore,
    ) -> Result<Sha256Hex, ResolverError> {
        let source = self.resolve_source(&content_ref.uri)?;
        let resolved = source.fetch(content_ref)?;
        let actual = hash_bytes(HashAlgorithm::Sha256, &resolved.bytes);
        if actual.value != content_ref.sha256.as_str() {
            return Err(ResolverError::HashMismatch {
                declared: content_ref.sha256.to_string(),
                resolved: actual.value,
            });
        }
        let mime = resolved.content_type.unwrap_or_else(|| content_ref.mime.clone());
        let sha256 = blobs.put_blob(&resolved.bytes, &mime, kind, filename)?;
        Ok(sha256)
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panics are acceptable."
    )]

    use std::collections::BTreeMap as Map;
    use std::sync::Mutex;

    use rmos_core::interfaces::MetaIndexPage;
    use rmos_core::interfaces::BlobStoreError as CoreBlobStoreError;

    use super::*;
    use crate::source::InlineSource;

    struct InMemoryBlobs {
        blobs: Mutex<Map<String, Vec<u8>>>,
    }

    impl InMemoryBlobs {
        fn new() -> Self {
            Self {
                blobs: Mutex::new(Map::new()),
            }
        }
    }

    impl BlobStore for InMemoryBlobs {
        fn put_blob(
            &self,
            bytes: &[u8],
            _mime: &str,
            _kind: AttachmentKind,
            _filename: Option<&str>,
        ) -> Result<Sha256Hex, BlobStoreError> {
            let digest = hash_bytes(HashAlgorithm::Sha256, bytes);
            #[allow(clippy::unwrap_used, reason = "test-only mutex")]
            self.blobs.lock().unwrap().insert(digest.value.clone(), bytes.to_vec());
            Ok(digest.as_sha256_hex())
        }

        fn get_blob(&self, sha256: &Sha256Hex) -> Result<Vec<u8>, BlobStoreError> {
            #[allow(clippy::unwrap_used, reason = "test-only mutex")]
            self.blobs
                .lock()
                .unwrap()
                .get(sha256.as_str())
                .cloned()
                .ok_or_else(|| CoreBlobStoreError::NotFound(sha256.to_string()))
        }

        fn meta_index_query(
            &self,
            _kind: Option<AttachmentKind>,
            _mime_prefix: Option<&str>,
            _cursor: Option<&str>,
            _limit: usize,
        ) -> Result<MetaIndexPage, BlobStoreError> {
            Ok(MetaIndexPage::default())
        }
    }

    #[test]
    fn resolves_and_verifies_an_inline_payload() {
        let resolver = AttachmentResolver::builder().source("inline", InlineSource::new()).build();
        let blobs = InMemoryBlobs::new();
        let bytes = b"G0 X0 Y0";
        let digest = hash_bytes(HashAlgorithm::Sha256, bytes);
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes);
        let content_ref = ContentRef {
            uri: format!("inline+bytes:{encoded}"),
            sha256: digest.as_sha256_hex(),
            mime: "application/octet-stream".to_string(),
        };

        let sha256 = resolver
            .resolve_and_store(&content_ref, AttachmentKind::GcodeOutput, Some("out.gcode"), &blobs)
            .expect("resolve");
        assert_eq!(sha256, digest.as_sha256_hex());
    }

    #[test]
    fn rejects_a_declared_hash_that_does_not_match_the_resolved_bytes() {
        let resolver = AttachmentResolver::builder().source("inline", InlineSource::new()).build();
        let blobs = InMemoryBlobs::new();
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b"real bytes");
        let content_ref = ContentRef {
            uri: format!("inline+bytes:{encoded}"),
            sha256: Sha256Hex::new("0".repeat(64)),
            mime: "application/octet-stream".to_string(),
        };

        let result = resolver.resolve_and_store(
            &content_ref,
            AttachmentKind::AdvisoryPayload,
            None,
            &blobs,
        );
        assert!(matches!(result, Err(ResolverError::HashMismatch { .. })));
    }
}
