// rmos-providers/src/registry.rs
// ============================================================================
// Module: RMOS Engine Registry
// Description: Allow/deny-gated registry of pluggable computation engines.
// Purpose: Decide which tool kinds a deployment is permitted to execute
//          against, independent of which engines happen to be linked in.
// Dependencies: rmos-core
// ============================================================================

//! ## Overview
//! [`EngineRegistry`] pairs a set of [`ComputationEngine`] implementations
//! with an [`EngineAccessPolicy`]. A deployment may link in more engines
//! than it wants active (e.g. a staging build that also carries
//! experimental tool kinds); the policy decides which of the linked engines
//! are actually handed to the orchestrator.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use rmos_core::ToolKind;
use rmos_core::interfaces::ComputationEngine;
use thiserror::Error;

use crate::engines::ReferenceToolpathEngine;

// ============================================================================
// SECTION: Access Policy
// ============================================================================

/// Allow/deny policy over [`ToolKind`] values.
///
/// An explicit allowlist takes precedence: when set, only listed tool kinds
/// are permitted regardless of the denylist. With no allowlist, every tool
/// kind is permitted except those on the denylist.
#[derive(Debug, Clone, Default)]
pub struct EngineAccessPolicy {
    /// When set, only these tool kinds may be registered.
    allowlist: Option<BTreeSet<ToolKind>>,
    /// Tool kinds that are never permitted, even if allowlisted.
    denylist: BTreeSet<ToolKind>,
}

impl EngineAccessPolicy {
    /// Permits every tool kind.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Restricts the policy to exactly the given tool kinds.
    #[must_use]
    pub fn allow_only(kinds: impl IntoIterator<Item = ToolKind>) -> Self {
        Self {
            allowlist: Some(kinds.into_iter().collect()),
            denylist: BTreeSet::new(),
        }
    }

    /// Adds a tool kind to the denylist.
    #[must_use]
    pub fn deny(mut self, kind: ToolKind) -> Self {
        self.denylist.insert(kind);
        self
    }

    /// Returns whether `kind` is permitted under this policy.
    #[must_use]
    pub fn is_allowed(&self, kind: &ToolKind) -> bool {
        if self.denylist.contains(kind) {
            return false;
        }
        self.allowlist.as_ref().is_none_or(|allowed| allowed.contains(kind))
    }
}

// ============================================================================
// SECTION: Registry Errors
// ============================================================================

/// Errors raised while assembling an [`EngineRegistry`].
#[derive(Debug, Error)]
pub enum EngineRegistryError {
    /// Two engines declared the same tool kind.
    #[error("an engine is already registered for tool kind: {0}")]
    DuplicateToolKind(ToolKind),
    /// The policy rejected the engine's tool kind.
    #[error("tool kind is not permitted by the access policy: {0}")]
    NotPermitted(ToolKind),
}

// ============================================================================
// SECTION: Engine Registry
// ============================================================================

/// A policy-gated collection of computation engines, keyed by tool kind.
pub struct EngineRegistry {
    /// Engines that passed the access policy at registration time.
    engines: BTreeMap<ToolKind, Arc<dyn ComputationEngine>>,
    /// The access policy applied to every registration.
    policy: EngineAccessPolicy,
}

impl EngineRegistry {
    /// Creates an empty registry under the given policy.
    #[must_use]
    pub fn new(policy: EngineAccessPolicy) -> Self {
        Self {
            engines: BTreeMap::new(),
            policy,
        }
    }

    /// Creates a registry under an allow-all policy, pre-populated with the
    /// deterministic reference engine for every tool kind in `tool_kinds`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineRegistryError`] if duplicate tool kinds are supplied.
    pub fn with_reference_engines(
        tool_kinds: impl IntoIterator<Item = ToolKind>,
    ) -> Result<Self, EngineRegistryError> {
        let mut registry = Self::new(EngineAccessPolicy::allow_all());
        for kind in tool_kinds {
            registry.register(Arc::new(ReferenceToolpathEngine::new(kind, "reference-1")))?;
        }
        Ok(registry)
    }

    /// Registers an engine, subject to the access policy.
    ///
    /// # Errors
    ///
    /// Returns [`EngineRegistryError::NotPermitted`] if the policy rejects
    /// the engine's tool kind, or [`EngineRegistryError::DuplicateToolKind`]
    /// if a different engine already serves that tool kind.
    pub fn register(
        &mut self,
        engine: Arc<dyn ComputationEngine>,
    ) -> Result<(), EngineRegistryError> {
        let kind = engine.tool_kind();
        if !self.policy.is_allowed(&kind) {
            return Err(EngineRegistryError::NotPermitted(kind));
        }
        if self.engines.contains_key(&kind) {
            return Err(EngineRegistryError::DuplicateToolKind(kind));
        }
        self.engines.insert(kind, engine);
        Ok(())
    }

    /// Returns the policy governing this registry.
    #[must_use]
    pub const fn policy(&self) -> &EngineAccessPolicy {
        &self.policy
    }

    /// Looks up the engine registered for `kind`, if any.
    #[must_use]
    pub fn get(&self, kind: &ToolKind) -> Option<Arc<dyn ComputationEngine>> {
        self.engines.get(kind).map(Arc::clone)
    }

    /// Iterates over every registered engine.
    pub fn iter(&self) -> impl Iterator<Item = (&ToolKind, &Arc<dyn ComputationEngine>)> {
        self.engines.iter()
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panics are acceptable."
    )]

    use super::*;

    #[test]
    fn allow_all_accepts_any_tool_kind() {
        let mut registry = EngineRegistry::new(EngineAccessPolicy::allow_all());
        let engine = Arc::new(ReferenceToolpathEngine::new(ToolKind::new("saw_batch"), "v1"));
        registry.register(engine).expect("register");
        assert!(registry.get(&ToolKind::new("saw_batch")).is_some());
    }

    #[test]
    fn denylist_rejects_matching_tool_kind() {
        let policy = EngineAccessPolicy::allow_all().deny(ToolKind::new("helical"));
        let mut registry = EngineRegistry::new(policy);
        let engine = Arc::new(ReferenceToolpathEngine::new(ToolKind::new("helical"), "v1"));
        let err = registry.register(engine).expect_err("denied");
        assert!(matches!(err, EngineRegistryError::NotPermitted(_)));
    }

    #[test]
    fn allowlist_rejects_unlisted_tool_kind() {
        let policy = EngineAccessPolicy::allow_only([ToolKind::new("saw_batch")]);
        let mut registry = EngineRegistry::new(policy);
        let engine = Arc::new(ReferenceToolpathEngine::new(ToolKind::new("rosette"), "v1"));
        let err = registry.register(engine).expect_err("not in allowlist");
        assert!(matches!(err, EngineRegistryError::NotPermitted(_)));
    }

    #[test]
    fn duplicate_tool_kind_is_rejected() {
        let mut registry = EngineRegistry::new(EngineAccessPolicy::allow_all());
        registry
            .register(Arc::new(ReferenceToolpathEngine::new(ToolKind::new("saw_batch"), "v1")))
            .expect("first register");
        let err = registry
            .register(Arc::new(ReferenceToolpathEngine::new(ToolKind::new("saw_batch"), "v2")))
            .expect_err("duplicate");
        assert!(matches!(err, EngineRegistryError::DuplicateToolKind(_)));
    }
}
