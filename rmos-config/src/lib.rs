// rmos-config/src/lib.rs
// ============================================================================
// Module: RMOS Config Library
// Description: Canonical configuration model and fail-closed TOML loading.
// Purpose: Single source of truth for rmos.toml semantics.
// Dependencies: rmos-contract, rmos-core, rmos-providers, rmos-store-sqlite,
//               serde, toml
// ============================================================================

//! ## Overview
//! `rmos-config` defines the canonical configuration model for the
//! orchestration core. Configuration is loaded from a TOML file with strict
//! size and path limits; missing or invalid configuration fails closed
//! rather than falling back to a permissive default.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::EnginesConfig;
pub use config::FeedbackConfig;
pub use config::GovernanceConfig;
pub use config::RmosConfig;
pub use config::RunStateStoreConfig;
pub use config::ServerConfig;
