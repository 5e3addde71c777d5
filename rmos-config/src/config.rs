// rmos-config/src/config.rs
// ============================================================================
// Module: RMOS Configuration
// Description: Configuration loading and validation for the orchestration
//              core.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: rmos-contract, rmos-core, rmos-providers, rmos-store-sqlite,
//               serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path
//! limits. Missing or invalid configuration fails closed: a malformed file
//! is a startup error, never a silently-ignored default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use rmos_contract::DeprecationEntry;
use rmos_contract::DeprecationTable;
use rmos_core::ToolKind;
use rmos_core::runtime::orchestrator::FeedbackFlags;
use rmos_providers::EngineAccessPolicy;
use rmos_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "rmos.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "RMOS_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Default bind address for the ingress server.
fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

/// Default maximum request body size, in bytes.
const fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Canonical configuration for an `rmos` deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct RmosConfig {
    /// Ingress HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Lane/deprecation governance table.
    #[serde(default)]
    pub governance: GovernanceConfig,
    /// Feedback-loop hook flags (safety default: all off).
    #[serde(default)]
    pub feedback: FeedbackConfig,
    /// `SQLite` artifact/blob store configuration.
    pub run_state_store: RunStateStoreConfig,
    /// Computation engine access policy.
    #[serde(default)]
    pub engines: EnginesConfig,
}

impl RmosConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, parsing, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.governance.validate()?;
        self.run_state_store.validate()?;
        self.engines.validate()?;
        Ok(())
    }

    /// Builds the [`FeedbackFlags`] the orchestrator should be constructed
    /// with.
    #[must_use]
    pub const fn feedback_flags(&self) -> FeedbackFlags {
        self.feedback.to_flags()
    }

    /// Builds the [`EngineAccessPolicy`] engines should be registered under.
    #[must_use]
    pub fn engine_access_policy(&self) -> EngineAccessPolicy {
        self.engines.to_policy()
    }

    /// Builds the [`DeprecationTable`] the route registry should be
    /// constructed with.
    #[must_use]
    pub fn deprecation_table(&self) -> DeprecationTable {
        self.governance.to_table()
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Ingress HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address the server binds to, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Accepted bearer tokens for the Ingress API. Empty means no
    /// authentication is enforced, which is only appropriate for local
    /// development.
    #[serde(default)]
    pub bearer_tokens: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_body_bytes: default_max_body_bytes(),
            bearer_tokens: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Validates server configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is malformed or the
    /// body limit is zero.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind_addr must be non-empty".to_string()));
        }
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| ConfigError::Invalid(format!("server.bind_addr is invalid: {err}")))?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("server.max_body_bytes must be positive".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Governance
// ============================================================================

/// A single declared deprecation entry, as written in TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct DeprecationEntryConfig {
    /// Path prefix this entry governs, e.g. `/api/art-studio`.
    pub prefix: String,
    /// Lane key surfaced in `X-Deprecated-Lane`.
    pub lane_key: String,
    /// Prefix clients should migrate to.
    pub successor_prefix: String,
    /// ISO sunset date, e.g. `2026-12-31`.
    pub sunset_date: String,
}

impl DeprecationEntryConfig {
    /// Validates a single deprecation entry.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.trim().is_empty() || !self.prefix.starts_with('/') {
            return Err(ConfigError::Invalid(
                "governance.deprecations[].prefix must start with '/'".to_string(),
            ));
        }
        if self.lane_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "governance.deprecations[].lane_key must be non-empty".to_string(),
            ));
        }
        if self.successor_prefix.trim().is_empty() || !self.successor_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(
                "governance.deprecations[].successor_prefix must start with '/'".to_string(),
            ));
        }
        if self.sunset_date.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "governance.deprecations[].sunset_date must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lane/deprecation governance configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GovernanceConfig {
    /// Declared deprecated prefixes.
    #[serde(default)]
    pub deprecations: Vec<DeprecationEntryConfig>,
}

impl GovernanceConfig {
    /// Validates every declared deprecation entry.
    fn validate(&self) -> Result<(), ConfigError> {
        for entry in &self.deprecations {
            entry.validate()?;
        }
        Ok(())
    }

    /// Builds the runtime [`DeprecationTable`] from the declared entries.
    #[must_use]
    pub fn to_table(&self) -> DeprecationTable {
        self.deprecations.iter().fold(DeprecationTable::new(), |table, entry| {
            table.with_entry(DeprecationEntry {
                prefix: entry.prefix.clone(),
                lane_key: entry.lane_key.clone(),
                successor_prefix: entry.successor_prefix.clone(),
                sunset_date: entry.sunset_date.clone(),
            })
        })
    }
}

// ============================================================================
// SECTION: Feedback
// ============================================================================

/// Feedback-loop hook flags.
///
/// All three default to `false`: a fresh deployment never emits learning
/// events, never applies accepted overrides, and never rolls up metrics
/// until an operator opts in explicitly.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FeedbackConfig {
    /// Emit a `LEARNING_EVENT` artifact from `JOB_LOG` metrics.
    #[serde(default)]
    pub learning_hook_enabled: bool,
    /// Emit a `ROLLUP` artifact alongside each `JOB_LOG`.
    #[serde(default)]
    pub metrics_rollup_hook_enabled: bool,
    /// Consult the accepted-overrides store when creating a `PLAN`.
    #[serde(default)]
    pub apply_accepted_overrides: bool,
}

impl FeedbackConfig {
    /// Converts to the orchestrator's [`FeedbackFlags`].
    #[must_use]
    pub const fn to_flags(&self) -> FeedbackFlags {
        FeedbackFlags {
            learning_hook_enabled: self.learning_hook_enabled,
            metrics_rollup_hook_enabled: self.metrics_rollup_hook_enabled,
            apply_accepted_overrides: self.apply_accepted_overrides,
        }
    }
}

// ============================================================================
// SECTION: Run State Store
// ============================================================================

/// `SQLite` artifact/blob store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RunStateStoreConfig {
    /// Underlying `SQLite` connection configuration.
    #[serde(flatten)]
    pub sqlite: SqliteStoreConfig,
}

impl RunStateStoreConfig {
    /// Validates the store path against path-safety limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path is empty or exceeds length
    /// limits.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("run_state_store.path", &self.sqlite.path.to_string_lossy())
    }
}

// ============================================================================
// SECTION: Engines
// ============================================================================

/// Computation engine access policy configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnginesConfig {
    /// When set, only these tool kinds may be registered.
    #[serde(default)]
    pub allow: Option<Vec<String>>,
    /// Tool kinds that are never permitted, even if allowlisted.
    #[serde(default)]
    pub deny: Vec<String>,
}

impl EnginesConfig {
    /// Validates that no tool kind appears in both `allow` and `deny`.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(allow) = &self.allow {
            for kind in &self.deny {
                if allow.contains(kind) {
                    return Err(ConfigError::Invalid(format!(
                        "engines: tool kind '{kind}' is both allowed and denied"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Builds the runtime [`EngineAccessPolicy`] from allow/deny lists.
    #[must_use]
    pub fn to_policy(&self) -> EngineAccessPolicy {
        let policy = self.allow.as_ref().map_or_else(EngineAccessPolicy::allow_all, |allow| {
            EngineAccessPolicy::allow_only(allow.iter().map(|kind| ToolKind::new(kind.clone())))
        });
        self.deny
            .iter()
            .fold(policy, |policy, kind| policy.deny(ToolKind::new(kind.clone())))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Path Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only panics are acceptable.")]

    use std::io::Write as _;

    use rmos_store_sqlite::SqliteStoreMode;
    use rmos_store_sqlite::SqliteSyncMode;

    use super::*;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(body.as_bytes()).expect("write");
        file
    }

    #[test]
    fn minimal_config_loads_with_safety_defaults_off() {
        let file = write_config("[run_state_store]\npath = \"/tmp/rmos-test.sqlite3\"\n");
        let config = RmosConfig::load(Some(file.path())).expect("load");
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert!(!config.feedback.learning_hook_enabled);
        assert!(!config.feedback.metrics_rollup_hook_enabled);
        assert!(!config.feedback.apply_accepted_overrides);
        assert!(matches!(config.run_state_store.sqlite.journal_mode, SqliteStoreMode::Wal));
        assert!(matches!(config.run_state_store.sqlite.sync_mode, SqliteSyncMode::Full));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = RmosConfig::load(Some(Path::new("/nonexistent/rmos.toml"))).expect_err("missing");
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn invalid_bind_addr_fails_closed() {
        let file = write_config(
            "[server]\nbind_addr = \"not-an-address\"\n\n[run_state_store]\npath = \"/tmp/x.sqlite3\"\n",
        );
        let err = RmosConfig::load(Some(file.path())).expect_err("invalid bind addr");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn overlapping_allow_and_deny_is_rejected() {
        let file = write_config(
            "[run_state_store]\npath = \"/tmp/x.sqlite3\"\n\n[engines]\nallow = [\"saw_batch\"]\ndeny = [\"saw_batch\"]\n",
        );
        let err = RmosConfig::load(Some(file.path())).expect_err("overlap");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn deprecation_entries_build_a_matching_table() {
        let file = write_config(
            "[run_state_store]\npath = \"/tmp/x.sqlite3\"\n\n[[governance.deprecations]]\nprefix = \"/api/art-studio\"\nlane_key = \"legacy_art_studio_lane\"\nsuccessor_prefix = \"/api/art\"\nsunset_date = \"2026-12-31\"\n",
        );
        let config = RmosConfig::load(Some(file.path())).expect("load");
        let table = config.deprecation_table();
        let matched = table.match_for("/api/art-studio/rosette/preview").expect("match");
        assert_eq!(matched.successor_prefix, "/api/art");
    }

    #[test]
    fn engines_allowlist_builds_a_restrictive_policy() {
        let file = write_config(
            "[run_state_store]\npath = \"/tmp/x.sqlite3\"\n\n[engines]\nallow = [\"saw_batch\"]\n",
        );
        let config = RmosConfig::load(Some(file.path())).expect("load");
        let policy = config.engine_access_policy();
        assert!(policy.is_allowed(&ToolKind::new("saw_batch")));
        assert!(!policy.is_allowed(&ToolKind::new("rosette")));
    }
}
