use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GovernanceConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub matching: MatchConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EngineConfig {
    /// Fallback SLA applied when a policy step omits `due_hours`. `None`
    /// leaves such steps without a due time.
    #[serde(default)]
    pub default_due_hours: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchConfig {
    /// When false, branch-scoped actions only match branch-scoped policies
    /// and never fall back to the company-global one.
    #[serde(default = "default_allow_global_fallback")]
    pub allow_global_fallback: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedConfig {
    /// Gates `PolicyService::install_seed_policies` for deployments that
    /// manage their governance pack entirely by hand.
    #[serde(default = "default_install_defaults")]
    pub install_defaults: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            allow_global_fallback: default_allow_global_fallback(),
        }
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            install_defaults: default_install_defaults(),
        }
    }
}

impl GovernanceConfig {
    /// Layered load: optional `governance` file in the working directory,
    /// then `GOVERNANCE__` environment overrides.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("governance").required(false))
            .add_source(
                config::Environment::with_prefix("GOVERNANCE")
                    .separator("__")
                    .try_parsing(true),
            );
        builder.build()?.try_deserialize()
    }

    /// Load from an explicit file, for embedding callers that carry their
    /// own configuration root.
    pub fn from_path(path: &Path) -> Result<Self, config::ConfigError> {
        let builder =
            config::Config::builder().add_source(config::File::from(path).required(true));
        builder.build()?.try_deserialize()
    }
}

fn default_allow_global_fallback() -> bool {
    true
}

fn default_install_defaults() -> bool {
    true
}
