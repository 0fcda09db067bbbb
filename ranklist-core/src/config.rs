//! Engine configuration

use crate::{ConfigError, RanklistResult};
use serde::{Deserialize, Serialize};

/// How much the bulk reorder trusts the caller's permutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReorderPolicy {
    /// Reject any batch that would leave an affected container non-dense.
    #[default]
    Strict,
    /// Authorization and atomicity only; the permutation is applied as given.
    Permissive,
}

impl std::str::FromStr for ReorderPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(ReorderPolicy::Strict),
            "permissive" => Ok(ReorderPolicy::Permissive),
            other => Err(ConfigError::InvalidValue {
                field: "reorder_policy".to_string(),
                value: other.to_string(),
                reason: "expected 'strict' or 'permissive'".to_string(),
            }),
        }
    }
}

/// Configuration of the position engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub reorder_policy: ReorderPolicy,
    /// Capacity assigned to containers created without an explicit one.
    pub default_max_items: i32,
    /// Largest capacity an owner may configure.
    pub max_items_ceiling: i32,
    /// Cap on the recently-deleted listing.
    pub recently_deleted_limit: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reorder_policy: ReorderPolicy::Strict,
            default_max_items: 10,
            max_items_ceiling: 100,
            recently_deleted_limit: 50,
        }
    }
}

impl EngineConfig {
    /// Create an EngineConfig from environment variables.
    ///
    /// Environment variables:
    /// - `RANKLIST_REORDER_POLICY`: "strict" or "permissive" (default: strict)
    /// - `RANKLIST_DEFAULT_MAX_ITEMS`: capacity for new containers (default: 10)
    /// - `RANKLIST_MAX_ITEMS_CEILING`: largest configurable capacity (default: 100)
    /// - `RANKLIST_RECENTLY_DELETED_LIMIT`: trash listing cap (default: 50)
    pub fn from_env() -> RanklistResult<Self> {
        let defaults = Self::default();

        let reorder_policy = match std::env::var("RANKLIST_REORDER_POLICY") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.reorder_policy,
        };

        let config = Self {
            reorder_policy,
            default_max_items: env_parse("RANKLIST_DEFAULT_MAX_ITEMS", defaults.default_max_items)?,
            max_items_ceiling: env_parse("RANKLIST_MAX_ITEMS_CEILING", defaults.max_items_ceiling)?,
            recently_deleted_limit: env_parse(
                "RANKLIST_RECENTLY_DELETED_LIMIT",
                defaults.recently_deleted_limit,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_reorder_policy(mut self, policy: ReorderPolicy) -> Self {
        self.reorder_policy = policy;
        self
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - max_items_ceiling >= 1
    /// - default_max_items in 1..=max_items_ceiling
    /// - recently_deleted_limit >= 1
    pub fn validate(&self) -> RanklistResult<()> {
        if self.max_items_ceiling < 1 {
            return Err(ConfigError::InvalidValue {
                field: "max_items_ceiling".to_string(),
                value: self.max_items_ceiling.to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        if self.default_max_items < 1 {
            return Err(ConfigError::InvalidValue {
                field: "default_max_items".to_string(),
                value: self.default_max_items.to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        if self.default_max_items > self.max_items_ceiling {
            return Err(ConfigError::IncompatibleOptions {
                option_a: format!("default_max_items={}", self.default_max_items),
                option_b: format!("max_items_ceiling={}", self.max_items_ceiling),
            }
            .into());
        }

        if self.recently_deleted_limit < 1 {
            return Err(ConfigError::InvalidValue {
                field: "recently_deleted_limit".to_string(),
                value: self.recently_deleted_limit.to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

fn env_parse<T>(key: &str, default: T) -> RanklistResult<T>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            ConfigError::InvalidValue {
                field: key.to_string(),
                value: raw.clone(),
                reason: "not a number".to_string(),
            }
            .into()
        }),
        Err(_) => Ok(default),
    }
}
