//! Run plans
//!
//! A plan names the stores of a run in opening order, picks the source,
//! and optionally fixes the order of transplant targets. Plans come from a
//! TOML file, from CLI flags, or from [`RunPlan::default`].
//!
//! ```toml
//! source = "europe"
//! targets = ["africa", "memory"]
//! transplant_read_only = false
//!
//! [[stores]]
//! name = "europe"
//! location = "europe.db"
//!
//! [[stores]]
//! name = "memory"
//! location = ":memory:"
//!
//! [probe]
//! table = "countries"
//! column = "name"
//! pattern = "%land%"
//! ```

use std::collections::HashSet;
use std::path::Path;

use dbgraft_core::errors::{ExError, ExErrorKind, GraftError};
use dbgraft_core::model::{RowProbe, StoreSpec, MEMORY_SENTINEL};
use dbgraft_store::errors::Result;
use serde::{Deserialize, Serialize};

/// Everything one orchestrator run needs to know
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPlan {
    /// Stores in opening order
    pub stores: Vec<StoreSpec>,
    /// Label of the store whose image is captured
    pub source: String,
    /// Transplant order; every non-source store in declared order when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,
    #[serde(default)]
    pub probe: RowProbe,
    #[serde(default)]
    pub transplant_read_only: bool,
}

impl Default for RunPlan {
    fn default() -> Self {
        Self {
            stores: vec![
                StoreSpec::new("europe", "europe.db"),
                StoreSpec::new("africa", "africa.db"),
                StoreSpec::new("memory", MEMORY_SENTINEL),
            ],
            source: "europe".to_string(),
            targets: None,
            probe: RowProbe::default(),
            transplant_read_only: false,
        }
    }
}

fn invalid(reason: impl Into<String>) -> ExError {
    GraftError::InvalidPlan {
        reason: reason.into(),
    }
    .into()
}

impl RunPlan {
    /// Parse a plan from TOML text
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::Config`: not valid TOML or not a valid plan
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let plan: RunPlan = toml::from_str(text).map_err(|e| invalid(e.to_string()))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Load a plan from a TOML file
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::Io`: the file cannot be read
    /// - `ExErrorKind::Config`: see [`RunPlan::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("load_plan")
                .with_message(format!("Cannot read plan {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Serialize the plan as TOML
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::Config`: the plan cannot be represented
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| invalid(e.to_string()))
    }

    /// Check the plan before any store is opened
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::Config` when:
    ///   - there are no stores, or a label is empty or repeated
    ///   - more than one volatile store is declared
    ///   - the source is not a declared store
    ///   - a target is unknown, repeated, or the source itself
    pub fn validate(&self) -> Result<()> {
        if self.stores.is_empty() {
            return Err(invalid("no stores declared"));
        }

        let mut names = HashSet::new();
        for spec in &self.stores {
            if spec.name.trim().is_empty() {
                return Err(invalid("store names must not be empty"));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(invalid(format!("store '{}' declared twice", spec.name)));
            }
        }

        let volatile = self.stores.iter().filter(|s| s.location.is_memory()).count();
        if volatile > 1 {
            return Err(invalid(format!(
                "at most one volatile store allowed, found {}",
                volatile
            )));
        }

        if !names.contains(self.source.as_str()) {
            return Err(invalid(format!(
                "source '{}' is not a declared store",
                self.source
            )));
        }

        if let Some(targets) = &self.targets {
            let mut seen = HashSet::new();
            for target in targets {
                if target == &self.source {
                    return Err(invalid(format!(
                        "source '{}' cannot also be a target",
                        target
                    )));
                }
                if !names.contains(target.as_str()) {
                    return Err(invalid(format!("target '{}' is not a declared store", target)));
                }
                if !seen.insert(target.as_str()) {
                    return Err(invalid(format!("target '{}' listed twice", target)));
                }
            }
        }

        Ok(())
    }

    /// Targets in transplant order
    pub fn target_names(&self) -> Vec<&str> {
        match &self.targets {
            Some(targets) => targets.iter().map(String::as_str).collect(),
            None => self
                .stores
                .iter()
                .map(|s| s.name.as_str())
                .filter(|name| *name != self.source)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_is_valid() {
        let plan = RunPlan::default();
        plan.validate().unwrap();
        assert_eq!(plan.target_names(), vec!["africa", "memory"]);
    }

    #[test]
    fn test_explicit_targets_keep_their_order() {
        let plan = RunPlan {
            targets: Some(vec!["memory".to_string(), "africa".to_string()]),
            ..RunPlan::default()
        };
        plan.validate().unwrap();
        assert_eq!(plan.target_names(), vec!["memory", "africa"]);
    }

    #[test]
    fn test_rejects_source_as_target() {
        let plan = RunPlan {
            targets: Some(vec!["europe".to_string()]),
            ..RunPlan::default()
        };
        let err = plan.validate().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Config);
    }

    #[test]
    fn test_rejects_unknown_source() {
        let plan = RunPlan {
            source: "asia".to_string(),
            ..RunPlan::default()
        };
        assert!(plan.validate().unwrap_err().message().contains("asia"));
    }

    #[test]
    fn test_rejects_second_volatile_store() {
        let mut plan = RunPlan::default();
        plan.stores
            .push(StoreSpec::new("memory2", MEMORY_SENTINEL));
        assert!(plan.validate().unwrap_err().message().contains("volatile"));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut plan = RunPlan::default();
        plan.stores.push(StoreSpec::new("africa", "other.db"));
        assert!(plan.validate().unwrap_err().message().contains("twice"));
    }
}
