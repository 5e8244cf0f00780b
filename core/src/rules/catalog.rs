use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

use super::Severity;

pub const RULE_CATALOG_VERSION: &str = "rule_catalog_v1";

#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RuleScope {
    RECORD,
    CORPUS,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleDef {
    pub rule_id: String,
    pub scope: RuleScope,
    pub default_severity: Severity,
    pub enabled_by_default: bool,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleCatalog {
    pub catalog_version: String,
    pub rules: Vec<RuleDef>,
    #[serde(default)]
    pub antonym_pairs: Vec<(String, String)>,
}

impl RuleCatalog {
    pub fn get(&self, rule_id: &str) -> Option<&RuleDef> {
        self.rules.iter().find(|r| r.rule_id == rule_id)
    }
}

pub fn rule_catalog_v1() -> CoreResult<RuleCatalog> {
    let json = include_str!("rule_catalog_v1.json");
    let catalog: RuleCatalog = serde_json::from_str(json)?;
    if catalog.catalog_version != RULE_CATALOG_VERSION {
        return Err(CoreError::Config(
            "embedded rule catalog is not rule_catalog_v1".to_string(),
        ));
    }
    Ok(catalog)
}

/// Per-rule configuration. Unset fields keep the catalog default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleOverride {
    pub rule_id: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub severity: Option<Severity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_has_baseline_rules() {
        let catalog = rule_catalog_v1().unwrap();
        for id in [
            "MISSING_CONDITION",
            "MISSING_CONSTRAINT_FOR_TIMED_ACTION",
            "MISSING_VERIFICATION",
        ] {
            let def = catalog.get(id).unwrap();
            assert_eq!(def.scope, RuleScope::RECORD);
            assert!(def.enabled_by_default);
        }
        assert_eq!(catalog.antonym_pairs.len(), 5);
    }

    #[test]
    fn override_fields_are_optional() {
        let o: RuleOverride = serde_json::from_str(r#"{"rule_id":"MISSING_VERIFICATION"}"#).unwrap();
        assert_eq!(o.enabled, None);
        assert_eq!(o.severity, None);
        let o: RuleOverride =
            serde_json::from_str(r#"{"rule_id":"MISSING_VERIFICATION","severity":"LOW"}"#).unwrap();
        assert_eq!(o.severity, Some(Severity::LOW));
    }
}
