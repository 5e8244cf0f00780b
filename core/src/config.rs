use crate::error::{CoreError, CoreResult};
use crate::extract::markers::MarkerCatalog;
use crate::normalize::synonyms::FieldSynonyms;
use crate::rules::catalog::RuleOverride;
use serde::{Deserialize, Serialize};

/// Engine configuration. Every part is optional; the embedded catalogs fill gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub rules: Vec<RuleOverride>,
    pub markers: Option<MarkerCatalog>,
    pub normalization: Option<FieldSynonyms>,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::Config(format!("invalid engine configuration: {}", e)))
    }

    pub fn markers_or_embedded(&self) -> CoreResult<MarkerCatalog> {
        match &self.markers {
            Some(m) => Ok(m.clone()),
            None => MarkerCatalog::embedded(),
        }
    }

    pub fn normalization_or_embedded(&self) -> CoreResult<FieldSynonyms> {
        match &self.normalization {
            Some(n) => Ok(n.clone()),
            None => FieldSynonyms::embedded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Severity;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn rule_overrides_parse() {
        let cfg = EngineConfig::from_json_str(
            r#"{"rules":[{"rule_id":"MISSING_VERIFICATION","enabled":false},{"rule_id":"MISSING_CONDITION","severity":"MEDIUM"}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.rules.len(), 2);
        assert_eq!(cfg.rules[0].enabled, Some(false));
        assert_eq!(cfg.rules[1].severity, Some(Severity::MEDIUM));
        assert!(cfg.markers_or_embedded().unwrap().markers.len() > 5);
    }

    #[test]
    fn unknown_marker_class_is_a_config_error() {
        let err = EngineConfig::from_json_str(
            r#"{"markers":{"catalog_version":"custom","trigger_classes":["SOMETIMES"],"temporal_classes":[],"markers":[]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        assert!(EngineConfig::from_json_str(r#"{"rulez":[]}"#).is_err());
    }
}
