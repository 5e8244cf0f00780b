use serde::{Deserialize, Serialize};

/// Logical requirement fields the normalizer produces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Anchors,
    Actions,
    Condition,
    Constraints,
    Verification,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Anchors => "anchors",
            FieldKind::Actions => "actions",
            FieldKind::Condition => "condition",
            FieldKind::Constraints => "constraints",
            FieldKind::Verification => "verification",
        }
    }

    pub fn all() -> [FieldKind; 5] {
        [
            FieldKind::Anchors,
            FieldKind::Actions,
            FieldKind::Condition,
            FieldKind::Constraints,
            FieldKind::Verification,
        ]
    }
}

#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConditionSource {
    EXPLICIT,
    EXTRACTED,
    NONE,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Constraint {
    pub label: String,
    pub value: String,
}

impl Constraint {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Canonical requirement record. `id` is the identity key for every later stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedRequirement {
    pub id: String,
    pub anchors: Vec<String>,
    pub actions: Vec<String>,
    pub condition: Option<String>,
    pub condition_source: ConditionSource,
    pub constraints: Vec<Constraint>,
    pub verification: Option<String>,
    /// Marker that produced an EXTRACTED condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_marker: Option<String>,
}

impl NormalizedRequirement {
    /// Lowercased anchor text used for grouping comparisons.
    pub fn anchor_key(&self) -> String {
        self.anchors.join(", ").to_lowercase()
    }

    pub fn action_key(&self) -> String {
        self.actions.join(", ").to_lowercase()
    }

    pub fn condition_key(&self) -> Option<String> {
        self.condition.as_ref().map(|c| c.to_lowercase())
    }

    /// Constraint values, lowercased and sorted, for order-insensitive comparison.
    pub fn constraint_key(&self) -> Vec<String> {
        let mut values: Vec<String> = self
            .constraints
            .iter()
            .map(|c| c.value.to_lowercase())
            .collect();
        values.sort();
        values
    }

    pub fn has_condition(&self) -> bool {
        self.condition_source != ConditionSource::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NormalizedRequirement {
        NormalizedRequirement {
            id: "REQ-BMS-01".to_string(),
            anchors: vec!["BMS".to_string(), "VCU".to_string()],
            actions: vec!["Open Relay".to_string()],
            condition: Some("Cell voltage exceeds 4.2V".to_string()),
            condition_source: ConditionSource::EXPLICIT,
            constraints: vec![
                Constraint::new("timing", "Within 200ms"),
                Constraint::new("FTTI", "500ms"),
            ],
            verification: None,
            extraction_marker: None,
        }
    }

    #[test]
    fn grouping_keys_are_lowercased() {
        let req = sample();
        assert_eq!(req.anchor_key(), "bms, vcu");
        assert_eq!(req.action_key(), "open relay");
        assert_eq!(req.condition_key().as_deref(), Some("cell voltage exceeds 4.2v"));
        assert_eq!(req.constraint_key(), vec!["500ms", "within 200ms"]);
    }

    #[test]
    fn serializes_condition_source_as_uppercase() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(v["condition_source"], "EXPLICIT");
        assert!(v.get("extraction_marker").is_none());
        assert!(v["verification"].is_null());
    }
}
