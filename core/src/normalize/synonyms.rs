use crate::error::{CoreError, CoreResult};
use crate::record::model::FieldKind;
use crate::record::raw::RecordKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const FIELD_SYNONYMS_VERSION: &str = "field_synonyms_v1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConstraintLabelRule {
    pub label: String,
    pub pattern: String,
}

/// Key-name synonyms, placeholder tokens and constraint-label rules.
///
/// `record_keys` maps `id` and each field name to the top-level JSON keys that
/// feed it. `value_keys` lists the inner keys accepted in a key-value field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSynonyms {
    pub catalog_version: String,
    pub record_keys: BTreeMap<String, Vec<String>>,
    pub value_keys: BTreeMap<String, Vec<String>>,
    pub placeholders: Vec<String>,
    #[serde(default)]
    pub constraint_labels: Vec<ConstraintLabelRule>,
}

impl FieldSynonyms {
    pub fn embedded() -> CoreResult<Self> {
        let json = include_str!("field_synonyms_v1.json");
        let catalog: FieldSynonyms = serde_json::from_str(json)?;
        if catalog.catalog_version != FIELD_SYNONYMS_VERSION {
            return Err(CoreError::Config(
                "embedded synonym catalog is not field_synonyms_v1".to_string(),
            ));
        }
        Ok(catalog)
    }

    /// Top-level record key lookup.
    pub fn record_field_for_key(&self, key: &str) -> Option<RecordKey> {
        let wanted = normalize_key(key);
        let hit = |name: &str| {
            self.record_keys
                .get(name)
                .map(|keys| keys.iter().any(|k| normalize_key(k) == wanted))
                .unwrap_or(false)
        };
        if hit("id") {
            return Some(RecordKey::Id);
        }
        FieldKind::all()
            .into_iter()
            .find(|kind| hit(kind.as_str()))
            .map(RecordKey::Field)
    }

    pub fn value_key_matches(&self, kind: FieldKind, key: &str) -> bool {
        let wanted = normalize_key(key);
        self.value_keys
            .get(kind.as_str())
            .map(|keys| keys.iter().any(|k| normalize_key(k) == wanted))
            .unwrap_or(false)
    }

    /// Empty, whitespace-only and listed placeholder tokens, case-insensitive.
    /// Trailing sentence punctuation is ignored.
    pub fn is_placeholder(&self, text: &str) -> bool {
        let stripped = text
            .trim()
            .trim_end_matches(['.', '\u{3002}', '!'])
            .trim();
        if stripped.is_empty() {
            return true;
        }
        let lowered = collapse_whitespace(&stripped.to_lowercase());
        self.placeholders
            .iter()
            .any(|p| p.trim().to_lowercase() == lowered)
    }
}

/// Lowercase, `_`/`-` as spaces, collapsed whitespace, no trailing colon.
pub fn normalize_key(key: &str) -> String {
    let spaced: String = key
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();
    collapse_whitespace(&spaced.to_lowercase())
        .trim_end_matches(':')
        .trim()
        .to_string()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
