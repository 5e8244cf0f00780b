use crate::error::{CoreError, CoreResult};
use crate::normalize::synonyms::FieldSynonyms;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{FieldKind, NormalizedRequirement};

/// One raw field exactly as the ingestion side delivered it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum RawField {
    #[default]
    Absent,
    Scalar(String),
    KeyValue { key: String, value: String },
    CompoundList(Vec<String>),
}

impl RawField {
    pub fn scalar(text: impl Into<String>) -> Self {
        RawField::Scalar(text.into())
    }

    pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        RawField::KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RawField::CompoundList(items.into_iter().map(Into::into).collect())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, RawField::Absent)
    }

    /// Map a JSON value onto the closed set of encodings without flattening it.
    ///
    /// Objects with several entries keep the first entry whose key is a synonym
    /// of `kind` (falling back to the first entry). Constraint objects keep every
    /// entry as a `key: value` list item.
    pub fn from_json(value: &Value, kind: FieldKind, synonyms: &FieldSynonyms) -> Self {
        match value {
            Value::Null => RawField::Absent,
            Value::String(s) => RawField::Scalar(s.clone()),
            Value::Bool(_) | Value::Number(_) => RawField::Scalar(value.to_string()),
            Value::Array(items) => {
                RawField::CompoundList(items.iter().filter_map(json_item_text).collect())
            }
            Value::Object(map) => {
                if map.is_empty() {
                    return RawField::Absent;
                }
                if kind == FieldKind::Constraints && map.len() > 1 {
                    return RawField::CompoundList(
                        map.iter()
                            .filter_map(|(k, v)| json_item_text(v).map(|t| format!("{}: {}", k, t)))
                            .collect(),
                    );
                }
                let chosen = map
                    .iter()
                    .find(|(k, _)| synonyms.value_key_matches(kind, k))
                    .or_else(|| map.iter().next());
                match chosen {
                    Some((k, v)) => match json_item_text(v) {
                        Some(text) => RawField::KeyValue {
                            key: k.clone(),
                            value: text,
                        },
                        None => RawField::Absent,
                    },
                    None => RawField::Absent,
                }
            }
        }
    }
}

fn json_item_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(json_item_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        other => Some(other.to_string()),
    }
}

/// Requirement row as received. Read-only to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawRequirement {
    pub id: Option<String>,
    pub anchor: RawField,
    pub action: RawField,
    pub when: RawField,
    pub constraints: RawField,
    pub verification: RawField,
}

impl RawRequirement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn field(&self, kind: FieldKind) -> &RawField {
        match kind {
            FieldKind::Anchors => &self.anchor,
            FieldKind::Actions => &self.action,
            FieldKind::Condition => &self.when,
            FieldKind::Constraints => &self.constraints,
            FieldKind::Verification => &self.verification,
        }
    }

    fn field_mut(&mut self, kind: FieldKind) -> &mut RawField {
        match kind {
            FieldKind::Anchors => &mut self.anchor,
            FieldKind::Actions => &mut self.action,
            FieldKind::Condition => &mut self.when,
            FieldKind::Constraints => &mut self.constraints,
            FieldKind::Verification => &mut self.verification,
        }
    }

    /// Build a record from one JSON row. Unknown keys are ignored; when two keys
    /// map to the same field the first non-absent one wins.
    pub fn from_json_value(value: &Value, synonyms: &FieldSynonyms) -> Self {
        let mut out = RawRequirement::default();
        let map = match value.as_object() {
            Some(m) => m,
            None => {
                tracing::debug!("requirement row is not a JSON object; leaving it without id");
                return out;
            }
        };
        for (key, v) in map {
            match synonyms.record_field_for_key(key) {
                Some(RecordKey::Id) => {
                    if out.id.is_none() {
                        out.id = match v {
                            Value::String(s) => Some(s.clone()),
                            Value::Number(n) => Some(n.to_string()),
                            _ => None,
                        };
                    }
                }
                Some(RecordKey::Field(kind)) => {
                    let slot = out.field_mut(kind);
                    if slot.is_absent() {
                        *slot = RawField::from_json(v, kind, synonyms);
                    }
                }
                None => {}
            }
        }
        out
    }
}

/// Which record slot a top-level JSON key feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKey {
    Id,
    Field(FieldKind),
}

impl From<&NormalizedRequirement> for RawRequirement {
    fn from(req: &NormalizedRequirement) -> Self {
        let list = |items: &[String]| {
            if items.is_empty() {
                RawField::Absent
            } else {
                RawField::CompoundList(items.to_vec())
            }
        };
        let text = |value: &Option<String>| match value {
            Some(v) => RawField::Scalar(v.clone()),
            None => RawField::Absent,
        };
        RawRequirement {
            id: Some(req.id.clone()),
            anchor: list(&req.anchors),
            action: list(&req.actions),
            when: text(&req.condition),
            constraints: if req.constraints.is_empty() {
                RawField::Absent
            } else {
                RawField::CompoundList(
                    req.constraints
                        .iter()
                        .map(|c| format!("{}: {}", c.label, c.value))
                        .collect(),
                )
            },
            verification: text(&req.verification),
        }
    }
}

/// Parse the ingestion payload: either a JSON array of rows or an object with a
/// `requirements` array.
pub fn parse_requirements_json(
    json_str: &str,
    synonyms: &FieldSynonyms,
) -> CoreResult<Vec<RawRequirement>> {
    let raw: Value = serde_json::from_str(json_str)
        .map_err(|e| CoreError::InvalidInput(format!("Failed to parse requirements: {}", e)))?;

    let rows = match &raw {
        Value::Array(rows) => rows,
        Value::Object(map) => map
            .get("requirements")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                CoreError::InvalidInput("Missing requirements array".to_string())
            })?,
        _ => {
            return Err(CoreError::InvalidInput(
                "requirements payload must be an array or an object".to_string(),
            ))
        }
    };

    Ok(rows
        .iter()
        .map(|row| RawRequirement::from_json_value(row, synonyms))
        .collect())
}
