pub mod split;
pub mod synonyms;

use crate::error::{CoreError, CoreResult};
use crate::record::model::{ConditionSource, Constraint, FieldKind, NormalizedRequirement};
use crate::record::raw::{RawField, RawRequirement};
use regex::Regex;
use std::borrow::Cow;

pub use split::{split_compound, top_level_chars};
pub use synonyms::{collapse_whitespace, FieldSynonyms};

const GENERAL_LABEL: &str = "general";
const MAX_LABEL_CHARS: usize = 40;

/// Field Normalizer. Total over [`RawField`]: every input yields a record.
#[derive(Debug, Clone)]
pub struct Normalizer {
    synonyms: FieldSynonyms,
    label_rules: Vec<(String, Regex)>,
    mapping_pair: Regex,
}

impl Normalizer {
    pub fn new(synonyms: FieldSynonyms) -> CoreResult<Self> {
        let mut label_rules = Vec::with_capacity(synonyms.constraint_labels.len());
        for rule in &synonyms.constraint_labels {
            let re = Regex::new(&rule.pattern).map_err(|e| {
                CoreError::Config(format!(
                    "constraint label rule {} has an invalid pattern: {}",
                    rule.label, e
                ))
            })?;
            label_rules.push((rule.label.clone(), re));
        }
        let mapping_pair =
            Regex::new(r#"(?:'([^']*)'|"([^"]*)")\s*:\s*(?:'([^']*)'|"([^"]*)")"#)?;
        Ok(Self {
            synonyms,
            label_rules,
            mapping_pair,
        })
    }

    pub fn synonyms(&self) -> &FieldSynonyms {
        &self.synonyms
    }

    /// Normalize one record. The caller has already validated `id`.
    pub fn normalize(&self, id: &str, raw: &RawRequirement) -> NormalizedRequirement {
        let anchors = self.list_field(raw.field(FieldKind::Anchors), FieldKind::Anchors);
        let actions = self.list_field(raw.field(FieldKind::Actions), FieldKind::Actions);
        let condition = self.text_field(raw.field(FieldKind::Condition), FieldKind::Condition);
        let constraints = self.constraint_field(raw.field(FieldKind::Constraints));
        let verification =
            self.text_field(raw.field(FieldKind::Verification), FieldKind::Verification);

        let condition_source = if condition.is_some() {
            ConditionSource::EXPLICIT
        } else {
            ConditionSource::NONE
        };

        NormalizedRequirement {
            id: id.trim().to_string(),
            anchors,
            actions,
            condition,
            condition_source,
            constraints,
            verification,
            extraction_marker: None,
        }
    }

    /// Parse `{'key': 'value', ...}` written as plain text.
    fn inline_mapping(&self, text: &str) -> Option<Vec<(String, String)>> {
        let trimmed = text.trim();
        if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
            return None;
        }
        let pairs: Vec<(String, String)> = self
            .mapping_pair
            .captures_iter(trimmed)
            .map(|caps| {
                let key = caps.get(1).or_else(|| caps.get(2));
                let value = caps.get(3).or_else(|| caps.get(4));
                (
                    key.map(|m| m.as_str()).unwrap_or_default().to_string(),
                    value.map(|m| m.as_str()).unwrap_or_default().to_string(),
                )
            })
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs)
        }
    }

    /// Rewrite a scalar that is really a mapping literal into the structured form.
    fn expand<'a>(&self, field: &'a RawField, kind: FieldKind) -> Cow<'a, RawField> {
        let text = match field {
            RawField::Scalar(text) => text,
            _ => return Cow::Borrowed(field),
        };
        let pairs = match self.inline_mapping(text) {
            Some(pairs) => pairs,
            None => return Cow::Borrowed(field),
        };
        if kind == FieldKind::Constraints && pairs.len() > 1 {
            return Cow::Owned(RawField::CompoundList(
                pairs
                    .into_iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect(),
            ));
        }
        // Several values for one field are kept as a list, never dropped.
        let matching = pairs
            .iter()
            .filter(|(k, _)| self.synonyms.value_key_matches(kind, k))
            .count();
        if matching > 1 || (matching == 0 && pairs.len() > 1) {
            let values = pairs
                .into_iter()
                .filter(|(k, _)| matching == 0 || self.synonyms.value_key_matches(kind, k))
                .map(|(_, v)| v)
                .collect();
            return Cow::Owned(RawField::CompoundList(values));
        }
        let chosen = pairs
            .iter()
            .position(|(k, _)| self.synonyms.value_key_matches(kind, k))
            .unwrap_or(0);
        let (key, value) = pairs[chosen].clone();
        Cow::Owned(RawField::KeyValue { key, value })
    }

    fn mapping_value(&self, item: &str, kind: FieldKind) -> String {
        let field = RawField::Scalar(item.to_string());
        let value = match self.expand(&field, kind).as_ref() {
            RawField::KeyValue { value, .. } => value.clone(),
            RawField::CompoundList(values) => values.join(", "),
            _ => item.to_string(),
        };
        value
    }

    fn clean(&self, text: &str) -> Option<String> {
        let collapsed = collapse_whitespace(text);
        if self.synonyms.is_placeholder(&collapsed) {
            None
        } else {
            Some(collapsed)
        }
    }

    fn split_clean(&self, text: &str) -> Vec<String> {
        split_compound(text)
            .iter()
            .filter_map(|part| self.clean(part))
            .collect()
    }

    fn list_field(&self, field: &RawField, kind: FieldKind) -> Vec<String> {
        match self.expand(field, kind).as_ref() {
            RawField::Absent => Vec::new(),
            RawField::Scalar(text) | RawField::KeyValue { value: text, .. } => {
                self.split_clean(text)
            }
            RawField::CompoundList(items) => items
                .iter()
                .flat_map(|item| self.split_clean(item))
                .collect(),
        }
    }

    fn text_field(&self, field: &RawField, kind: FieldKind) -> Option<String> {
        match self.expand(field, kind).as_ref() {
            RawField::Absent => None,
            RawField::Scalar(text) | RawField::KeyValue { value: text, .. } => self.clean(text),
            RawField::CompoundList(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|item| self.clean(&self.mapping_value(item, kind)))
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(", "))
                }
            }
        }
    }

    fn constraint_field(&self, field: &RawField) -> Vec<Constraint> {
        let kind = FieldKind::Constraints;
        match self.expand(field, kind).as_ref() {
            RawField::Absent => Vec::new(),
            RawField::Scalar(text) => split_compound(text)
                .iter()
                .filter_map(|item| self.constraint_item(item))
                .collect(),
            RawField::KeyValue { key, value } => {
                let label = collapse_whitespace(key);
                let keep_label =
                    label_is_usable(&label) && !self.synonyms.value_key_matches(kind, &label);
                split_compound(value)
                    .iter()
                    .filter_map(|part| {
                        if !keep_label {
                            return self.constraint_item(part);
                        }
                        let value = self.clean(part)?;
                        Some(Constraint {
                            label: label.clone(),
                            value,
                        })
                    })
                    .collect()
            }
            RawField::CompoundList(items) => items
                .iter()
                .flat_map(|item| split_compound(item))
                .filter_map(|item| self.constraint_item(&item))
                .collect(),
        }
    }

    /// One constraint from `label: value` text, or an inferred label.
    fn constraint_item(&self, item: &str) -> Option<Constraint> {
        let item = self.clean(item)?;
        if let Some((left, right)) = item.split_once(':') {
            let label = left.trim();
            let value = right.trim();
            if label_is_usable(label) && !value.is_empty() {
                let value = self.clean(value)?;
                let label = if self.synonyms.value_key_matches(FieldKind::Constraints, label) {
                    self.infer_label(&value)
                } else {
                    label.to_string()
                };
                return Some(Constraint { label, value });
            }
        }
        let label = self.infer_label(&item);
        Some(Constraint { label, value: item })
    }

    pub fn infer_label(&self, value: &str) -> String {
        self.label_rules
            .iter()
            .find(|(_, re)| re.is_match(value))
            .map(|(label, _)| label.clone())
            .unwrap_or_else(|| GENERAL_LABEL.to_string())
    }
}

fn label_is_usable(label: &str) -> bool {
    !label.is_empty()
        && label.chars().count() <= MAX_LABEL_CHARS
        && label.chars().any(char::is_alphabetic)
        && !label.starts_with(|c: char| c.is_ascii_digit())
        && !label.contains([',', ':'])
}
