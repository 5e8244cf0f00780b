use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ISSUE_TAXONOMY_VERSION: &str = "issue_taxonomy_v1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxonomyEntry {
    pub issue_type: String,
    pub grouped_issue_type: String,
    pub details_template: String,
    pub rationale: String,
}

impl TaxonomyEntry {
    /// Fill `{ids}`, `{count}` and `{rationale}`.
    pub fn render(&self, ids: &[&str]) -> String {
        self.details_template
            .replace("{ids}", &ids.join(", "))
            .replace("{count}", &ids.len().to_string())
            .replace("{rationale}", &self.rationale)
            .trim()
            .to_string()
    }
}

/// Static rule id → issue category lookup table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueTaxonomy {
    pub taxonomy_version: String,
    pub fallback: TaxonomyEntry,
    pub entries: BTreeMap<String, TaxonomyEntry>,
}

impl IssueTaxonomy {
    pub fn embedded() -> CoreResult<Self> {
        let json = include_str!("issue_taxonomy_v1.json");
        let taxonomy: IssueTaxonomy = serde_json::from_str(json)?;
        if taxonomy.taxonomy_version != ISSUE_TAXONOMY_VERSION {
            return Err(CoreError::Config(
                "embedded issue taxonomy is not issue_taxonomy_v1".to_string(),
            ));
        }
        Ok(taxonomy)
    }

    pub fn lookup(&self, rule_id: &str) -> &TaxonomyEntry {
        self.entries.get(rule_id).unwrap_or(&self.fallback)
    }
}
