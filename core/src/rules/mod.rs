pub mod catalog;
pub mod engine;
pub mod predicates;

use serde::{Deserialize, Serialize};

pub use catalog::{rule_catalog_v1, RuleCatalog, RuleDef, RuleOverride, RuleScope};
pub use engine::RuleEngine;
pub use predicates::{RecordPredicate, RuleContext};

#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Severity {
    HIGH,
    MEDIUM,
    LOW,
}

impl Severity {
    pub fn rank(&self) -> u8 {
        match self {
            Severity::HIGH => 3,
            Severity::MEDIUM => 2,
            Severity::LOW => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::HIGH => "HIGH",
            Severity::MEDIUM => "MEDIUM",
            Severity::LOW => "LOW",
        }
    }

    pub fn max(self, other: Severity) -> Severity {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

/// One rule evaluation result for one requirement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub requirement_id: String,
    pub rule_id: String,
    pub severity: Severity,
}
