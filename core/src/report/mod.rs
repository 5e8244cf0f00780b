pub mod render;

use crate::issues::IssueEntry;
use crate::record::model::NormalizedRequirement;
use serde::{Deserialize, Serialize};

pub use render::{render_issues_markdown, render_normalized_csv, render_normalized_markdown};

/// A record that could not be normalized. The rest of the batch still runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedRecord {
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QaReport {
    pub run_id: String,
    pub normalized: Vec<NormalizedRequirement>,
    pub issues: Vec<IssueEntry>,
    pub skipped: Vec<SkippedRecord>,
    pub finding_count: usize,
}

impl QaReport {
    pub fn issue_for_group(&self, grouped_issue_type: &str) -> Option<&IssueEntry> {
        self.issues
            .iter()
            .find(|i| i.grouped_issue_type == grouped_issue_type)
    }

    pub fn requirement(&self, id: &str) -> Option<&NormalizedRequirement> {
        self.normalized.iter().find(|r| r.id == id)
    }
}
