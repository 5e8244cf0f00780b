use crate::rules::{Finding, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::taxonomy::IssueTaxonomy;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueEntry {
    pub issue_id: String,
    pub issue_type: String,
    pub grouped_issue_type: String,
    pub severity: Severity,
    pub rule_ids: Vec<String>,
    pub affected_requirement_ids: BTreeSet<String>,
    pub details: String,
}

/// Ids collected for one rule inside a group.
struct RuleBucket<'a> {
    rule_id: &'a str,
    ids: BTreeSet<&'a str>,
}

struct Group<'a> {
    issue_type: &'a str,
    grouped_issue_type: &'a str,
    severity: Severity,
    rules: Vec<RuleBucket<'a>>,
}

#[derive(Debug, Clone)]
pub struct IssueAggregator {
    taxonomy: IssueTaxonomy,
}

impl IssueAggregator {
    pub fn new(taxonomy: IssueTaxonomy) -> Self {
        Self { taxonomy }
    }

    pub fn aggregate(&self, findings: &[Finding]) -> Vec<IssueEntry> {
        let mut ordered: Vec<&Finding> = findings.iter().collect();
        ordered.sort_by(|a, b| a.requirement_id.cmp(&b.requirement_id));

        let mut groups: Vec<Group> = Vec::new();
        let mut index: HashMap<(&str, &str), usize> = HashMap::new();

        for f in ordered {
            let entry = self.taxonomy.lookup(&f.rule_id);
            let key = (entry.issue_type.as_str(), entry.grouped_issue_type.as_str());
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(Group {
                    issue_type: key.0,
                    grouped_issue_type: key.1,
                    severity: f.severity,
                    rules: Vec::new(),
                });
                groups.len() - 1
            });
            let group = &mut groups[slot];
            group.severity = group.severity.max(f.severity);
            match group.rules.iter_mut().find(|b| b.rule_id == f.rule_id) {
                Some(bucket) => {
                    bucket.ids.insert(f.requirement_id.as_str());
                }
                None => group.rules.push(RuleBucket {
                    rule_id: &f.rule_id,
                    ids: BTreeSet::from([f.requirement_id.as_str()]),
                }),
            }
        }

        groups
            .into_iter()
            .enumerate()
            .map(|(n, group)| {
                let details = group
                    .rules
                    .iter()
                    .map(|b| {
                        let ids: Vec<&str> = b.ids.iter().copied().collect();
                        self.taxonomy.lookup(b.rule_id).render(&ids)
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                IssueEntry {
                    issue_id: format!("ISS-{:03}", n + 1),
                    issue_type: group.issue_type.to_string(),
                    grouped_issue_type: group.grouped_issue_type.to_string(),
                    severity: group.severity,
                    rule_ids: group.rules.iter().map(|b| b.rule_id.to_string()).collect(),
                    affected_requirement_ids: group
                        .rules
                        .iter()
                        .flat_map(|b| b.ids.iter().map(|id| id.to_string()))
                        .collect(),
                    details,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(id: &str, rule: &str, severity: Severity) -> Finding {
        Finding {
            requirement_id: id.to_string(),
            rule_id: rule.to_string(),
            severity,
        }
    }

    fn aggregator() -> IssueAggregator {
        IssueAggregator::new(IssueTaxonomy::embedded().unwrap())
    }

    #[test]
    fn one_entry_per_rule_across_requirements() {
        let findings = vec![
            finding("REQ-MCU-04", "MISSING_CONDITION", Severity::HIGH),
            finding("REQ-BMS-01", "MISSING_CONDITION", Severity::HIGH),
            finding("REQ-BMS-01", "MISSING_CONDITION", Severity::HIGH),
        ];
        let issues = aggregator().aggregate(&findings);
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.issue_id, "ISS-001");
        assert_eq!(issue.issue_type, "EngineHealthIssue");
        assert_eq!(issue.grouped_issue_type, "Condition Structuring Issues");
        assert_eq!(issue.affected_requirement_ids.len(), 2);
        assert!(issue.details.contains("REQ-BMS-01, REQ-MCU-04"));
    }

    #[test]
    fn order_is_first_occurrence_in_id_order() {
        let findings = vec![
            finding("R2", "MISSING_VERIFICATION", Severity::MEDIUM),
            finding("R1", "MISSING_CONDITION", Severity::HIGH),
            finding("R3", "MISSING_ANCHOR", Severity::HIGH),
        ];
        let issues = aggregator().aggregate(&findings);
        let grouped: Vec<&str> = issues.iter().map(|i| i.grouped_issue_type.as_str()).collect();
        assert_eq!(
            grouped,
            vec![
                "Condition Structuring Issues",
                "Verification Coverage Issues",
                "Anchor Integrity Issues"
            ]
        );
        assert_eq!(issues[2].issue_id, "ISS-003");
    }

    #[test]
    fn shared_group_merges_rules_and_keeps_highest_severity() {
        let findings = vec![
            finding("R1", "INCOMPATIBLE_CONSTRAINTS", Severity::MEDIUM),
            finding("R2", "INCOMPATIBLE_CONSTRAINTS", Severity::MEDIUM),
            finding("R2", "INCONSISTENT_FTTI", Severity::HIGH),
            finding("R3", "INCONSISTENT_FTTI", Severity::HIGH),
        ];
        let issues = aggregator().aggregate(&findings);
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.issue_type, "ConstraintConflictIssue");
        assert_eq!(issue.severity, Severity::HIGH);
        assert_eq!(issue.rule_ids, vec!["INCOMPATIBLE_CONSTRAINTS", "INCONSISTENT_FTTI"]);
        assert_eq!(
            issue.affected_requirement_ids,
            BTreeSet::from(["R1".to_string(), "R2".to_string(), "R3".to_string()])
        );
        let first = issue.details.find("R1, R2 state the same behavior").unwrap();
        let second = issue.details.find("R2, R3 give different timing").unwrap();
        assert!(first < second);
    }

    #[test]
    fn unmapped_rule_is_unclassified() {
        let issues = aggregator().aggregate(&[finding("R1", "CUSTOM_RULE", Severity::LOW)]);
        assert_eq!(issues[0].issue_type, "UnclassifiedIssue");
        assert_eq!(issues[0].grouped_issue_type, "Unclassified Issues");
    }

    #[test]
    fn no_findings_no_issues() {
        assert!(aggregator().aggregate(&[]).is_empty());
    }
}
