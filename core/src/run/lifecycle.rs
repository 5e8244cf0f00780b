use crate::audit::event::{Actor, AuditEvent};
use crate::audit::log::AuditLog;
use crate::error::CoreResult;
use crate::issues::IssueEntry;
use crate::record::model::{ConditionSource, NormalizedRequirement};
use crate::report::SkippedRecord;
use crate::rules::Finding;
use std::collections::BTreeMap;

fn append(
    audit: &mut AuditLog,
    run_id: &str,
    ts_utc: &str,
    actor: Actor,
    event_type: &str,
    details: serde_json::Value,
) -> CoreResult<()> {
    audit.append(AuditEvent {
        ts_utc: ts_utc.to_string(),
        event_type: event_type.to_string(),
        run_id: run_id.to_string(),
        actor,
        details,
        prev_event_hash: String::new(),
        event_hash: String::new(),
    })?;
    Ok(())
}

pub fn emit_run_started(
    audit: &mut AuditLog,
    run_id: &str,
    ts_utc: &str,
    requested_by: Actor,
    record_count: usize,
    rules_enabled: &[&str],
) -> CoreResult<()> {
    append(
        audit,
        run_id,
        ts_utc,
        requested_by,
        "RUN_STARTED",
        serde_json::json!({
            "record_count": record_count,
            "rules_enabled": rules_enabled
        }),
    )
}

pub fn emit_record_skipped(
    audit: &mut AuditLog,
    run_id: &str,
    ts_utc: &str,
    skipped: &SkippedRecord,
) -> CoreResult<()> {
    append(
        audit,
        run_id,
        ts_utc,
        Actor::System,
        "RECORD_SKIPPED",
        serde_json::json!({
            "index": skipped.index,
            "requirement_id": skipped.id,
            "reason": skipped.reason
        }),
    )
}

pub fn emit_normalization_completed(
    audit: &mut AuditLog,
    run_id: &str,
    ts_utc: &str,
    normalized: &[NormalizedRequirement],
) -> CoreResult<()> {
    let count = |source: ConditionSource| {
        normalized
            .iter()
            .filter(|r| r.condition_source == source)
            .count()
    };
    append(
        audit,
        run_id,
        ts_utc,
        Actor::System,
        "NORMALIZATION_COMPLETED",
        serde_json::json!({
            "normalized_count": normalized.len(),
            "explicit_conditions": count(ConditionSource::EXPLICIT),
            "extracted_conditions": count(ConditionSource::EXTRACTED),
            "missing_conditions": count(ConditionSource::NONE)
        }),
    )
}

pub fn emit_rules_evaluated(
    audit: &mut AuditLog,
    run_id: &str,
    ts_utc: &str,
    findings: &[Finding],
) -> CoreResult<()> {
    let mut by_rule: BTreeMap<&str, usize> = BTreeMap::new();
    for f in findings {
        *by_rule.entry(f.rule_id.as_str()).or_default() += 1;
    }
    append(
        audit,
        run_id,
        ts_utc,
        Actor::System,
        "RULES_EVALUATED",
        serde_json::json!({
            "finding_count": findings.len(),
            "findings_by_rule": by_rule
        }),
    )
}

pub fn emit_issues_aggregated(
    audit: &mut AuditLog,
    run_id: &str,
    ts_utc: &str,
    issues: &[IssueEntry],
) -> CoreResult<()> {
    let issue_ids: Vec<&str> = issues.iter().map(|i| i.issue_id.as_str()).collect();
    append(
        audit,
        run_id,
        ts_utc,
        Actor::System,
        "ISSUES_AGGREGATED",
        serde_json::json!({
            "issue_count": issues.len(),
            "issue_ids": issue_ids
        }),
    )
}

pub fn emit_run_completed(
    audit: &mut AuditLog,
    run_id: &str,
    ts_utc: &str,
    normalized_count: usize,
    skipped_count: usize,
    issue_count: usize,
) -> CoreResult<()> {
    append(
        audit,
        run_id,
        ts_utc,
        Actor::System,
        "RUN_COMPLETED",
        serde_json::json!({
            "normalized_count": normalized_count,
            "skipped_count": skipped_count,
            "issue_count": issue_count
        }),
    )
}
