use crate::audit::event::Actor;
use crate::audit::log::AuditLog;
use crate::config::EngineConfig;
use crate::determinism::run_id::run_id_for_records;
use crate::error::{CoreError, CoreResult};
use crate::extract::{CompiledMarkers, ConditionExtractor};
use crate::issues::{IssueAggregator, IssueEntry, IssueTaxonomy};
use crate::normalize::Normalizer;
use crate::record::model::NormalizedRequirement;
use crate::record::raw::{parse_requirements_json, RawRequirement};
use crate::report::{QaReport, SkippedRecord};
use crate::rules::{rule_catalog_v1, Finding, RuleEngine};
use rayon::prelude::*;
use std::collections::HashSet;

use super::lifecycle;

const FALLBACK_RUN_ID: &str = "r_00000000000000000000000000000000";

/// The full pipeline: normalize, extract, evaluate, aggregate.
#[derive(Debug, Clone)]
pub struct Engine {
    normalizer: Normalizer,
    extractor: ConditionExtractor,
    rules: RuleEngine,
    aggregator: IssueAggregator,
}

struct Outcome {
    normalized: Vec<NormalizedRequirement>,
    skipped: Vec<SkippedRecord>,
    findings: Vec<Finding>,
    issues: Vec<IssueEntry>,
}

impl Engine {
    /// Configuration problems surface here, before any record is read.
    pub fn new(config: &EngineConfig) -> CoreResult<Self> {
        let normalizer = Normalizer::new(config.normalization_or_embedded()?)?;
        let markers = CompiledMarkers::compile(&config.markers_or_embedded()?)?;
        let rules = RuleEngine::new(&rule_catalog_v1()?, &config.rules, markers.clone())?;
        let aggregator = IssueAggregator::new(IssueTaxonomy::embedded()?);
        tracing::debug!(
            markers = markers.len(),
            rules = rules.enabled_rule_ids().len(),
            "engine initialized"
        );
        Ok(Self {
            normalizer,
            extractor: ConditionExtractor::new(markers),
            rules,
            aggregator,
        })
    }

    pub fn with_defaults() -> CoreResult<Self> {
        Self::new(&EngineConfig::default())
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleEngine {
        &mut self.rules
    }

    pub fn parse_records_json(&self, json: &str) -> CoreResult<Vec<RawRequirement>> {
        parse_requirements_json(json, self.normalizer.synonyms())
    }

    /// Normalize and enrich every well-formed record, in input order.
    pub fn normalize_all(
        &self,
        records: &[RawRequirement],
    ) -> (Vec<NormalizedRequirement>, Vec<SkippedRecord>) {
        let mut seen: HashSet<String> = HashSet::new();
        let mut accepted: Vec<(usize, String, &RawRequirement)> = Vec::new();
        let mut skipped = Vec::new();

        for (index, raw) in records.iter().enumerate() {
            match record_id(index, raw, &seen) {
                Ok(id) => {
                    seen.insert(id.clone());
                    accepted.push((index, id, raw));
                }
                Err(e) => {
                    tracing::warn!(index, id = ?raw.id, error = %e, "record skipped");
                    skipped.push(SkippedRecord {
                        index,
                        id: raw.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut normalized: Vec<(usize, NormalizedRequirement)> = accepted
            .par_iter()
            .map(|(index, id, raw)| {
                let req = self.normalizer.normalize(id, raw);
                (*index, self.extractor.enrich(req))
            })
            .collect();
        normalized.sort_by_key(|(index, _)| *index);

        (normalized.into_iter().map(|(_, r)| r).collect(), skipped)
    }

    fn execute(&self, records: &[RawRequirement]) -> Outcome {
        let (normalized, skipped) = self.normalize_all(records);
        let findings = self.rules.evaluate(&normalized);
        let issues = self.aggregator.aggregate(&findings);
        Outcome {
            normalized,
            skipped,
            findings,
            issues,
        }
    }

    fn run_id(&self, records: &[RawRequirement]) -> String {
        run_id_for_records(records).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "run id fingerprint failed; using fallback id");
            FALLBACK_RUN_ID.to_string()
        })
    }

    /// Always completes; record-level problems land in `skipped`.
    pub fn run(&self, records: &[RawRequirement]) -> QaReport {
        let run_id = self.run_id(records);
        tracing::info!(run_id = %run_id, records = records.len(), "run started");
        let outcome = self.execute(records);
        let report = QaReport {
            run_id,
            finding_count: outcome.findings.len(),
            normalized: outcome.normalized,
            issues: outcome.issues,
            skipped: outcome.skipped,
        };
        tracing::info!(
            run_id = %report.run_id,
            normalized = report.normalized.len(),
            skipped = report.skipped.len(),
            issues = report.issues.len(),
            "run completed"
        );
        report
    }

    /// Like [`Engine::run`], also recording each stage in the audit log.
    pub fn run_audited(
        &self,
        records: &[RawRequirement],
        audit: &mut AuditLog,
        ts_utc: &str,
        requested_by: Actor,
    ) -> CoreResult<QaReport> {
        let run_id = self.run_id(records);
        lifecycle::emit_run_started(
            audit,
            &run_id,
            ts_utc,
            requested_by,
            records.len(),
            &self.rules.enabled_rule_ids(),
        )?;

        let outcome = self.execute(records);
        for s in &outcome.skipped {
            lifecycle::emit_record_skipped(audit, &run_id, ts_utc, s)?;
        }
        lifecycle::emit_normalization_completed(audit, &run_id, ts_utc, &outcome.normalized)?;
        lifecycle::emit_rules_evaluated(audit, &run_id, ts_utc, &outcome.findings)?;
        lifecycle::emit_issues_aggregated(audit, &run_id, ts_utc, &outcome.issues)?;
        lifecycle::emit_run_completed(
            audit,
            &run_id,
            ts_utc,
            outcome.normalized.len(),
            outcome.skipped.len(),
            outcome.issues.len(),
        )?;

        tracing::info!(run_id = %run_id, issues = outcome.issues.len(), "audited run completed");
        Ok(QaReport {
            run_id,
            finding_count: outcome.findings.len(),
            normalized: outcome.normalized,
            issues: outcome.issues,
            skipped: outcome.skipped,
        })
    }
}

fn record_id(index: usize, raw: &RawRequirement, seen: &HashSet<String>) -> CoreResult<String> {
    let id = match raw.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return Err(CoreError::MalformedRecord {
                index,
                reason: "missing id".to_string(),
            })
        }
    };
    if seen.contains(&id) {
        return Err(CoreError::MalformedRecord {
            index,
            reason: format!("duplicate id {}", id),
        });
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::model::ConditionSource;
    use crate::record::raw::RawField;

    #[test]
    fn blank_and_duplicate_ids_are_skipped() {
        let engine = Engine::with_defaults().unwrap();
        let mut a = RawRequirement::new("R1");
        a.when = RawField::scalar("IGN ON");
        let blank = RawRequirement::new("   ");
        let dup = RawRequirement::new("R1");
        let missing = RawRequirement::default();

        let (normalized, skipped) = engine.normalize_all(&[a, blank, dup, missing]);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].condition_source, ConditionSource::EXPLICIT);
        let reasons: Vec<(usize, &str)> = skipped.iter().map(|s| (s.index, s.reason.as_str())).collect();
        assert_eq!(
            reasons,
            vec![
                (1, "malformed record at index 1: missing id"),
                (2, "malformed record at index 2: duplicate id R1"),
                (3, "malformed record at index 3: missing id"),
            ]
        );
    }

    #[test]
    fn run_id_is_deterministic() {
        let engine = Engine::with_defaults().unwrap();
        let records = vec![RawRequirement::new("R1")];
        assert_eq!(engine.run(&records).run_id, engine.run(&records).run_id);
    }
}
