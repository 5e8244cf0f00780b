use crate::error::{CoreError, CoreResult};
use crate::extract::markers::CompiledMarkers;
use crate::record::model::NormalizedRequirement;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::catalog::{RuleCatalog, RuleOverride, RuleScope};
use super::predicates::{builtin_corpus, builtin_record, CorpusPredicate, RecordPredicate, RuleContext};
use super::{Finding, Severity};

#[derive(Clone)]
enum RuleCheck {
    Record(RecordPredicate),
    Corpus(CorpusPredicate),
}

#[derive(Clone)]
struct ActiveRule {
    rule_id: String,
    severity: Severity,
    check: RuleCheck,
}

/// Evaluates the enabled rules. Rules only ever read the requirement set.
#[derive(Clone)]
pub struct RuleEngine {
    rules: Vec<ActiveRule>,
    ctx: RuleContext,
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.enabled_rule_ids())
            .finish()
    }
}

#[derive(Default)]
struct MergedOverride {
    enabled: Option<bool>,
    severity: Option<Severity>,
}

fn merge_overrides(
    catalog: &RuleCatalog,
    overrides: &[RuleOverride],
) -> CoreResult<HashMap<String, MergedOverride>> {
    let mut merged: HashMap<String, MergedOverride> = HashMap::new();
    for o in overrides {
        if catalog.get(&o.rule_id).is_none() {
            return Err(CoreError::Config(format!("unknown rule id {}", o.rule_id)));
        }
        let slot = merged.entry(o.rule_id.clone()).or_default();
        if let Some(sev) = o.severity {
            match slot.severity {
                Some(prev) if prev != sev => {
                    return Err(CoreError::Config(format!(
                        "conflicting severity for rule {}: {} vs {}",
                        o.rule_id,
                        prev.as_str(),
                        sev.as_str()
                    )))
                }
                _ => slot.severity = Some(sev),
            }
        }
        if let Some(enabled) = o.enabled {
            match slot.enabled {
                Some(prev) if prev != enabled => {
                    return Err(CoreError::Config(format!(
                        "conflicting enabled flag for rule {}",
                        o.rule_id
                    )))
                }
                _ => slot.enabled = Some(enabled),
            }
        }
    }
    Ok(merged)
}

impl RuleEngine {
    pub fn new(
        catalog: &RuleCatalog,
        overrides: &[RuleOverride],
        markers: CompiledMarkers,
    ) -> CoreResult<Self> {
        let merged = merge_overrides(catalog, overrides)?;
        let mut rules = Vec::new();
        let mut seen = std::collections::BTreeSet::new();

        for def in &catalog.rules {
            if !seen.insert(def.rule_id.as_str()) {
                return Err(CoreError::Config(format!(
                    "rule {} is listed twice in the catalog",
                    def.rule_id
                )));
            }
            let check = match def.scope {
                RuleScope::RECORD => builtin_record(&def.rule_id).map(RuleCheck::Record),
                RuleScope::CORPUS => builtin_corpus(&def.rule_id).map(RuleCheck::Corpus),
            }
            .ok_or_else(|| {
                CoreError::Config(format!("rule {} has no predicate", def.rule_id))
            })?;

            let o = merged.get(&def.rule_id);
            let enabled = o
                .and_then(|o| o.enabled)
                .unwrap_or(def.enabled_by_default);
            let severity = o
                .and_then(|o| o.severity)
                .unwrap_or(def.default_severity);
            if o.is_some() {
                tracing::info!(
                    rule_id = %def.rule_id,
                    enabled,
                    severity = severity.as_str(),
                    "rule override applied"
                );
            }
            if enabled {
                rules.push(ActiveRule {
                    rule_id: def.rule_id.clone(),
                    severity,
                    check,
                });
            }
        }

        let ctx = RuleContext::new(markers, catalog.antonym_pairs.clone())?;
        Ok(Self { rules, ctx })
    }

    /// Add a custom record rule after the catalog rules.
    pub fn register_record_rule<F>(
        &mut self,
        rule_id: &str,
        severity: Severity,
        predicate: F,
    ) -> CoreResult<()>
    where
        F: Fn(&NormalizedRequirement, &RuleContext) -> bool + Send + Sync + 'static,
    {
        if self.rules.iter().any(|r| r.rule_id == rule_id) {
            return Err(CoreError::Config(format!(
                "rule {} is already registered",
                rule_id
            )));
        }
        self.rules.push(ActiveRule {
            rule_id: rule_id.to_string(),
            severity,
            check: RuleCheck::Record(Arc::new(predicate)),
        });
        Ok(())
    }

    pub fn enabled_rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.rule_id.as_str()).collect()
    }

    /// Findings in requirement-id order; within one id, in rule order.
    pub fn evaluate(&self, reqs: &[NormalizedRequirement]) -> Vec<Finding> {
        let per_record: Vec<Vec<(usize, Finding)>> = reqs
            .par_iter()
            .map(|req| {
                self.rules
                    .iter()
                    .enumerate()
                    .filter_map(|(pos, rule)| match &rule.check {
                        RuleCheck::Record(pred) if pred(req, &self.ctx) => {
                            Some((pos, self.finding(req, rule)))
                        }
                        _ => None,
                    })
                    .collect()
            })
            .collect();

        let mut by_id: BTreeMap<&str, Vec<(usize, Finding)>> = BTreeMap::new();
        for (req, findings) in reqs.iter().zip(per_record) {
            by_id.entry(req.id.as_str()).or_default().extend(findings);
        }

        for (pos, rule) in self.rules.iter().enumerate() {
            if let RuleCheck::Corpus(pred) = &rule.check {
                for idx in pred(reqs, &self.ctx) {
                    let req = &reqs[idx];
                    by_id
                        .entry(req.id.as_str())
                        .or_default()
                        .push((pos, self.finding(req, rule)));
                }
            }
        }

        let mut out = Vec::new();
        for (_, mut findings) in by_id {
            findings.sort_by_key(|(pos, _)| *pos);
            out.extend(findings.into_iter().map(|(_, f)| f));
        }

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for f in &out {
            *counts.entry(f.rule_id.as_str()).or_default() += 1;
        }
        for (rule_id, count) in &counts {
            tracing::debug!(rule_id = %rule_id, count, "rule findings");
        }
        out
    }

    fn finding(&self, req: &NormalizedRequirement, rule: &ActiveRule) -> Finding {
        Finding {
            requirement_id: req.id.clone(),
            rule_id: rule.rule_id.clone(),
            severity: rule.severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::markers::MarkerCatalog;
    use crate::record::model::ConditionSource;
    use crate::rules::catalog::rule_catalog_v1;

    fn markers() -> CompiledMarkers {
        CompiledMarkers::compile(&MarkerCatalog::embedded().unwrap()).unwrap()
    }

    fn req(id: &str, anchor: &str, action: &str) -> NormalizedRequirement {
        NormalizedRequirement {
            id: id.to_string(),
            anchors: vec![anchor.to_string()],
            actions: vec![action.to_string()],
            condition: None,
            condition_source: ConditionSource::NONE,
            constraints: vec![],
            verification: None,
            extraction_marker: None,
        }
    }

    fn override_of(rule_id: &str, enabled: Option<bool>, severity: Option<Severity>) -> RuleOverride {
        RuleOverride {
            rule_id: rule_id.to_string(),
            enabled,
            severity,
        }
    }

    #[test]
    fn findings_follow_id_then_rule_order() {
        let engine = RuleEngine::new(&rule_catalog_v1().unwrap(), &[], markers()).unwrap();
        let reqs = vec![req("R2", "VCU", "Warn driver"), req("R1", "BMS", "Warn driver")];
        let findings = engine.evaluate(&reqs);
        let got: Vec<(&str, &str)> = findings
            .iter()
            .map(|f| (f.requirement_id.as_str(), f.rule_id.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("R1", "MISSING_CONDITION"),
                ("R1", "MISSING_VERIFICATION"),
                ("R1", "CROSS_ANCHOR_DUPLICATION"),
                ("R2", "MISSING_CONDITION"),
                ("R2", "MISSING_VERIFICATION"),
                ("R2", "CROSS_ANCHOR_DUPLICATION"),
            ]
        );
    }

    #[test]
    fn overrides_disable_and_reweight() {
        let overrides = vec![
            override_of("MISSING_VERIFICATION", Some(false), None),
            override_of("MISSING_CONDITION", None, Some(Severity::LOW)),
            override_of("MISSING_CONDITION", Some(true), Some(Severity::LOW)),
        ];
        let engine = RuleEngine::new(&rule_catalog_v1().unwrap(), &overrides, markers()).unwrap();
        assert!(!engine.enabled_rule_ids().contains(&"MISSING_VERIFICATION"));
        let findings = engine.evaluate(&[req("R1", "BMS", "Warn driver")]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "MISSING_CONDITION");
        assert_eq!(findings[0].severity, Severity::LOW);
    }

    #[test]
    fn unknown_rule_id_is_rejected() {
        let err = RuleEngine::new(
            &rule_catalog_v1().unwrap(),
            &[override_of("NO_SUCH_RULE", Some(true), None)],
            markers(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown rule id NO_SUCH_RULE"));
    }

    #[test]
    fn conflicting_severity_is_rejected() {
        let err = RuleEngine::new(
            &rule_catalog_v1().unwrap(),
            &[
                override_of("MISSING_CONDITION", None, Some(Severity::HIGH)),
                override_of("MISSING_CONDITION", None, Some(Severity::LOW)),
            ],
            markers(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
        assert!(err.to_string().contains("conflicting severity"));
    }

    #[test]
    fn catalog_rule_without_predicate_is_rejected() {
        let mut catalog = rule_catalog_v1().unwrap();
        let mut extra = catalog.rules[0].clone();
        extra.rule_id = "MISSING_RATIONALE".to_string();
        catalog.rules.push(extra);
        let err = RuleEngine::new(&catalog, &[], markers()).unwrap_err();
        assert!(err.to_string().contains("MISSING_RATIONALE has no predicate"));
    }

    #[test]
    fn custom_record_rule() {
        let mut engine = RuleEngine::new(&rule_catalog_v1().unwrap(), &[], markers()).unwrap();
        engine
            .register_record_rule("SHOUTING_ACTION", Severity::LOW, |r, _| {
                r.actions.iter().any(|a| a.chars().all(|c| !c.is_lowercase()))
            })
            .unwrap();
        let findings = engine.evaluate(&[req("R1", "BMS", "OPEN RELAY")]);
        assert_eq!(findings.last().unwrap().rule_id, "SHOUTING_ACTION");
        assert!(engine
            .register_record_rule("SHOUTING_ACTION", Severity::LOW, |_, _| true)
            .is_err());
    }
}
