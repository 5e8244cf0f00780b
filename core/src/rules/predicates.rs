//! Built-in rule predicates. Record predicates see one requirement; corpus
//! predicates see the whole immutable set and return the involved indices.

use crate::error::CoreResult;
use crate::extract::markers::CompiledMarkers;
use crate::record::model::{ConditionSource, NormalizedRequirement};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub type RecordPredicate = Arc<dyn Fn(&NormalizedRequirement, &RuleContext) -> bool + Send + Sync>;
pub type CorpusPredicate = fn(&[NormalizedRequirement], &RuleContext) -> BTreeSet<usize>;

/// Read-only data shared by every predicate.
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub markers: CompiledMarkers,
    pub antonym_pairs: Vec<(String, String)>,
    duration: Regex,
}

impl RuleContext {
    pub fn new(markers: CompiledMarkers, antonym_pairs: Vec<(String, String)>) -> CoreResult<Self> {
        let duration = Regex::new(
            r"(?i)(\d+(?:\.\d+)?)\s*(milliseconds?|msec|ms|seconds?|sec|s|초)(?:[^A-Za-z]|$)",
        )?;
        Ok(Self {
            markers,
            antonym_pairs: antonym_pairs
                .into_iter()
                .map(|(a, b)| (a.to_lowercase(), b.to_lowercase()))
                .collect(),
            duration,
        })
    }

    /// First duration in `text`, in milliseconds.
    pub fn duration_ms(&self, text: &str) -> Option<f64> {
        let caps = self.duration.captures(text)?;
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        let unit = caps.get(2)?.as_str().to_lowercase();
        let factor = match unit.as_str() {
            "ms" | "msec" | "millisecond" | "milliseconds" => 1.0,
            _ => 1000.0,
        };
        Some(value * factor)
    }

    fn timing_ms(&self, req: &NormalizedRequirement) -> Option<f64> {
        req.constraints
            .iter()
            .find_map(|c| self.duration_ms(&c.value))
    }
}

pub fn builtin_record(rule_id: &str) -> Option<RecordPredicate> {
    let f: fn(&NormalizedRequirement, &RuleContext) -> bool = match rule_id {
        "MISSING_CONDITION" => missing_condition,
        "MISSING_CONSTRAINT_FOR_TIMED_ACTION" => missing_constraint_for_timed_action,
        "MISSING_VERIFICATION" => missing_verification,
        "MISSING_ANCHOR" => missing_anchor,
        _ => return None,
    };
    Some(Arc::new(f))
}

pub fn builtin_corpus(rule_id: &str) -> Option<CorpusPredicate> {
    match rule_id {
        "DUPLICATE_CONDITION" => Some(duplicate_condition),
        "INCOMPATIBLE_CONSTRAINTS" => Some(incompatible_constraints),
        "INCONSISTENT_FTTI" => Some(inconsistent_ftti),
        "CROSS_ANCHOR_DUPLICATION" => Some(cross_anchor_duplication),
        "POTENTIAL_CONFLICT" => Some(potential_conflict),
        _ => None,
    }
}

pub fn missing_condition(req: &NormalizedRequirement, _ctx: &RuleContext) -> bool {
    req.condition_source == ConditionSource::NONE
}

pub fn missing_constraint_for_timed_action(req: &NormalizedRequirement, ctx: &RuleContext) -> bool {
    if !req.constraints.is_empty() {
        return false;
    }
    req.actions.iter().any(|a| ctx.markers.has_temporal(a))
        || req
            .condition
            .as_deref()
            .is_some_and(|c| ctx.markers.has_temporal(c))
}

pub fn missing_verification(req: &NormalizedRequirement, _ctx: &RuleContext) -> bool {
    req.verification.is_none()
}

pub fn missing_anchor(req: &NormalizedRequirement, _ctx: &RuleContext) -> bool {
    req.anchors.is_empty() && !req.actions.is_empty()
}

/// Indices grouped by a key, groups in key order, members in input order.
fn group_by<K: Ord>(
    reqs: &[NormalizedRequirement],
    key: impl Fn(&NormalizedRequirement) -> Option<K>,
) -> BTreeMap<K, Vec<usize>> {
    let mut groups: BTreeMap<K, Vec<usize>> = BTreeMap::new();
    for (idx, req) in reqs.iter().enumerate() {
        if let Some(k) = key(req) {
            groups.entry(k).or_default().push(idx);
        }
    }
    groups
}

/// Every index in `members` that pairs with another member satisfying `hit`.
fn pairwise(members: &[usize], hit: impl Fn(usize, usize) -> bool) -> BTreeSet<usize> {
    let mut out = BTreeSet::new();
    for (pos, &i) in members.iter().enumerate() {
        for &j in &members[pos + 1..] {
            if hit(i, j) {
                out.insert(i);
                out.insert(j);
            }
        }
    }
    out
}

/// Only records that state a condition can be the same statement.
fn same_statement_key(req: &NormalizedRequirement) -> Option<(String, String, String)> {
    if req.actions.is_empty() {
        return None;
    }
    Some((req.anchor_key(), req.action_key(), req.condition_key()?))
}

pub fn duplicate_condition(reqs: &[NormalizedRequirement], _ctx: &RuleContext) -> BTreeSet<usize> {
    group_by(reqs, same_statement_key)
    .into_values()
    .filter(|members| members.len() > 1)
    .flatten()
    .collect()
}

pub fn incompatible_constraints(
    reqs: &[NormalizedRequirement],
    _ctx: &RuleContext,
) -> BTreeSet<usize> {
    group_by(reqs, same_statement_key)
        .into_values()
        .flat_map(|members| {
            pairwise(&members, |i, j| {
                let a = reqs[i].constraint_key();
                let b = reqs[j].constraint_key();
                !a.is_empty() && !b.is_empty() && a != b
            })
        })
        .collect()
}

pub fn inconsistent_ftti(reqs: &[NormalizedRequirement], ctx: &RuleContext) -> BTreeSet<usize> {
    group_by(reqs, same_statement_key)
        .into_values()
        .flat_map(|members| {
            pairwise(&members, |i, j| {
                match (ctx.timing_ms(&reqs[i]), ctx.timing_ms(&reqs[j])) {
                    (Some(a), Some(b)) => (a - b).abs() > f64::EPSILON,
                    _ => false,
                }
            })
        })
        .collect()
}

pub fn cross_anchor_duplication(
    reqs: &[NormalizedRequirement],
    _ctx: &RuleContext,
) -> BTreeSet<usize> {
    group_by(reqs, |r| {
        if r.actions.is_empty() || r.anchors.is_empty() {
            None
        } else {
            Some(r.action_key())
        }
    })
    .into_values()
    .flat_map(|members| pairwise(&members, |i, j| reqs[i].anchor_key() != reqs[j].anchor_key()))
    .collect()
}

fn holds_antonyms(a: &str, b: &str, pairs: &[(String, String)]) -> bool {
    pairs.iter().any(|(x, y)| {
        (contains_word(a, x) && contains_word(b, y) && !contains_word(a, y))
            || (contains_word(a, y) && contains_word(b, x) && !contains_word(b, y))
    })
}

/// ASCII words match on word boundaries; other scripts match as substrings.
fn contains_word(text: &str, word: &str) -> bool {
    if !word.is_ascii() {
        return text.contains(word);
    }
    text.match_indices(word).any(|(pos, _)| {
        let before = text[..pos].chars().next_back();
        let after = text[pos + word.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_alphabetic() && c != 's')
    })
}

pub fn potential_conflict(reqs: &[NormalizedRequirement], ctx: &RuleContext) -> BTreeSet<usize> {
    group_by(reqs, |r| if r.actions.is_empty() { None } else { r.condition_key() })
        .into_values()
        .flat_map(|members| {
            pairwise(&members, |i, j| {
                reqs[i].anchor_key() != reqs[j].anchor_key()
                    && holds_antonyms(
                        &reqs[i].action_key(),
                        &reqs[j].action_key(),
                        &ctx.antonym_pairs,
                    )
            })
        })
        .collect()
}
