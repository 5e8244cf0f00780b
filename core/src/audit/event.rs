use crate::determinism::json_canonical;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEvent {
    pub ts_utc: String, // RFC3339 UTC string
    pub event_type: String,
    pub run_id: String,
    pub actor: Actor,
    pub details: serde_json::Value,
    pub prev_event_hash: String, // hex 64
    pub event_hash: String,      // hex 64
}

pub const ZERO_HASH_64: &str = "0000000000000000000000000000000000000000000000000000000000000000";

pub const EVENT_TYPES: &[&str] = &[
    "RUN_STARTED",
    "RECORD_SKIPPED",
    "NORMALIZATION_COMPLETED",
    "RULES_EVALUATED",
    "ISSUES_AGGREGATED",
    "RUN_COMPLETED",
];

pub fn now_rfc3339_utc() -> CoreResult<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| CoreError::InvalidInput(format!("timestamp formatting failed: {}", e)))
}

// event_hash = SHA-256 over the canonical envelope with event_hash zeroed.
pub fn compute_event_hash(event: &AuditEvent) -> CoreResult<String> {
    let mut e = event.clone();
    e.event_hash = ZERO_HASH_64.to_string();
    let bytes = json_canonical::to_canonical_bytes(&e)?;
    let mut h = Sha256::new();
    h.update(bytes);
    Ok(hex::encode(h.finalize()))
}

pub fn finalize_event(mut event: AuditEvent) -> CoreResult<AuditEvent> {
    if !is_hex64(&event.prev_event_hash) {
        return Err(CoreError::InvalidInput(
            "prev_event_hash must be 64 hex chars".to_string(),
        ));
    }
    validate_event_taxonomy(&event)?;
    event.event_hash = compute_event_hash(&event)?;
    Ok(event)
}

pub fn is_hex64(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn validate_event_taxonomy(event: &AuditEvent) -> CoreResult<()> {
    if !EVENT_TYPES.contains(&event.event_type.as_str()) {
        return Err(CoreError::InvalidInput(format!(
            "unknown event_type {}",
            event.event_type
        )));
    }
    for k in required_detail_keys(&event.event_type) {
        if event.details.get(k).is_none() {
            return Err(CoreError::InvalidInput(format!(
                "event {} missing details.{}",
                event.event_type, k
            )));
        }
    }
    Ok(())
}

pub fn required_detail_keys(event_type: &str) -> &'static [&'static str] {
    match event_type {
        "RUN_STARTED" => &["record_count", "rules_enabled"],
        "RECORD_SKIPPED" => &["index", "requirement_id", "reason"],
        "NORMALIZATION_COMPLETED" => &[
            "normalized_count",
            "explicit_conditions",
            "extracted_conditions",
            "missing_conditions",
        ],
        "RULES_EVALUATED" => &["finding_count", "findings_by_rule"],
        "ISSUES_AGGREGATED" => &["issue_count", "issue_ids"],
        "RUN_COMPLETED" => &["normalized_count", "skipped_count", "issue_count"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, details: serde_json::Value) -> AuditEvent {
        AuditEvent {
            ts_utc: "2026-01-01T00:00:00Z".to_string(),
            event_type: event_type.to_string(),
            run_id: "r_0123456789abcdef0123456789abcdef".to_string(),
            actor: Actor::System,
            details,
            prev_event_hash: ZERO_HASH_64.to_string(),
            event_hash: String::new(),
        }
    }

    #[test]
    fn finalize_sets_stable_hash() {
        let e = event("RUN_STARTED", json!({"record_count": 2, "rules_enabled": ["MISSING_CONDITION"]}));
        let a = finalize_event(e.clone()).unwrap();
        let b = finalize_event(e).unwrap();
        assert!(is_hex64(&a.event_hash));
        assert_eq!(a.event_hash, b.event_hash);
    }

    #[test]
    fn missing_detail_key_is_rejected() {
        let err = finalize_event(event("RUN_COMPLETED", json!({"issue_count": 1}))).unwrap_err();
        assert!(err.to_string().contains("missing details.normalized_count"));
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        assert!(finalize_event(event("EXPORT_REQUESTED", json!({}))).is_err());
    }

    #[test]
    fn bad_prev_hash_is_rejected() {
        let mut e = event("RUN_STARTED", json!({"record_count": 0, "rules_enabled": []}));
        e.prev_event_hash = "abc".to_string();
        assert!(finalize_event(e).is_err());
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let ts = now_rfc3339_utc().unwrap();
        assert!(OffsetDateTime::parse(&ts, &Rfc3339).is_ok());
    }
}
