use fusa_req_core::normalize::{split_compound, FieldSynonyms, Normalizer};
use fusa_req_core::record::{ConditionSource, RawField, RawRequirement};
use fusa_req_core::Engine;
use proptest::prelude::*;

fn text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9가-힣 (),:-]{0,16}"
}

fn raw_field() -> impl Strategy<Value = RawField> {
    prop_oneof![
        Just(RawField::Absent),
        text().prop_map(RawField::Scalar),
        (text(), text()).prop_map(|(key, value)| RawField::KeyValue { key, value }),
        proptest::collection::vec(text(), 0..4).prop_map(RawField::CompoundList),
    ]
}

fn raw_requirement() -> impl Strategy<Value = RawRequirement> {
    (raw_field(), raw_field(), raw_field(), raw_field(), raw_field()).prop_map(
        |(anchor, action, when, constraints, verification)| RawRequirement {
            id: Some("REQ-P-01".to_string()),
            anchor,
            action,
            when,
            constraints,
            verification,
        },
    )
}

proptest! {
    #[test]
    fn normalization_is_idempotent(raw in raw_requirement()) {
        let normalizer = Normalizer::new(FieldSynonyms::embedded().unwrap()).unwrap();
        let once = normalizer.normalize("REQ-P-01", &raw);
        let twice = normalizer.normalize("REQ-P-01", &RawRequirement::from(&once));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn none_source_means_absent_condition(raw in raw_requirement()) {
        let engine = Engine::with_defaults().unwrap();
        let (normalized, skipped) = engine.normalize_all(&[raw]);
        prop_assert!(skipped.is_empty());
        let req = &normalized[0];
        if req.condition_source == ConditionSource::NONE {
            prop_assert!(req.condition.is_none());
        } else {
            prop_assert!(req.condition.as_deref().is_some_and(|c| !c.is_empty()));
        }
        prop_assert_eq!(req.extraction_marker.is_some(), req.condition_source == ConditionSource::EXTRACTED);
    }

    #[test]
    fn split_items_are_trimmed_and_non_empty(s in text()) {
        for part in split_compound(&s) {
            prop_assert!(!part.is_empty());
            prop_assert_eq!(part.trim(), part.as_str());
        }
    }
}

#[test]
fn parenthesized_commas_stay_together() {
    assert_eq!(split_compound("A(x, y), B"), vec!["A(x, y)", "B"]);
}

#[test]
fn parallel_output_keeps_input_order() {
    let engine = Engine::with_defaults().unwrap();
    let records: Vec<RawRequirement> = (0..300)
        .rev()
        .map(|n| {
            let mut r = RawRequirement::new(format!("REQ-{:04}", n));
            r.anchor = RawField::scalar(format!("ECU{}", n % 7));
            r.action = if n % 3 == 0 {
                RawField::scalar(format!("Stop motor {} when fault {} is detected", n, n))
            } else {
                RawField::scalar(format!("Report status {}", n))
            };
            r
        })
        .collect();

    let report = engine.run(&records);
    let expected: Vec<String> = records.iter().filter_map(|r| r.id.clone()).collect();
    let got: Vec<String> = report.normalized.iter().map(|r| r.id.clone()).collect();
    assert_eq!(got, expected);

    let again = engine.run(&records);
    assert_eq!(report, again);
}

#[test]
fn findings_merge_in_requirement_id_order() {
    let engine = Engine::with_defaults().unwrap();
    let records: Vec<RawRequirement> = ["REQ-C", "REQ-A", "REQ-B"]
        .iter()
        .map(|id| {
            let mut r = RawRequirement::new(*id);
            r.anchor = RawField::scalar(format!("{} anchor", id));
            r.action = RawField::scalar(format!("{} action", id));
            r
        })
        .collect();
    let report = engine.run(&records);
    let condition_issue = report.issue_for_group("Condition Structuring Issues").unwrap();
    assert!(condition_issue
        .details
        .starts_with("Requirements REQ-A, REQ-B, REQ-C have no structured trigger condition."));
    assert_eq!(report.issues[0].issue_id, "ISS-001");
    assert_eq!(report.issues[0].grouped_issue_type, "Condition Structuring Issues");
}
