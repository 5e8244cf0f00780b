use crate::normalize::split::top_level_chars;
use crate::record::model::{ConditionSource, NormalizedRequirement};

use super::markers::{CompiledMarkers, Placement};

const TRAILING_PUNCTUATION: &[char] = &[',', ';', '.', ':', '\u{FF0C}', '\u{3002}'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionMatch {
    pub marker_id: String,
    pub text: String,
}

/// Condition Extractor: copies a trigger clause out of anchor/action text.
#[derive(Debug, Clone)]
pub struct ConditionExtractor {
    markers: CompiledMarkers,
}

struct Candidate<'a> {
    offset: usize,
    len: usize,
    order: usize,
    marker_id: &'a str,
    text: &'a str,
}

impl ConditionExtractor {
    pub fn new(markers: CompiledMarkers) -> Self {
        Self { markers }
    }

    /// Fill in a condition for records that have none. Other records pass through.
    pub fn enrich(&self, mut req: NormalizedRequirement) -> NormalizedRequirement {
        if req.condition_source != ConditionSource::NONE {
            return req;
        }
        let found = req
            .anchors
            .iter()
            .chain(req.actions.iter())
            .find_map(|text| self.find_condition(text));
        if let Some(found) = found {
            tracing::debug!(
                requirement_id = %req.id,
                marker_id = %found.marker_id,
                "condition extracted"
            );
            req.condition = Some(found.text);
            req.condition_source = ConditionSource::EXTRACTED;
            req.extraction_marker = Some(found.marker_id);
        }
        req
    }

    /// Earliest trigger marker in `text`; longer match then catalog order on ties.
    pub fn find_condition(&self, text: &str) -> Option<ConditionMatch> {
        let clauses = clause_ranges(text);
        let mut best: Option<Candidate> = None;

        for (order, marker) in self.markers.triggers().enumerate() {
            for m in marker.regex.find_iter(text) {
                let (clause_start, clause_end) = clauses
                    .iter()
                    .copied()
                    .find(|(s, e)| m.start() >= *s && m.start() < *e)
                    .unwrap_or((0, text.len()));
                let span = match marker.placement {
                    Placement::SUFFIX => &text[clause_start..m.end().min(text.len())],
                    Placement::PREFIX => &text[m.start()..clause_end.max(m.end())],
                };
                let span = trim_condition(span);
                if span.is_empty() {
                    continue;
                }
                let candidate = Candidate {
                    offset: m.start(),
                    len: m.len(),
                    order,
                    marker_id: &marker.marker_id,
                    text: span,
                };
                if best.as_ref().map_or(true, |b| beats(&candidate, b)) {
                    best = Some(candidate);
                }
            }
        }

        best.map(|c| ConditionMatch {
            marker_id: c.marker_id.to_string(),
            text: c.text.to_string(),
        })
    }
}

fn beats(a: &Candidate, b: &Candidate) -> bool {
    (a.offset, std::cmp::Reverse(a.len), a.order) < (b.offset, std::cmp::Reverse(b.len), b.order)
}

fn trim_condition(span: &str) -> &str {
    span.trim()
        .trim_end_matches(|c: char| c.is_whitespace() || TRAILING_PUNCTUATION.contains(&c))
        .trim_start_matches(|c: char| c.is_whitespace() || TRAILING_PUNCTUATION.contains(&c))
}

/// Byte ranges of clauses split on top-level `,` `;` `，` and `.` (not between digits).
pub fn clause_ranges(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut ranges = Vec::new();
    let mut start = 0;
    for (offset, c) in top_level_chars(text) {
        let is_boundary = match c {
            ',' | ';' | '\u{FF0C}' => true,
            '.' => {
                let digit_before = offset > 0 && bytes[offset - 1].is_ascii_digit();
                let digit_after = bytes.get(offset + 1).is_some_and(|b| b.is_ascii_digit());
                !(digit_before && digit_after)
            }
            _ => false,
        };
        if is_boundary {
            ranges.push((start, offset));
            start = offset + c.len_utf8();
        }
    }
    ranges.push((start, text.len()));
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::markers::MarkerCatalog;
    use crate::record::model::Constraint;

    fn extractor() -> ConditionExtractor {
        let markers = CompiledMarkers::compile(&MarkerCatalog::embedded().unwrap()).unwrap();
        ConditionExtractor::new(markers)
    }

    fn req(actions: &[&str]) -> NormalizedRequirement {
        NormalizedRequirement {
            id: "R1".to_string(),
            anchors: vec!["MCU".to_string()],
            actions: actions.iter().map(|s| s.to_string()).collect(),
            condition: None,
            condition_source: ConditionSource::NONE,
            constraints: vec![],
            verification: None,
            extraction_marker: None,
        }
    }

    #[test]
    fn korean_suffix_marker() {
        let found = extractor()
            .find_condition("과전압 감지 시 릴레이를 개방한다.")
            .unwrap();
        assert_eq!(found.text, "과전압 감지 시");
        assert_eq!(found.marker_id, "KO_EVENT_SI");
    }

    #[test]
    fn english_prefix_marker_runs_to_clause_end() {
        let found = extractor()
            .find_condition("Open the relay when cell voltage exceeds 4.2V. Log a DTC")
            .unwrap();
        assert_eq!(found.text, "when cell voltage exceeds 4.2V");
        assert_eq!(found.marker_id, "EN_CONNECTIVE");
    }

    #[test]
    fn clause_start_bounds_suffix_marker() {
        let found = extractor()
            .find_condition("경고를 표시하고, 3초 이상 지속 시 토크를 제한한다")
            .unwrap();
        assert_eq!(found.text, "3초 이상 지속 시");
    }

    #[test]
    fn threshold_marker() {
        let found = extractor()
            .find_condition("배터리 온도 60℃ 이상 도달 시 충전을 중단")
            .unwrap();
        assert_eq!(found.text, "배터리 온도 60℃ 이상");
        assert_eq!(found.marker_id, "KO_THRESHOLD");
    }

    #[test]
    fn no_marker_leaves_record_untouched() {
        let r = req(&["토크 제어를 중단하고", "안전 상태로 전환한다."]);
        let out = extractor().enrich(r.clone());
        assert_eq!(out, r);
    }

    #[test]
    fn enrich_copies_without_touching_actions() {
        let r = req(&["Limit torque", "Stop charging if temperature exceeds 60C"]);
        let out = extractor().enrich(r.clone());
        assert_eq!(out.condition.as_deref(), Some("if temperature exceeds 60C"));
        assert_eq!(out.condition_source, ConditionSource::EXTRACTED);
        assert_eq!(out.extraction_marker.as_deref(), Some("EN_CONNECTIVE"));
        assert_eq!(out.actions, r.actions);
    }

    #[test]
    fn explicit_condition_is_not_overwritten() {
        let mut r = req(&["Stop when overheated"]);
        r.condition = Some("IGN ON".to_string());
        r.condition_source = ConditionSource::EXPLICIT;
        r.constraints = vec![Constraint::new("timing", "10ms")];
        assert_eq!(extractor().enrich(r.clone()), r);
    }

    #[test]
    fn decimal_point_is_not_a_clause_boundary() {
        assert_eq!(clause_ranges("a 4.2V. b"), vec![(0, 6), (7, 9)]);
        assert_eq!(clause_ranges("x(a, b); y"), vec![(0, 7), (8, 10)]);
    }
}
