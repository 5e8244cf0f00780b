use crate::error::CoreResult;
use crate::issues::IssueEntry;
use crate::record::model::{ConditionSource, NormalizedRequirement};

const ABSENT: &str = "-";

fn cell(text: &str) -> String {
    if text.is_empty() {
        ABSENT.to_string()
    } else {
        text.replace('|', "\\|").replace('\n', " ")
    }
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn source_label(source: ConditionSource) -> &'static str {
    match source {
        ConditionSource::EXPLICIT => "EXPLICIT",
        ConditionSource::EXTRACTED => "EXTRACTED",
        ConditionSource::NONE => "NONE",
    }
}

fn constraint_text(req: &NormalizedRequirement, sep: &str) -> String {
    req.constraints
        .iter()
        .map(|c| format!("{}: {}", c.label, c.value))
        .collect::<Vec<_>>()
        .join(sep)
}

pub fn render_normalized_markdown(reqs: &[NormalizedRequirement]) -> String {
    let mut out = Vec::new();
    out.push("# Normalized Requirements".to_string());
    out.push("".to_string());
    out.push(
        "| Req ID | Anchor | Action | When | Condition Source | Constraints | Verification |"
            .to_string(),
    );
    out.push("|---|---|---|---|---|---|---|".to_string());
    for r in reqs {
        out.push(format!(
            "| {} | {} | {} | {} | {} | {} | {} |",
            cell(&r.id),
            cell(&r.anchors.join(", ")),
            cell(&r.actions.join(", ")),
            cell(opt(&r.condition)),
            source_label(r.condition_source),
            cell(&constraint_text(r, "; ")),
            cell(opt(&r.verification)),
        ));
    }
    out.push("".to_string());
    out.join("\n")
}

pub fn render_issues_markdown(issues: &[IssueEntry]) -> String {
    let mut out = Vec::new();
    out.push("# Issues".to_string());
    out.push("".to_string());
    if issues.is_empty() {
        out.push("No issues found.".to_string());
        out.push("".to_string());
        return out.join("\n");
    }
    out.push("| Issue ID | Issue Type | Grouped Issue Type | Severity | Affected Requirements | Details |".to_string());
    out.push("|---|---|---|---|---|---|".to_string());
    for i in issues {
        let ids: Vec<&str> = i.affected_requirement_ids.iter().map(String::as_str).collect();
        out.push(format!(
            "| {} | {} | {} | {} | {} | {} |",
            cell(&i.issue_id),
            cell(&i.issue_type),
            cell(&i.grouped_issue_type),
            i.severity.as_str(),
            cell(&ids.join(", ")),
            cell(&i.details),
        ));
    }
    out.push("".to_string());
    out.join("\n")
}

pub fn render_normalized_csv(reqs: &[NormalizedRequirement]) -> CoreResult<String> {
    let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
    wtr.write_record([
        "req_id",
        "anchors",
        "actions",
        "condition",
        "condition_source",
        "constraints",
        "verification",
    ])?;
    for r in reqs {
        let anchors = r.anchors.join(";");
        let actions = r.actions.join(";");
        let constraints = constraint_text(r, ";");
        wtr.write_record([
            r.id.as_str(),
            anchors.as_str(),
            actions.as_str(),
            opt(&r.condition),
            source_label(r.condition_source),
            constraints.as_str(),
            opt(&r.verification),
        ])?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).replace("\r\n", "\n"))
}
