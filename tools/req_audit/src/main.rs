use fusa_req_core::audit::event::{now_rfc3339_utc, Actor};
use fusa_req_core::audit::log::AuditLog;
use fusa_req_core::report::{render_issues_markdown, render_normalized_csv, render_normalized_markdown};
use fusa_req_core::{CoreResult, Engine, EngineConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: req_audit <requirements.json> [--config <engine.json>] [--audit-log <audit.ndjson>] [--format json|markdown|csv]";

struct Args {
    input: PathBuf,
    config: Option<PathBuf>,
    audit_log: Option<PathBuf>,
    format: String,
}

fn parse_args() -> Result<Args, String> {
    let mut it = std::env::args().skip(1);
    let mut input = None;
    let mut config = None;
    let mut audit_log = None;
    let mut format = "json".to_string();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(it.next().ok_or("--config needs a path")?)),
            "--audit-log" => {
                audit_log = Some(PathBuf::from(it.next().ok_or("--audit-log needs a path")?))
            }
            "--format" => format = it.next().ok_or("--format needs a value")?,
            other if other.starts_with("--") => return Err(format!("unknown flag {}", other)),
            other => input = Some(PathBuf::from(other)),
        }
    }
    if !matches!(format.as_str(), "json" | "markdown" | "csv") {
        return Err(format!("invalid format: {}", format));
    }
    Ok(Args {
        input: input.ok_or("missing requirements file")?,
        config,
        audit_log,
        format,
    })
}

fn run(args: &Args) -> CoreResult<String> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    let engine = Engine::new(&config)?;
    let records = engine.parse_records_json(&std::fs::read_to_string(&args.input)?)?;

    let report = match &args.audit_log {
        Some(path) => {
            let mut audit = AuditLog::open_or_create(path)?;
            engine.run_audited(&records, &mut audit, &now_rfc3339_utc()?, Actor::User)?
        }
        None => engine.run(&records),
    };

    for s in &report.skipped {
        eprintln!("SKIPPED index={} reason={}", s.index, s.reason);
    }

    match args.format.as_str() {
        "markdown" => Ok(format!(
            "{}\n{}",
            render_normalized_markdown(&report.normalized),
            render_issues_markdown(&report.issues)
        )),
        "csv" => render_normalized_csv(&report.normalized),
        _ => Ok(serde_json::to_string_pretty(&report)?),
    }
}

fn main() {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("fusa_req_core=info,req_audit=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{}", msg);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    match run(&args) {
        Ok(out) => println!("{}", out),
        Err(e) => {
            tracing::error!(error = %e, "req_audit failed");
            eprintln!("req_audit error: {}", e);
            std::process::exit(1);
        }
    }
}
