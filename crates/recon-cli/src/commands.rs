use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use recon_resolver::{IdentityResolver, ResolverConfig};
use recon_server::{ReconServer, ServerConfig};
use recon_store::{validate_forest, ForestReport, InMemoryContactStore};
use recon_types::{IdentifyRequest, IdentifyResponse};
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Replay(args) => cmd_replay(args, cli.format),
        Command::CheckConfig(args) => cmd_check_config(args, cli.format),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(ReconServer::in_memory(config).serve())?;
    Ok(())
}

fn cmd_check_config(args: CheckConfigArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = ServerConfig::load(&args.path)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => {
            println!("{} {} is valid", "✓".green().bold(), args.path.display());
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}

/// One replayed request line and what came of it.
#[derive(Debug)]
pub struct ReplayOutcome {
    pub line: usize,
    pub result: Result<IdentifyResponse, String>,
}

/// Resolve every non-blank line of `input` as an identify request.
///
/// Lines that fail to parse or resolve are reported in their outcome and do
/// not stop the replay.
pub fn replay_requests(
    resolver: &IdentityResolver,
    input: impl BufRead,
) -> anyhow::Result<Vec<ReplayOutcome>> {
    let mut outcomes = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let result = serde_json::from_str::<IdentifyRequest>(&line)
            .map_err(|e| format!("invalid request: {e}"))
            .and_then(|request| resolver.identify(request).map_err(|e| e.to_string()));
        if let Err(reason) = &result {
            tracing::debug!(line = line_no, %reason, "request failed");
        }
        outcomes.push(ReplayOutcome { line: line_no, result });
    }
    Ok(outcomes)
}

fn cmd_replay(args: ReplayArgs, format: OutputFormat) -> anyhow::Result<()> {
    let file = File::open(&args.file)
        .with_context(|| format!("failed to open {}", args.file.display()))?;

    let store = Arc::new(InMemoryContactStore::new());
    let resolver = IdentityResolver::new(store.clone(), ResolverConfig::default());
    let outcomes = replay_requests(&resolver, BufReader::new(file))?;

    for outcome in &outcomes {
        print_outcome(outcome, format)?;
    }

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if format == OutputFormat::Text {
        println!(
            "\n{} {} requests, {} failed, {} contacts stored",
            "Replay:".bold(),
            outcomes.len(),
            failed,
            store.len()?
        );
    }

    if args.verify {
        let report = validate_forest(&store.snapshot()?);
        print_report(&report, format)?;
        if !report.is_valid() {
            anyhow::bail!("{} invariant violation(s) after replay", report.violations.len());
        }
    }
    Ok(())
}

fn print_outcome(outcome: &ReplayOutcome, format: OutputFormat) -> anyhow::Result<()> {
    match (format, &outcome.result) {
        (OutputFormat::Json, Ok(response)) => println!("{}", serde_json::to_string(response)?),
        (OutputFormat::Json, Err(reason)) => {
            println!("{}", json!({ "line": outcome.line, "error": reason }))
        }
        (OutputFormat::Text, Ok(response)) => {
            let contact = &response.contact;
            let secondaries: Vec<String> = contact
                .secondary_contact_ids
                .iter()
                .map(|id| id.to_string())
                .collect();
            println!(
                "{:>5}  primary {}  emails [{}]  phones [{}]  secondaries [{}]",
                outcome.line,
                contact.primary_contact_id.to_string().yellow(),
                contact.emails.join(", "),
                contact.phone_numbers.join(", "),
                secondaries.join(", ")
            );
        }
        (OutputFormat::Text, Err(reason)) => {
            println!("{:>5}  {} {}", outcome.line, "error:".red().bold(), reason);
        }
    }
    Ok(())
}

fn print_report(report: &ForestReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let violations: Vec<_> = report
                .violations
                .iter()
                .map(|v| {
                    json!({
                        "contact": v.contact,
                        "kind": format!("{:?}", v.kind),
                        "description": v.description,
                    })
                })
                .collect();
            let summary = json!({
                "valid": report.is_valid(),
                "contacts": report.contact_count,
                "primaries": report.primary_count,
                "identities": report.identity_count,
                "violations": violations,
            });
            println!("{}", serde_json::to_string(&summary)?);
        }
        OutputFormat::Text => {
            if report.is_valid() {
                println!(
                    "{} {} contacts, {} identities, all invariants hold",
                    "✓".green().bold(),
                    report.contact_count,
                    report.identity_count
                );
            } else {
                for v in &report.violations {
                    println!("  {} {} {:?}: {}", "✗".red(), v.contact, v.kind, v.description);
                }
            }
        }
    }
    Ok(())
}
