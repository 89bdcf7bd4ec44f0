//! Pretty-mode display logic for the fanout-lookup CLI.
//!
//! Everything `--pretty` prints lives here: the header, aligned result
//! lines, the elapsed-time summary and the failure list.

use console::{pad_str, style, Alignment};
use fanout_lookup_lib::{AggregateError, AggregateOutcome, LookupKey, LookupResult, SourceKind};
use std::time::Duration;

const KEY_WIDTH: usize = 24;

// ── Header ───────────────────────────────────────────────────────────────────

pub fn print_header(keys: &[LookupKey], source: &SourceKind, delay: Option<Duration>) {
    println!(
        "{} {} {}",
        style("fanout-lookup").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "- Looking up {} key{} on {}",
            keys.len(),
            if keys.len() == 1 { "" } else { "s" },
            source
        ))
        .dim(),
    );

    if let Some(delay) = delay {
        println!(
            "{}",
            style(format!("Simulated latency: {}ms", delay.as_millis())).dim()
        );
    }
    println!();
}

// ── Results ──────────────────────────────────────────────────────────────────

pub fn print_outcome(outcome: &AggregateOutcome) {
    for result in &outcome.results {
        print_result(result);
    }
    println!();
    print_summary(outcome.len(), outcome.elapsed);
}

fn print_result(result: &LookupResult) {
    let padded_key = pad_str(result.key.as_str(), KEY_WIDTH, Alignment::Left, Some(".."));
    let name = result.payload.name.as_deref().unwrap_or("-");
    let website = result.payload.website.as_deref().unwrap_or("-");

    println!(
        "  {}  {}  {}  {}",
        style(&padded_key).white(),
        style(name).green().bold(),
        style(website).cyan(),
        style(format!("({}ms)", result.fetch_duration.as_millis())).dim(),
    );
}

fn print_summary(count: usize, elapsed: Duration) {
    println!(
        "{} {} lookup{} in {}",
        style("Summary:").bold(),
        count,
        if count == 1 { "" } else { "s" },
        style(format!("{}ms", elapsed.as_millis())).yellow(),
    );
}

// ── Failures ─────────────────────────────────────────────────────────────────

pub fn print_failures(err: &AggregateError) {
    eprintln!(
        "{} {} of {} lookups failed",
        style("✗").red().bold(),
        err.failures().len(),
        err.total()
    );
    for failure in err.failures() {
        let padded_key = pad_str(failure.key(), KEY_WIDTH, Alignment::Left, Some(".."));
        eprintln!("  {}  {}", style(&padded_key).red(), style(failure).dim());
    }
    eprintln!();
}
