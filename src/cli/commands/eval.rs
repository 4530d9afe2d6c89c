use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use inetvm::{ReduceConfig, RunOutcome, run_program};

pub(crate) fn cmd_eval(source: &str, config: &ReduceConfig, json: bool) -> Result<()> {
    let outcome = run_program(source, config)?;
    print_value(&outcome, json)
}

pub(crate) fn cmd_run(file: &Path, config: &ReduceConfig, json: bool) -> Result<()> {
    let source =
        fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let outcome = run_program(&source, config)?;
    print_value(&outcome, json)
}

pub(crate) fn cmd_stats(source: &str, config: &ReduceConfig, json: bool) -> Result<()> {
    let outcome = run_program(source, config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    println!("{}", format_stats(&outcome));
    Ok(())
}

pub(crate) fn format_value(outcome: &RunOutcome) -> String {
    match &outcome.value {
        Some(value) => value.to_string(),
        None => "<no value>".to_string(),
    }
}

pub(crate) fn format_stats(outcome: &RunOutcome) -> String {
    let stats = &outcome.report.statistics;
    format!(
        "value: {}\nsteps: {}\nreductions: {}\ncreated: {}\ndeleted: {}\nstale pairs: {}\nlive nodes: {}\ntime: {}ms",
        format_value(outcome),
        outcome.report.steps,
        stats.reductions,
        stats.created_nodes,
        stats.deleted_nodes,
        stats.stale_pairs,
        outcome.state.node_count,
        outcome.report.duration.as_millis()
    )
}

fn print_value(outcome: &RunOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(&outcome.value)?);
    } else {
        println!("{}", format_value(outcome));
    }
    Ok(())
}
