//! End-to-end evaluation of surface programs.

use anyhow::Context;
use serde::Serialize;
use tracing::debug;

use crate::Result;
use crate::engine::{NormalFormReport, ReduceConfig, Reducer};
use crate::lower::compile;
use crate::net::{Net, NetState};
use crate::readback::{Value, extract};
use crate::syntax::parse;

#[derive(Clone, Debug, Serialize)]
pub struct RunOutcome {
    pub value: Option<Value>,
    pub report: NormalFormReport,
    pub state: NetState,
}

/// Parse, lower, reduce and read back `source`.
pub fn run_program(source: &str, config: &ReduceConfig) -> Result<RunOutcome> {
    let term = parse(source).context("parse failed")?;
    let mut net = Net::new();
    let root = compile(&mut net, &term).context("compile failed")?;
    let report = Reducer::new(config.clone()).normal_form(&mut net)?;
    let value = extract(&net, root)?;
    debug!(?value, steps = report.steps, "program finished");
    Ok(RunOutcome {
        value,
        report,
        state: net.get_state(),
    })
}

/// Convenience wrapper returning only the value.
pub fn eval(source: &str) -> Result<Option<Value>> {
    Ok(run_program(source, &ReduceConfig::default())?.value)
}
