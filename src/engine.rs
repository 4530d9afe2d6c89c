//! Reduction driver: pops active pairs and dispatches them to rewrite rules.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::error::ReduceError;
use crate::net::{Net, Statistics};
use crate::rules::Rule;

pub const DEFAULT_MAX_STEPS: usize = 1000;
pub const DEFAULT_MAX_WALL_TIME_MS: u64 = 5000;

/// Budgets applied by [`Reducer::normal_form`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceConfig {
    pub max_steps: usize,
    pub max_wall_time_ms: u64,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_wall_time_ms: DEFAULT_MAX_WALL_TIME_MS,
        }
    }
}

impl ReduceConfig {
    pub fn max_wall_time(&self) -> Duration {
        Duration::from_millis(self.max_wall_time_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NormalFormReport {
    pub steps: usize,
    #[serde(rename = "duration_ms")]
    #[serde(serialize_with = "as_millis")]
    pub duration: Duration,
    pub statistics: Statistics,
}

fn as_millis<S: serde::Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(duration.as_millis() as u64)
}

#[derive(Clone, Debug, Default)]
pub struct Reducer {
    config: ReduceConfig,
}

impl Reducer {
    pub fn new(config: ReduceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReduceConfig {
        &self.config
    }

    /// Rewrite one active pair. Returns false once the queue is empty.
    /// A stale pair is discarded and still counts as a step.
    pub fn step(&self, net: &mut Net) -> Result<bool, ReduceError> {
        let Some((a, b)) = net.pop_active() else {
            return Ok(false);
        };
        if !net.is_active_pair(a, b) {
            net.stats_mut().stale_pairs += 1;
            trace!(%a, %b, "stale pair");
            return Ok(true);
        }
        if a == b {
            return Err(ReduceError::SelfInteraction(a));
        }
        let (left, right) = (net.kind(a)?, net.kind(b)?);
        let Some((rule, swapped)) = Rule::lookup(left, right) else {
            return Err(ReduceError::NoRule { left, right });
        };
        let (lo, hi) = if swapped { (b, a) } else { (a, b) };
        debug!(%rule, %lo, %hi, "reduce");
        rule.apply(net, lo, hi)?;
        net.stats_mut().reductions += 1;
        Ok(true)
    }

    /// Step until no active pair remains, within the configured budgets.
    pub fn normal_form(&self, net: &mut Net) -> Result<NormalFormReport, ReduceError> {
        let started = Instant::now();
        let budget = self.config.max_wall_time();
        let mut steps = 0usize;
        loop {
            if started.elapsed() > budget {
                return Err(ReduceError::Timeout(budget));
            }
            if !self.step(net)? {
                break;
            }
            steps += 1;
            if steps > self.config.max_steps {
                return Err(ReduceError::StepLimit(self.config.max_steps));
            }
        }
        let report = NormalFormReport {
            steps,
            duration: started.elapsed(),
            statistics: net.stats(),
        };
        info!(
            steps,
            reductions = report.statistics.reductions,
            nodes = net.node_count(),
            "normal form"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetError;
    use crate::inspect::render;
    use crate::kind::NodeKind;
    use crate::lower::compile;
    use crate::net::PortRef;
    use crate::ops::Operator;
    use crate::syntax::parse;
    use anyhow::Result;

    /// 5 + 3 feeding a root anchor.
    fn addition(net: &mut Net) -> Result<crate::net::NodeId> {
        let add = net.create_op(Operator::Add);
        let (five, three) = (net.create_num(5), net.create_num(3));
        let root = net.create_anchor();
        net.connect(PortRef::new(add, 2), PortRef::principal(three))?;
        net.connect(PortRef::new(add, 1), PortRef::new(root, 1))?;
        net.connect(PortRef::principal(five), PortRef::principal(add))?;
        Ok(root)
    }

    #[test]
    fn normal_form_reports_steps() -> Result<()> {
        let mut net = Net::new();
        let root = addition(&mut net)?;
        let reducer = Reducer::default();
        let report = reducer.normal_form(&mut net)?;
        assert_eq!(report.steps, 2);
        assert_eq!(report.statistics.reductions, 2);
        let result = net
            .peer(PortRef::new(root, 1))?
            .ok_or_else(|| anyhow::anyhow!("no result"))?;
        assert_eq!(net.kind(result.node)?, NodeKind::Num);
        net.validate_network()?;

        // Further steps are no-ops.
        assert!(!reducer.step(&mut net)?);
        assert_eq!(net.stats().reductions, 2);
        Ok(())
    }

    #[test]
    fn stale_pairs_are_skipped() -> Result<()> {
        let mut net = Net::new();
        let lam = net.create_lam();
        let app = net.create_app();
        net.connect(PortRef::principal(lam), PortRef::principal(app))?;
        net.delete_node(app)?;
        let reducer = Reducer::default();
        assert!(reducer.step(&mut net)?);
        assert_eq!(net.stats().stale_pairs, 1);
        assert_eq!(net.stats().reductions, 0);
        assert!(!reducer.step(&mut net)?);
        Ok(())
    }

    #[test]
    fn unsupported_pair_fails() -> Result<()> {
        let mut net = Net::new();
        let a = net.create_num(1);
        let b = net.create_num(2);
        net.connect(PortRef::principal(a), PortRef::principal(b))?;
        let err = Reducer::default().step(&mut net).unwrap_err();
        assert_eq!(
            err,
            ReduceError::NoRule {
                left: NodeKind::Num,
                right: NodeKind::Num,
            }
        );
        Ok(())
    }

    #[test]
    fn self_linked_principal_fails() -> Result<()> {
        let mut net = Net::new();
        let dup = net.create_dup();
        net.connect(PortRef::principal(dup), PortRef::principal(dup))?;
        let err = Reducer::default().step(&mut net).unwrap_err();
        assert_eq!(err, ReduceError::SelfInteraction(dup));
        Ok(())
    }

    #[test]
    fn step_budget_is_enforced() -> Result<()> {
        let mut net = Net::new();
        addition(&mut net)?;
        let reducer = Reducer::new(ReduceConfig {
            max_steps: 1,
            ..ReduceConfig::default()
        });
        assert_eq!(reducer.normal_form(&mut net), Err(ReduceError::StepLimit(1)));
        Ok(())
    }

    #[test]
    fn dead_nodes_surface_as_net_errors() -> Result<()> {
        let mut net = Net::new();
        let era = net.create_era();
        net.delete_node(era)?;
        let err = net.delete_node(era).unwrap_err();
        assert_eq!(err, NetError::DeadNode(era));
        assert_eq!(ReduceError::from(err.clone()), ReduceError::Net(err));
        Ok(())
    }

    #[test]
    fn rewrites_are_deterministic() -> Result<()> {
        let sources = [
            "let f = \\x -> x * 2 in f 3 + f 4",
            "let twice = \\f -> \\x -> f (f x) in twice (\\n -> n + 1) 5",
            "let p = (3, 4) in fst p + snd p",
        ];
        let reducer = Reducer::default();
        for source in sources {
            let mut left = Net::new();
            compile(&mut left, &parse(source)?)?;
            let mut right = left.clone();
            assert_eq!(render(&left), render(&right));
            loop {
                let (l, r) = (reducer.step(&mut left)?, reducer.step(&mut right)?);
                assert_eq!(l, r, "{source}");
                assert_eq!(render(&left), render(&right), "{source}");
                assert_eq!(left.stats(), right.stats());
                if !l {
                    break;
                }
            }
        }
        Ok(())
    }

    #[test]
    fn config_reads_partial_json() -> Result<()> {
        let config: ReduceConfig = serde_json::from_str(r#"{"max_steps": 50}"#)?;
        assert_eq!(config.max_steps, 50);
        assert_eq!(config.max_wall_time(), Duration::from_millis(DEFAULT_MAX_WALL_TIME_MS));
        Ok(())
    }
}
