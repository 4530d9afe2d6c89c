//! Rewrite rules for every supported active pair.
//!
//! Each rule consumes exactly the two interacting nodes and rewires the
//! partners of their ports. Port layouts:
//!
//! * LAM: 0 value, 1 binder; body through the uplink of port 0.
//! * APP: 0 function, 1 result, 2 argument.
//! * DUP: 0 shared side, 1 and 2 copies.
//! * SWI: 0 condition, 1 true branch, 2 false branch; result through the uplink of port 0.
//! * OPE: 0 awaited operand, 1 result, 2 second operand (binary operators only).
//! * PAIR / LIST: 0 value, 1 first / head, 2 second / tail.
//! * FST, SND, HEAD, TAIL: 0 input, 1 result.

use std::fmt;

use tracing::trace;

use crate::error::ReduceError;
use crate::kind::NodeKind;
use crate::net::{Constant, Net, NodeId, Payload, PortRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rule {
    Beta,
    DupLam,
    DupApp,
    DupDup,
    DupConstant,
    DupConstructor,
    DupProjection,
    DupOperator,
    DupSwitch,
    Erase,
    EraseEraser,
    SwitchBool,
    SwitchErase,
    Operate,
    ProjectPair,
    ProjectList,
}

impl Rule {
    pub fn name(self) -> &'static str {
        match self {
            Rule::Beta => "beta",
            Rule::DupLam => "dup-lam",
            Rule::DupApp => "dup-app",
            Rule::DupDup => "dup-dup",
            Rule::DupConstant => "dup-constant",
            Rule::DupConstructor => "dup-constructor",
            Rule::DupProjection => "dup-projection",
            Rule::DupOperator => "dup-operator",
            Rule::DupSwitch => "dup-switch",
            Rule::Erase => "erase",
            Rule::EraseEraser => "erase-eraser",
            Rule::SwitchBool => "switch-bool",
            Rule::SwitchErase => "switch-erase",
            Rule::Operate => "operate",
            Rule::ProjectPair => "project-pair",
            Rule::ProjectList => "project-list",
        }
    }

    /// Rule for an unordered kind pair, plus whether `(a, b)` must be swapped
    /// into canonical order before calling [`Rule::apply`].
    pub fn lookup(a: NodeKind, b: NodeKind) -> Option<(Rule, bool)> {
        use NodeKind::*;

        let swapped = a > b;
        let (lo, hi) = if swapped { (b, a) } else { (a, b) };
        let rule = match (lo, hi) {
            (Lam, App) => Rule::Beta,
            (Lam, Dup) => Rule::DupLam,
            (App, Dup) => Rule::DupApp,
            (Dup, Dup) => Rule::DupDup,
            (Dup, Num | Bool | Str) => Rule::DupConstant,
            (Dup, Pair | List) => Rule::DupConstructor,
            (Dup, Fst | Snd | Head | Tail) => Rule::DupProjection,
            (Dup, Ope) => Rule::DupOperator,
            (Dup, Swi) => Rule::DupSwitch,
            (Era, Era) => Rule::EraseEraser,
            (Era, Swi) => Rule::SwitchErase,
            (Lam | App | Dup, Era) => Rule::Erase,
            (Era, Num | Bool | Str | Pair | Fst | Snd | Ope | List | Head | Tail) => Rule::Erase,
            (Num | Bool | Str, Ope) => Rule::Operate,
            (Pair, Fst | Snd) => Rule::ProjectPair,
            (Bool, Swi) => Rule::SwitchBool,
            (List, Head | Tail) => Rule::ProjectList,
            _ => return None,
        };
        Some((rule, swapped))
    }

    /// Rewrite the pair `(lo, hi)`, given in canonical kind order.
    pub fn apply(self, net: &mut Net, lo: NodeId, hi: NodeId) -> Result<(), ReduceError> {
        trace!(rule = self.name(), %lo, %hi, "rewrite");
        match self {
            Rule::Beta => beta(net, lo, hi),
            Rule::DupDup => dup_dup(net, lo, hi),
            Rule::DupLam
            | Rule::DupApp
            | Rule::DupConstant
            | Rule::DupConstructor
            | Rule::DupProjection
            | Rule::DupOperator
            | Rule::DupSwitch => {
                if net.kind(lo)? == NodeKind::Dup {
                    commute(net, lo, hi)
                } else {
                    commute(net, hi, lo)
                }
            }
            Rule::Erase | Rule::SwitchErase => {
                if net.kind(lo)? == NodeKind::Era {
                    erase(net, lo, hi)
                } else {
                    erase(net, hi, lo)
                }
            }
            Rule::EraseEraser => {
                net.delete_node(lo)?;
                net.delete_node(hi)?;
                Ok(())
            }
            Rule::SwitchBool => switch_bool(net, lo, hi),
            Rule::Operate => operate(net, lo, hi),
            Rule::ProjectPair | Rule::ProjectList => project(net, lo, hi),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Far end of the wire an uplink points at. When the target is an anchor the
/// wire continues through its port 1 and the anchor is consumed with the rule.
struct UplinkWire {
    end: Option<PortRef>,
    anchor: Option<NodeId>,
}

fn uplink_wire(net: &Net, node: NodeId) -> Result<Option<UplinkWire>, ReduceError> {
    let Some(target) = net.uplink(PortRef::principal(node))? else {
        return Ok(None);
    };
    let target_node = net.node(target.node)?;
    if target_node.kind() == NodeKind::Var && target.is_principal() && target_node.arity() > 1 {
        Ok(Some(UplinkWire {
            end: net.peer(PortRef::new(target.node, 1))?,
            anchor: Some(target.node),
        }))
    } else {
        Ok(Some(UplinkWire {
            end: Some(target),
            anchor: None,
        }))
    }
}

fn splice(net: &mut Net, a: Option<PortRef>, b: Option<PortRef>) -> Result<(), ReduceError> {
    if let (Some(a), Some(b)) = (a, b) {
        net.connect(a, b)?;
    }
    Ok(())
}

fn erase_end(net: &mut Net, end: Option<PortRef>) -> Result<(), ReduceError> {
    if let Some(end) = end {
        let era = net.create_era();
        net.connect(PortRef::principal(era), end)?;
    }
    Ok(())
}

fn label_of(net: &Net, dup: NodeId) -> Result<u32, ReduceError> {
    net.node(dup)?.label().ok_or(ReduceError::MissingPayload {
        node: dup,
        kind: NodeKind::Dup,
    })
}

fn beta(net: &mut Net, lam: NodeId, app: NodeId) -> Result<(), ReduceError> {
    let binder = net.peer(PortRef::new(lam, 1))?;
    let argument = net.peer(PortRef::new(app, 2))?;
    splice(net, binder, argument)?;

    if let Some(body) = uplink_wire(net, lam)? {
        let result = net.peer(PortRef::new(app, 1))?;
        splice(net, body.end, result)?;
        if let Some(anchor) = body.anchor {
            net.delete_node(anchor)?;
        }
    }
    net.delete_node(lam)?;
    net.delete_node(app)?;
    Ok(())
}

fn dup_dup(net: &mut Net, a: NodeId, b: NodeId) -> Result<(), ReduceError> {
    if label_of(net, a)? != label_of(net, b)? {
        return commute(net, a, b);
    }
    for port in 1..=2 {
        let left = net.peer(PortRef::new(a, port))?;
        let right = net.peer(PortRef::new(b, port))?;
        splice(net, left, right)?;
    }
    net.delete_node(a)?;
    net.delete_node(b)?;
    Ok(())
}

/// Push `dup` through `other`: two copies of `other` take the places of the
/// duplicator's copy ports, and every auxiliary wire of `other` is shared
/// through a new duplicator carrying the same label.
fn commute(net: &mut Net, dup: NodeId, other: NodeId) -> Result<(), ReduceError> {
    let label = label_of(net, dup)?;
    let kind = net.kind(other)?;
    let arity = net.node(other)?.arity();
    let copies = [net.create_copy(other)?, net.create_copy(other)?];

    for port in 1..arity {
        let Some(end) = net.peer(PortRef::new(other, port))? else {
            continue;
        };
        if kind == NodeKind::Ope && port == 2 && is_constant_value(net, end)? {
            // A constant second operand is handed to one copy and cloned for the other.
            net.connect(PortRef::new(copies[0], 2), end)?;
            let clone = net.create_copy(end.node)?;
            net.connect(PortRef::new(copies[1], 2), PortRef::principal(clone))?;
            continue;
        }
        let fan = net.create_dup_labeled(label);
        net.connect(PortRef::principal(fan), end)?;
        net.connect(PortRef::new(fan, 1), PortRef::new(copies[0], port))?;
        net.connect(PortRef::new(fan, 2), PortRef::new(copies[1], port))?;
    }

    if kind.has_uplink() {
        if let Some(wire) = uplink_wire(net, other)? {
            let fan = net.create_dup_labeled(label);
            if let Some(end) = wire.end {
                net.connect(PortRef::principal(fan), end)?;
            }
            for (slot, copy) in copies.iter().enumerate() {
                let anchor = net.create_anchor();
                net.connect(PortRef::new(anchor, 1), PortRef::new(fan, slot + 1))?;
                net.set_uplink(PortRef::principal(*copy), PortRef::principal(anchor))?;
            }
            if let Some(anchor) = wire.anchor {
                net.delete_node(anchor)?;
            }
        }
    }

    for (slot, copy) in copies.iter().enumerate() {
        if let Some(end) = net.peer(PortRef::new(dup, slot + 1))? {
            net.connect(PortRef::principal(*copy), end)?;
        }
    }
    net.delete_node(dup)?;
    net.delete_node(other)?;
    Ok(())
}

fn is_constant_value(net: &Net, end: PortRef) -> Result<bool, ReduceError> {
    Ok(end.is_principal() && net.kind(end.node)?.is_constant())
}

fn erase(net: &mut Net, era: NodeId, target: NodeId) -> Result<(), ReduceError> {
    let kind = net.kind(target)?;
    let arity = net.node(target)?.arity();
    for port in 1..arity {
        let end = net.peer(PortRef::new(target, port))?;
        erase_end(net, end)?;
    }
    if kind.has_uplink() {
        if let Some(wire) = uplink_wire(net, target)? {
            erase_end(net, wire.end)?;
            if let Some(anchor) = wire.anchor {
                net.delete_node(anchor)?;
            }
        }
    }
    net.delete_node(era)?;
    net.delete_node(target)?;
    Ok(())
}

fn switch_bool(net: &mut Net, condition: NodeId, swi: NodeId) -> Result<(), ReduceError> {
    let value = match net.payload(condition)? {
        Payload::Constant(Constant::Bool(value)) => *value,
        _ => {
            return Err(ReduceError::MissingPayload {
                node: condition,
                kind: NodeKind::Bool,
            });
        }
    };
    let (chosen, dropped) = if value { (1, 2) } else { (2, 1) };
    let dropped_end = net.peer(PortRef::new(swi, dropped))?;
    erase_end(net, dropped_end)?;

    let chosen_end = net.peer(PortRef::new(swi, chosen))?;
    if let Some(result) = uplink_wire(net, swi)? {
        splice(net, chosen_end, result.end)?;
        if let Some(anchor) = result.anchor {
            net.delete_node(anchor)?;
        }
    }
    net.delete_node(condition)?;
    net.delete_node(swi)?;
    Ok(())
}

fn operate(net: &mut Net, value: NodeId, op: NodeId) -> Result<(), ReduceError> {
    let value_kind = net.kind(value)?;
    let mut pending = match net.payload(op)? {
        Payload::Operator(pending) => *pending,
        _ => {
            return Err(ReduceError::MissingPayload {
                node: op,
                kind: NodeKind::Ope,
            });
        }
    };
    let operand = match net.payload(value)? {
        Payload::Constant(constant) => constant.as_operand(),
        _ => None,
    }
    .ok_or(ReduceError::OperandMismatch {
        operator: pending.operator,
        found: value_kind,
    })?;
    pending.operator.check(operand)?;

    let result = if pending.operator.is_unary() {
        pending.operator.apply_unary(operand)?
    } else if let Some(first) = pending.first_operand {
        pending.operator.apply(first, operand)?
    } else {
        // First phase: remember the operand and wait on the second one.
        pending.first_operand = Some(operand);
        net.set_payload(op, Payload::Operator(pending))?;
        let second = net.peer(PortRef::new(op, 2))?;
        net.delete_node(value)?;
        if let Some(second) = second {
            net.connect(PortRef::principal(op), second)?;
        }
        trace!(%op, %operand, "operand stored");
        return Ok(());
    };

    trace!(%op, operator = %pending.operator, %result, "computed");
    let out = net.peer(PortRef::new(op, 1))?;
    let node = net.create_constant(result.into());
    net.delete_node(op)?;
    net.delete_node(value)?;
    if let Some(out) = out {
        net.connect(PortRef::principal(node), out)?;
    }
    Ok(())
}

fn project(net: &mut Net, source: NodeId, projection: NodeId) -> Result<(), ReduceError> {
    let keep = match net.kind(projection)? {
        NodeKind::Fst | NodeKind::Head => 1,
        _ => 2,
    };
    let dropped = net.peer(PortRef::new(source, 3 - keep))?;
    erase_end(net, dropped)?;
    let kept = net.peer(PortRef::new(source, keep))?;
    let out = net.peer(PortRef::new(projection, 1))?;
    splice(net, kept, out)?;
    net.delete_node(source)?;
    net.delete_node(projection)?;
    Ok(())
}
