//! Result extraction from a reduced net.

use std::fmt;

use serde::Serialize;

use crate::error::NetError;
use crate::kind::NodeKind;
use crate::net::{Constant, Net, NodeId, Payload, PortRef};

const MAX_DEPTH: usize = 4096;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Num(i64),
    Bool(bool),
    Str(String),
    /// Any lambda; bodies are not read back.
    Function,
    Pair(Box<Value>, Box<Value>),
    Cons(Box<Value>, Box<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Function => f.write_str("<function>"),
            Value::Pair(a, b) => write!(f, "({a}, {b})"),
            Value::Cons(head, tail) => match head.as_ref() {
                Value::Cons(..) => write!(f, "({head}) : {tail}"),
                _ => write!(f, "{head} : {tail}"),
            },
        }
    }
}

/// Read the value wired to the root anchor, if the wire ends at a value node.
pub fn extract(net: &Net, root: NodeId) -> Result<Option<Value>, NetError> {
    let wire = net.peer(PortRef::new(root, 1))?;
    read_back(net, wire, 0)
}

/// Read the value whose principal port is `port`.
pub fn read_back(net: &Net, port: Option<PortRef>, depth: usize) -> Result<Option<Value>, NetError> {
    let Some(port) = port else {
        return Ok(None);
    };
    if !port.is_principal() || depth > MAX_DEPTH {
        return Ok(None);
    }
    let node = port.node;
    let value = match net.kind(node)? {
        NodeKind::Num | NodeKind::Bool | NodeKind::Str => match net.payload(node)? {
            Payload::Constant(Constant::Num(n)) => Some(Value::Num(*n)),
            Payload::Constant(Constant::Bool(b)) => Some(Value::Bool(*b)),
            Payload::Constant(Constant::Str(s)) => Some(Value::Str(s.clone())),
            _ => None,
        },
        NodeKind::Lam => Some(Value::Function),
        kind @ (NodeKind::Pair | NodeKind::List) => {
            let first = read_back(net, net.peer(PortRef::new(node, 1))?, depth + 1)?;
            let second = read_back(net, net.peer(PortRef::new(node, 2))?, depth + 1)?;
            match (first, second) {
                (Some(a), Some(b)) if kind == NodeKind::Pair => {
                    Some(Value::Pair(Box::new(a), Box::new(b)))
                }
                (Some(a), Some(b)) => Some(Value::Cons(Box::new(a), Box::new(b))),
                _ => None,
            }
        }
        _ => None,
    };
    Ok(value)
}
