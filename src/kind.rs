//! Node kinds and their port layouts.

use std::fmt;
use std::str::FromStr;

use crate::error::NetError;

/// Closed set of node kinds. Declaration order is the canonical order used
/// when dispatching an active pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    Lam,
    App,
    Var,
    Dup,
    Era,
    Num,
    Bool,
    Pair,
    Fst,
    Snd,
    Ope,
    Str,
    List,
    Head,
    Tail,
    Swi,
}

impl NodeKind {
    pub const ALL: [NodeKind; 16] = [
        NodeKind::Lam,
        NodeKind::App,
        NodeKind::Var,
        NodeKind::Dup,
        NodeKind::Era,
        NodeKind::Num,
        NodeKind::Bool,
        NodeKind::Pair,
        NodeKind::Fst,
        NodeKind::Snd,
        NodeKind::Ope,
        NodeKind::Str,
        NodeKind::List,
        NodeKind::Head,
        NodeKind::Tail,
        NodeKind::Swi,
    ];

    /// Canonical upper-case tag.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Lam => "LAM",
            NodeKind::App => "APP",
            NodeKind::Var => "VAR",
            NodeKind::Dup => "DUP",
            NodeKind::Era => "ERA",
            NodeKind::Num => "NUM",
            NodeKind::Bool => "BOOL",
            NodeKind::Pair => "PAIR",
            NodeKind::Fst => "FST",
            NodeKind::Snd => "SND",
            NodeKind::Ope => "OPE",
            NodeKind::Str => "STR",
            NodeKind::List => "LIST",
            NodeKind::Head => "HEAD",
            NodeKind::Tail => "TAIL",
            NodeKind::Swi => "SWI",
        }
    }

    /// Port polarities at creation time, principal first. OPE is laid out
    /// for a binary operator; unary operators drop the last port.
    pub fn polarities(self) -> &'static [bool] {
        match self {
            NodeKind::Lam => &[true, false],
            NodeKind::App
            | NodeKind::Dup
            | NodeKind::Pair
            | NodeKind::List
            | NodeKind::Swi
            | NodeKind::Ope => &[false, true, true],
            NodeKind::Fst | NodeKind::Snd | NodeKind::Head | NodeKind::Tail => &[false, true],
            NodeKind::Var
            | NodeKind::Era
            | NodeKind::Num
            | NodeKind::Bool
            | NodeKind::Str => &[false],
        }
    }

    pub fn arity(self) -> usize {
        self.polarities().len()
    }

    /// Kinds whose principal port carries an uplink to a body or result wire.
    pub fn has_uplink(self) -> bool {
        matches!(self, NodeKind::Lam | NodeKind::Swi)
    }

    /// Kinds that hold a constant payload and have no auxiliary ports.
    pub fn is_constant(self) -> bool {
        matches!(self, NodeKind::Num | NodeKind::Bool | NodeKind::Str)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| NetError::UnknownKind(s.to_string()))
    }
}
