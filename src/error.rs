//! Error taxonomy for net construction, reduction and validation.

use std::time::Duration;

use thiserror::Error;

use crate::kind::NodeKind;
use crate::net::{NodeId, PortRef};
use crate::ops::Operator;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    #[error("node {0} is not live")]
    DeadNode(NodeId),
    #[error("port {0} does not exist")]
    MissingPort(PortRef),
    #[error("unknown node kind `{0}`")]
    UnknownKind(String),
    #[error("{0} nodes need a payload and cannot be created bare")]
    PayloadRequired(NodeKind),
    #[error("port {from} is linked to {to}, which does not link back")]
    AsymmetricLink { from: PortRef, to: PortRef },
    #[error("port {from} is linked to {to}, which belongs to a deleted node")]
    DanglingLink { from: PortRef, to: PortRef },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReduceError {
    #[error("no reduction rule for pair <{left}, {right}>")]
    NoRule { left: NodeKind, right: NodeKind },
    #[error("node {0} has its principal port linked to itself")]
    SelfInteraction(NodeId),
    #[error("operator `{operator}` cannot take a {found} operand")]
    OperandMismatch { operator: Operator, found: NodeKind },
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in `{0}`")]
    Overflow(Operator),
    #[error("{kind} node {node} carries no usable payload")]
    MissingPayload { node: NodeId, kind: NodeKind },
    #[error("reduction exceeded {0} steps - possible infinite loop")]
    StepLimit(usize),
    #[error("reduction timeout - computation took longer than {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error(transparent)]
    Net(#[from] NetError),
}

impl ReduceError {
    /// True for budget exhaustion rather than a malformed net.
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, ReduceError::StepLimit(_) | ReduceError::Timeout(_))
    }
}
