//! Arena-backed interaction net.
//!
//! Nodes live in generation-checked slots, so a [`NodeId`] held past the
//! node's deletion is rejected instead of aliasing whatever reuses the slot.
//! Links are kept symmetric by [`Net::connect`]; uplinks are one-directional
//! references from a principal port to the wire that carries its body or
//! result.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use smallvec::SmallVec;
use tracing::trace;

use crate::error::NetError;
use crate::kind::NodeKind;
use crate::ops::{Operand, Operator};

pub const PRINCIPAL: usize = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub node: NodeId,
    pub port: usize,
}

impl PortRef {
    pub fn new(node: NodeId, port: usize) -> Self {
        Self { node, port }
    }

    pub fn principal(node: NodeId) -> Self {
        Self::new(node, PRINCIPAL)
    }

    pub fn is_principal(self) -> bool {
        self.port == PRINCIPAL
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.port)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Port {
    /// Advisory polarity; never enforced.
    pub positive: bool,
    pub link: Option<PortRef>,
    pub uplink: Option<PortRef>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constant {
    Num(i64),
    Bool(bool),
    Str(String),
}

impl Constant {
    pub fn kind(&self) -> NodeKind {
        match self {
            Constant::Num(_) => NodeKind::Num,
            Constant::Bool(_) => NodeKind::Bool,
            Constant::Str(_) => NodeKind::Str,
        }
    }

    pub fn as_operand(&self) -> Option<Operand> {
        match self {
            Constant::Num(n) => Some(Operand::Num(*n)),
            Constant::Bool(b) => Some(Operand::Bool(*b)),
            Constant::Str(_) => None,
        }
    }
}

impl From<Operand> for Constant {
    fn from(value: Operand) -> Self {
        match value {
            Operand::Num(n) => Constant::Num(n),
            Operand::Bool(b) => Constant::Bool(b),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Num(n) => write!(f, "{n}"),
            Constant::Bool(b) => write!(f, "{b}"),
            Constant::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// Operator state of an OPE node. The first operand is stored at most once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingOperator {
    pub operator: Operator,
    pub first_operand: Option<Operand>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Payload {
    #[default]
    None,
    Constant(Constant),
    Operator(PendingOperator),
    /// Duplicator label.
    Label(u32),
}

#[derive(Clone, Debug)]
pub struct Node {
    kind: NodeKind,
    ports: SmallVec<[Port; 3]>,
    payload: Payload,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn arity(&self) -> usize {
        self.ports.len()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn label(&self) -> Option<u32> {
        match self.payload {
            Payload::Label(label) => Some(label),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub reductions: u64,
    pub created_nodes: u64,
    pub deleted_nodes: u64,
    pub stale_pairs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NetState {
    pub node_count: usize,
    pub active_pair_count: usize,
    pub statistics: Statistics,
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Clone, Debug, Default)]
pub struct Net {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    active: VecDeque<(NodeId, NodeId)>,
    next_label: u32,
    stats: Statistics,
}

impl Net {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, NetError> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(NetError::DeadNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, NetError> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(NetError::DeadNode(id))
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind, NetError> {
        Ok(self.node(id)?.kind)
    }

    pub fn payload(&self, id: NodeId) -> Result<&Payload, NetError> {
        Ok(&self.node(id)?.payload)
    }

    pub(crate) fn set_payload(&mut self, id: NodeId, payload: Payload) -> Result<(), NetError> {
        self.node_mut(id)?.payload = payload;
        Ok(())
    }

    pub fn port(&self, p: PortRef) -> Result<&Port, NetError> {
        self.node(p.node)
            .ok()
            .and_then(|node| node.ports.get(p.port))
            .ok_or(NetError::MissingPort(p))
    }

    fn port_mut(&mut self, p: PortRef) -> Result<&mut Port, NetError> {
        self.node_mut(p.node)
            .ok()
            .and_then(|node| node.ports.get_mut(p.port))
            .ok_or(NetError::MissingPort(p))
    }

    /// The port on the other side of `p`'s link.
    pub fn peer(&self, p: PortRef) -> Result<Option<PortRef>, NetError> {
        Ok(self.port(p)?.link)
    }

    pub fn uplink(&self, p: PortRef) -> Result<Option<PortRef>, NetError> {
        Ok(self.port(p)?.uplink)
    }

    pub fn is_connected(&self, p: PortRef) -> Result<bool, NetError> {
        Ok(self.port(p)?.link.is_some())
    }

    /// Live nodes in slot order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    node,
                )
            })
        })
    }

    pub fn node_count(&self) -> usize {
        self.live
    }

    pub fn stats(&self) -> Statistics {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut Statistics {
        &mut self.stats
    }

    pub fn fresh_label(&mut self) -> u32 {
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    fn alloc(&mut self, kind: NodeKind, polarities: &[bool], payload: Payload) -> NodeId {
        let ports = polarities
            .iter()
            .map(|&positive| Port {
                positive,
                ..Port::default()
            })
            .collect();
        let node = Node {
            kind,
            ports,
            payload,
        };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        };
        self.live += 1;
        self.stats.created_nodes += 1;
        trace!(node = %id, %kind, "create");
        id
    }

    /// Create a node with the default layout for `kind`. DUP nodes get a fresh label.
    ///
    /// Constants and operators cannot start without a payload; build those with
    /// [`Net::create_constant`] or [`Net::create_op`].
    pub fn create_node(&mut self, kind: NodeKind) -> Result<NodeId, NetError> {
        if kind.is_constant() || kind == NodeKind::Ope {
            return Err(NetError::PayloadRequired(kind));
        }
        Ok(self.create_bare(kind))
    }

    fn create_bare(&mut self, kind: NodeKind) -> NodeId {
        let payload = match kind {
            NodeKind::Dup => Payload::Label(self.fresh_label()),
            _ => Payload::None,
        };
        self.alloc(kind, kind.polarities(), payload)
    }

    pub fn create_lam(&mut self) -> NodeId {
        self.create_bare(NodeKind::Lam)
    }

    pub fn create_app(&mut self) -> NodeId {
        self.create_bare(NodeKind::App)
    }

    pub fn create_var(&mut self) -> NodeId {
        self.create_bare(NodeKind::Var)
    }

    /// A VAR whose port 1 carries a wire; port 0 is the target of an uplink.
    pub fn create_anchor(&mut self) -> NodeId {
        self.alloc(NodeKind::Var, &[false, true], Payload::None)
    }

    pub fn create_dup(&mut self) -> NodeId {
        self.create_bare(NodeKind::Dup)
    }

    pub fn create_dup_labeled(&mut self, label: u32) -> NodeId {
        self.alloc(NodeKind::Dup, NodeKind::Dup.polarities(), Payload::Label(label))
    }

    pub fn create_era(&mut self) -> NodeId {
        self.create_bare(NodeKind::Era)
    }

    pub fn create_constant(&mut self, value: Constant) -> NodeId {
        let kind = value.kind();
        self.alloc(kind, kind.polarities(), Payload::Constant(value))
    }

    pub fn create_num(&mut self, value: i64) -> NodeId {
        self.create_constant(Constant::Num(value))
    }

    pub fn create_bool(&mut self, value: bool) -> NodeId {
        self.create_constant(Constant::Bool(value))
    }

    pub fn create_string(&mut self, value: impl Into<String>) -> NodeId {
        self.create_constant(Constant::Str(value.into()))
    }

    pub fn create_pair(&mut self) -> NodeId {
        self.create_bare(NodeKind::Pair)
    }

    pub fn create_fst(&mut self) -> NodeId {
        self.create_bare(NodeKind::Fst)
    }

    pub fn create_snd(&mut self) -> NodeId {
        self.create_bare(NodeKind::Snd)
    }

    pub fn create_op(&mut self, operator: Operator) -> NodeId {
        let polarities = &NodeKind::Ope.polarities()[..operator.arity()];
        self.alloc(
            NodeKind::Ope,
            polarities,
            Payload::Operator(PendingOperator {
                operator,
                first_operand: None,
            }),
        )
    }

    pub fn create_list(&mut self) -> NodeId {
        self.create_bare(NodeKind::List)
    }

    pub fn create_head(&mut self) -> NodeId {
        self.create_bare(NodeKind::Head)
    }

    pub fn create_tail(&mut self) -> NodeId {
        self.create_bare(NodeKind::Tail)
    }

    pub fn create_switch(&mut self) -> NodeId {
        self.create_bare(NodeKind::Swi)
    }

    /// Fresh unlinked node with the kind, port layout and payload of `id`.
    pub fn create_copy(&mut self, id: NodeId) -> Result<NodeId, NetError> {
        let node = self.node(id)?;
        let kind = node.kind;
        let polarities: SmallVec<[bool; 3]> = node.ports.iter().map(|p| p.positive).collect();
        let payload = node.payload.clone();
        Ok(self.alloc(kind, &polarities, payload))
    }

    /// Append a port to a live node; returns the new port's address.
    pub fn add_port(&mut self, node: NodeId, positive: bool) -> Result<PortRef, NetError> {
        let target = self.node_mut(node)?;
        target.ports.push(Port {
            positive,
            ..Port::default()
        });
        Ok(PortRef::new(node, target.ports.len() - 1))
    }

    /// Link `a` and `b` symmetrically. Any previous partner of either port is
    /// left unlinked. Two principal ports form an active pair.
    pub fn connect(&mut self, a: PortRef, b: PortRef) -> Result<(), NetError> {
        self.port(a)?;
        self.port(b)?;
        self.detach(a);
        self.detach(b);
        self.port_mut(a)?.link = Some(b);
        self.port_mut(b)?.link = Some(a);
        trace!(%a, %b, "connect");
        if a.is_principal() && b.is_principal() {
            self.active.push_back((a.node, b.node));
        }
        Ok(())
    }

    pub fn disconnect(&mut self, p: PortRef) -> Result<(), NetError> {
        self.port(p)?;
        self.detach(p);
        Ok(())
    }

    fn detach(&mut self, p: PortRef) {
        let Ok(port) = self.port_mut(p) else {
            return;
        };
        let Some(other) = port.link.take() else {
            return;
        };
        if let Ok(other_port) = self.port_mut(other) {
            if other_port.link == Some(p) {
                other_port.link = None;
            }
        }
    }

    pub fn set_uplink(&mut self, from: PortRef, to: PortRef) -> Result<(), NetError> {
        self.port(to)?;
        self.port_mut(from)?.uplink = Some(to);
        Ok(())
    }

    /// Remove a live node, unlinking every partner. Not recursive.
    pub fn delete_node(&mut self, id: NodeId) -> Result<Node, NetError> {
        let arity = self.node(id)?.ports.len();
        for port in 0..arity {
            self.detach(PortRef::new(id, port));
        }
        let slot = &mut self.slots[id.index()];
        let mut node = slot.node.take().ok_or(NetError::DeadNode(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        for port in node.ports.iter_mut() {
            port.uplink = None;
        }
        self.free.push(id.index);
        self.live -= 1;
        self.stats.deleted_nodes += 1;
        trace!(node = %id, kind = %node.kind, "delete");
        Ok(node)
    }

    pub(crate) fn pop_active(&mut self) -> Option<(NodeId, NodeId)> {
        self.active.pop_front()
    }

    pub fn active_pair_count(&self) -> usize {
        self.active.len()
    }

    /// Both nodes live and their principal ports linked to each other.
    pub fn is_active_pair(&self, a: NodeId, b: NodeId) -> bool {
        let pa = PortRef::principal(a);
        let pb = PortRef::principal(b);
        matches!(
            (self.peer(pa), self.peer(pb)),
            (Ok(Some(x)), Ok(Some(y))) if x == pb && y == pa
        )
    }

    pub fn get_state(&self) -> NetState {
        NetState {
            node_count: self.live,
            active_pair_count: self.active.len(),
            statistics: self.stats,
        }
    }

    /// Check link symmetry over every live port; reports the first violation.
    pub fn validate_network(&self) -> Result<(), NetError> {
        for (id, node) in self.nodes() {
            for (index, port) in node.ports.iter().enumerate() {
                let here = PortRef::new(id, index);
                let Some(there) = port.link else {
                    continue;
                };
                let back = match self.port(there) {
                    Ok(other) => other.link,
                    Err(_) => {
                        return Err(NetError::DanglingLink {
                            from: here,
                            to: there,
                        });
                    }
                };
                if back != Some(here) {
                    return Err(NetError::AsymmetricLink {
                        from: here,
                        to: there,
                    });
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn force_link(&mut self, from: PortRef, to: PortRef) -> Result<(), NetError> {
        self.port_mut(from)?.link = Some(to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn connect_links_both_sides() -> Result<()> {
        let mut net = Net::new();
        let app = net.create_app();
        let num = net.create_num(7);
        net.connect(PortRef::new(app, 2), PortRef::principal(num))?;
        assert_eq!(net.peer(PortRef::new(app, 2))?, Some(PortRef::principal(num)));
        assert_eq!(net.peer(PortRef::principal(num))?, Some(PortRef::new(app, 2)));
        assert!(net.is_connected(PortRef::new(app, 2))?);
        assert!(!net.is_connected(PortRef::new(app, 1))?);
        assert_eq!(net.active_pair_count(), 0);
        net.validate_network()?;
        Ok(())
    }

    #[test]
    fn reconnect_unlinks_previous_partner() -> Result<()> {
        let mut net = Net::new();
        let a = net.create_num(1);
        let b = net.create_num(2);
        let fst = net.create_fst();
        net.connect(PortRef::new(fst, 1), PortRef::principal(a))?;
        net.connect(PortRef::new(fst, 1), PortRef::principal(b))?;
        assert_eq!(net.peer(PortRef::principal(a))?, None);
        assert_eq!(net.peer(PortRef::principal(b))?, Some(PortRef::new(fst, 1)));
        net.validate_network()?;
        Ok(())
    }

    #[test]
    fn principal_link_enqueues_pair() -> Result<()> {
        let mut net = Net::new();
        let lam = net.create_lam();
        let app = net.create_app();
        net.connect(PortRef::principal(lam), PortRef::principal(app))?;
        assert_eq!(net.active_pair_count(), 1);
        assert!(net.is_active_pair(lam, app));
        assert!(net.is_active_pair(app, lam));
        assert_eq!(net.pop_active(), Some((lam, app)));
        Ok(())
    }

    #[test]
    fn delete_clears_links_and_retires_handle() -> Result<()> {
        let mut net = Net::new();
        let dup = net.create_dup();
        let num = net.create_num(3);
        net.connect(PortRef::new(dup, 1), PortRef::principal(num))?;
        net.delete_node(dup)?;
        assert!(!net.is_live(dup));
        assert_eq!(net.peer(PortRef::principal(num))?, None);
        assert_eq!(net.delete_node(dup).unwrap_err(), NetError::DeadNode(dup));

        // The freed slot is reused under a new generation.
        let era = net.create_era();
        assert_eq!(era.index(), dup.index());
        assert_ne!(era, dup);
        assert!(net.is_live(era));
        assert!(!net.is_live(dup));
        assert_eq!(
            net.connect(PortRef::principal(dup), PortRef::principal(num)),
            Err(NetError::MissingPort(PortRef::principal(dup)))
        );

        let state = net.get_state();
        assert_eq!(state.node_count, 2);
        assert_eq!(state.statistics.created_nodes, 3);
        assert_eq!(state.statistics.deleted_nodes, 1);
        Ok(())
    }

    #[test]
    fn port_layouts() -> Result<()> {
        let mut net = Net::new();
        let add = net.create_op(Operator::Add);
        let not = net.create_op(Operator::Not);
        assert_eq!(net.node(add)?.arity(), 3);
        assert_eq!(net.node(not)?.arity(), 2);
        assert!(net.peer(PortRef::new(not, 2)).is_err());

        let anchor = net.create_anchor();
        assert_eq!(net.kind(anchor)?, NodeKind::Var);
        assert_eq!(net.node(anchor)?.arity(), 2);

        let var = net.create_var();
        let extra = net.add_port(var, true)?;
        assert_eq!(extra, PortRef::new(var, 1));
        assert!(net.port(extra)?.positive);

        let first = net.create_dup();
        let second = net.create_dup();
        assert_ne!(net.node(first)?.label(), net.node(second)?.label());
        Ok(())
    }

    #[test]
    fn add_port_requires_live_node() -> Result<()> {
        let mut net = Net::new();
        let var = net.create_var();
        net.delete_node(var)?;
        assert_eq!(net.add_port(var, true), Err(NetError::DeadNode(var)));
        Ok(())
    }

    #[test]
    fn payload_kinds_cannot_be_created_bare() -> Result<()> {
        let mut net = Net::new();
        for kind in [NodeKind::Ope, NodeKind::Num, NodeKind::Bool, NodeKind::Str] {
            assert_eq!(net.create_node(kind), Err(NetError::PayloadRequired(kind)));
        }
        assert_eq!(net.node_count(), 0);

        let dup = net.create_node(NodeKind::Dup)?;
        assert!(net.node(dup)?.label().is_some());
        let swi = net.create_node("SWI".parse()?)?;
        assert_eq!(net.node(swi)?.arity(), 3);
        assert_eq!(net.payload(swi)?, &Payload::None);
        Ok(())
    }

    #[test]
    fn uplinks_are_one_directional() -> Result<()> {
        let mut net = Net::new();
        let lam = net.create_lam();
        let anchor = net.create_anchor();
        net.set_uplink(PortRef::principal(lam), PortRef::principal(anchor))?;
        assert_eq!(
            net.uplink(PortRef::principal(lam))?,
            Some(PortRef::principal(anchor))
        );
        assert_eq!(net.uplink(PortRef::principal(anchor))?, None);
        assert_eq!(net.peer(PortRef::principal(anchor))?, None);
        Ok(())
    }

    #[test]
    fn validation_reports_broken_links() -> Result<()> {
        let mut net = Net::new();
        let a = net.create_num(1);
        let b = net.create_num(2);
        let fst = net.create_fst();
        net.connect(PortRef::new(fst, 1), PortRef::principal(a))?;
        net.validate_network()?;

        net.force_link(PortRef::principal(b), PortRef::new(fst, 1))?;
        assert_eq!(
            net.validate_network(),
            Err(NetError::AsymmetricLink {
                from: PortRef::principal(b),
                to: PortRef::new(fst, 1),
            })
        );

        net.disconnect(PortRef::principal(b))?;
        let gone = net.create_era();
        net.delete_node(gone)?;
        net.force_link(PortRef::principal(b), PortRef::principal(gone))?;
        assert!(matches!(
            net.validate_network(),
            Err(NetError::DanglingLink { .. })
        ));
        Ok(())
    }
}
