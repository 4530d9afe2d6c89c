//! Human-readable dump of a net.

use std::fmt;

use crate::net::{Net, Node, Payload};

fn describe_payload(node: &Node) -> String {
    match node.payload() {
        Payload::None => String::new(),
        Payload::Constant(value) => format!("({value})"),
        Payload::Operator(pending) => match pending.first_operand {
            Some(first) => format!("({} {first} _)", pending.operator),
            None => format!("({})", pending.operator),
        },
        Payload::Label(label) => format!("[{label}]"),
    }
}

/// Displays one line per live node (kind, payload, then each port's link and
/// uplink) followed by a summary line.
pub struct NetDump<'a>(pub &'a Net);

impl fmt::Display for NetDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let net = self.0;
        for (id, node) in net.nodes() {
            write!(f, "{id} {}{}", node.kind(), describe_payload(node))?;
            for (index, port) in node.ports().iter().enumerate() {
                let sign = if port.positive { '+' } else { '-' };
                match port.link {
                    Some(peer) => write!(f, " {index}{sign}->{peer}")?,
                    None => write!(f, " {index}{sign}->_")?,
                }
                if let Some(target) = port.uplink {
                    write!(f, "^{target}")?;
                }
            }
            writeln!(f)?;
        }
        let state = net.get_state();
        writeln!(
            f,
            "nodes: {}, active pairs: {}",
            state.node_count, state.active_pair_count
        )
    }
}

pub fn render(net: &Net) -> String {
    NetDump(net).to_string()
}
