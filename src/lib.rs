//! Interaction-net virtual machine: an arena-backed graph of typed nodes,
//! a rewrite engine over active pairs, and a small lambda front end that
//! lowers programs into nets.

pub mod engine;
pub mod error;
pub mod inspect;
pub mod interp;
pub mod kind;
pub mod lower;
pub mod net;
pub mod ops;
pub mod readback;
pub mod rules;
pub mod syntax;

pub type Result<T> = anyhow::Result<T>;

pub use engine::{NormalFormReport, ReduceConfig, Reducer};
pub use error::{NetError, ReduceError};
pub use inspect::{NetDump, render};
pub use interp::{RunOutcome, eval, run_program};
pub use kind::NodeKind;
pub use lower::{CompileError, compile};
pub use net::{Constant, Net, NetState, NodeId, Payload, PortRef, Statistics};
pub use ops::{Operand, Operator};
pub use readback::{Value, extract};
pub use rules::Rule;
pub use syntax::{SyntaxError, Term, parse};
