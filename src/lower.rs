//! Lowering of surface terms into interaction nets.
//!
//! Every term lowers to the output port that carries its value. Binders are
//! counted before their scope is lowered: an unused binder is wired to an
//! eraser, a single use takes the binder port directly, and `n` uses hang off
//! a chain of `n - 1` duplicators with fresh labels.

use thiserror::Error;
use tracing::debug;

use crate::error::NetError;
use crate::net::{Net, NodeId, PortRef};
use crate::ops::Operator;
use crate::syntax::Term;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("unbound variable `{0}`")]
    UnboundVariable(String),
    #[error("variable `{0}` has no wire left for this occurrence")]
    OccurrenceMismatch(String),
    #[error(transparent)]
    Net(#[from] NetError),
}

struct Binding {
    name: String,
    uses: Vec<PortRef>,
}

struct Lowering<'net> {
    net: &'net mut Net,
    scopes: Vec<Binding>,
}

/// Build `term` into `net` and return the root anchor; the value ends up on
/// the wire of the anchor's port 1.
pub fn compile(net: &mut Net, term: &Term) -> Result<NodeId, CompileError> {
    let before = net.node_count();
    let mut lowering = Lowering {
        net: &mut *net,
        scopes: Vec::new(),
    };
    let out = lowering.lower(term)?;
    let root = lowering.net.create_anchor();
    lowering.net.connect(PortRef::new(root, 1), out)?;
    debug!(
        nodes = net.node_count() - before,
        active = net.active_pair_count(),
        "compiled"
    );
    Ok(root)
}

/// Free occurrences of `name` in `term`.
pub fn occurrences(term: &Term, name: &str) -> usize {
    match term {
        Term::Var(var) => usize::from(var == name),
        Term::Num(_) | Term::Bool(_) | Term::Str(_) => 0,
        Term::Lam { param, body } => {
            if param == name {
                0
            } else {
                occurrences(body, name)
            }
        }
        Term::Let {
            name: bound,
            value,
            body,
        } => {
            let inner = if bound == name {
                0
            } else {
                occurrences(body, name)
            };
            occurrences(value, name) + inner
        }
        Term::App { func, arg } => occurrences(func, name) + occurrences(arg, name),
        Term::If {
            cond,
            then_branch,
            else_branch,
        } => {
            occurrences(cond, name) + occurrences(then_branch, name) + occurrences(else_branch, name)
        }
        Term::Binary { lhs, rhs, .. } => occurrences(lhs, name) + occurrences(rhs, name),
        Term::Pair(a, b) | Term::Cons(a, b) => occurrences(a, name) + occurrences(b, name),
        Term::Not(inner)
        | Term::Fst(inner)
        | Term::Snd(inner)
        | Term::Head(inner)
        | Term::Tail(inner) => occurrences(inner, name),
    }
}

impl Lowering<'_> {
    fn lower(&mut self, term: &Term) -> Result<PortRef, CompileError> {
        match term {
            Term::Num(n) => Ok(PortRef::principal(self.net.create_num(*n))),
            Term::Bool(b) => Ok(PortRef::principal(self.net.create_bool(*b))),
            Term::Str(s) => Ok(PortRef::principal(self.net.create_string(s.as_str()))),
            Term::Var(name) => self.take_use(name),
            Term::Lam { param, body } => {
                let lam = self.net.create_lam();
                self.bind(param, PortRef::new(lam, 1), occurrences(body, param))?;
                let out = self.lower(body)?;
                self.scopes.pop();
                let anchor = self.net.create_anchor();
                self.net.connect(PortRef::new(anchor, 1), out)?;
                self.net
                    .set_uplink(PortRef::principal(lam), PortRef::principal(anchor))?;
                Ok(PortRef::principal(lam))
            }
            Term::App { func, arg } => {
                let func = self.lower(func)?;
                let arg = self.lower(arg)?;
                let app = self.net.create_app();
                self.net.connect(PortRef::principal(app), func)?;
                self.net.connect(PortRef::new(app, 2), arg)?;
                Ok(PortRef::new(app, 1))
            }
            Term::Let { name, value, body } => {
                let value = self.lower(value)?;
                self.bind(name, value, occurrences(body, name))?;
                let out = self.lower(body)?;
                self.scopes.pop();
                Ok(out)
            }
            Term::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.lower(cond)?;
                let then_out = self.lower(then_branch)?;
                let else_out = self.lower(else_branch)?;
                let swi = self.net.create_switch();
                self.net.connect(PortRef::principal(swi), cond)?;
                self.net.connect(PortRef::new(swi, 1), then_out)?;
                self.net.connect(PortRef::new(swi, 2), else_out)?;
                let result = self.net.create_anchor();
                self.net
                    .set_uplink(PortRef::principal(swi), PortRef::principal(result))?;
                Ok(PortRef::new(result, 1))
            }
            Term::Binary { op, lhs, rhs } => {
                let lhs = self.lower(lhs)?;
                let rhs = self.lower(rhs)?;
                let node = self.net.create_op(*op);
                self.net.connect(PortRef::principal(node), lhs)?;
                self.net.connect(PortRef::new(node, 2), rhs)?;
                Ok(PortRef::new(node, 1))
            }
            Term::Not(inner) => {
                let input = self.lower(inner)?;
                let node = self.net.create_op(Operator::Not);
                self.net.connect(PortRef::principal(node), input)?;
                Ok(PortRef::new(node, 1))
            }
            Term::Pair(first, second) => {
                let node = self.net.create_pair();
                self.construct(node, first, second)
            }
            Term::Cons(head, tail) => {
                let node = self.net.create_list();
                self.construct(node, head, tail)
            }
            Term::Fst(inner) => {
                let node = self.net.create_fst();
                self.project(node, inner)
            }
            Term::Snd(inner) => {
                let node = self.net.create_snd();
                self.project(node, inner)
            }
            Term::Head(inner) => {
                let node = self.net.create_head();
                self.project(node, inner)
            }
            Term::Tail(inner) => {
                let node = self.net.create_tail();
                self.project(node, inner)
            }
        }
    }

    fn construct(&mut self, node: NodeId, first: &Term, second: &Term) -> Result<PortRef, CompileError> {
        let first = self.lower(first)?;
        let second = self.lower(second)?;
        self.net.connect(PortRef::new(node, 1), first)?;
        self.net.connect(PortRef::new(node, 2), second)?;
        Ok(PortRef::principal(node))
    }

    fn project(&mut self, node: NodeId, inner: &Term) -> Result<PortRef, CompileError> {
        let input = self.lower(inner)?;
        self.net.connect(PortRef::principal(node), input)?;
        Ok(PortRef::new(node, 1))
    }

    fn bind(&mut self, name: &str, port: PortRef, count: usize) -> Result<(), CompileError> {
        let uses = match count {
            0 => {
                let era = self.net.create_era();
                self.net.connect(PortRef::principal(era), port)?;
                Vec::new()
            }
            1 => vec![port],
            n => {
                let mut uses = Vec::with_capacity(n);
                let mut current = port;
                for _ in 1..n {
                    let dup = self.net.create_dup();
                    self.net.connect(PortRef::principal(dup), current)?;
                    uses.push(PortRef::new(dup, 1));
                    current = PortRef::new(dup, 2);
                }
                uses.push(current);
                uses.reverse();
                uses
            }
        };
        self.scopes.push(Binding {
            name: name.to_string(),
            uses,
        });
        Ok(())
    }

    fn take_use(&mut self, name: &str) -> Result<PortRef, CompileError> {
        let binding = self
            .scopes
            .iter_mut()
            .rev()
            .find(|binding| binding.name == name)
            .ok_or_else(|| CompileError::UnboundVariable(name.to_string()))?;
        binding
            .uses
            .pop()
            .ok_or_else(|| CompileError::OccurrenceMismatch(name.to_string()))
    }
}
