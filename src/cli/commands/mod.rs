mod dump;
mod eval;
mod repl;
mod util;

pub(crate) use dump::cmd_dump;
pub(crate) use eval::{cmd_eval, cmd_run, cmd_stats};
pub(crate) use repl::cmd_repl;
pub(crate) use util::load_config;
