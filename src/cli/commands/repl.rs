use std::io::{self, BufRead, Write};

use anyhow::Result;

use inetvm::{ReduceConfig, ReduceError, run_program};

use super::eval::{format_stats, format_value};

pub(crate) fn cmd_repl(config: &ReduceConfig) -> Result<()> {
    let stdin = io::stdin();
    let mut input = String::new();
    let mut show_stats = false;

    println!("inetvm REPL. Type an expression, `:stats` to toggle statistics, `help`, or `quit`.");
    loop {
        print!("inet> ");
        io::stdout().flush().ok();
        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let line = input.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            "quit" | "exit" => break,
            "help" => {
                println!(
                    "Commands:\n  <expr>   evaluate an expression (e.g. let f = \\x -> x * 2 in f 3)\n  :stats   toggle reduction statistics\n  help     show this message\n  quit     leave the REPL"
                );
                continue;
            }
            ":stats" => {
                show_stats = !show_stats;
                println!("statistics {}", if show_stats { "on" } else { "off" });
                continue;
            }
            _ => {}
        }
        match run_program(line, config) {
            Ok(outcome) if show_stats => println!("{}", format_stats(&outcome)),
            Ok(outcome) => println!("{}", format_value(&outcome)),
            Err(err) => {
                eprintln!("error: {err:#}");
                if err
                    .downcast_ref::<ReduceError>()
                    .is_some_and(ReduceError::is_resource_limit)
                {
                    eprintln!("hint: raise --max-steps or --timeout-ms");
                }
            }
        }
    }
    Ok(())
}
