mod cli;

fn main() {
    set_logger();
    if let Err(err) = cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn set_logger() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter_layer =
        EnvFilter::try_from_env("INETVM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
