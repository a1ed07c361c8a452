use clap::Parser;
use connect_preflight::{run_cli, Cli};
use std::env;
use tracing::debug;

fn main() {
    // Good enough for now
    if env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt::init();
    } else {
        let format = tracing_subscriber::fmt::format()
            .with_level(false)
            .with_target(false)
            .without_time()
            .compact();
        tracing_subscriber::fmt().event_format(format).init();
    }

    debug!("START: {:?}", env::args().collect::<Vec<_>>());
    match run_cli(Cli::parse()) {
        Err(e) => {
            eprintln!("💥 {} failed", env!("CARGO_PKG_NAME"));
            for cause in e.chain().collect::<Vec<_>>().iter() {
                eprintln!("  Caused by: {}", cause);
            }
            std::process::exit(1);
        }
        Ok(None) => {}
        Ok(Some(exit_code)) => {
            std::process::exit(exit_code);
        }
    }
}
