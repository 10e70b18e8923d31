//! `nbmerge-apply`: apply a diff or a list of merge decisions to a document.
//!
//! Usage:
//!   nbmerge-apply [--stringified] < input.json
//!
//! The input is `{"base": ..., "diff": [...]}` or
//! `{"base": ..., "decisions": [...]}`. Set `RUST_LOG` to see what happens.

use std::io::{self, Read, Write};

use nbmerge::cli::{run_apply, ApplyOptions};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let opts = match ApplyOptions::from_args(std::env::args().skip(1)) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    match run_apply(buf.trim(), &opts) {
        Ok(result) => {
            let mut stdout = io::stdout();
            if let Err(e) = stdout.write_all(result.as_bytes()).and_then(|()| stdout.write_all(b"\n")) {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
