use std::path::PathBuf;

use clap::Parser;
use normtx_scenario::locator;
use normtx_scenario::steps::Scenario;

/// normtx-scenario — CHECKSIGEX normalized-txid upgrade and spend scenario
#[derive(Parser)]
#[command(name = "normtx-scenario", version, about)]
struct Cli {
    /// Path to a normalized-txid-enabled bitcoind
    /// (default: $NORMTX_BITCOIND, then cache dir, then PATH)
    #[arg(long)]
    bitcoind: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let bitcoind = cli
        .bitcoind
        .or_else(|| locator::find_bitcoind(&locator::default_cache_dir()));
    let Some(bitcoind) = bitcoind else {
        eprintln!("error: bitcoind not found. Pass --bitcoind or set NORMTX_BITCOIND");
        std::process::exit(1);
    };

    let result = Scenario::new(&bitcoind).and_then(|scenario| scenario.run());
    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
