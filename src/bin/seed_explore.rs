//! Binary target for seed exploration.
//!
//! With no arguments, loops over seeds forever, printing each one before
//! running a full simulation; an invariant violation aborts the process,
//! leaving the last printed seed as the reproducer. With `trace <seed>`,
//! runs that single seed and prints a tab-separated trace of workload
//! events.

use std::env;
use std::process;

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    match args.get(1).map(String::as_str) {
        None => {
            let mut seed: u64 = 0;
            loop {
                println!("Trying seed {seed}");
                if let Err(e) = tidepool::run_seeded(seed, false) {
                    eprintln!("simulation error on seed {seed}: {e}");
                    process::exit(1);
                }
                seed += 1;
            }
        }
        Some("trace") => {
            let Some(seed) = args.get(2).and_then(|s| s.parse::<u64>().ok()) else {
                eprintln!("usage: seed_explore trace <seed>");
                process::exit(2);
            };
            if let Err(e) = tidepool::run_seeded(seed, true) {
                eprintln!("simulation error on seed {seed}: {e}");
                process::exit(1);
            }
        }
        Some(other) => {
            eprintln!("unknown mode '{other}'");
            eprintln!("usage: seed_explore            # loop seeds until a crash");
            eprintln!("       seed_explore trace <seed>  # trace a single seed");
            process::exit(2);
        }
    }
}
