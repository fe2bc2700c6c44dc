//! Replays one bootstrap iteration and streams its sample records as NDJSON
//! to stdout (one line per draw, in sequence order) — the provenance feed a
//! draw-by-draw visualisation consumes. Summary goes to stderr.
//!
//! Usage: trace_iteration [ITERATION] [BASE_SEED]

use std::env;

use resboot::config::{self, BootstrapConfig};
use resboot::engine::Engine;
use resboot::projector::ProjectionMode;

fn main() {
    let config = BootstrapConfig::canonical();

    let iteration: u64 = env::args().nth(1).and_then(|s| s.parse().ok()).unwrap_or(0);
    let base_seed: u64 =
        env::args().nth(2).and_then(|s| s.parse().ok()).unwrap_or(config.base_seed);

    let engine = Engine::new(config::canonical_triangle(), ProjectionMode::UltimateMinusLatest)
        .unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        });

    let result = engine.run_iteration(iteration, base_seed).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    // Write NDJSON to stdout.
    for record in &result.records {
        println!("{}", serde_json::to_string(record).expect("serialisation failed"));
    }

    eprintln!(
        "trace_iteration: iteration {} (base seed {}), {} draws from a {}-entry pool",
        iteration,
        base_seed,
        result.records.len(),
        engine.residual_pool().len()
    );
    eprintln!(
        "  reserve {:.0} (base {:.0}, phi {:.4})",
        result.reserve,
        engine.base_reserve(),
        engine.scale_parameter()
    );
}
