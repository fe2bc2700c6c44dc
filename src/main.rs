use std::fs::File;
use std::io::{BufWriter, Write};

use resboot::config::{self, BootstrapConfig};
use resboot::engine::Engine;
use resboot::projector::ProjectionMode;
use resboot::runner::BootstrapSummary;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = BootstrapConfig::canonical();
    let mut process_variance = false;
    let mut output_path: Option<String> = None;
    let mut csv_path: Option<String> = None;
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                i += 1;
                config.base_seed = args[i].parse().expect("--seed requires a u64");
            }
            "--iterations" => {
                i += 1;
                config.iterations =
                    args[i].parse().expect("--iterations requires a positive integer");
            }
            "--process-variance" => process_variance = true,
            "--fail-fast" => config.fail_fast = true,
            "--output" => {
                i += 1;
                output_path = Some(args[i].clone());
            }
            "--csv" => {
                i += 1;
                csv_path = Some(args[i].clone());
            }
            "--quiet" => quiet = true,
            _ => {}
        }
        i += 1;
    }

    let mode = if process_variance {
        ProjectionMode::GammaProcessVariance
    } else {
        ProjectionMode::UltimateMinusLatest
    };

    let engine = Engine::new(config::canonical_triangle(), mode).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    if !quiet {
        println!("Triangle: {0} × {0}", engine.n());
        println!("Residual pool: {} entries, phi = {:.4}", engine.residual_pool().len(), engine.scale_parameter());
        println!("Base chain ladder reserve: {:.0}", engine.base_reserve());
        println!(
            "Mode: {}",
            match mode {
                ProjectionMode::UltimateMinusLatest => "estimation variance only",
                ProjectionMode::GammaProcessVariance => "estimation + process variance",
            }
        );
    }

    let summary = engine.run_bootstrap(&config).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    if let Some(ref path) = output_path {
        write_reserves_ndjson(&summary, path);
        if !quiet {
            println!("{} reserve estimates → {path}", summary.n_completed);
        }
    }

    if let Some(ref path) = csv_path {
        write_reserves_csv(&summary, config.base_seed, path);
    }

    if !quiet {
        print_summary(&summary, engine.base_reserve());
    }
}

fn write_reserves_ndjson(summary: &BootstrapSummary, path: &str) {
    let file = File::create(path).unwrap_or_else(|e| panic!("failed to create {path}: {e}"));
    let mut writer = BufWriter::new(file);
    for (index, reserve) in summary.reserves.iter().enumerate() {
        serde_json::to_writer(&mut writer, &serde_json::json!({ "index": index, "reserve": reserve }))
            .expect("serialize");
        writeln!(writer).expect("newline");
    }
}

fn write_reserves_csv(summary: &BootstrapSummary, base_seed: u64, path: &str) {
    let file = File::create(path).unwrap_or_else(|e| panic!("failed to create {path}: {e}"));
    let mut w = BufWriter::new(file);
    writeln!(w, "base_seed,index,reserve").expect("write");
    for (index, reserve) in summary.reserves.iter().enumerate() {
        writeln!(w, "{base_seed},{index},{reserve:.2}").expect("write");
    }
}

fn print_summary(summary: &BootstrapSummary, base_reserve: f64) {
    println!(
        "\n=== Reserve Distribution (N={} requested, {} completed, {} failed, {} skipped) ===",
        summary.n_requested, summary.n_completed, summary.n_failed, summary.n_skipped
    );

    let Some(ref s) = summary.stats else {
        println!("  No completed iterations — no distribution to report.");
        return;
    };

    const M: f64 = 1_000_000.0;
    println!(
        "{:>8} | {:>8} | {:>8} | {:>8} | {:>8} | {:>8} | {:>8} | {:>8} | {:>8}",
        "min", "p5", "p25", "p50", "p75", "p95", "max", "mean", "stddev"
    );
    println!(
        "{:>8.2} | {:>8.2} | {:>8.2} | {:>8.2} | {:>8.2} | {:>8.2} | {:>8.2} | {:>8.2} | {:>8.2}",
        s.min / M,
        s.p5 / M,
        s.p25 / M,
        s.p50 / M,
        s.p75 / M,
        s.p95 / M,
        s.max / M,
        s.mean / M,
        s.std / M,
    );
    println!("(millions)");
    println!(
        "\nBase reserve {:.2}M | bootstrap mean {:.2}M | drift {:+.2}%",
        base_reserve / M,
        s.mean / M,
        (s.mean - base_reserve) / base_reserve * 100.0
    );
}
