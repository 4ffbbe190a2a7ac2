/// Demo harness — runs a seven-node ring diffusion end to end.
///
/// Builds a ring-like graph A..G, injects 1.00 of mass at A, drives
/// the diffusion to completion (one frame per step), then verifies
/// replay parity against the step log.

use std::path::PathBuf;

use diffusion_engine::arithmetic::{format_mass, SCALE};
use diffusion_engine::graph::WeightedGraph;

use diffusion_runtime::layout::LayoutParams;
use diffusion_runtime::session::RunSession;

/// Seven nodes on a ring (weight 1.0) with one heavier chord A-D.
fn demo_graph() -> WeightedGraph {
    let names: Vec<String> = ["A", "B", "C", "D", "E", "F", "G"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let n = names.len();
    let mut m = vec![vec![0i64; n]; n];
    for i in 0..n {
        let j = (i + 1) % n;
        m[i][j] = SCALE;
        m[j][i] = SCALE;
    }
    m[0][3] = SCALE / 2;
    m[3][0] = SCALE / 2;
    WeightedGraph::from_matrix(names, m).expect("demo graph is well-formed")
}

fn main() {
    let base = PathBuf::from("diffusion_demo");

    let mut session = match RunSession::new(
        &base,
        "ring_a_to_g",
        demo_graph(),
        "A",
        SCALE,
        LayoutParams::default(),
        2,
    ) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to start run: {}", e);
            eprintln!("(delete {} to rerun)", base.display());
            std::process::exit(1);
        }
    };

    let final_counter = match session.run_to_completion() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Run failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("Run {} complete.", session.run_id());
    println!("  frames written: {}", final_counter - 1);
    println!("  frames dir:     {}", session.frames_dir().display());
    for record in session.frames() {
        println!("    step {:>3} -> {}", record.sequence, record.filename);
    }

    let state = session.state();
    println!("  visited:        {}", state.visited.join(" -> "));
    println!(
        "  conserved mass: {} (injected {})",
        format_mass(state.mass.values().sum::<i64>()),
        format_mass(state.total_mass)
    );

    match session.replay_full() {
        Ok((_, replay_hash)) => {
            let live_hash = session.current_hash();
            if replay_hash == live_hash {
                println!("[OK] replay hash matches live run: {}", live_hash);
            } else {
                println!(
                    "[FAIL] replay drifted:\n  live:   {}\n  replay: {}",
                    live_hash, replay_hash
                );
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Replay failed: {}", e);
            std::process::exit(1);
        }
    }
}
