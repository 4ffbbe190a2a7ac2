//! Renderer contract tests.
//!
//! All tests use temporary directories for isolation. White-box
//! assertions go through `plan_frame`; file-level assertions go
//! through `render_step`.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use diffusion_engine::arithmetic::SCALE;
use diffusion_engine::graph::{GraphError, WeightedGraph};

use diffusion_runtime::frame::{plan_frame, render_step, RenderError};
use diffusion_runtime::layout::{compute_layout, LayoutParams};

/// Seven nodes A..G on a ring (weight 1.0) with one chord A-D (0.5).
fn ring_graph() -> WeightedGraph {
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
    WeightedGraph::from_matrix(names, m).unwrap()
}

/// All mass sitting on "A".
fn initial_mass(graph: &WeightedGraph) -> BTreeMap<String, i64> {
    let mut mass = BTreeMap::new();
    for name in graph.names() {
        mass.insert(name.clone(), 0);
    }
    mass.insert("A".to_string(), SCALE);
    mass
}

fn history(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("diffusion_render_tests")
        .join(name);
    if dir.exists() {
        fs::remove_dir_all(&dir).ok();
    }
    fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

fn png_names(dir: &PathBuf) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ─────────────────────────────────────────────────────────────
// First step: A..G, source "A", mass 1.00, history ["A"],
// counter 1, depth 1
// ─────────────────────────────────────────────────────────────

#[test]
fn first_step_returns_two_and_writes_one_frame() {
    let graph = ring_graph();
    let mass = initial_mass(&graph);
    let layout = compute_layout(&graph, &LayoutParams::default());
    let dir = temp_dir("first_step");

    let next = render_step(
        &graph,
        &mass,
        &dir,
        SCALE,
        "A",
        &history(&["A"]),
        1,
        1,
        &layout,
    )
    .unwrap();

    assert_eq!(next, 2);
    assert_eq!(png_names(&dir), vec!["diffusion_000001.png".to_string()]);
}

#[test]
fn first_step_plan_decisions() {
    let graph = ring_graph();
    let mass = initial_mass(&graph);
    let layout = compute_layout(&graph, &LayoutParams::default());

    let plan = plan_frame(&graph, &mass, &layout, SCALE, "A", &history(&["A"]), 1, 1)
        .unwrap();

    assert_eq!(plan.filename, "diffusion_000001.png");
    assert!(plan.title.contains("1.00"));
    assert!(plan.title.contains("A"));
    assert!(plan.title.contains("1"));

    for node in &plan.nodes {
        if node.name == "A" {
            assert!(node.visited);
            assert!(node.is_source);
            assert_eq!(node.label, "A:1.00");
        } else {
            assert!(!node.visited, "{} should be unvisited", node.name);
            assert!(!node.is_source);
            assert_eq!(node.label, format!("{}:0.00", node.name));
        }
    }

    assert_eq!(plan.legend.len(), 2);
    assert_eq!(plan.legend[0].0, "Visited");
    assert_eq!(plan.legend[1].0, "Unvisited");
}

// ─────────────────────────────────────────────────────────────
// Sequential scenario: counters 1 -> 2 -> 3
// ─────────────────────────────────────────────────────────────

#[test]
fn sequential_calls_produce_distinct_contiguous_frames() {
    let graph = ring_graph();
    let mass = initial_mass(&graph);
    let layout = compute_layout(&graph, &LayoutParams::default());
    let dir = temp_dir("sequential");

    let histories = [
        history(&["A"]),
        history(&["A", "B"]),
        history(&["A", "B", "C"]),
    ];

    let mut counter = 1u64;
    for (i, hist) in histories.iter().enumerate() {
        let plan =
            plan_frame(&graph, &mass, &layout, SCALE, "A", hist, counter, 1).unwrap();
        let visited = plan.nodes.iter().filter(|n| n.visited).count();
        assert_eq!(visited, i + 1);

        counter =
            render_step(&graph, &mass, &dir, SCALE, "A", hist, counter, 1, &layout)
                .unwrap();
    }

    assert_eq!(counter, 4);
    assert_eq!(
        png_names(&dir),
        vec![
            "diffusion_000001.png".to_string(),
            "diffusion_000002.png".to_string(),
            "diffusion_000003.png".to_string(),
        ]
    );
}

// ─────────────────────────────────────────────────────────────
// Error taxonomy
// ─────────────────────────────────────────────────────────────

#[test]
fn missing_state_entry_is_invalid_state() {
    let graph = ring_graph();
    let mut mass = initial_mass(&graph);
    mass.remove("G");
    let layout = compute_layout(&graph, &LayoutParams::default());

    let err = plan_frame(&graph, &mass, &layout, SCALE, "A", &history(&["A"]), 1, 1)
        .unwrap_err();
    assert!(matches!(err, RenderError::InvalidState(_)), "got {:?}", err);
}

#[test]
fn asymmetric_matrix_is_rejected_as_invalid_graph() {
    let err = WeightedGraph::from_matrix(
        vec!["A".into(), "B".into()],
        vec![vec![0, SCALE], vec![SCALE / 2, 0]],
    )
    .unwrap_err();
    assert!(matches!(err, GraphError::Asymmetric { .. }), "got {:?}", err);
}

#[test]
fn unknown_source_is_invalid_state() {
    let graph = ring_graph();
    let mass = initial_mass(&graph);
    let layout = compute_layout(&graph, &LayoutParams::default());

    let err = plan_frame(&graph, &mass, &layout, SCALE, "Z", &history(&["A"]), 1, 1)
        .unwrap_err();
    assert!(matches!(err, RenderError::InvalidState(_)));
}

#[test]
fn unknown_history_entry_is_invalid_state() {
    let graph = ring_graph();
    let mass = initial_mass(&graph);
    let layout = compute_layout(&graph, &LayoutParams::default());

    let err =
        plan_frame(&graph, &mass, &layout, SCALE, "A", &history(&["A", "Z"]), 1, 1)
            .unwrap_err();
    assert!(matches!(err, RenderError::InvalidState(_)));
}

#[test]
fn repeated_history_entry_is_invalid_state() {
    let graph = ring_graph();
    let mass = initial_mass(&graph);
    let layout = compute_layout(&graph, &LayoutParams::default());

    let err =
        plan_frame(&graph, &mass, &layout, SCALE, "A", &history(&["A", "B", "A"]), 1, 1)
            .unwrap_err();
    assert!(matches!(err, RenderError::InvalidState(_)));
}

#[test]
fn missing_output_dir_is_io_error() {
    let graph = ring_graph();
    let mass = initial_mass(&graph);
    let layout = compute_layout(&graph, &LayoutParams::default());
    let dir = temp_dir("missing_dir").join("nope");

    let err = render_step(
        &graph,
        &mass,
        &dir,
        SCALE,
        "A",
        &history(&["A"]),
        1,
        1,
        &layout,
    )
    .unwrap_err();
    assert!(matches!(err, RenderError::Io(_)), "got {:?}", err);
}

// ─────────────────────────────────────────────────────────────
// Documented behaviors
// ─────────────────────────────────────────────────────────────

/// Counter reuse overwrites the prior frame. Known behavior, not a
/// bug — counters are caller-owned and must never be reused.
#[test]
fn counter_reuse_overwrites_the_frame() {
    let graph = ring_graph();
    let mass = initial_mass(&graph);
    let layout = compute_layout(&graph, &LayoutParams::default());
    let dir = temp_dir("reuse");

    render_step(&graph, &mass, &dir, SCALE, "A", &history(&["A"]), 1, 1, &layout)
        .unwrap();
    render_step(
        &graph,
        &mass,
        &dir,
        SCALE,
        "A",
        &history(&["A", "B"]),
        1,
        1,
        &layout,
    )
    .unwrap();

    assert_eq!(png_names(&dir), vec!["diffusion_000001.png".to_string()]);
}

#[test]
fn edge_widths_are_monotone_in_weight() {
    let graph = ring_graph();
    let mass = initial_mass(&graph);
    let layout = compute_layout(&graph, &LayoutParams::default());

    let plan = plan_frame(&graph, &mass, &layout, SCALE, "A", &history(&["A"]), 1, 1)
        .unwrap();

    let mut edges = plan.edges.clone();
    edges.sort_by_key(|e| e.weight.abs());
    let mut last = 0;
    for edge in edges {
        assert!(
            edge.width_px >= last,
            "width decreased at weight {}",
            edge.weight
        );
        last = edge.width_px;
    }
}
