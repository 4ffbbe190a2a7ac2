//! Run sessions — one directory per diffusion run.
//!
//! Apply-before-persist order, per step:
//!   1. engine.apply_step(event)   — may panic on invariant violation
//!   2. step_log.append_step()     — only if step 1 succeeded
//!   3. render exactly one frame, threading the frame counter
//!   4. snapshot if the interval is reached
//!
//! The session owns and serializes frame-counter allocation; no global
//! mutable counter exists anywhere. A frame failure propagates to the
//! caller and leaves previously written frames untouched.
//!
//! Directory structure:
//!   <base_dir>/<run_id>/run.json       — run header
//!   <base_dir>/<run_id>/steps.log      — append-only step log
//!   <base_dir>/<run_id>/frames/        — diffusion_NNNNNN.png
//!   <base_dir>/<run_id>/frames.json    — manifest, written at completion
//!   <base_dir>/<run_id>/snapshots/     — hash-verified state checkpoints

use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use diffusion_engine::domain::DiffusionState;
use diffusion_engine::engine::DiffusionEngine;
use diffusion_engine::events::StepEvent;
use diffusion_engine::graph::WeightedGraph;
use diffusion_engine::hashing::canonical_hash;
use diffusion_engine::planner::plan_splits;
use diffusion_engine::FORMAT_VERSION;

use crate::frame::{self, frame_filename, RenderError};
use crate::layout::{compute_layout, LayoutParams};
use crate::proto_bridge::{proto_to_step, step_to_proto};
use crate::replay;
use crate::snapshot::{self, SnapshotError};
use crate::step_log::StepLog;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Failures while driving a run.
#[derive(Debug)]
pub enum RunError {
    Render(RenderError),
    Snapshot(SnapshotError),
    Io(String),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Render(e) => write!(f, "RenderError: {}", e),
            RunError::Snapshot(e) => write!(f, "SnapshotError: {}", e),
            RunError::Io(msg) => write!(f, "IoError: {}", msg),
        }
    }
}

impl From<RenderError> for RunError {
    fn from(e: RenderError) -> Self {
        RunError::Render(e)
    }
}

impl From<SnapshotError> for RunError {
    fn from(e: SnapshotError) -> Self {
        RunError::Snapshot(e)
    }
}

impl From<io::Error> for RunError {
    fn from(e: io::Error) -> Self {
        RunError::Io(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// On-disk records
// ---------------------------------------------------------------------------

/// Run parameters, written once at start. Everything replay needs.
#[derive(Serialize, Deserialize)]
pub struct RunHeader {
    pub format_version: u32,
    pub graph: WeightedGraph,
    pub source: String,
    pub total_mass: i64,
    pub layout_seed: u64,
}

/// One written frame, for the downstream assembly step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub sequence: u64,
    pub frame: u64,
    pub filename: String,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An isolated diffusion run with its own step log, layout, and frames.
pub struct RunSession {
    run_id: String,
    run_dir: PathBuf,
    frames_dir: PathBuf,
    engine: DiffusionEngine,
    step_log: StepLog,
    header: RunHeader,
    layout: Vec<(f32, f32)>,
    frontier: VecDeque<(String, u32)>,
    planned: VecDeque<StepEvent>,
    frame_counter: u64,
    next_sequence: u64,
    snapshot_interval: u64,
    frames: Vec<FrameRecord>,
}

impl RunSession {
    /// Create a new run in `<base_dir>/<run_id>`.
    ///
    /// The layout is computed once here and reused for every frame, so
    /// nodes do not jitter between frames. A run directory is
    /// single-use: an existing non-empty step log is rejected.
    pub fn new(
        base_dir: &Path,
        run_id: &str,
        graph: WeightedGraph,
        source: &str,
        total_mass: i64,
        layout_params: LayoutParams,
        snapshot_interval: u64,
    ) -> Result<Self, RunError> {
        let run_dir = base_dir.join(run_id);
        let frames_dir = run_dir.join("frames");
        fs::create_dir_all(&frames_dir)?;

        let step_log = StepLog::open(&run_dir.join("steps.log"))?;
        if step_log.last_sequence() > 0 {
            return Err(RunError::Io(format!(
                "run directory {} already contains a step log",
                run_dir.display()
            )));
        }

        let layout = compute_layout(&graph, &layout_params);

        let header = RunHeader {
            format_version: FORMAT_VERSION,
            graph: graph.clone(),
            source: source.to_string(),
            total_mass,
            layout_seed: layout_params.seed,
        };
        let header_json = serde_json::to_string(&header)
            .map_err(|e| RunError::Io(e.to_string()))?;
        fs::write(run_dir.join("run.json"), header_json)?;

        let mut engine = DiffusionEngine::new();
        engine.begin_run(graph, source, total_mass);

        let mut frontier = VecDeque::new();
        frontier.push_back((source.to_string(), 0u32));

        log::info!("run {} started from {:?}", run_id, source);

        Ok(Self {
            run_id: run_id.to_string(),
            run_dir,
            frames_dir,
            engine,
            step_log,
            header,
            layout,
            frontier,
            planned: VecDeque::new(),
            frame_counter: 1,
            next_sequence: 1,
            snapshot_interval,
            frames: Vec::new(),
        })
    }

    /// Apply the next diffusion step and render its frame.
    ///
    /// Returns `Ok(Some(next_frame_counter))`, or `Ok(None)` once the
    /// frontier is exhausted and the run is complete.
    pub fn advance(&mut self) -> Result<Option<u64>, RunError> {
        while self.planned.is_empty() {
            match self.frontier.pop_front() {
                Some((node, node_depth)) => {
                    let steps = plan_splits(
                        self.engine.state(),
                        &node,
                        node_depth + 1,
                        self.next_sequence,
                    );
                    self.next_sequence += steps.len() as u64;
                    self.planned.extend(steps);
                }
                None => return Ok(None),
            }
        }

        let event = self.planned.pop_front().expect("planned queue is non-empty");

        // Step 1: apply to kernel (may panic on contract violation)
        let (state, _outcome) = self.engine.apply_step(&event);
        let state = state.clone();

        // Step 2: persist to step log (only if step 1 succeeded)
        self.step_log.append_step(&step_to_proto(&event))?;

        // Step 3: render exactly one frame, threading the counter
        let counter = self.frame_counter;
        let next = frame::render_step(
            &state.graph,
            &state.mass,
            &self.frames_dir,
            event.mass,
            &event.from_node,
            &state.visited,
            counter,
            event.depth,
            &self.layout,
        )?;
        self.frames.push(FrameRecord {
            sequence: event.sequence,
            frame: counter,
            filename: frame_filename(counter),
        });
        self.frame_counter = next;
        self.frontier.push_back((event.to_node.clone(), event.depth));

        // Step 4: auto-snapshot at interval
        if self.snapshot_interval > 0 && event.sequence % self.snapshot_interval == 0 {
            let snap_dir = self.run_dir.join("snapshots");
            snapshot::save_snapshot(&snap_dir, event.sequence, &state)?;
        }

        Ok(Some(next))
    }

    /// Drive the run until the frontier is exhausted, then write the
    /// frame manifest. Returns the final frame counter.
    pub fn run_to_completion(&mut self) -> Result<u64, RunError> {
        while self.advance()?.is_some() {}

        let manifest = serde_json::to_string(&self.frames)
            .map_err(|e| RunError::Io(e.to_string()))?;
        fs::write(self.run_dir.join("frames.json"), manifest)?;

        log::info!(
            "run {} complete: {} frames, hash {}",
            self.run_id,
            self.frames.len(),
            self.current_hash()
        );
        Ok(self.frame_counter)
    }

    /// Full replay from the step log — rebuilds state through a fresh
    /// engine and returns it with its canonical hash. Read-only
    /// verification; the live session is untouched.
    pub fn replay_full(&self) -> Result<(DiffusionState, String), RunError> {
        let proto_steps = self.step_log.load_all_steps()?;
        let steps: Vec<StepEvent> = proto_steps.iter().map(proto_to_step).collect();
        Ok(replay::rebuild_state(
            self.header.graph.clone(),
            &self.header.source,
            self.header.total_mass,
            &steps,
        ))
    }

    /// Current state from the engine.
    pub fn state(&self) -> &DiffusionState {
        self.engine.state()
    }

    /// Current canonical hash.
    pub fn current_hash(&self) -> String {
        canonical_hash(self.engine.state())
    }

    /// Next frame counter value (1 before any frame is written).
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Records of every frame written so far, in order.
    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }
}
