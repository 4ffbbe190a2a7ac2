//! Frame rendering — one labeled PNG per diffusion step.
//!
//! Split in two layers so render decisions stay testable without
//! decoding pixels:
//!   - `plan_frame`: pure. Validates inputs and produces the per-node
//!     and per-edge render decisions (colors, labels, widths, title,
//!     filename).
//!   - `write_frame`: rasterizes a plan and writes the PNG.
//!
//! `render_step` chains both and returns the incremented frame counter.
//! A failed call returns an error and does NOT increment — frame
//! numbering stays contiguous with successfully written frames only.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use diffusion_engine::arithmetic::format_mass;
use diffusion_engine::graph::WeightedGraph;

use crate::raster::{text_width, Canvas};

/// Frames are fixed square pixel dimensions.
pub const FRAME_SIZE: u32 = 500;
/// Node disc radius.
pub const NODE_RADIUS: u32 = 10;
/// Gap between a source node's disc and its highlight ring.
const SOURCE_RING_GAP: u32 = 4;
/// Edge stroke scaling: widths run 1..=1+EDGE_WIDTH_SCALE px.
const EDGE_WIDTH_SCALE: f32 = 4.0;

struct Palette;
impl Palette {
    const BG: [u8; 3] = [18, 18, 24];
    const PANEL_BG: [u8; 3] = [28, 28, 36];
    const EDGE: [u8; 3] = [88, 88, 104];
    const VISITED: [u8; 3] = [255, 150, 40];
    const UNVISITED: [u8; 3] = [70, 95, 155];
    const SOURCE_RING: [u8; 3] = [240, 240, 245];
    const TEXT: [u8; 3] = [205, 205, 215];
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Renderer failures. All non-retryable at this layer — they indicate a
/// contract violation by the caller or a broken filesystem precondition.
#[derive(Debug)]
pub enum RenderError {
    /// Malformed adjacency input.
    InvalidGraph(String),
    /// Probability state or node-name references inconsistent with the
    /// graph.
    InvalidState(String),
    /// Cannot create or write the output frame.
    Io(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidGraph(msg) => write!(f, "InvalidGraph: {}", msg),
            RenderError::InvalidState(msg) => write!(f, "InvalidState: {}", msg),
            RenderError::Io(msg) => write!(f, "IoError: {}", msg),
        }
    }
}

impl From<io::Error> for RenderError {
    fn from(err: io::Error) -> Self {
        RenderError::Io(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Render plan
// ---------------------------------------------------------------------------

/// Render decision for one node.
#[derive(Debug, Clone)]
pub struct NodePlan {
    pub name: String,
    /// `"<name>:<mass to 2 decimals>"`.
    pub label: String,
    pub x: i32,
    pub y: i32,
    pub visited: bool,
    pub is_source: bool,
}

/// Render decision for one edge.
#[derive(Debug, Clone)]
pub struct EdgePlan {
    pub from: usize,
    pub to: usize,
    pub weight: i64,
    pub width_px: u32,
}

/// Everything `write_frame` needs, and everything a white-box test
/// wants to inspect.
#[derive(Debug, Clone)]
pub struct FramePlan {
    pub filename: String,
    pub title: String,
    pub nodes: Vec<NodePlan>,
    pub edges: Vec<EdgePlan>,
    pub legend: Vec<(String, [u8; 3])>,
}

/// Deterministic frame file name. Zero-padded so frames sort correctly
/// in ascending numeric order when globbed.
pub fn frame_filename(counter: u64) -> String {
    format!("diffusion_{:06}.png", counter)
}

/// Validate inputs and compute the render decisions for one frame.
pub fn plan_frame(
    graph: &WeightedGraph,
    mass: &BTreeMap<String, i64>,
    layout: &[(f32, f32)],
    mass_being_diffused: i64,
    source: &str,
    history: &[String],
    frame_counter: u64,
    depth: u32,
) -> Result<FramePlan, RenderError> {
    graph
        .try_validate()
        .map_err(|e| RenderError::InvalidGraph(e.to_string()))?;

    if layout.len() != graph.node_count() {
        return Err(RenderError::InvalidState(format!(
            "layout has {} positions for {} nodes",
            layout.len(),
            graph.node_count()
        )));
    }
    for name in graph.names() {
        if !mass.contains_key(name) {
            return Err(RenderError::InvalidState(format!(
                "state has no entry for graph node {:?}",
                name
            )));
        }
    }
    if !graph.contains(source) {
        return Err(RenderError::InvalidState(format!(
            "source {:?} is not a graph node",
            source
        )));
    }
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for name in history {
        if !graph.contains(name) {
            return Err(RenderError::InvalidState(format!(
                "visited node {:?} is not a graph node",
                name
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(RenderError::InvalidState(format!(
                "visitation history repeats {:?}",
                name
            )));
        }
    }
    let nodes = graph
        .names()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let (ux, uy) = layout[i];
            NodePlan {
                name: name.clone(),
                label: format!("{}:{}", name, format_mass(mass[name])),
                x: (ux * FRAME_SIZE as f32) as i32,
                y: (uy * FRAME_SIZE as f32) as i32,
                visited: seen.contains(name.as_str()),
                is_source: name == source,
            }
        })
        .collect();

    let max_w = graph.max_weight();
    let edges = graph
        .edges()
        .into_iter()
        .map(|(i, j, w)| EdgePlan {
            from: i,
            to: j,
            weight: w,
            width_px: edge_width_px(w, max_w),
        })
        .collect();

    Ok(FramePlan {
        filename: frame_filename(frame_counter),
        title: format!(
            "Diffusing {} from {} (depth {})",
            format_mass(mass_being_diffused),
            source,
            depth
        ),
        nodes,
        edges,
        legend: vec![
            ("Visited".to_string(), Palette::VISITED),
            ("Unvisited".to_string(), Palette::UNVISITED),
        ],
    })
}

/// Stroke width in pixels, monotonically non-decreasing in |weight|.
fn edge_width_px(weight: i64, max_weight: i64) -> u32 {
    let m = max_weight.abs().max(1) as f32;
    1 + (weight.abs() as f32 / m * EDGE_WIDTH_SCALE) as u32
}

/// Rasterize a plan and write the PNG into `output_dir`.
///
/// Fails with `Io` if the directory does not exist; never creates it —
/// directory lifecycle belongs to the caller.
pub fn write_frame(output_dir: &Path, plan: &FramePlan) -> Result<PathBuf, RenderError> {
    if !output_dir.is_dir() {
        return Err(RenderError::Io(format!(
            "output directory {} does not exist",
            output_dir.display()
        )));
    }

    let mut canvas = Canvas::new(FRAME_SIZE, FRAME_SIZE, Palette::BG);

    for edge in &plan.edges {
        let a = &plan.nodes[edge.from];
        let b = &plan.nodes[edge.to];
        canvas.draw_line(a.x, a.y, b.x, b.y, edge.width_px, Palette::EDGE);
    }

    for node in &plan.nodes {
        let fill = if node.visited {
            Palette::VISITED
        } else {
            Palette::UNVISITED
        };
        canvas.draw_disc(node.x, node.y, NODE_RADIUS, fill);
        if node.is_source {
            canvas.draw_ring(
                node.x,
                node.y,
                NODE_RADIUS + SOURCE_RING_GAP,
                2,
                Palette::SOURCE_RING,
            );
        }
        let lx = node.x - text_width(&node.label) as i32 / 2;
        let ly = node.y + NODE_RADIUS as i32 + SOURCE_RING_GAP as i32 + 2;
        canvas.draw_text(lx, ly, &node.label, Palette::TEXT);
    }

    let tx = (FRAME_SIZE as i32 - text_width(&plan.title) as i32) / 2;
    canvas.draw_text(tx, 6, &plan.title, Palette::TEXT);

    // Fixed-position legend bar along the bottom edge.
    canvas.fill_rect(0, FRAME_SIZE as i32 - 24, FRAME_SIZE, 24, Palette::PANEL_BG);
    let ly = FRAME_SIZE as i32 - 16;
    let mut lx = 120i32;
    for (label, color) in &plan.legend {
        canvas.draw_disc(lx, ly + 3, 5, *color);
        canvas.draw_text(lx + 10, ly, label, Palette::TEXT);
        lx += 140;
    }

    let path = output_dir.join(&plan.filename);
    image::save_buffer(
        &path,
        canvas.pixels(),
        FRAME_SIZE,
        FRAME_SIZE,
        image::ExtendedColorType::Rgb8,
    )
    .map_err(|e| RenderError::Io(e.to_string()))?;

    Ok(path)
}

/// Render one diffusion step: exactly one PNG named by `frame_counter`
/// lands in `output_dir`, and the next counter value is returned.
#[allow(clippy::too_many_arguments)]
pub fn render_step(
    graph: &WeightedGraph,
    mass: &BTreeMap<String, i64>,
    output_dir: &Path,
    mass_being_diffused: i64,
    source: &str,
    history: &[String],
    frame_counter: u64,
    depth: u32,
    layout: &[(f32, f32)],
) -> Result<u64, RenderError> {
    let plan = plan_frame(
        graph,
        mass,
        layout,
        mass_being_diffused,
        source,
        history,
        frame_counter,
        depth,
    )?;
    let path = write_frame(output_dir, &plan)?;
    log::debug!("wrote frame {} ({})", frame_counter, path.display());
    Ok(frame_counter + 1)
}
