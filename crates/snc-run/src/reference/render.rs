use std::f64::consts::TAU;

use snc_core::errors::{ErrorInfo, SncError};
use snc_core::graph::{GraphRole, SnnGraph, Trace};

use crate::backends::{FrameFormat, Renderer};
use crate::store::missing_trace;

const RADIUS_PER_NEURON: f64 = 12.0;
const MARGIN: f64 = 40.0;
const DEAD_FILL: &str = "#d62728";
const SPIKE_FILL: &str = "#ffd700";
const IDLE_FILL: &str = "#ffffff";

/// Reference stage-3 renderer producing SVG, Graphviz dot or text frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameRenderer;

impl Renderer for FrameRenderer {
    fn render(
        &self,
        role: GraphRole,
        graph: &SnnGraph,
        t: usize,
        format: FrameFormat,
    ) -> Result<String, SncError> {
        let trace = graph.trace.as_ref().ok_or_else(|| missing_trace(role))?;
        trace.validate(graph.neurons.len())?;
        if t >= trace.duration() {
            return Err(SncError::StructuralIntegrity(
                ErrorInfo::new("timestep_out_of_range", "frame requested past the end of the trace")
                    .with_context("role", role.name())
                    .with_context("t", t.to_string())
                    .with_context("duration", trace.duration().to_string()),
            ));
        }
        Ok(match format {
            FrameFormat::Svg => svg_frame(role, graph, trace, t),
            FrameFormat::Dot => dot_frame(role, graph, trace, t),
            FrameFormat::Text => text_frame(role, graph, trace, t),
        })
    }
}

fn fill(graph: &SnnGraph, trace: &Trace, idx: usize, t: usize) -> &'static str {
    if graph.is_dead(idx) {
        DEAD_FILL
    } else if trace.spiked(idx, t) {
        SPIKE_FILL
    } else {
        IDLE_FILL
    }
}

fn svg_frame(role: GraphRole, graph: &SnnGraph, trace: &Trace, t: usize) -> String {
    let n = graph.neurons.len().max(1);
    let radius = RADIUS_PER_NEURON * n as f64 / 2.0 + MARGIN;
    let centre = radius + MARGIN;
    let position = |idx: usize| {
        let angle = TAU * idx as f64 / n as f64;
        (centre + radius * angle.cos(), centre + radius * angle.sin())
    };
    let size = 2.0 * centre;
    let mut out = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size:.0}\" height=\"{size:.0}\">\n\
         <title>{role} t={t}</title>\n"
    );
    for synapse in &graph.synapses {
        let (x1, y1) = position(synapse.pre);
        let (x2, y2) = position(synapse.post);
        let stroke = if synapse.weight < 0.0 { "#1f77b4" } else { "#7f7f7f" };
        out.push_str(&format!(
            "<line x1=\"{x1:.1}\" y1=\"{y1:.1}\" x2=\"{x2:.1}\" y2=\"{y2:.1}\" stroke=\"{stroke}\"/>\n"
        ));
    }
    for (idx, neuron) in graph.neurons.iter().enumerate() {
        let (x, y) = position(idx);
        let voltage = trace.v[idx][t];
        out.push_str(&format!(
            "<circle cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"8\" fill=\"{}\" stroke=\"#000000\"/>\n\
             <text x=\"{x:.1}\" y=\"{:.1}\" font-size=\"8\">{} v={voltage:.2}</text>\n",
            fill(graph, trace, idx, t),
            y - 10.0,
            neuron.name,
        ));
    }
    out.push_str("</svg>\n");
    out
}

fn dot_frame(role: GraphRole, graph: &SnnGraph, trace: &Trace, t: usize) -> String {
    let mut out = format!("digraph \"{role}_{t}\" {{\n");
    for (idx, neuron) in graph.neurons.iter().enumerate() {
        out.push_str(&format!(
            "  \"{}\" [style=filled, fillcolor=\"{}\", label=\"{}\\nv={:.2}\"];\n",
            neuron.name,
            fill(graph, trace, idx, t),
            neuron.name,
            trace.v[idx][t],
        ));
    }
    for synapse in &graph.synapses {
        if let (Some(pre), Some(post)) = (
            graph.neurons.get(synapse.pre),
            graph.neurons.get(synapse.post),
        ) {
            out.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\"];\n",
                pre.name, post.name, synapse.weight,
            ));
        }
    }
    out.push_str("}\n");
    out
}

fn text_frame(role: GraphRole, graph: &SnnGraph, trace: &Trace, t: usize) -> String {
    let spiking: Vec<&str> = graph
        .neurons
        .iter()
        .enumerate()
        .filter(|(idx, _)| trace.spiked(*idx, t))
        .map(|(_, neuron)| neuron.name.as_str())
        .collect();
    format!(
        "t={t} {role}: spiking [{}] dead [{}]",
        spiking.join(", "),
        graph.dead_neurons.iter().cloned().collect::<Vec<_>>().join(", ")
    )
}
