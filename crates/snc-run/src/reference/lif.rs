//! Discrete current-based leaky integrate-and-fire simulation.

use snc_core::errors::{ErrorInfo, SncError};
use snc_core::graph::{GraphSet, SnnGraph, Trace};
use snc_exp::RunConfig;
use tracing::debug;

use crate::backends::Simulator;

/// Simulates `graph` for `duration` timesteps.
///
/// Per step: `u = u(1 - du) + sum(w * spike_prev)`, `v = v(1 - dv) + u + bias`;
/// a living neuron spikes when `v > vth` and its voltage resets to zero.
/// Recorded voltages are taken before the reset.
pub fn simulate(graph: &SnnGraph, duration: usize) -> Result<Trace, SncError> {
    let n = graph.neurons.len();
    if let Some(synapse) = graph.synapses.iter().find(|s| s.pre >= n || s.post >= n) {
        return Err(SncError::StructuralIntegrity(
            ErrorInfo::new("synapse_index", "synapse references a missing neuron")
                .with_context("pre", synapse.pre.to_string())
                .with_context("post", synapse.post.to_string())
                .with_context("neurons", n.to_string()),
        ));
    }
    let dead: Vec<bool> = (0..n).map(|idx| graph.is_dead(idx)).collect();
    let mut current = vec![0.0; n];
    let mut voltage = vec![0.0; n];
    let mut fired = vec![false; n];
    let mut trace = Trace {
        v: vec![Vec::with_capacity(duration); n],
        i: vec![Vec::with_capacity(duration); n],
        spikes: vec![Vec::with_capacity(duration); n],
    };

    for _ in 0..duration {
        let mut input = vec![0.0; n];
        for synapse in graph.synapses.iter().filter(|s| fired[s.pre]) {
            input[synapse.post] += synapse.weight;
        }
        for (idx, neuron) in graph.neurons.iter().enumerate() {
            current[idx] = current[idx] * (1.0 - neuron.du) + input[idx];
            voltage[idx] = voltage[idx] * (1.0 - neuron.dv) + current[idx] + neuron.bias;
            trace.i[idx].push(current[idx]);
            trace.v[idx].push(voltage[idx]);
            fired[idx] = !dead[idx] && voltage[idx] > neuron.vth;
            if fired[idx] {
                voltage[idx] = 0.0;
            }
            trace.spikes[idx].push(fired[idx]);
        }
    }

    if let Some(idx) = (0..n).find(|&idx| !voltage[idx].is_finite() || !current[idx].is_finite()) {
        return Err(SncError::Simulation(
            ErrorInfo::new("non_finite_state", "neuron state diverged")
                .with_context("neuron", graph.neurons[idx].name.clone()),
        ));
    }
    Ok(trace)
}

/// Reference stage-2 simulator; both simulator kinds run the same numerics.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifSimulator;

impl Simulator for LifSimulator {
    fn sim_graphs(&self, run: &RunConfig, graphs: &mut GraphSet) -> Result<(), SncError> {
        let duration = run.sim_duration();
        for role in run.expected_roles().into_iter().filter(|role| role.is_snn()) {
            let snn = graphs.require_mut(role)?.as_snn_mut()?;
            let trace = simulate(snn, duration)?;
            debug!(%role, duration, "simulated network");
            snn.trace = Some(trace);
        }
        Ok(())
    }
}
