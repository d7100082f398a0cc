//! Discrepancy-modulated weight updates.
//!
//! For every synapse owned by an operant neuron:
//!
//! ```text
//! Δw = rate · d · a_pre · a_post        (negated for inhibitory synapses)
//! w' = clamp(w + Δw, 0, 1)
//! ```
//!
//! `d` is the dopaminergic signal for motor-side neurons and the hippocampal
//! signal (plus the dopaminergic one, if configured) for sensory-side
//! neurons. Signals are cleared once the update has been applied.

use tracing::debug;

use crate::config::NetworkConfig;
use crate::error::NetworkResult;
use crate::network::{Network, TickPhase};
use crate::neuron::{Activation, DiscrepancyKind, NodeKind, Polarity, SynapseTarget, Weight};
use crate::topology::RegionKind;

/// What one learning step did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LearningReport {
    pub strengthened: usize,
    pub weakened: usize,
    /// Sum of |Δw| actually applied (after clamping).
    pub total_change: f32,
    pub motor_signal: f32,
    pub sensory_signal: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningEngine {
    pub learning_rate: f32,
    pub deadband: f32,
    pub dopamine_gates_sensory: bool,
}

impl LearningEngine {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            deadband: 0.0,
            dopamine_gates_sensory: true,
        }
    }

    pub fn from_config(cfg: &NetworkConfig) -> Self {
        Self {
            learning_rate: cfg.learning_rate,
            deadband: cfg.learning_deadband,
            dopamine_gates_sensory: cfg.dopamine_gates_sensory,
        }
    }

    /// Unclamped change for one synapse.
    #[inline]
    pub fn weight_delta(
        &self,
        discrepancy: f32,
        pre: Activation,
        post: Activation,
        polarity: Polarity,
    ) -> f32 {
        polarity.sign() * self.learning_rate * discrepancy * pre * post
    }

    /// New weight for one synapse, clamped to [0, 1].
    #[inline]
    pub fn updated_weight(
        &self,
        weight: Weight,
        discrepancy: f32,
        pre: Activation,
        post: Activation,
        polarity: Polarity,
    ) -> Weight {
        (weight + self.weight_delta(discrepancy, pre, post, polarity)).clamp(0.0, 1.0)
    }

    fn side_signals(&self, net: &Network) -> (f32, f32) {
        let motor = net.discrepancy_signal(DiscrepancyKind::Dopaminergic);
        let mut sensory = net.discrepancy_signal(DiscrepancyKind::Hippocampal);
        if self.dopamine_gates_sensory {
            sensory += motor;
        }
        (motor, sensory)
    }

    /// Apply one learning step to every operant neuron, then clear all
    /// discrepancy signals.
    ///
    /// Legal only after [`Network::update_discrepancy_areas`] in the current
    /// tick; otherwise returns a phase violation and leaves weights alone.
    pub fn apply_weight_updates(&self, net: &mut Network) -> NetworkResult<LearningReport> {
        net.expect_phase(&[TickPhase::DiscrepancyUpdated])?;

        let (motor, sensory) = self.side_signals(net);
        let mut report = LearningReport {
            motor_signal: motor,
            sensory_signal: sensory,
            ..Default::default()
        };

        for kind in RegionKind::OPERANT_ORDER {
            let d = match kind {
                RegionKind::SensoryAssociation => sensory,
                _ => motor,
            };
            if d == 0.0 || d.abs() < self.deadband {
                continue;
            }

            let levels = &net.levels;
            for id in net.topology.region(kind).nodes() {
                let post = levels[id];
                let NodeKind::Neuron(neuron) = &mut net.units[id] else {
                    continue;
                };
                for syn in neuron.synapses_mut().iter_mut() {
                    let pre = levels[syn.source];
                    let old = syn.weight();
                    let new = self.updated_weight(old, d, pre, post, syn.polarity);
                    if new > old {
                        report.strengthened += 1;
                    } else if new < old {
                        report.weakened += 1;
                    }
                    report.total_change += (new - old).abs();
                    syn.set_weight(new);
                }
            }
        }

        net.clear_discrepancy_signals();
        net.phase = TickPhase::Learned;

        debug!(
            tick = net.tick,
            strengthened = report.strengthened,
            weakened = report.weakened,
            total_change = report.total_change,
            motor_signal = motor,
            sensory_signal = sensory,
            "weights updated"
        );
        Ok(report)
    }
}

impl Default for LearningEngine {
    fn default() -> Self {
        Self::from_config(&NetworkConfig::default())
    }
}
