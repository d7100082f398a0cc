//! The network: node arena, level board, and per-tick phase machine.
//!
//! Per tick the caller drives, in this order:
//!
//! 1. [`Network::update_external_inputs`]
//! 2. [`Network::prepare_all`] / [`Network::commit_all`] (sensors + input region)
//! 3. an updater's `operant_neurons_activate`
//! 4. [`Network::update_discrepancy_areas`]
//! 5. `LearningEngine::apply_weight_updates` (optional)
//! 6. [`Network::act_effectors`]
//!
//! Calling a step out of order returns [`NetworkError::PhaseViolation`]
//! before anything is mutated.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::{debug, warn};

use crate::activation::{ActivationScheduler, PassReport};
use crate::config::NetworkConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::neuron::{
    Activatable, Activation, DiscrepancyKind, DiscrepancySource, EffectorAction, NodeKind,
    SynapseTarget,
};
use crate::prng::Prng;
use crate::registry::IdentifierRegistry;
use crate::topology::{NodeId, ParentRef, RegionKind, Topology};

/// Where the network is within the current tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TickPhase {
    #[default]
    Idle,
    InputsUpdated,
    InputsPrepared,
    InputsCommitted,
    OperantActivated,
    DiscrepancyUpdated,
    Learned,
}

/// Identifier and container position of a node.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeMeta {
    pub identifier: Option<String>,
    pub parent: Option<ParentRef>,
}

/// Mean discrepancy signal per side after an update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiscrepancySignals {
    pub hippocampal: f32,
    pub dopaminergic: f32,
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub tick: u64,
    pub node_count: usize,
    pub sensor_count: usize,
    pub effector_count: usize,
    pub synapse_count: usize,
    pub max_layer_depth: usize,
    pub max_node_width: usize,
    pub avg_activation: f32,
    pub signals: DiscrepancySignals,
}

#[derive(Debug, Clone)]
pub struct Network {
    pub(crate) cfg: NetworkConfig,
    pub(crate) topology: Topology,
    pub(crate) registry: IdentifierRegistry,
    pub(crate) units: Vec<NodeKind>,
    pub(crate) levels: Vec<Activation>,
    pub(crate) meta: Vec<NodeMeta>,
    pub(crate) phase: TickPhase,
    pub(crate) tick: u64,

    sensors: Vec<NodeId>,
    effectors: Vec<NodeId>,
    // Sensors followed by the sensory input region.
    input_population: Vec<NodeId>,
    scheduler: ActivationScheduler,
}

impl Network {
    /// Assemble a network from validated parts.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        cfg: NetworkConfig,
        topology: Topology,
        registry: IdentifierRegistry,
        units: Vec<NodeKind>,
        levels: Vec<Activation>,
        meta: Vec<NodeMeta>,
        rng: Prng,
        tick: u64,
    ) -> NetworkResult<Self> {
        cfg.validate()?;
        let scheduler = ActivationScheduler::with_rng(cfg.schedule, rng)?;

        let sensors: Vec<NodeId> = (0..units.len())
            .filter(|&i| matches!(units[i], NodeKind::Sensor(_)))
            .collect();
        let effectors: Vec<NodeId> = (0..units.len())
            .filter(|&i| matches!(units[i], NodeKind::Effector(_)))
            .collect();
        let mut input_population = sensors.clone();
        input_population.extend(topology.region(RegionKind::SensoryInput).nodes());

        Ok(Self {
            cfg,
            topology,
            registry,
            units,
            levels,
            meta,
            phase: TickPhase::Idle,
            tick,
            sensors,
            effectors,
            input_population,
            scheduler,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.cfg
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    /// Completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn node_count(&self) -> usize {
        self.units.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeKind> {
        self.units.get(id)
    }

    pub fn meta(&self, id: NodeId) -> Option<&NodeMeta> {
        self.meta.get(id)
    }

    /// Committed activation level of `id`.
    pub fn level(&self, id: NodeId) -> Option<Activation> {
        self.levels.get(id).copied()
    }

    pub fn levels(&self) -> &[Activation] {
        &self.levels
    }

    pub fn sensors(&self) -> &[NodeId] {
        &self.sensors
    }

    pub fn effectors(&self) -> &[NodeId] {
        &self.effectors
    }

    pub fn find_node(&self, identifier: Option<&str>) -> Option<NodeId> {
        self.registry.find(identifier)
    }

    pub fn registry(&self) -> &IdentifierRegistry {
        &self.registry
    }

    pub(crate) fn rng_state(&self) -> u64 {
        self.scheduler.rng_state()
    }

    pub(crate) fn expect_phase(&self, expected: &'static [TickPhase]) -> NetworkResult<()> {
        if expected.contains(&self.phase) {
            Ok(())
        } else {
            Err(NetworkError::PhaseViolation {
                expected,
                found: self.phase,
            })
        }
    }

    /// Load one external scalar per sensor, in sensor order.
    pub fn update_external_inputs(&mut self, values: &[f32]) -> NetworkResult<()> {
        self.expect_phase(&[TickPhase::Idle])?;
        if values.len() != self.sensors.len() {
            return Err(NetworkError::InputCountMismatch {
                expected: self.sensors.len(),
                found: values.len(),
            });
        }

        for (&id, &value) in self.sensors.iter().zip(values) {
            if !value.is_finite() {
                warn!(sensor = id, value, "non-finite sensor input clamped");
            }
            if let NodeKind::Sensor(sensor) = &mut self.units[id] {
                sensor.update_external_input(value);
            }
        }
        for unit in &mut self.units {
            unit.slot_mut().settle();
        }
        self.phase = TickPhase::InputsUpdated;
        Ok(())
    }

    /// Prepare sensors and input neurons.
    pub fn prepare_all(&mut self) -> NetworkResult<PassReport> {
        self.expect_phase(&[TickPhase::InputsUpdated])?;
        let report = self.scheduler.prepare_pass(
            &mut self.units,
            &mut self.levels,
            &self.input_population,
            &self.cfg,
        );
        self.phase = TickPhase::InputsPrepared;
        Ok(report)
    }

    /// Commit sensors and input neurons.
    pub fn commit_all(&mut self) -> NetworkResult<()> {
        self.expect_phase(&[TickPhase::InputsPrepared])?;
        self.scheduler
            .commit_pass(&mut self.units, &mut self.levels, &self.input_population);
        self.phase = TickPhase::InputsCommitted;
        Ok(())
    }

    /// Recompute a slice of the operant population.
    ///
    /// Legal only once the input stage of this tick is committed. May be
    /// called several times per tick (one call per region, for instance).
    pub fn activate_operant(&mut self, population: &[NodeId]) -> NetworkResult<PassReport> {
        self.expect_phase(&[TickPhase::InputsCommitted, TickPhase::OperantActivated])?;
        for &id in population {
            let meta = self.meta.get(id).ok_or(NetworkError::UnknownNode(id))?;
            let operant = meta.parent.is_some_and(|p| p.region.is_operant());
            if !operant {
                return Err(NetworkError::NotOperant(id));
            }
        }

        let report =
            self.scheduler
                .run_pass(&mut self.units, &mut self.levels, population, &self.cfg);
        self.phase = TickPhase::OperantActivated;
        Ok(report)
    }

    /// Recompute hippocampal then dopaminergic units and fold their new
    /// activation into their discrepancy signals.
    pub fn update_discrepancy_areas(&mut self) -> NetworkResult<DiscrepancySignals> {
        self.expect_phase(&[TickPhase::OperantActivated])?;

        for kind in [RegionKind::Hippocampal, RegionKind::Dopaminergic] {
            let population = self.topology.region(kind).nodes();
            self.scheduler
                .run_pass(&mut self.units, &mut self.levels, &population, &self.cfg);
            for &id in &population {
                if let NodeKind::Discrepancy(d) = &mut self.units[id] {
                    d.integrate(self.levels[id], &self.cfg);
                }
            }
        }

        self.phase = TickPhase::DiscrepancyUpdated;
        let signals = self.discrepancy_signals();
        debug!(
            tick = self.tick,
            hippocampal = signals.hippocampal,
            dopaminergic = signals.dopaminergic,
            "discrepancy updated"
        );
        Ok(signals)
    }

    /// Mean signal over every unit of `kind`; 0.0 if there are none.
    pub fn discrepancy_signal(&self, kind: DiscrepancyKind) -> f32 {
        let (sum, n) = self
            .units
            .iter()
            .filter_map(NodeKind::as_discrepancy)
            .filter(|d| d.kind == kind)
            .fold((0.0f32, 0usize), |(s, n), d| (s + d.discrepancy_signal(), n + 1));
        if n == 0 {
            0.0
        } else {
            sum / n as f32
        }
    }

    pub fn discrepancy_signals(&self) -> DiscrepancySignals {
        DiscrepancySignals {
            hippocampal: self.discrepancy_signal(DiscrepancyKind::Hippocampal),
            dopaminergic: self.discrepancy_signal(DiscrepancyKind::Dopaminergic),
        }
    }

    pub(crate) fn clear_discrepancy_signals(&mut self) {
        for unit in &mut self.units {
            if let NodeKind::Discrepancy(d) = unit {
                d.clear_discrepancy_signal();
            }
        }
    }

    /// Latch motor output into the effectors and report their actions.
    /// Ends the tick.
    pub fn act_effectors(&mut self) -> NetworkResult<Vec<(NodeId, EffectorAction)>> {
        self.expect_phase(&[TickPhase::DiscrepancyUpdated, TickPhase::Learned])?;

        let effectors = std::mem::take(&mut self.effectors);
        self.scheduler
            .run_pass(&mut self.units, &mut self.levels, &effectors, &self.cfg);
        let actions: Vec<(NodeId, EffectorAction)> = effectors
            .iter()
            .filter_map(|&id| match &self.units[id] {
                NodeKind::Effector(e) => Some((id, e.act(self.levels[id]))),
                _ => None,
            })
            .collect();
        self.effectors = effectors;

        self.tick = self.tick.wrapping_add(1);
        self.phase = TickPhase::Idle;
        Ok(actions)
    }

    /// Stage and commit every unit's baseline and zero the discrepancy state.
    /// Used between trials.
    pub fn reset_activations(&mut self) -> NetworkResult<()> {
        self.expect_phase(&[TickPhase::Idle])?;
        let cfg = self.cfg;
        for (unit, level) in self.units.iter_mut().zip(self.levels.iter_mut()) {
            unit.reset_activation(&cfg);
            unit.commit_activation(level);
            unit.slot_mut().settle();
            if let NodeKind::Discrepancy(d) = unit {
                d.restore_signal(*level, 0.0);
            }
        }
        Ok(())
    }

    pub fn synapse_count(&self) -> usize {
        self.units
            .iter()
            .filter_map(NodeKind::as_synapse_target)
            .map(|t| t.synapses().len())
            .sum()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let avg_activation = if self.levels.is_empty() {
            0.0
        } else {
            self.levels.iter().sum::<f32>() / self.levels.len() as f32
        };
        Diagnostics {
            tick: self.tick,
            node_count: self.units.len(),
            sensor_count: self.sensors.len(),
            effector_count: self.effectors.len(),
            synapse_count: self.synapse_count(),
            max_layer_depth: self.topology.max_layer_depth(),
            max_node_width: self.topology.max_node_width(),
            avg_activation,
            signals: self.discrepancy_signals(),
        }
    }
}
