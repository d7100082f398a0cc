//! Neuron variants and the synapse model.
//!
//! Every variant is a flat struct that implements only the capabilities it
//! needs: [`Activatable`] for all of them, [`SynapseTarget`] for units with
//! incoming synapses, and [`DiscrepancySource`] for the two discrepancy
//! variants. [`NodeKind`] is the tagged union stored in the arena.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::NetworkConfig;
use crate::topology::NodeId;

/// Type alias for synaptic weights (range: 0.0 to 1.0).
pub type Weight = f32;

/// Type alias for activation levels (range: 0.0 to 1.0).
pub type Activation = f32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Polarity {
    Excitatory,
    Inhibitory,
}

impl Polarity {
    /// +1 for excitatory, -1 for inhibitory.
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Polarity::Excitatory => 1.0,
            Polarity::Inhibitory => -1.0,
        }
    }
}

/// A weighted connection owned by its postsynaptic neuron.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Synapse {
    pub source: NodeId,
    pub polarity: Polarity,
    weight: Weight,
}

impl Synapse {
    pub fn new(source: NodeId, polarity: Polarity, weight: Weight) -> Self {
        Self {
            source,
            polarity,
            weight: clamp_unit(weight),
        }
    }

    pub fn excitatory(source: NodeId, weight: Weight) -> Self {
        Self::new(source, Polarity::Excitatory, weight)
    }

    pub fn inhibitory(source: NodeId, weight: Weight) -> Self {
        Self::new(source, Polarity::Inhibitory, weight)
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    /// Only the learning engine moves weights.
    pub(crate) fn set_weight(&mut self, weight: Weight) {
        self.weight = clamp_unit(weight);
    }

    /// Signed contribution of this synapse to the postsynaptic net input.
    #[inline]
    pub fn contribution(&self, levels: &[Activation]) -> f32 {
        self.polarity.sign() * self.weight * levels[self.source]
    }
}

#[inline]
pub(crate) fn clamp_unit(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// `Σ excitatory w·a − Σ inhibitory w·a` over committed levels.
pub fn net_input(synapses: &[Synapse], levels: &[Activation]) -> f32 {
    synapses.iter().map(|s| s.contribution(levels)).sum()
}

/// Per-unit protocol state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnitPhase {
    #[default]
    Idle,
    Prepared,
    Committed,
}

/// Private staging slot every activatable unit owns.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActivationSlot {
    pub(crate) staged: Activation,
    pub(crate) phase: UnitPhase,
}

impl ActivationSlot {
    pub(crate) fn with_staged(staged: Activation) -> Self {
        Self {
            staged,
            phase: UnitPhase::Idle,
        }
    }

    #[inline]
    fn stage(&mut self, value: Activation) {
        self.staged = value;
        self.phase = UnitPhase::Prepared;
    }

    #[inline]
    fn publish(&mut self, level: &mut Activation) {
        *level = self.staged;
        self.phase = UnitPhase::Committed;
    }

    pub fn staged(&self) -> Activation {
        self.staged
    }

    pub fn phase(&self) -> UnitPhase {
        self.phase
    }

    pub(crate) fn settle(&mut self) {
        self.phase = UnitPhase::Idle;
    }
}

/// Prepare/commit/reset protocol.
///
/// The public activation level lives outside the unit (in the network's
/// level board) so that `prepare_activation` can read a frozen view of every
/// committed level while writing only its own staging slot.
pub trait Activatable {
    fn slot(&self) -> &ActivationSlot;
    fn slot_mut(&mut self) -> &mut ActivationSlot;

    /// Compute the next level from committed state. Pure with respect to `levels`.
    fn compute_activation(&self, levels: &[Activation], cfg: &NetworkConfig) -> Activation;

    /// Variant-specific resting value.
    fn baseline(&self, cfg: &NetworkConfig) -> Activation;

    /// Stage the next level. Never touches `levels`; idempotent before commit.
    fn prepare_activation(&mut self, levels: &[Activation], cfg: &NetworkConfig) {
        let next = self.compute_activation(levels, cfg);
        self.slot_mut().stage(next);
    }

    /// Publish the staged value into this unit's public level slot.
    fn commit_activation(&mut self, level: &mut Activation) {
        self.slot_mut().publish(level);
    }

    /// Stage the baseline; visible after the next commit.
    fn reset_activation(&mut self, cfg: &NetworkConfig) {
        let base = self.baseline(cfg);
        self.slot_mut().stage(base);
    }
}

/// Units that own incoming synapses.
pub trait SynapseTarget {
    fn synapses(&self) -> &[Synapse];
    fn synapses_mut(&mut self) -> &mut Vec<Synapse>;

    fn net_input(&self, levels: &[Activation]) -> f32 {
        net_input(self.synapses(), levels)
    }
}

/// Units that carry a discrepancy (prediction-error) signal.
pub trait DiscrepancySource {
    fn discrepancy_signal(&self) -> f32;
    fn receive_excitation(&mut self, contribution: f32);
    fn receive_inhibition(&mut self, contribution: f32);
    fn clear_discrepancy_signal(&mut self);
}

/// Boundary unit mapping an external scalar into [0, 1].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sensor {
    pub min: f32,
    pub max: f32,
    pub(crate) external: f32,
    pub(crate) slot: ActivationSlot,
}

impl Sensor {
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            external: min,
            slot: ActivationSlot::default(),
        }
    }

    /// A sensor whose inputs are already on the unit interval.
    pub fn unit() -> Self {
        Self::new(0.0, 1.0)
    }

    pub fn update_external_input(&mut self, value: f32) {
        self.external = value;
    }

    pub fn external_input(&self) -> f32 {
        self.external
    }

    /// Normalise `value` into [0, 1] using this sensor's range.
    pub fn normalize(&self, value: f32) -> Activation {
        let span = self.max - self.min;
        if span <= 0.0 || !span.is_finite() {
            return if value >= self.max { 1.0 } else { 0.0 };
        }
        clamp_unit((value - self.min) / span)
    }
}

impl Activatable for Sensor {
    fn slot(&self) -> &ActivationSlot {
        &self.slot
    }
    fn slot_mut(&mut self) -> &mut ActivationSlot {
        &mut self.slot
    }
    fn compute_activation(&self, _levels: &[Activation], _cfg: &NetworkConfig) -> Activation {
        self.normalize(self.external)
    }
    fn baseline(&self, _cfg: &NetworkConfig) -> Activation {
        0.0
    }
}

/// What an effector hands to the environment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EffectorAction {
    pub strength: Activation,
    pub fired: bool,
}

/// Boundary unit that latches a motor neuron's committed output.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Effector {
    pub source: NodeId,
    /// Output at or above this level counts as the action being emitted.
    pub threshold: f32,
    pub(crate) slot: ActivationSlot,
}

impl Effector {
    pub fn new(source: NodeId, threshold: f32) -> Self {
        Self {
            source,
            threshold,
            slot: ActivationSlot::default(),
        }
    }

    /// Translate the committed output into an action.
    ///
    /// # Panics
    /// Panics if `level` is outside [0, 1]; an out-of-range value reaching an
    /// effector means the squashing or clamping upstream is broken.
    pub fn act(&self, level: Activation) -> EffectorAction {
        assert!(
            (0.0..=1.0).contains(&level),
            "effector output {level} outside [0, 1]"
        );
        EffectorAction {
            strength: level,
            fired: level >= self.threshold,
        }
    }
}

impl Activatable for Effector {
    fn slot(&self) -> &ActivationSlot {
        &self.slot
    }
    fn slot_mut(&mut self) -> &mut ActivationSlot {
        &mut self.slot
    }
    fn compute_activation(&self, levels: &[Activation], _cfg: &NetworkConfig) -> Activation {
        levels[self.source]
    }
    fn baseline(&self, _cfg: &NetworkConfig) -> Activation {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NeuronRole {
    SensoryInput,
    RespondentSensoryInput,
    SensoryInterneuron,
    MotorInterneuron,
    MotorOutput,
}

impl NeuronRole {
    pub fn is_input(self) -> bool {
        matches!(
            self,
            NeuronRole::SensoryInput | NeuronRole::RespondentSensoryInput
        )
    }
}

/// Weighted-sum + logistic unit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Neuron {
    pub role: NeuronRole,
    /// Sensory inputs flagged as test stimuli also feed the hippocampal unit.
    pub test_stimulus: bool,
    pub(crate) synapses: Vec<Synapse>,
    pub(crate) slot: ActivationSlot,
}

impl Neuron {
    pub fn new(role: NeuronRole) -> Self {
        Self {
            role,
            test_stimulus: false,
            synapses: Vec::new(),
            slot: ActivationSlot::default(),
        }
    }

    pub fn test_stimulus(mut self) -> Self {
        self.test_stimulus = true;
        self
    }
}

impl SynapseTarget for Neuron {
    fn synapses(&self) -> &[Synapse] {
        &self.synapses
    }
    fn synapses_mut(&mut self) -> &mut Vec<Synapse> {
        &mut self.synapses
    }
}

impl Activatable for Neuron {
    fn slot(&self) -> &ActivationSlot {
        &self.slot
    }
    fn slot_mut(&mut self) -> &mut ActivationSlot {
        &mut self.slot
    }
    fn compute_activation(&self, levels: &[Activation], cfg: &NetworkConfig) -> Activation {
        cfg.squash(self.net_input(levels))
    }
    /// Raw input neurons rest at 0.0 like the sensors feeding them.
    fn baseline(&self, cfg: &NetworkConfig) -> Activation {
        if self.role.is_input() {
            0.0
        } else {
            cfg.squash(0.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DiscrepancyKind {
    /// Motor side: reward prediction error.
    Dopaminergic,
    /// Sensory side: novelty prediction error.
    Hippocampal,
}

impl DiscrepancyKind {
    /// Whether a neuron in `role` may feed this discrepancy unit.
    pub fn accepts(self, role: NeuronRole, test_stimulus: bool) -> bool {
        match self {
            DiscrepancyKind::Dopaminergic => matches!(
                role,
                NeuronRole::MotorInterneuron
                    | NeuronRole::MotorOutput
                    | NeuronRole::RespondentSensoryInput
            ),
            DiscrepancyKind::Hippocampal => match role {
                NeuronRole::SensoryInterneuron => true,
                NeuronRole::SensoryInput => test_stimulus,
                _ => false,
            },
        }
    }

    pub fn gain(self, cfg: &NetworkConfig) -> f32 {
        match self {
            DiscrepancyKind::Dopaminergic => cfg.dopaminergic_gain,
            DiscrepancyKind::Hippocampal => cfg.hippocampal_gain,
        }
    }
}

/// Dopaminergic or hippocampal unit.
///
/// Its activation is a squashed integration of the excitation and inhibition
/// it receives; its discrepancy signal accumulates the change of that
/// activation since the previous integration, scaled by the kind's gain.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiscrepancyNeuron {
    pub kind: DiscrepancyKind,
    pub(crate) synapses: Vec<Synapse>,
    pub(crate) excitation: f32,
    pub(crate) inhibition: f32,
    pub(crate) previous_level: Activation,
    pub(crate) signal: f32,
    pub(crate) slot: ActivationSlot,
}

impl DiscrepancyNeuron {
    pub fn new(kind: DiscrepancyKind, cfg: &NetworkConfig) -> Self {
        let rest = cfg.squash(0.0);
        Self {
            kind,
            synapses: Vec::new(),
            excitation: 0.0,
            inhibition: 0.0,
            previous_level: rest,
            signal: 0.0,
            slot: ActivationSlot::with_staged(rest),
        }
    }

    /// Pull every synapse's contribution in as excitation or inhibition.
    pub fn gather(&mut self, levels: &[Activation]) {
        self.excitation = 0.0;
        self.inhibition = 0.0;
        for i in 0..self.synapses.len() {
            let syn = self.synapses[i];
            let amount = syn.weight() * levels[syn.source];
            match syn.polarity {
                Polarity::Excitatory => self.receive_excitation(amount),
                Polarity::Inhibitory => self.receive_inhibition(amount),
            }
        }
    }

    /// Fold the newly committed level into the discrepancy signal.
    pub fn integrate(&mut self, level: Activation, cfg: &NetworkConfig) {
        self.signal += self.kind.gain(cfg) * (level - self.previous_level);
        self.previous_level = level;
    }

    pub fn previous_level(&self) -> Activation {
        self.previous_level
    }

    pub(crate) fn restore_signal(&mut self, previous_level: Activation, signal: f32) {
        self.previous_level = previous_level;
        self.signal = signal;
    }
}

impl SynapseTarget for DiscrepancyNeuron {
    fn synapses(&self) -> &[Synapse] {
        &self.synapses
    }
    fn synapses_mut(&mut self) -> &mut Vec<Synapse> {
        &mut self.synapses
    }
}

impl DiscrepancySource for DiscrepancyNeuron {
    fn discrepancy_signal(&self) -> f32 {
        self.signal
    }
    fn receive_excitation(&mut self, contribution: f32) {
        self.excitation += contribution;
    }
    fn receive_inhibition(&mut self, contribution: f32) {
        self.inhibition += contribution;
    }
    fn clear_discrepancy_signal(&mut self) {
        self.signal = 0.0;
    }
}

impl Activatable for DiscrepancyNeuron {
    fn slot(&self) -> &ActivationSlot {
        &self.slot
    }
    fn slot_mut(&mut self) -> &mut ActivationSlot {
        &mut self.slot
    }
    fn compute_activation(&self, _levels: &[Activation], cfg: &NetworkConfig) -> Activation {
        cfg.squash(self.excitation - self.inhibition)
    }
    fn baseline(&self, cfg: &NetworkConfig) -> Activation {
        cfg.squash(0.0)
    }
    fn prepare_activation(&mut self, levels: &[Activation], cfg: &NetworkConfig) {
        self.gather(levels);
        let next = self.compute_activation(levels, cfg);
        self.slot.stage(next);
    }
}

/// Tagged union of every node variant held in the arena.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeKind {
    Sensor(Sensor),
    Effector(Effector),
    Neuron(Neuron),
    Discrepancy(DiscrepancyNeuron),
}

impl NodeKind {
    pub fn as_synapse_target(&self) -> Option<&dyn SynapseTarget> {
        match self {
            NodeKind::Neuron(n) => Some(n),
            NodeKind::Discrepancy(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_synapse_target_mut(&mut self) -> Option<&mut dyn SynapseTarget> {
        match self {
            NodeKind::Neuron(n) => Some(n),
            NodeKind::Discrepancy(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_discrepancy(&self) -> Option<&DiscrepancyNeuron> {
        match self {
            NodeKind::Discrepancy(d) => Some(d),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<NeuronRole> {
        match self {
            NodeKind::Neuron(n) => Some(n.role),
            _ => None,
        }
    }
}

impl Activatable for NodeKind {
    fn slot(&self) -> &ActivationSlot {
        match self {
            NodeKind::Sensor(s) => s.slot(),
            NodeKind::Effector(e) => e.slot(),
            NodeKind::Neuron(n) => n.slot(),
            NodeKind::Discrepancy(d) => d.slot(),
        }
    }
    fn slot_mut(&mut self) -> &mut ActivationSlot {
        match self {
            NodeKind::Sensor(s) => s.slot_mut(),
            NodeKind::Effector(e) => e.slot_mut(),
            NodeKind::Neuron(n) => n.slot_mut(),
            NodeKind::Discrepancy(d) => d.slot_mut(),
        }
    }
    fn compute_activation(&self, levels: &[Activation], cfg: &NetworkConfig) -> Activation {
        match self {
            NodeKind::Sensor(s) => s.compute_activation(levels, cfg),
            NodeKind::Effector(e) => e.compute_activation(levels, cfg),
            NodeKind::Neuron(n) => n.compute_activation(levels, cfg),
            NodeKind::Discrepancy(d) => d.compute_activation(levels, cfg),
        }
    }
    fn baseline(&self, cfg: &NetworkConfig) -> Activation {
        match self {
            NodeKind::Sensor(s) => s.baseline(cfg),
            NodeKind::Effector(e) => e.baseline(cfg),
            NodeKind::Neuron(n) => n.baseline(cfg),
            NodeKind::Discrepancy(d) => d.baseline(cfg),
        }
    }
    fn prepare_activation(&mut self, levels: &[Activation], cfg: &NetworkConfig) {
        match self {
            NodeKind::Sensor(s) => s.prepare_activation(levels, cfg),
            NodeKind::Effector(e) => e.prepare_activation(levels, cfg),
            NodeKind::Neuron(n) => n.prepare_activation(levels, cfg),
            NodeKind::Discrepancy(d) => d.prepare_activation(levels, cfg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> NetworkConfig {
        NetworkConfig::default()
    }

    #[test]
    fn net_input_subtracts_inhibition() {
        let levels = [1.0, 0.5, 0.0];
        let syns = [
            Synapse::excitatory(0, 0.6),
            Synapse::inhibitory(1, 0.4),
            Synapse::excitatory(2, 1.0),
        ];
        assert!((net_input(&syns, &levels) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn synapse_weights_are_clamped() {
        assert_eq!(Synapse::excitatory(0, 1.7).weight(), 1.0);
        assert_eq!(Synapse::inhibitory(0, -0.2).weight(), 0.0);
        assert_eq!(Synapse::excitatory(0, f32::NAN).weight(), 0.0);
    }

    #[test]
    fn prepare_leaves_public_level_alone() {
        let cfg = cfg();
        let mut n = Neuron::new(NeuronRole::SensoryInterneuron);
        n.synapses_mut().push(Synapse::excitatory(0, 0.5));
        let mut levels = vec![1.0, 0.25];

        n.prepare_activation(&levels, &cfg);
        assert_eq!(levels[1], 0.25);
        assert_eq!(n.slot().phase(), UnitPhase::Prepared);

        // Idempotent before commit.
        let first = n.slot().staged();
        n.prepare_activation(&levels, &cfg);
        assert_eq!(n.slot().staged(), first);

        n.commit_activation(&mut levels[1]);
        assert!((levels[1] - cfg.squash(0.5)).abs() < 1e-6);
        assert_eq!(n.slot().phase(), UnitPhase::Committed);
    }

    #[test]
    fn reset_then_commit_yields_variant_baseline() {
        let cfg = cfg();
        let mut level = 0.9;

        let mut s = Sensor::unit();
        s.reset_activation(&cfg);
        assert_eq!(level, 0.9);
        s.commit_activation(&mut level);
        assert_eq!(level, 0.0);

        let mut n = Neuron::new(NeuronRole::MotorInterneuron);
        n.reset_activation(&cfg);
        n.commit_activation(&mut level);
        assert!((level - cfg.squash(0.0)).abs() < 1e-6);

        let mut input = Neuron::new(NeuronRole::RespondentSensoryInput);
        input.reset_activation(&cfg);
        input.commit_activation(&mut level);
        assert_eq!(level, 0.0);
    }

    #[test]
    fn sensor_normalises_and_clamps() {
        let s = Sensor::new(-10.0, 10.0);
        assert_eq!(s.normalize(0.0), 0.5);
        assert_eq!(s.normalize(25.0), 1.0);
        assert_eq!(s.normalize(-25.0), 0.0);

        let degenerate = Sensor::new(1.0, 1.0);
        assert_eq!(degenerate.normalize(1.0), 1.0);
        assert_eq!(degenerate.normalize(0.5), 0.0);
    }

    #[test]
    fn effector_latches_without_squashing() {
        let cfg = cfg();
        let mut e = Effector::new(0, 0.5);
        let mut levels = vec![0.3, 0.0];
        e.prepare_activation(&levels, &cfg);
        levels[0] = 0.8;
        let (src, out) = levels.split_at_mut(1);
        e.commit_activation(&mut out[0]);
        assert_eq!(out[0], 0.3);
        assert_eq!(src[0], 0.8);

        let action = e.act(out[0]);
        assert!(!action.fired);
        assert_eq!(action.strength, 0.3);
    }

    #[test]
    #[should_panic(expected = "outside [0, 1]")]
    fn effector_rejects_out_of_range_output() {
        Effector::new(0, 0.5).act(1.5);
    }

    #[test]
    fn discrepancy_signal_tracks_activation_change() {
        let cfg = cfg();
        let mut d = DiscrepancyNeuron::new(DiscrepancyKind::Dopaminergic, &cfg);
        d.synapses_mut().push(Synapse::excitatory(0, 1.0));
        d.synapses_mut().push(Synapse::inhibitory(1, 1.0));

        let mut level = d.previous_level();
        let levels = [1.0, 0.0];
        d.prepare_activation(&levels, &cfg);
        d.commit_activation(&mut level);
        d.integrate(level, &cfg);

        let expected = cfg.squash(1.0) - cfg.squash(0.0);
        assert!((d.discrepancy_signal() - expected).abs() < 1e-6);

        d.clear_discrepancy_signal();
        assert_eq!(d.discrepancy_signal(), 0.0);
    }

    #[test]
    fn discrepancy_sources_are_role_restricted() {
        use DiscrepancyKind::*;
        assert!(Dopaminergic.accepts(NeuronRole::MotorInterneuron, false));
        assert!(Dopaminergic.accepts(NeuronRole::RespondentSensoryInput, false));
        assert!(!Dopaminergic.accepts(NeuronRole::SensoryInterneuron, false));
        assert!(Hippocampal.accepts(NeuronRole::SensoryInterneuron, false));
        assert!(Hippocampal.accepts(NeuronRole::SensoryInput, true));
        assert!(!Hippocampal.accepts(NeuronRole::SensoryInput, false));
        assert!(!Hippocampal.accepts(NeuronRole::MotorOutput, false));
    }
}
