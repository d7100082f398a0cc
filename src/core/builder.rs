//! Network assembly.
//!
//! Every node is created with its container position and optional
//! identifier; the identifier is registered in the same step. Invalid
//! requests fail without touching the partially built network.

use tracing::{info, warn};

use crate::config::NetworkConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::network::{Network, NodeMeta};
use crate::neuron::{
    Activatable, DiscrepancyKind, DiscrepancyNeuron, Effector, Neuron, NeuronRole, NodeKind,
    Polarity, Sensor, Synapse, SynapseTarget,
};
use crate::prng::Prng;
use crate::registry::IdentifierRegistry;
use crate::topology::{Area, NodeId, ParentRef, RegionKind, Topology};

/// An area inside a region, as returned by [`NetworkBuilder::add_area`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaHandle {
    pub region: RegionKind,
    pub area: usize,
}

impl AreaHandle {
    /// Address of layer `index` within this area.
    pub fn layer(self, index: usize) -> ParentRef {
        ParentRef {
            region: self.region,
            area: self.area,
            layer: index,
        }
    }
}

/// Region a node variant must live in; `None` for boundary units.
pub(crate) fn home_region(kind: &NodeKind) -> Option<RegionKind> {
    match kind {
        NodeKind::Sensor(_) | NodeKind::Effector(_) => None,
        NodeKind::Neuron(n) => Some(match n.role {
            NeuronRole::SensoryInput | NeuronRole::RespondentSensoryInput => {
                RegionKind::SensoryInput
            }
            NeuronRole::SensoryInterneuron => RegionKind::SensoryAssociation,
            NeuronRole::MotorInterneuron => RegionKind::MotorAssociation,
            NeuronRole::MotorOutput => RegionKind::MotorOutput,
        }),
        NodeKind::Discrepancy(d) => Some(match d.kind {
            DiscrepancyKind::Hippocampal => RegionKind::Hippocampal,
            DiscrepancyKind::Dopaminergic => RegionKind::Dopaminergic,
        }),
    }
}

/// Whether a synapse `source -> target` is allowed between two arena nodes.
///
/// Shared by assembly and snapshot restore so both accept the same graphs.
pub(crate) fn check_connection(
    units: &[NodeKind],
    source: NodeId,
    target: NodeId,
) -> NetworkResult<()> {
    let src = units.get(source).ok_or(NetworkError::UnknownNode(source))?;
    let dst = units.get(target).ok_or(NetworkError::UnknownNode(target))?;
    let reject = |reason: &'static str| NetworkError::InvalidSynapseSource {
        source_node: source,
        target,
        reason,
    };

    if source == target {
        return Err(reject("self-connections are not allowed"));
    }
    match src {
        NodeKind::Effector(_) => return Err(reject("effectors have no outgoing synapses")),
        NodeKind::Discrepancy(_) => {
            return Err(reject("discrepancy units modulate learning, not activation"))
        }
        _ => {}
    }

    match dst {
        NodeKind::Sensor(_) | NodeKind::Effector(_) => {
            Err(reject("target does not accept synapses"))
        }
        NodeKind::Neuron(n) if n.role.is_input() => match src {
            NodeKind::Sensor(_) => Ok(()),
            _ => Err(reject("input neurons are fed by sensors only")),
        },
        NodeKind::Neuron(_) => Ok(()),
        NodeKind::Discrepancy(d) => match src {
            NodeKind::Neuron(n) if d.kind.accepts(n.role, n.test_stimulus) => Ok(()),
            _ => Err(reject("source is not an eligible discrepancy input")),
        },
    }
}

/// Effectors latch a computing neuron.
pub(crate) fn check_effector_source(
    units: &[NodeKind],
    source: NodeId,
    effector: NodeId,
) -> NetworkResult<()> {
    match units.get(source) {
        None => Err(NetworkError::UnknownNode(source)),
        Some(NodeKind::Neuron(_)) => Ok(()),
        Some(_) => Err(NetworkError::InvalidSynapseSource {
            source_node: source,
            target: effector,
            reason: "effectors latch a computing neuron",
        }),
    }
}

#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    cfg: NetworkConfig,
    topology: Topology,
    registry: IdentifierRegistry,
    units: Vec<NodeKind>,
    meta: Vec<NodeMeta>,
}

impl NetworkBuilder {
    pub fn new(cfg: NetworkConfig) -> Self {
        Self {
            cfg,
            topology: Topology::default(),
            registry: IdentifierRegistry::new(),
            units: Vec::new(),
            meta: Vec::new(),
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.cfg
    }

    pub fn add_area(&mut self, region: RegionKind, area: Area) -> AreaHandle {
        let area = self.topology.add_area(region, area);
        AreaHandle { region, area }
    }

    pub fn find_node(&self, identifier: Option<&str>) -> Option<NodeId> {
        self.registry.find(identifier)
    }

    fn push(
        &mut self,
        kind: NodeKind,
        parent: Option<ParentRef>,
        identifier: Option<&str>,
    ) -> NetworkResult<NodeId> {
        let id = self.units.len();

        match (home_region(&kind), parent) {
            (None, None) => {}
            (None, Some(p)) => {
                return Err(NetworkError::InvalidPlacement {
                    region: p.region,
                    reason: "sensors and effectors belong to no container",
                })
            }
            (Some(home), None) => {
                return Err(NetworkError::InvalidPlacement {
                    region: home,
                    reason: "neurons need a parent layer",
                })
            }
            (Some(home), Some(p)) if home != p.region => {
                return Err(NetworkError::InvalidPlacement {
                    region: p.region,
                    reason: "neuron role does not belong to this region",
                })
            }
            (Some(_), Some(p)) => {
                let exists = self
                    .topology
                    .region(p.region)
                    .areas()
                    .get(p.area)
                    .is_some_and(|a| p.layer < a.layers().len());
                if !exists {
                    return Err(NetworkError::InvalidPlacement {
                        region: p.region,
                        reason: "no such area or layer",
                    });
                }
            }
        }

        if let Some(name) = identifier {
            self.registry.register(Some(name), id)?;
        }
        if let Some(p) = parent {
            // Address checked above.
            let _ = self.topology.place(p, id);
        }
        self.units.push(kind);
        self.meta.push(NodeMeta {
            identifier: identifier.map(str::to_string),
            parent,
        });
        Ok(id)
    }

    pub fn add_sensor(&mut self, identifier: Option<&str>, sensor: Sensor) -> NetworkResult<NodeId> {
        self.push(NodeKind::Sensor(sensor), None, identifier)
    }

    pub fn add_neuron(
        &mut self,
        parent: ParentRef,
        identifier: Option<&str>,
        neuron: Neuron,
    ) -> NetworkResult<NodeId> {
        self.push(NodeKind::Neuron(neuron), Some(parent), identifier)
    }

    pub fn add_discrepancy(
        &mut self,
        parent: ParentRef,
        identifier: Option<&str>,
        kind: DiscrepancyKind,
    ) -> NetworkResult<NodeId> {
        let unit = DiscrepancyNeuron::new(kind, &self.cfg);
        self.push(NodeKind::Discrepancy(unit), Some(parent), identifier)
    }

    /// Attach an effector that latches `source`, a computing neuron.
    pub fn add_effector(
        &mut self,
        identifier: Option<&str>,
        source: NodeId,
        threshold: f32,
    ) -> NetworkResult<NodeId> {
        check_effector_source(&self.units, source, self.units.len())?;
        self.push(
            NodeKind::Effector(Effector::new(source, threshold)),
            None,
            identifier,
        )
    }

    /// Add a synapse from `source` to `target`; the weight is clamped to [0, 1].
    pub fn connect(
        &mut self,
        source: NodeId,
        target: NodeId,
        polarity: Polarity,
        weight: f32,
    ) -> NetworkResult<()> {
        check_connection(&self.units, source, target)?;
        if !(0.0..=1.0).contains(&weight) {
            warn!(source, target, weight, "synapse weight clamped to [0, 1]");
        }
        let synapse = Synapse::new(source, polarity, weight);
        if let Some(t) = self.units[target].as_synapse_target_mut() {
            t.synapses_mut().push(synapse);
        }
        Ok(())
    }

    pub fn excite(&mut self, source: NodeId, target: NodeId, weight: f32) -> NetworkResult<()> {
        self.connect(source, target, Polarity::Excitatory, weight)
    }

    pub fn inhibit(&mut self, source: NodeId, target: NodeId, weight: f32) -> NetworkResult<()> {
        self.connect(source, target, Polarity::Inhibitory, weight)
    }

    /// Fully connect `sources` to `targets` with weights drawn uniformly
    /// from `[low, high)` using `rng`.
    pub fn connect_random(
        &mut self,
        sources: &[NodeId],
        targets: &[NodeId],
        polarity: Polarity,
        (low, high): (f32, f32),
        rng: &mut Prng,
    ) -> NetworkResult<()> {
        for &t in targets {
            for &s in sources {
                let w = low + (high - low) * rng.next_f32_01();
                self.connect(s, t, polarity, w)?;
            }
        }
        Ok(())
    }

    /// Validate the config and freeze the graph into a [`Network`].
    pub fn build(self) -> NetworkResult<Network> {
        self.cfg.validate()?;
        let cfg = self.cfg;

        let mut units = self.units;
        let mut levels = vec![0.0; units.len()];
        for (unit, level) in units.iter_mut().zip(levels.iter_mut()) {
            unit.reset_activation(&cfg);
            unit.commit_activation(level);
            unit.slot_mut().settle();
        }

        let net = Network::from_parts(
            cfg,
            self.topology,
            self.registry,
            units,
            levels,
            self.meta,
            Prng::new(cfg.seed),
            0,
        )?;
        info!(
            nodes = net.node_count(),
            synapses = net.synapse_count(),
            sensors = net.sensors().len(),
            effectors = net.effectors().len(),
            schedule = ?cfg.schedule,
            "network assembled"
        );
        Ok(net)
    }
}
