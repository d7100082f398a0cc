//! Flat snapshots and the chunked binary image.
//!
//! [`NetworkSnapshot`] is plain data: the node arena with index-based
//! synapses, the container hierarchy as nested index lists, the config and
//! the generator state. It is what an archival collaborator stores, either
//! through serde or through the binary image (`SELNET01`).
//!
//! Restoring an image and saving it again yields the same bytes.

use std::io::{self, Read, Write};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::info;

use crate::builder::{check_connection, check_effector_source, home_region};
use crate::config::{NetworkConfig, Schedule};
use crate::error::{NetworkError, NetworkResult};
use crate::network::{Network, NodeMeta, TickPhase};
use crate::neuron::{
    Activation, ActivationSlot, DiscrepancyKind, DiscrepancyNeuron, Effector, Neuron,
    NeuronRole, NodeKind, Polarity, Sensor, Synapse, SynapseTarget, UnitPhase,
};
use crate::prng::Prng;
use crate::registry::IdentifierRegistry;
use crate::storage::{self, invalid};
use crate::topology::{Area, NodeId, ParentRef, RegionKind, Topology};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeRecord {
    pub identifier: Option<String>,
    pub parent: Option<ParentRef>,
    pub level: Activation,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AreaRecord {
    /// Single-layer area (as opposed to a stack that happens to hold one layer).
    pub single: bool,
    pub layers: Vec<Vec<NodeId>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegionRecord {
    pub kind: RegionKind,
    pub areas: Vec<AreaRecord>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkSnapshot {
    pub config: NetworkConfig,
    pub rng_state: u64,
    pub tick: u64,
    pub nodes: Vec<NodeRecord>,
    pub regions: Vec<RegionRecord>,
}

impl Network {
    /// Capture the full state. Only legal between ticks.
    pub fn snapshot(&self) -> NetworkResult<NetworkSnapshot> {
        self.expect_phase(&[TickPhase::Idle])?;

        let nodes = self
            .units
            .iter()
            .zip(&self.levels)
            .zip(&self.meta)
            .map(|((kind, &level), meta)| NodeRecord {
                identifier: meta.identifier.clone(),
                parent: meta.parent,
                level,
                kind: kind.clone(),
            })
            .collect();

        let regions = self
            .topology
            .regions()
            .iter()
            .map(|region| RegionRecord {
                kind: region.kind(),
                areas: region
                    .areas()
                    .iter()
                    .map(|area| AreaRecord {
                        single: matches!(area, Area::Single(_)),
                        layers: area.layers().iter().map(|l| l.nodes().to_vec()).collect(),
                    })
                    .collect(),
            })
            .collect();

        Ok(NetworkSnapshot {
            config: self.cfg,
            rng_state: self.rng_state(),
            tick: self.tick,
            nodes,
            regions,
        })
    }

    /// Rebuild a network from a snapshot, validating it the way the builder
    /// validates a fresh assembly.
    pub fn from_snapshot(snapshot: NetworkSnapshot) -> NetworkResult<Self> {
        let NetworkSnapshot {
            config,
            rng_state,
            tick,
            nodes,
            regions,
        } = snapshot;
        config.validate()?;
        let n = nodes.len();

        let topology = rebuild_topology(&regions, n)?;
        let placed = placements(&topology, n)?;

        let mut registry = IdentifierRegistry::new();
        let mut units = Vec::with_capacity(n);
        let mut levels = Vec::with_capacity(n);
        let mut meta = Vec::with_capacity(n);

        for (id, record) in nodes.into_iter().enumerate() {
            if !record.level.is_finite() || !(0.0..=1.0).contains(&record.level) {
                return Err(NetworkError::InvalidSnapshot("activation level outside [0, 1]"));
            }
            if placed[id] != record.parent {
                return Err(NetworkError::InvalidSnapshot(
                    "node parent disagrees with its container",
                ));
            }
            let home_ok = match (home_region(&record.kind), record.parent) {
                (None, None) => true,
                (Some(home), Some(p)) => home == p.region,
                _ => false,
            };
            if !home_ok {
                return Err(NetworkError::InvalidSnapshot("node placed outside its home region"));
            }

            if let Some(name) = record.identifier.as_deref() {
                registry.register(Some(name), id)?;
            }
            units.push(record.kind);
            levels.push(record.level);
            meta.push(NodeMeta {
                identifier: record.identifier,
                parent: record.parent,
            });
        }

        check_links(&units)?;

        let net = Network::from_parts(
            config,
            topology,
            registry,
            units,
            levels,
            meta,
            Prng::from_state(rng_state),
            tick,
        )?;
        info!(nodes = net.node_count(), tick, "network restored");
        Ok(net)
    }

    pub fn save_image_to<W: Write>(&self, w: &mut W) -> NetworkResult<()> {
        self.snapshot()?.write_image(w)?;
        Ok(())
    }

    pub fn load_image_from<R: Read>(r: &mut R) -> NetworkResult<Self> {
        Self::from_snapshot(NetworkSnapshot::read_image(r)?)
    }

    pub fn save_image_bytes(&self) -> NetworkResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.save_image_to(&mut buf)?;
        Ok(buf)
    }

    pub fn load_image_bytes(bytes: &[u8]) -> NetworkResult<Self> {
        Self::load_image_from(&mut io::Cursor::new(bytes))
    }

    /// Exact serialized size in bytes of the current image.
    pub fn image_size_bytes(&self) -> NetworkResult<usize> {
        let mut cw = storage::CountingWriter::new();
        self.save_image_to(&mut cw)?;
        Ok(cw.written())
    }
}

fn rebuild_topology(regions: &[RegionRecord], n: usize) -> NetworkResult<Topology> {
    let mut topology = Topology::default();
    let mut seen = [false; RegionKind::ALL.len()];

    for region in regions {
        let slot = &mut seen[region.kind.index()];
        if *slot {
            return Err(NetworkError::InvalidSnapshot("region listed twice"));
        }
        *slot = true;

        for record in &region.areas {
            let area = match (record.single, record.layers.len()) {
                (true, 1) => Area::single(),
                (false, depth) if depth > 0 => Area::multi(depth),
                _ => return Err(NetworkError::InvalidSnapshot("malformed area")),
            };
            let index = topology.add_area(region.kind, area);
            for (layer, members) in record.layers.iter().enumerate() {
                for &node in members {
                    if node >= n {
                        return Err(NetworkError::InvalidSnapshot("layer member out of range"));
                    }
                    let parent = ParentRef {
                        region: region.kind,
                        area: index,
                        layer,
                    };
                    topology
                        .place(parent, node)
                        .ok_or(NetworkError::InvalidSnapshot("malformed area"))?;
                }
            }
        }
    }
    Ok(topology)
}

/// Container address of every node according to the topology.
fn placements(topology: &Topology, n: usize) -> NetworkResult<Vec<Option<ParentRef>>> {
    let mut placed = vec![None; n];
    for region in topology.regions() {
        for (a, area) in region.areas().iter().enumerate() {
            for (l, layer) in area.layers().iter().enumerate() {
                for &node in layer.nodes() {
                    if placed[node].is_some() {
                        return Err(NetworkError::InvalidSnapshot(
                            "node listed in two containers",
                        ));
                    }
                    placed[node] = Some(ParentRef {
                        region: region.kind(),
                        area: a,
                        layer: l,
                    });
                }
            }
        }
    }
    Ok(placed)
}

/// Hold restored links to the same rules the builder enforces.
fn check_links(units: &[NodeKind]) -> NetworkResult<()> {
    let n = units.len();
    for (id, unit) in units.iter().enumerate() {
        if let NodeKind::Effector(e) = unit {
            if e.source >= n {
                return Err(NetworkError::InvalidSnapshot("effector source out of range"));
            }
            check_effector_source(units, e.source, id)?;
        }
        let Some(target) = unit.as_synapse_target() else {
            continue;
        };
        for syn in target.synapses() {
            if syn.source >= n {
                return Err(NetworkError::InvalidSnapshot("synapse source out of range"));
            }
            if !(0.0..=1.0).contains(&syn.weight()) {
                return Err(NetworkError::InvalidSnapshot("synapse weight outside [0, 1]"));
            }
            check_connection(units, syn.source, id)?;
        }
    }
    Ok(())
}

impl NetworkSnapshot {
    /// Serialize as a versioned, chunked image.
    pub fn write_image<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(storage::MAGIC)?;
        storage::write_u32_le(w, storage::VERSION_CURRENT)?;

        let mut payload = Vec::new();
        write_cfg_payload(&mut payload, &self.config)?;
        storage::write_chunk_lz4(w, *b"CFG0", &payload)?;

        payload.clear();
        storage::write_u64_le(&mut payload, self.rng_state)?;
        storage::write_chunk_lz4(w, *b"PRNG", &payload)?;

        payload.clear();
        storage::write_u64_le(&mut payload, self.tick)?;
        storage::write_chunk_lz4(w, *b"STAT", &payload)?;

        payload.clear();
        storage::write_len(&mut payload, self.nodes.len())?;
        for node in &self.nodes {
            write_node(&mut payload, node)?;
        }
        storage::write_chunk_lz4(w, *b"NODE", &payload)?;

        payload.clear();
        write_regions(&mut payload, &self.regions)?;
        storage::write_chunk_lz4(w, *b"REGN", &payload)
    }

    /// Parse a chunked image. Unknown chunks are skipped.
    pub fn read_image<R: Read>(r: &mut R) -> io::Result<Self> {
        let magic = storage::read_exact::<8, _>(r)?;
        if &magic != storage::MAGIC {
            return Err(invalid("bad network image magic"));
        }
        let version = storage::read_u32_le(r)?;
        if version != storage::VERSION_CURRENT {
            return Err(invalid("unsupported network image version"));
        }

        let mut config: Option<NetworkConfig> = None;
        let mut rng_state: Option<u64> = None;
        let mut tick: Option<u64> = None;
        let mut nodes: Option<Vec<NodeRecord>> = None;
        let mut regions: Option<Vec<RegionRecord>> = None;

        loop {
            let (tag, len) = match storage::read_chunk_header(r) {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            };
            let payload = storage::read_chunk_payload(r, len)?;
            let mut cursor = io::Cursor::new(payload);

            match &tag {
                b"CFG0" => config = Some(read_cfg_payload(&mut cursor)?),
                b"PRNG" => rng_state = Some(storage::read_u64_le(&mut cursor)?),
                b"STAT" => tick = Some(storage::read_u64_le(&mut cursor)?),
                b"NODE" => {
                    let count = storage::read_len(&mut cursor)?;
                    let mut list = Vec::new();
                    for _ in 0..count {
                        list.push(read_node(&mut cursor)?);
                    }
                    nodes = Some(list);
                }
                b"REGN" => regions = Some(read_regions(&mut cursor)?),
                _ => {
                    // Unknown chunk: skipped.
                }
            }
        }

        Ok(Self {
            config: config.ok_or_else(|| invalid("missing CFG0"))?,
            rng_state: rng_state.ok_or_else(|| invalid("missing PRNG"))?,
            tick: tick.unwrap_or(0),
            nodes: nodes.ok_or_else(|| invalid("missing NODE"))?,
            regions: regions.ok_or_else(|| invalid("missing REGN"))?,
        })
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> NetworkResult<String> {
        Ok(serde_json::to_string_pretty(self).map_err(io::Error::from)?)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> NetworkResult<Self> {
        Ok(serde_json::from_str(json).map_err(io::Error::from)?)
    }
}

fn write_cfg_payload<W: Write>(w: &mut W, cfg: &NetworkConfig) -> io::Result<()> {
    storage::write_u64_le(w, cfg.seed)?;
    match cfg.schedule {
        Schedule::SequentialRandomized => {
            storage::write_u8(w, 0)?;
            storage::write_len(w, 0)?;
        }
        Schedule::ParallelBatch { workers } => {
            storage::write_u8(w, 1)?;
            storage::write_len(w, workers)?;
        }
    }
    storage::write_f32_le(w, cfg.squash_gain)?;
    storage::write_f32_le(w, cfg.squash_offset)?;
    storage::write_f32_le(w, cfg.learning_rate)?;
    storage::write_f32_le(w, cfg.learning_deadband)?;
    storage::write_f32_le(w, cfg.dopaminergic_gain)?;
    storage::write_f32_le(w, cfg.hippocampal_gain)?;
    storage::write_u8(w, cfg.dopamine_gates_sensory as u8)
}

fn read_cfg_payload<R: Read>(r: &mut R) -> io::Result<NetworkConfig> {
    let seed = storage::read_u64_le(r)?;
    let tag = storage::read_u8(r)?;
    let workers = storage::read_len(r)?;
    let schedule = match tag {
        0 => Schedule::SequentialRandomized,
        1 => Schedule::ParallelBatch { workers },
        _ => return Err(invalid("unknown schedule tag")),
    };
    Ok(NetworkConfig {
        seed,
        schedule,
        squash_gain: storage::read_f32_le(r)?,
        squash_offset: storage::read_f32_le(r)?,
        learning_rate: storage::read_f32_le(r)?,
        learning_deadband: storage::read_f32_le(r)?,
        dopaminergic_gain: storage::read_f32_le(r)?,
        hippocampal_gain: storage::read_f32_le(r)?,
        dopamine_gates_sensory: storage::read_bool(r)?,
    })
}

fn region_tag(kind: RegionKind) -> u8 {
    kind.index() as u8
}

fn read_region_tag<R: Read>(r: &mut R) -> io::Result<RegionKind> {
    RegionKind::from_index(storage::read_u8(r)? as usize).ok_or_else(|| invalid("unknown region"))
}

fn role_tag(role: NeuronRole) -> u8 {
    match role {
        NeuronRole::SensoryInput => 0,
        NeuronRole::RespondentSensoryInput => 1,
        NeuronRole::SensoryInterneuron => 2,
        NeuronRole::MotorInterneuron => 3,
        NeuronRole::MotorOutput => 4,
    }
}

fn read_role<R: Read>(r: &mut R) -> io::Result<NeuronRole> {
    Ok(match storage::read_u8(r)? {
        0 => NeuronRole::SensoryInput,
        1 => NeuronRole::RespondentSensoryInput,
        2 => NeuronRole::SensoryInterneuron,
        3 => NeuronRole::MotorInterneuron,
        4 => NeuronRole::MotorOutput,
        _ => return Err(invalid("unknown neuron role")),
    })
}

fn write_slot<W: Write>(w: &mut W, slot: &ActivationSlot) -> io::Result<()> {
    storage::write_f32_le(w, slot.staged)?;
    let phase = match slot.phase {
        UnitPhase::Idle => 0,
        UnitPhase::Prepared => 1,
        UnitPhase::Committed => 2,
    };
    storage::write_u8(w, phase)
}

fn read_slot<R: Read>(r: &mut R) -> io::Result<ActivationSlot> {
    let staged = storage::read_f32_le(r)?;
    let phase = match storage::read_u8(r)? {
        0 => UnitPhase::Idle,
        1 => UnitPhase::Prepared,
        2 => UnitPhase::Committed,
        _ => return Err(invalid("unknown unit phase")),
    };
    Ok(ActivationSlot { staged, phase })
}

fn write_synapses<W: Write>(w: &mut W, synapses: &[Synapse]) -> io::Result<()> {
    storage::write_len(w, synapses.len())?;
    for syn in synapses {
        storage::write_len(w, syn.source)?;
        storage::write_u8(w, matches!(syn.polarity, Polarity::Inhibitory) as u8)?;
        storage::write_f32_le(w, syn.weight())?;
    }
    Ok(())
}

fn read_synapses<R: Read>(r: &mut R) -> io::Result<Vec<Synapse>> {
    let count = storage::read_len(r)?;
    let mut synapses = Vec::new();
    for _ in 0..count {
        let source = storage::read_len(r)?;
        let polarity = if storage::read_bool(r)? {
            Polarity::Inhibitory
        } else {
            Polarity::Excitatory
        };
        let weight = storage::read_f32_le(r)?;
        if !(0.0..=1.0).contains(&weight) {
            return Err(invalid("synapse weight outside [0, 1]"));
        }
        synapses.push(Synapse::new(source, polarity, weight));
    }
    Ok(synapses)
}

fn write_node<W: Write>(w: &mut W, node: &NodeRecord) -> io::Result<()> {
    match &node.identifier {
        None => storage::write_u8(w, 0)?,
        Some(name) => {
            storage::write_u8(w, 1)?;
            storage::write_string(w, name)?;
        }
    }
    match node.parent {
        None => storage::write_u8(w, 0)?,
        Some(p) => {
            storage::write_u8(w, 1)?;
            storage::write_u8(w, region_tag(p.region))?;
            storage::write_len(w, p.area)?;
            storage::write_len(w, p.layer)?;
        }
    }
    storage::write_f32_le(w, node.level)?;

    match &node.kind {
        NodeKind::Sensor(s) => {
            storage::write_u8(w, 0)?;
            write_slot(w, &s.slot)?;
            storage::write_f32_le(w, s.min)?;
            storage::write_f32_le(w, s.max)?;
            storage::write_f32_le(w, s.external)
        }
        NodeKind::Effector(e) => {
            storage::write_u8(w, 1)?;
            write_slot(w, &e.slot)?;
            storage::write_len(w, e.source)?;
            storage::write_f32_le(w, e.threshold)
        }
        NodeKind::Neuron(n) => {
            storage::write_u8(w, 2)?;
            write_slot(w, &n.slot)?;
            storage::write_u8(w, role_tag(n.role))?;
            storage::write_u8(w, n.test_stimulus as u8)?;
            write_synapses(w, &n.synapses)
        }
        NodeKind::Discrepancy(d) => {
            storage::write_u8(w, 3)?;
            write_slot(w, &d.slot)?;
            let kind = match d.kind {
                DiscrepancyKind::Dopaminergic => 0,
                DiscrepancyKind::Hippocampal => 1,
            };
            storage::write_u8(w, kind)?;
            storage::write_f32_le(w, d.excitation)?;
            storage::write_f32_le(w, d.inhibition)?;
            storage::write_f32_le(w, d.previous_level)?;
            storage::write_f32_le(w, d.signal)?;
            write_synapses(w, &d.synapses)
        }
    }
}

fn read_node<R: Read>(r: &mut R) -> io::Result<NodeRecord> {
    let identifier = if storage::read_bool(r)? {
        Some(storage::read_string(r)?)
    } else {
        None
    };
    let parent = if storage::read_bool(r)? {
        Some(ParentRef {
            region: read_region_tag(r)?,
            area: storage::read_len(r)?,
            layer: storage::read_len(r)?,
        })
    } else {
        None
    };
    let level = storage::read_f32_le(r)?;

    let tag = storage::read_u8(r)?;
    let slot = read_slot(r)?;
    let kind = match tag {
        0 => NodeKind::Sensor(Sensor {
            min: storage::read_f32_le(r)?,
            max: storage::read_f32_le(r)?,
            external: storage::read_f32_le(r)?,
            slot,
        }),
        1 => NodeKind::Effector(Effector {
            source: storage::read_len(r)?,
            threshold: storage::read_f32_le(r)?,
            slot,
        }),
        2 => NodeKind::Neuron(Neuron {
            role: read_role(r)?,
            test_stimulus: storage::read_bool(r)?,
            synapses: read_synapses(r)?,
            slot,
        }),
        3 => NodeKind::Discrepancy(DiscrepancyNeuron {
            kind: match storage::read_u8(r)? {
                0 => DiscrepancyKind::Dopaminergic,
                1 => DiscrepancyKind::Hippocampal,
                _ => return Err(invalid("unknown discrepancy kind")),
            },
            excitation: storage::read_f32_le(r)?,
            inhibition: storage::read_f32_le(r)?,
            previous_level: storage::read_f32_le(r)?,
            signal: storage::read_f32_le(r)?,
            synapses: read_synapses(r)?,
            slot,
        }),
        _ => return Err(invalid("unknown node kind")),
    };

    Ok(NodeRecord {
        identifier,
        parent,
        level,
        kind,
    })
}

fn write_regions<W: Write>(w: &mut W, regions: &[RegionRecord]) -> io::Result<()> {
    storage::write_len(w, regions.len())?;
    for region in regions {
        storage::write_u8(w, region_tag(region.kind))?;
        storage::write_len(w, region.areas.len())?;
        for area in &region.areas {
            storage::write_u8(w, area.single as u8)?;
            storage::write_len(w, area.layers.len())?;
            for layer in &area.layers {
                storage::write_len(w, layer.len())?;
                for &node in layer {
                    storage::write_len(w, node)?;
                }
            }
        }
    }
    Ok(())
}

fn read_regions<R: Read>(r: &mut R) -> io::Result<Vec<RegionRecord>> {
    let count = storage::read_len(r)?;
    let mut regions = Vec::new();
    for _ in 0..count {
        let kind = read_region_tag(r)?;
        let area_count = storage::read_len(r)?;
        let mut areas = Vec::new();
        for _ in 0..area_count {
            let single = storage::read_bool(r)?;
            let layer_count = storage::read_len(r)?;
            let mut layers = Vec::new();
            for _ in 0..layer_count {
                let members = storage::read_len(r)?;
                let mut layer = Vec::new();
                for _ in 0..members {
                    layer.push(storage::read_len(r)?);
                }
                layers.push(layer);
            }
            areas.push(AreaRecord { single, layers });
        }
        regions.push(RegionRecord { kind, areas });
    }
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::LearningEngine;
    use crate::presets::{conditioning, ConditioningNet};
    use crate::updater::{NetworkUpdater, UnionUpdater};

    fn tick(net: &mut Network, inputs: &[f32]) {
        net.update_external_inputs(inputs).unwrap();
        net.prepare_all().unwrap();
        net.commit_all().unwrap();
        UnionUpdater.operant_neurons_activate(net).unwrap();
        net.update_discrepancy_areas().unwrap();
        LearningEngine::from_config(net.config())
            .apply_weight_updates(net)
            .unwrap();
        net.act_effectors().unwrap();
    }

    fn trained() -> Network {
        let ConditioningNet { mut network, .. } =
            conditioning(NetworkConfig::default().with_seed(21), 3).unwrap();
        tick(&mut network, &[1.0, 0.0]);
        tick(&mut network, &[1.0, 1.0]);
        network
    }

    #[test]
    fn image_round_trip_is_byte_identical() {
        let net = trained();
        let bytes = net.save_image_bytes().unwrap();
        assert_eq!(&bytes[..8], storage::MAGIC);
        assert_eq!(net.image_size_bytes().unwrap(), bytes.len());

        let restored = Network::load_image_bytes(&bytes).unwrap();
        assert_eq!(restored.save_image_bytes().unwrap(), bytes);
        assert_eq!(restored.snapshot().unwrap(), net.snapshot().unwrap());
        assert_eq!(restored.find_node(Some("response")), net.find_node(Some("response")));
    }

    #[test]
    fn restored_network_continues_identically() {
        let mut original = trained();
        let mut restored = Network::load_image_bytes(&original.save_image_bytes().unwrap()).unwrap();

        for inputs in [[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]] {
            tick(&mut original, &inputs);
            tick(&mut restored, &inputs);
        }
        assert_eq!(original.levels(), restored.levels());
        assert_eq!(original.snapshot().unwrap(), restored.snapshot().unwrap());
    }

    #[test]
    fn snapshot_is_only_taken_between_ticks() {
        let mut net = trained();
        net.update_external_inputs(&[0.0, 0.0]).unwrap();
        assert!(matches!(
            net.snapshot(),
            Err(NetworkError::PhaseViolation { .. })
        ));
    }

    #[test]
    fn unknown_chunks_are_skipped_and_bad_magic_rejected() {
        let net = trained();
        let mut bytes = net.save_image_bytes().unwrap();
        storage::write_chunk_lz4(&mut bytes, *b"XTRA", b"future data").unwrap();
        let restored = Network::load_image_bytes(&bytes).unwrap();
        assert_eq!(restored.snapshot().unwrap(), net.snapshot().unwrap());

        bytes[0] = b'X';
        assert!(matches!(
            Network::load_image_bytes(&bytes),
            Err(NetworkError::Image(_))
        ));
    }

    #[test]
    fn inconsistent_snapshots_are_rejected() {
        let net = trained();
        let good = net.snapshot().unwrap();

        let mut bad = good.clone();
        if let Some(NodeRecord {
            kind: NodeKind::Neuron(n),
            ..
        }) = bad
            .nodes
            .iter_mut()
            .find(|r| matches!(r.kind, NodeKind::Neuron(_)))
        {
            n.synapses.push(Synapse::excitatory(10_000, 0.5));
        }
        assert!(matches!(
            Network::from_snapshot(bad),
            Err(NetworkError::InvalidSnapshot(_))
        ));

        let mut bad = good.clone();
        bad.nodes[1].identifier = bad.nodes[0].identifier.clone();
        assert!(matches!(
            Network::from_snapshot(bad),
            Err(NetworkError::DuplicateIdentifier(_))
        ));

        let mut bad = good.clone();
        bad.regions[0].areas[0].layers[0].pop();
        assert!(matches!(
            Network::from_snapshot(bad),
            Err(NetworkError::InvalidSnapshot(_))
        ));

        let mut bad = good;
        bad.nodes[0].level = 1.5;
        assert!(Network::from_snapshot(bad).is_err());
    }

    #[test]
    fn restore_applies_assembly_wiring_rules() {
        let net = trained();
        let id = |name: &str| net.find_node(Some(name)).unwrap();
        let (cs, response, vta, press) = (id("cs"), id("response"), id("vta"), id("press"));
        let good = net.snapshot().unwrap();

        let push = |snap: &mut NetworkSnapshot, target: NodeId, synapse: Synapse| {
            match &mut snap.nodes[target].kind {
                NodeKind::Neuron(n) => n.synapses.push(synapse),
                NodeKind::Discrepancy(d) => d.synapses.push(synapse),
                other => panic!("unexpected node {other:?}"),
            }
        };

        // Discrepancy units never drive activation.
        let mut bad = good.clone();
        push(&mut bad, response, Synapse::excitatory(vta, 0.5));
        assert!(matches!(
            Network::from_snapshot(bad),
            Err(NetworkError::InvalidSynapseSource { .. })
        ));

        // Sensors are not eligible dopaminergic inputs.
        let mut bad = good.clone();
        push(&mut bad, vta, Synapse::excitatory(cs, 0.5));
        assert!(matches!(
            Network::from_snapshot(bad),
            Err(NetworkError::InvalidSynapseSource { .. })
        ));

        // Effectors latch neurons, not sensors.
        let mut bad = good;
        if let NodeKind::Effector(e) = &mut bad.nodes[press].kind {
            e.source = cs;
        }
        assert!(matches!(
            Network::from_snapshot(bad),
            Err(NetworkError::InvalidSynapseSource { .. })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_weights_outside_unit_interval_are_rejected() {
        let net = trained();
        let response = net.find_node(Some("response")).unwrap();
        let json = net.snapshot().unwrap().to_json().unwrap();

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["nodes"][response]["kind"]["Neuron"]["synapses"][0]["weight"] =
            serde_json::json!(5.0);
        let edited = NetworkSnapshot::from_json(&value.to_string()).unwrap();

        assert!(matches!(
            Network::from_snapshot(edited),
            Err(NetworkError::InvalidSnapshot(_))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_snapshot_round_trip() {
        let net = trained();
        let snap = net.snapshot().unwrap();
        let json = snap.to_json().unwrap();
        let back = NetworkSnapshot::from_json(&json).unwrap();
        assert_eq!(back, snap);
        let restored = Network::from_snapshot(back).unwrap();
        assert_eq!(restored.save_image_bytes().unwrap(), net.save_image_bytes().unwrap());
    }
}
