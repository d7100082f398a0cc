use crate::network::{Diagnostics, Network, TickPhase};
use crate::neuron::SynapseTarget;
use crate::topology::{NodeId, RegionKind};

/// A read-only view of what the network is doing.
///
/// Design intent:
/// - Observers cannot mutate or steer the network.
/// - Views are built on demand and may allocate; the tick loop stays unchanged.
#[derive(Debug, Clone)]
pub struct NetworkSnapshotView {
    pub tick: u64,
    pub phase: TickPhase,
    pub diagnostics: Diagnostics,
    pub regions: Vec<RegionActivity>,
    /// Committed level of every identified node, sorted by identifier.
    pub named_levels: Vec<(String, f32)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionActivity {
    pub kind: RegionKind,
    pub nodes: usize,
    /// 0.0 for an empty region.
    pub mean_activation: f32,
}

pub struct NetworkObserver<'a> {
    net: &'a Network,
}

impl<'a> NetworkObserver<'a> {
    pub fn new(net: &'a Network) -> Self {
        Self { net }
    }

    pub fn view(&self) -> NetworkSnapshotView {
        NetworkSnapshotView {
            tick: self.net.tick(),
            phase: self.net.phase(),
            diagnostics: self.net.diagnostics(),
            regions: RegionKind::ALL
                .iter()
                .map(|&k| self.region_activity(k))
                .collect(),
            named_levels: self.named_levels(),
        }
    }

    pub fn region_activity(&self, kind: RegionKind) -> RegionActivity {
        let nodes = self.net.topology().region(kind).nodes();
        let sum: f32 = nodes.iter().filter_map(|&id| self.net.level(id)).sum();
        RegionActivity {
            kind,
            nodes: nodes.len(),
            mean_activation: if nodes.is_empty() {
                0.0
            } else {
                sum / nodes.len() as f32
            },
        }
    }

    pub fn named_levels(&self) -> Vec<(String, f32)> {
        let mut out: Vec<(String, f32)> = self
            .net
            .registry()
            .iter()
            .filter_map(|(name, id)| Some((name.to_string(), self.net.level(id)?)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// The `n` heaviest incoming synapses of `target`, as `(source, weight)`.
    pub fn strongest_inputs(&self, target: NodeId, n: usize) -> Vec<(NodeId, f32)> {
        let Some(t) = self.net.node(target).and_then(|k| k.as_synapse_target()) else {
            return Vec::new();
        };
        let mut inputs: Vec<(NodeId, f32)> =
            t.synapses().iter().map(|s| (s.source, s.weight())).collect();
        inputs.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        inputs.truncate(n);
        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::presets::conditioning;

    #[test]
    fn fresh_network_reports_baselines() {
        let net = conditioning(NetworkConfig::default(), 2).unwrap();
        let view = NetworkObserver::new(&net.network).view();
        let rest = NetworkConfig::default().squash(0.0);

        assert_eq!(view.tick, 0);
        assert_eq!(view.phase, TickPhase::Idle);
        assert_eq!(view.regions.len(), 6);
        let assoc = view
            .regions
            .iter()
            .find(|r| r.kind == RegionKind::SensoryAssociation)
            .unwrap();
        assert_eq!(assoc.nodes, 2);
        assert!((assoc.mean_activation - rest).abs() < 1e-6);

        let names: Vec<&str> = view.named_levels.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            ["ca1", "cs", "cs_in", "press", "response", "us", "us_in", "vta"]
        );
    }

    #[test]
    fn strongest_inputs_are_sorted_by_weight() {
        let net = conditioning(NetworkConfig::default(), 3).unwrap();
        let obs = NetworkObserver::new(&net.network);
        let top = obs.strongest_inputs(net.response, 2);
        assert_eq!(top.len(), 2);
        // The us_in reflex is the heaviest input.
        assert_eq!(top[0].1, 1.0);
        assert!(top[0].1 >= top[1].1);
        assert!(obs.strongest_inputs(net.cs, 3).is_empty());
    }
}
