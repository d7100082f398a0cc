//! Region → Area → Layer containers.
//!
//! Containers hold [`NodeId`] handles only; the network arena owns the nodes.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle into the network's node arena.
pub type NodeId = usize;

/// The six fixed regions of the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RegionKind {
    SensoryInput,
    SensoryAssociation,
    Hippocampal,
    MotorAssociation,
    MotorOutput,
    Dopaminergic,
}

impl RegionKind {
    pub const ALL: [RegionKind; 6] = [
        RegionKind::SensoryInput,
        RegionKind::SensoryAssociation,
        RegionKind::Hippocampal,
        RegionKind::MotorAssociation,
        RegionKind::MotorOutput,
        RegionKind::Dopaminergic,
    ];

    /// Regions recomputed by the updater, in activation order.
    pub const OPERANT_ORDER: [RegionKind; 3] = [
        RegionKind::SensoryAssociation,
        RegionKind::MotorAssociation,
        RegionKind::MotorOutput,
    ];

    pub fn is_operant(self) -> bool {
        Self::OPERANT_ORDER.contains(&self)
    }

    pub fn is_discrepancy(self) -> bool {
        matches!(self, RegionKind::Hippocampal | RegionKind::Dopaminergic)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            RegionKind::SensoryInput => 0,
            RegionKind::SensoryAssociation => 1,
            RegionKind::Hippocampal => 2,
            RegionKind::MotorAssociation => 3,
            RegionKind::MotorOutput => 4,
            RegionKind::Dopaminergic => 5,
        }
    }

    pub(crate) fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Where a node sits in the container hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParentRef {
    pub region: RegionKind,
    pub area: usize,
    pub layer: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layer {
    nodes: Vec<NodeId>,
}

impl Layer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn push(&mut self, node: NodeId) {
        self.nodes.push(node);
    }
}

/// An area is either a single layer (usable as a [`Layer`]) or an ordered
/// stack of layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Area {
    Single(Layer),
    Multi(Vec<Layer>),
}

impl Area {
    pub fn single() -> Self {
        Area::Single(Layer::new())
    }

    pub fn multi(depth: usize) -> Self {
        Area::Multi(vec![Layer::new(); depth.max(1)])
    }

    /// The area viewed as one layer, if it is single-layer.
    pub fn as_layer(&self) -> Option<&Layer> {
        match self {
            Area::Single(layer) => Some(layer),
            Area::Multi(_) => None,
        }
    }

    pub fn layers(&self) -> &[Layer] {
        match self {
            Area::Single(layer) => std::slice::from_ref(layer),
            Area::Multi(layers) => layers,
        }
    }

    pub(crate) fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        match self {
            Area::Single(layer) if index == 0 => Some(layer),
            Area::Single(_) => None,
            Area::Multi(layers) => layers.get_mut(index),
        }
    }

    pub fn max_layer_depth(&self) -> usize {
        self.layers().len()
    }

    pub fn max_node_width(&self) -> usize {
        self.layers().iter().map(Layer::len).max().unwrap_or(0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.layers().iter().flat_map(|l| l.nodes().iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    kind: RegionKind,
    areas: Vec<Area>,
}

impl Region {
    pub fn new(kind: RegionKind) -> Self {
        Self {
            kind,
            areas: Vec::new(),
        }
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub(crate) fn areas_mut(&mut self) -> &mut Vec<Area> {
        &mut self.areas
    }

    pub fn max_layer_depth(&self) -> usize {
        self.areas.iter().map(Area::max_layer_depth).max().unwrap_or(0)
    }

    pub fn max_node_width(&self) -> usize {
        self.areas.iter().map(Area::max_node_width).max().unwrap_or(0)
    }

    /// All member nodes, area by area, layer by layer.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.areas.iter().flat_map(Area::nodes).collect()
    }

    pub fn node_count(&self) -> usize {
        self.areas
            .iter()
            .flat_map(|a| a.layers())
            .map(Layer::len)
            .sum()
    }
}

/// The full container hierarchy: one region per [`RegionKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    regions: Vec<Region>,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            regions: RegionKind::ALL.iter().map(|&k| Region::new(k)).collect(),
        }
    }
}

impl Topology {
    pub fn region(&self, kind: RegionKind) -> &Region {
        &self.regions[kind.index()]
    }

    pub(crate) fn region_mut(&mut self, kind: RegionKind) -> &mut Region {
        &mut self.regions[kind.index()]
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Add an area to `kind` and return its index within the region.
    pub(crate) fn add_area(&mut self, kind: RegionKind, area: Area) -> usize {
        let areas = self.region_mut(kind).areas_mut();
        areas.push(area);
        areas.len() - 1
    }

    /// Append `node` to the addressed layer; `None` if the address is invalid.
    pub(crate) fn place(&mut self, parent: ParentRef, node: NodeId) -> Option<()> {
        let area = self
            .region_mut(parent.region)
            .areas_mut()
            .get_mut(parent.area)?;
        area.layer_mut(parent.layer)?.push(node);
        Some(())
    }

    /// Operant population in the fixed region order.
    pub fn operant_nodes(&self) -> Vec<NodeId> {
        RegionKind::OPERANT_ORDER
            .iter()
            .flat_map(|&k| self.region(k).nodes())
            .collect()
    }

    pub fn max_layer_depth(&self) -> usize {
        self.regions
            .iter()
            .map(Region::max_layer_depth)
            .max()
            .unwrap_or(0)
    }

    pub fn max_node_width(&self) -> usize {
        self.regions
            .iter()
            .map(Region::max_node_width)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_area_acts_as_a_layer() {
        let mut topo = Topology::default();
        let a = topo.add_area(RegionKind::SensoryAssociation, Area::single());
        let parent = ParentRef {
            region: RegionKind::SensoryAssociation,
            area: a,
            layer: 0,
        };
        topo.place(parent, 4).unwrap();
        topo.place(parent, 5).unwrap();

        let area = &topo.region(RegionKind::SensoryAssociation).areas()[a];
        assert_eq!(area.as_layer().map(Layer::len), Some(2));
        assert!(topo
            .place(
                ParentRef {
                    layer: 1,
                    ..parent
                },
                6
            )
            .is_none());
    }

    #[test]
    fn depth_and_width_aggregate_over_areas() {
        let mut topo = Topology::default();
        let kind = RegionKind::MotorAssociation;
        let deep = topo.add_area(kind, Area::multi(3));
        let wide = topo.add_area(kind, Area::single());
        for n in 0..4 {
            topo.place(
                ParentRef {
                    region: kind,
                    area: wide,
                    layer: 0,
                },
                n,
            )
            .unwrap();
        }
        topo.place(
            ParentRef {
                region: kind,
                area: deep,
                layer: 2,
            },
            10,
        )
        .unwrap();

        let region = topo.region(kind);
        assert_eq!(region.max_layer_depth(), 3);
        assert_eq!(region.max_node_width(), 4);
        assert_eq!(region.node_count(), 5);
        assert_eq!(topo.max_layer_depth(), 3);
        assert_eq!(region.nodes(), vec![10, 0, 1, 2, 3]);
    }

    #[test]
    fn operant_nodes_follow_fixed_region_order() {
        let mut topo = Topology::default();
        for (node, kind) in [
            (0, RegionKind::MotorOutput),
            (1, RegionKind::Hippocampal),
            (2, RegionKind::SensoryAssociation),
            (3, RegionKind::MotorAssociation),
        ] {
            let area = topo.add_area(kind, Area::single());
            topo.place(
                ParentRef {
                    region: kind,
                    area,
                    layer: 0,
                },
                node,
            )
            .unwrap();
        }
        assert_eq!(topo.operant_nodes(), vec![2, 3, 0]);
    }
}
