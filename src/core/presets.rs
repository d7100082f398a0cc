//! Ready-made network layouts.

use crate::builder::NetworkBuilder;
use crate::config::NetworkConfig;
use crate::error::NetworkResult;
use crate::network::Network;
use crate::neuron::{DiscrepancyKind, Neuron, NeuronRole, Polarity, Sensor};
use crate::prng::Prng;
use crate::topology::{Area, NodeId, RegionKind};

/// Handles into a [`conditioning`] network.
#[derive(Debug, Clone)]
pub struct ConditioningNet {
    pub network: Network,
    /// Sensor for the conditioned stimulus (a tone, say).
    pub cs: NodeId,
    /// Sensor for the unconditioned stimulus (the reward).
    pub us: NodeId,
    pub response: NodeId,
    pub effector: NodeId,
}

/// Classic two-stimulus conditioning layout.
///
/// ```text
/// cs ─► cs_in ─► sensory assoc (width) ─► motor assoc (width) ─► response ─► press
///                     │                                              ▲
///                     └──► hippocampal                 us ─► us_in ──┴──► dopaminergic
/// ```
///
/// Feed-forward weights are drawn in `[0.1, 0.5)` from a generator derived
/// from `cfg.seed`; the `us_in → response` reflex is fixed at 1.0.
pub fn conditioning(cfg: NetworkConfig, width: usize) -> NetworkResult<ConditioningNet> {
    let width = width.max(1);
    let mut rng = Prng::new(cfg.seed ^ 0xC0FF_EE00_D15C_0001);
    let mut b = NetworkBuilder::new(cfg);

    let cs = b.add_sensor(Some("cs"), Sensor::unit())?;
    let us = b.add_sensor(Some("us"), Sensor::unit())?;

    let inputs = b.add_area(RegionKind::SensoryInput, Area::single());
    let cs_in = b.add_neuron(
        inputs.layer(0),
        Some("cs_in"),
        Neuron::new(NeuronRole::SensoryInput).test_stimulus(),
    )?;
    let us_in = b.add_neuron(
        inputs.layer(0),
        Some("us_in"),
        Neuron::new(NeuronRole::RespondentSensoryInput),
    )?;
    b.excite(cs, cs_in, 1.0)?;
    b.excite(us, us_in, 1.0)?;

    let sa = b.add_area(RegionKind::SensoryAssociation, Area::single());
    let sensory = (0..width)
        .map(|_| b.add_neuron(sa.layer(0), None, Neuron::new(NeuronRole::SensoryInterneuron)))
        .collect::<NetworkResult<Vec<_>>>()?;

    let ma = b.add_area(RegionKind::MotorAssociation, Area::single());
    let motor = (0..width)
        .map(|_| b.add_neuron(ma.layer(0), None, Neuron::new(NeuronRole::MotorInterneuron)))
        .collect::<NetworkResult<Vec<_>>>()?;

    let mo = b.add_area(RegionKind::MotorOutput, Area::single());
    let response = b.add_neuron(
        mo.layer(0),
        Some("response"),
        Neuron::new(NeuronRole::MotorOutput),
    )?;

    let hip = b.add_area(RegionKind::Hippocampal, Area::single());
    let ca1 = b.add_discrepancy(hip.layer(0), Some("ca1"), DiscrepancyKind::Hippocampal)?;
    let da = b.add_area(RegionKind::Dopaminergic, Area::single());
    let vta = b.add_discrepancy(da.layer(0), Some("vta"), DiscrepancyKind::Dopaminergic)?;

    let range = (0.1, 0.5);
    b.connect_random(&[cs_in], &sensory, Polarity::Excitatory, range, &mut rng)?;
    b.connect_random(&sensory, &motor, Polarity::Excitatory, range, &mut rng)?;
    b.connect_random(&motor, &[response], Polarity::Excitatory, range, &mut rng)?;
    b.excite(us_in, response, 1.0)?;

    b.connect_random(&sensory, &[ca1], Polarity::Excitatory, range, &mut rng)?;
    b.excite(cs_in, ca1, 0.5)?;
    b.excite(us_in, vta, 1.0)?;

    let effector = b.add_effector(Some("press"), response, 0.6)?;

    Ok(ConditioningNet {
        network: b.build()?,
        cs,
        us,
        response,
        effector,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditioning_layout_is_complete() {
        let net = conditioning(NetworkConfig::default(), 4).unwrap();
        let n = &net.network;
        assert_eq!(n.sensors(), &[net.cs, net.us]);
        assert_eq!(n.effectors(), &[net.effector]);
        assert_eq!(n.find_node(Some("response")), Some(net.response));
        assert_eq!(n.topology().operant_nodes().len(), 4 + 4 + 1);
        // sensor links, cs_in->4, 4x4, 4->response, reflex, 4->ca1, cs_in->ca1, us_in->vta
        assert_eq!(n.synapse_count(), 2 + 4 + 16 + 4 + 1 + 4 + 1 + 1);
    }

    #[test]
    fn same_seed_same_weights() {
        let a = conditioning(NetworkConfig::default().with_seed(3), 3).unwrap();
        let b = conditioning(NetworkConfig::default().with_seed(3), 3).unwrap();
        assert_eq!(
            a.network.snapshot().unwrap(),
            b.network.snapshot().unwrap()
        );
    }
}
