//! Strategies for activating the operant population within a tick.

use tracing::trace;

use crate::activation::PassReport;
use crate::error::NetworkResult;
use crate::network::Network;
use crate::topology::RegionKind;

/// Pluggable operant-activation step.
///
/// Implementations decide which operant neurons are recomputed together. A
/// neuron may be visited at most once per call.
pub trait NetworkUpdater {
    fn name(&self) -> &'static str;

    fn operant_neurons_activate(&mut self, net: &mut Network) -> NetworkResult<Vec<PassReport>>;
}

/// Sensory association, motor association and motor output as one population.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnionUpdater;

impl NetworkUpdater for UnionUpdater {
    fn name(&self) -> &'static str {
        "union"
    }

    fn operant_neurons_activate(&mut self, net: &mut Network) -> NetworkResult<Vec<PassReport>> {
        let population = net.topology().operant_nodes();
        let report = net.activate_operant(&population)?;
        trace!(visited = report.visited.len(), "union operant pass");
        Ok(vec![report])
    }
}

/// One pass per operant region, upstream first.
///
/// Each region sees the levels its upstream region committed in the same
/// tick, so a signal crosses the whole operant chain in one tick even under
/// the batch schedule.
#[derive(Debug, Clone, Copy, Default)]
pub struct StagedUpdater;

impl NetworkUpdater for StagedUpdater {
    fn name(&self) -> &'static str {
        "staged"
    }

    fn operant_neurons_activate(&mut self, net: &mut Network) -> NetworkResult<Vec<PassReport>> {
        let mut reports = Vec::with_capacity(RegionKind::OPERANT_ORDER.len());
        for kind in RegionKind::OPERANT_ORDER {
            let population = net.topology().region(kind).nodes();
            let report = net.activate_operant(&population)?;
            trace!(region = ?kind, visited = report.visited.len(), "staged operant pass");
            reports.push(report);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NetworkBuilder;
    use crate::config::{NetworkConfig, Schedule};
    use crate::error::NetworkError;
    use crate::network::TickPhase;
    use crate::neuron::{Neuron, NeuronRole, Sensor};
    use crate::topology::{Area, NodeId};

    /// sensor -> sensory interneuron -> motor interneuron -> motor output
    fn chain(schedule: Schedule) -> (Network, [NodeId; 3]) {
        let cfg = NetworkConfig::default().with_schedule(schedule).with_seed(11);
        let mut b = NetworkBuilder::new(cfg);
        let s = b.add_sensor(None, Sensor::unit()).unwrap();
        let sa = b.add_area(RegionKind::SensoryAssociation, Area::single());
        let ma = b.add_area(RegionKind::MotorAssociation, Area::single());
        let mo = b.add_area(RegionKind::MotorOutput, Area::single());
        let a = b
            .add_neuron(sa.layer(0), None, Neuron::new(NeuronRole::SensoryInterneuron))
            .unwrap();
        let m = b
            .add_neuron(ma.layer(0), None, Neuron::new(NeuronRole::MotorInterneuron))
            .unwrap();
        let o = b
            .add_neuron(mo.layer(0), None, Neuron::new(NeuronRole::MotorOutput))
            .unwrap();
        b.excite(s, a, 1.0).unwrap();
        b.excite(a, m, 1.0).unwrap();
        b.excite(m, o, 1.0).unwrap();
        (b.build().unwrap(), [a, m, o])
    }

    fn inputs(net: &mut Network) {
        net.update_external_inputs(&[1.0]).unwrap();
        net.prepare_all().unwrap();
        net.commit_all().unwrap();
    }

    #[test]
    fn staged_updater_reaches_the_end_of_the_chain_in_one_tick() {
        let (mut net, [a, m, o]) = chain(Schedule::ParallelBatch { workers: 2 });
        let cfg = *net.config();
        inputs(&mut net);

        let reports = StagedUpdater.operant_neurons_activate(&mut net).unwrap();
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.visited.len() == 1));

        let la = cfg.squash(1.0);
        let lm = cfg.squash(la);
        let lo = cfg.squash(lm);
        assert!((net.level(a).unwrap() - la).abs() < 1e-6);
        assert!((net.level(m).unwrap() - lm).abs() < 1e-6);
        assert!((net.level(o).unwrap() - lo).abs() < 1e-6);
        assert_eq!(net.phase(), TickPhase::OperantActivated);
    }

    #[test]
    fn union_batch_pass_reads_previous_tick_levels() {
        let (mut net, [a, m, o]) = chain(Schedule::ParallelBatch { workers: 2 });
        let cfg = *net.config();
        let rest = cfg.squash(0.0);
        inputs(&mut net);

        let reports = UnionUpdater.operant_neurons_activate(&mut net).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].visited.len(), 3);

        // Every unit read the baseline of its upstream neighbour.
        assert!((net.level(a).unwrap() - cfg.squash(1.0)).abs() < 1e-6);
        assert!((net.level(m).unwrap() - cfg.squash(rest)).abs() < 1e-6);
        assert!((net.level(o).unwrap() - cfg.squash(rest)).abs() < 1e-6);
    }

    #[test]
    fn updaters_refuse_to_run_before_inputs_commit() {
        let (mut net, _) = chain(Schedule::SequentialRandomized);
        for updater in [
            &mut UnionUpdater as &mut dyn NetworkUpdater,
            &mut StagedUpdater,
        ] {
            assert!(matches!(
                updater.operant_neurons_activate(&mut net),
                Err(NetworkError::PhaseViolation { .. })
            ));
        }
    }

    #[test]
    fn empty_operant_regions_are_harmless() {
        let mut b = NetworkBuilder::new(NetworkConfig::default());
        b.add_sensor(None, Sensor::unit()).unwrap();
        let mut net = b.build().unwrap();
        inputs(&mut net);
        let reports = StagedUpdater.operant_neurons_activate(&mut net).unwrap();
        assert!(reports.iter().all(|r| r.visited.is_empty()));
        net.update_discrepancy_areas().unwrap();
        net.act_effectors().unwrap();
    }
}
