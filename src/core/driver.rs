//! Runs the per-tick contract end to end.
//!
//! The caller owns the logging context: a [`RunContext`] carries the span
//! every event of a run is recorded under, plus run-level switches. Nothing
//! in here installs a subscriber.

use tracing::{debug, debug_span, info_span, Span};

use crate::activation::PassReport;
use crate::error::NetworkResult;
use crate::learning::{LearningEngine, LearningReport};
use crate::network::{DiscrepancySignals, Network};
use crate::neuron::EffectorAction;
use crate::topology::NodeId;
use crate::updater::NetworkUpdater;

#[derive(Debug, Clone)]
pub struct RunContext {
    pub span: Span,
    /// Apply weight updates after the discrepancy step.
    pub learning: bool,
}

impl RunContext {
    pub fn new(label: &str) -> Self {
        Self {
            span: info_span!("run", label),
            learning: true,
        }
    }

    /// No span, learning on.
    pub fn silent() -> Self {
        Self {
            span: Span::none(),
            learning: true,
        }
    }

    pub fn with_learning(mut self, learning: bool) -> Self {
        self.learning = learning;
        self
    }
}

/// Everything one tick produced.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Index of the tick that just completed.
    pub tick: u64,
    pub input_pass: PassReport,
    pub operant_passes: Vec<PassReport>,
    pub signals: DiscrepancySignals,
    pub learning: Option<LearningReport>,
    pub actions: Vec<(NodeId, EffectorAction)>,
}

impl TickReport {
    pub fn fired(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.actions
            .iter()
            .filter(|(_, a)| a.fired)
            .map(|(id, _)| *id)
    }
}

#[derive(Debug)]
pub struct Driver<U> {
    network: Network,
    updater: U,
    learning: LearningEngine,
}

impl<U: NetworkUpdater> Driver<U> {
    pub fn new(network: Network, updater: U) -> Self {
        let learning = LearningEngine::from_config(network.config());
        Self {
            network,
            updater,
            learning,
        }
    }

    pub fn with_learning(mut self, learning: LearningEngine) -> Self {
        self.learning = learning;
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    pub fn updater(&self) -> &U {
        &self.updater
    }

    /// Run one full tick with `inputs` (one value per sensor).
    pub fn tick(&mut self, ctx: &RunContext, inputs: &[f32]) -> NetworkResult<TickReport> {
        let _run = ctx.span.enter();
        let tick = self.network.tick();
        let _tick = debug_span!("tick", tick).entered();

        let net = &mut self.network;
        net.update_external_inputs(inputs)?;
        let input_pass = net.prepare_all()?;
        net.commit_all()?;

        let operant_passes = self.updater.operant_neurons_activate(net)?;
        let signals = net.update_discrepancy_areas()?;

        let learning = if ctx.learning {
            Some(self.learning.apply_weight_updates(net)?)
        } else {
            None
        };

        let actions = net.act_effectors()?;
        debug!(
            updater = self.updater.name(),
            fired = actions.iter().filter(|(_, a)| a.fired).count(),
            "tick complete"
        );

        Ok(TickReport {
            tick,
            input_pass,
            operant_passes,
            signals,
            learning,
            actions,
        })
    }

    /// Run one tick per input row, stopping at the first error.
    pub fn run<I, R>(&mut self, ctx: &RunContext, rows: I) -> NetworkResult<Vec<TickReport>>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[f32]>,
    {
        rows.into_iter()
            .map(|row| self.tick(ctx, row.as_ref()))
            .collect()
    }
}
