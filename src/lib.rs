//! # selnet
//!
//! A selectionist neural network for operant and respondent conditioning.
//!
//! Sensors feed scaled stimuli into a layered graph of squashing neurons;
//! effectors latch motor output; dopaminergic and hippocampal discrepancy
//! units turn changes in their own activation into the signals that drive
//! weight updates. No gradients, no backprop.
//!
//! ## Quick Start
//!
//! ```
//! use selnet::prelude::*;
//!
//! let cfg = NetworkConfig::default().with_seed(42);
//! let preset = conditioning(cfg, 4).unwrap();
//! let mut driver = Driver::new(preset.network, StagedUpdater);
//!
//! // One value per sensor: conditioned stimulus on, reward on.
//! let report = driver.tick(&RunContext::silent(), &[1.0, 1.0]).unwrap();
//! assert_eq!(report.actions.len(), 1);
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel` (default): run the batch schedule on a rayon pool
//! - `serde` (default): serde support for config and snapshots, JSON helpers
//!
//! ## Modules
//!
//! - [`network`]: node arena, level board and per-tick phase machine
//! - [`activation`]: prepare/commit pass scheduling
//! - [`neuron`]: neuron variants, synapses and capability traits
//! - [`learning`]: discrepancy-modulated weight updates
//! - [`updater`]: operant activation strategies
//! - [`snapshot`]: flat snapshots and the binary image
//! - [`observer`]: read-only observation adapters

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/error.rs"]
pub mod error;

#[path = "core/config.rs"]
pub mod config;

#[path = "core/registry.rs"]
pub mod registry;

#[path = "core/topology.rs"]
pub mod topology;

#[path = "core/neuron.rs"]
pub mod neuron;

#[path = "core/activation.rs"]
pub mod activation;

#[path = "core/network.rs"]
pub mod network;

#[path = "core/builder.rs"]
pub mod builder;

#[path = "core/learning.rs"]
pub mod learning;

#[path = "core/updater.rs"]
pub mod updater;

#[path = "core/storage.rs"]
pub mod storage;

#[path = "core/snapshot.rs"]
pub mod snapshot;

#[path = "core/driver.rs"]
pub mod driver;

#[path = "core/presets.rs"]
pub mod presets;

pub mod observer;

/// Prelude module for convenient imports.
///
/// ```
/// use selnet::prelude::*;
/// ```
pub mod prelude {
    pub use crate::activation::{ActivationScheduler, PassReport};
    pub use crate::builder::{AreaHandle, NetworkBuilder};
    pub use crate::config::{NetworkConfig, Schedule};
    pub use crate::driver::{Driver, RunContext, TickReport};
    pub use crate::error::{NetworkError, NetworkResult};
    pub use crate::learning::{LearningEngine, LearningReport};
    pub use crate::network::{Diagnostics, DiscrepancySignals, Network, TickPhase};
    pub use crate::neuron::{
        Activatable, Activation, DiscrepancyKind, DiscrepancySource, EffectorAction, NeuronRole,
        Neuron, NodeKind, Polarity, Sensor, Synapse, SynapseTarget, Weight,
    };
    pub use crate::observer::{NetworkObserver, NetworkSnapshotView};
    pub use crate::presets::{conditioning, ConditioningNet};
    pub use crate::snapshot::NetworkSnapshot;
    pub use crate::topology::{Area, NodeId, ParentRef, RegionKind};
    pub use crate::updater::{NetworkUpdater, StagedUpdater, UnionUpdater};
}
