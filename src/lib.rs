//! arcade-grpo - Group Relative Policy Optimization for arcade games
//!
//! Trains a convolutional policy to play an arcade game from pixels.
//! Instead of a learned value baseline, advantage is computed by
//! standardizing episode returns within a group of simultaneously
//! collected trajectories, one per pooled environment.
//!
//! The crate is built around two components: the [`EnvPool`], which
//! drives N preprocessed emulators in lockstep with automatic episode
//! management, and the [`GrpoTrainer`], which turns pooled transitions
//! into clipped policy-gradient updates. The emulator itself is an
//! external collaborator behind the [`Emulator`] trait.

pub mod config;
pub mod env;
pub mod error;
pub mod metrics;
pub mod network;
pub mod policy;
pub mod training;

pub use config::EnvConfig;
pub use env::{Emulator, EmulatorStep, EnvPool, PoolStep, RawFrame, ScriptedEmulator};
pub use error::EnvError;
pub use metrics::{ConsoleSink, CsvSink, MetricsSink, NullSink};
pub use network::ActorCritic;
pub use policy::Policy;
pub use training::{group_advantages, GroupBatch, GrpoTrainer, Trajectory, TrainingConfig};
