//! Training infrastructure for GRPO.
//!
//! Provides trajectory containers, group-relative advantage computation,
//! and the GRPO trainer.

pub mod advantage;
pub mod grpo;
pub mod trajectory;

pub use advantage::group_advantages;
pub use grpo::{GrpoTrainer, TrainingConfig};
pub use trajectory::{GroupBatch, Trajectory, TrajectoryStep};
