//! Policy trait for pixel-based agents.

use tch::Tensor;

/// A policy mapping a batch of stacked observations to an action
/// distribution and a scalar state estimate.
///
/// The scalar output exists for interface symmetry with baseline-based
/// policy-gradient trainers; group-relative training never consumes it,
/// so the same policy type serves both algorithm families.
pub trait Policy {
    /// Forward pass over a `[B, stack, size, size]` observation batch.
    ///
    /// # Returns
    ///
    /// `(logits, values)` where `logits` is `[B, num_actions]` (a
    /// categorical distribution over the discrete action set) and
    /// `values` is `[B]`. Both must be differentiable with respect to
    /// the policy parameters.
    fn forward(&self, observations: &Tensor) -> (Tensor, Tensor);
}
