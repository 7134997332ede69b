//! Per-environment trajectories and the flattened group batch.

use tch::{Device, Tensor};

/// A single rollout step: the observation as fed to the sampling policy,
/// the sampled action, its log-probability at sampling time, and the
/// shaped reward the pool reported for it.
#[derive(Debug, Clone)]
pub struct TrajectoryStep {
    /// Stacked observation bytes (pre-step snapshot).
    pub observation: Vec<u8>,
    /// Sampled discrete action.
    pub action: i64,
    /// Log-probability of the action under the sampling policy.
    pub log_prob: f32,
    /// Sign-clipped reward for this step.
    pub reward: f32,
}

/// One group member's episode, from iteration start to its first
/// episode end. Trajectories across a group may have different lengths.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    /// Ordered steps of the episode.
    pub steps: Vec<TrajectoryStep>,
}

impl Trajectory {
    /// Creates an empty trajectory.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends one step.
    pub fn push(&mut self, step: TrajectoryStep) {
        self.steps.push(step);
    }

    /// Number of steps collected.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no steps were collected yet.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of shaped rewards over the trajectory.
    pub fn shaped_return(&self) -> f64 {
        self.steps.iter().map(|s| s.reward as f64).sum()
    }
}

/// The union of all group trajectories for one iteration, flattened into
/// parallel sequences. Each step inherits its trajectory's scalar
/// advantage.
#[derive(Debug)]
pub struct GroupBatch {
    observations: Vec<u8>,
    actions: Vec<i64>,
    old_log_probs: Vec<f32>,
    advantages: Vec<f32>,
}

impl GroupBatch {
    /// Flattens a group of trajectories with their per-trajectory
    /// advantages.
    pub fn from_group(trajectories: &[Trajectory], advantages: &[f64]) -> Self {
        assert_eq!(
            trajectories.len(),
            advantages.len(),
            "one advantage per trajectory"
        );

        let total_steps: usize = trajectories.iter().map(|t| t.len()).sum();
        let obs_len = trajectories
            .iter()
            .flat_map(|t| t.steps.first())
            .map(|s| s.observation.len())
            .next()
            .unwrap_or(0);

        let mut batch = Self {
            observations: Vec::with_capacity(total_steps * obs_len),
            actions: Vec::with_capacity(total_steps),
            old_log_probs: Vec::with_capacity(total_steps),
            advantages: Vec::with_capacity(total_steps),
        };
        for (trajectory, &advantage) in trajectories.iter().zip(advantages) {
            for step in &trajectory.steps {
                batch.observations.extend_from_slice(&step.observation);
                batch.actions.push(step.action);
                batch.old_log_probs.push(step.log_prob);
                batch.advantages.push(advantage as f32);
            }
        }
        batch
    }

    /// Total number of steps in the batch.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if the batch holds no steps.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Per-step advantages (broadcast from the trajectory scalars).
    pub fn advantages(&self) -> &[f32] {
        &self.advantages
    }

    /// Materializes `(observations, actions, old_log_probs, advantages)`
    /// tensors on the given device. Observations are normalized to the
    /// unit range and shaped `[T, stack, size, size]`.
    pub fn to_tensors(
        &self,
        obs_shape: [i64; 3],
        device: Device,
    ) -> (Tensor, Tensor, Tensor, Tensor) {
        let obs: Vec<f32> = self.observations.iter().map(|&b| b as f32 / 255.0).collect();
        let [c, h, w] = obs_shape;
        let observations = Tensor::from_slice(&obs)
            .reshape([self.len() as i64, c, h, w])
            .to_device(device);
        let actions = Tensor::from_slice(&self.actions).to_device(device);
        let old_log_probs = Tensor::from_slice(&self.old_log_probs).to_device(device);
        let advantages = Tensor::from_slice(&self.advantages).to_device(device);
        (observations, actions, old_log_probs, advantages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(action: i64, reward: f32, obs_len: usize) -> TrajectoryStep {
        TrajectoryStep {
            observation: vec![128; obs_len],
            action,
            log_prob: -0.5,
            reward,
        }
    }

    #[test]
    fn shaped_return_sums_rewards() {
        let mut t = Trajectory::new();
        t.push(step(0, 1.0, 8));
        t.push(step(1, 0.0, 8));
        t.push(step(2, -1.0, 8));
        assert_eq!(t.shaped_return(), 0.0);
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn from_group_broadcasts_advantages() {
        let mut a = Trajectory::new();
        a.push(step(0, 1.0, 4));
        a.push(step(1, 0.0, 4));
        let mut b = Trajectory::new();
        b.push(step(2, 1.0, 4));

        let batch = GroupBatch::from_group(&[a, b], &[0.75, -0.25]);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.advantages(), &[0.75, 0.75, -0.25]);
    }

    #[test]
    fn to_tensors_shapes() {
        let obs_len = 2 * 4 * 4;
        let mut t = Trajectory::new();
        t.push(step(1, 1.0, obs_len));
        t.push(step(0, 0.0, obs_len));

        let batch = GroupBatch::from_group(&[t], &[1.0]);
        let (obs, actions, old_lp, adv) = batch.to_tensors([2, 4, 4], Device::Cpu);
        assert_eq!(obs.size(), &[2, 2, 4, 4]);
        assert_eq!(actions.size(), &[2]);
        assert_eq!(old_lp.size(), &[2]);
        assert_eq!(adv.size(), &[2]);
        // Bytes are normalized to the unit range.
        let max: f64 = obs.max().double_value(&[]);
        assert!(max <= 1.0);
    }
}
