//! Group Relative Policy Optimization (GRPO) trainer.
//!
//! One training iteration collects a full episode from every pooled
//! environment (the group), standardizes the episode returns within the
//! group to obtain advantages, and takes a single clipped
//! policy-gradient step:
//!
//!   L = -mean_t[ min(ρ_t · A_i, clip(ρ_t, 1-ε, 1+ε) · A_i) ]
//!
//! where ρ_t = exp(log π_θ(a_t|o_t) − log π_old(a_t|o_t)) and A_i is the
//! group-relative advantage of the trajectory step `t` belongs to.

use tch::{nn, nn::OptimizerConfig, Device, Kind, Tensor};

use super::advantage::group_advantages;
use super::trajectory::{GroupBatch, Trajectory, TrajectoryStep};
use crate::env::{Emulator, EnvPool};
use crate::error::EnvError;
use crate::metrics::MetricsSink;
use crate::network::ActorCritic;

/// Training hyperparameters for GRPO.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainingConfig {
    /// Optimizer learning rate.
    pub learning_rate: f64,
    /// Surrogate clip parameter ε.
    pub clip_eps: f64,
    /// Constant added to the group standard deviation when normalizing.
    pub advantage_eps: f64,
    /// When true, advantages are computed from raw episode scores
    /// instead of sign-clipped return sums.
    pub score_advantage: bool,
    /// Progress line interval (updates).
    pub log_every: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 2.5e-4,
            clip_eps: 0.2,
            advantage_eps: 1e-8,
            score_advantage: false,
            log_every: 10,
        }
    }
}

/// GRPO trainer: owns the policy network, its optimizer, and the
/// iteration loop. The group of simultaneously collected trajectories
/// replaces a learned value baseline.
pub struct GrpoTrainer {
    /// Shared actor-critic network (the critic head is unused here).
    pub model: ActorCritic,
    /// Training hyperparameters.
    pub config: TrainingConfig,
    /// Policy optimizer.
    opt: nn::Optimizer,
    /// Device (CPU/CUDA).
    device: Device,
}

impl GrpoTrainer {
    /// Creates a new trainer around an actor-critic network.
    pub fn new(mut model: ActorCritic, config: TrainingConfig, device: Device) -> Self {
        let opt = nn::Adam::default()
            .build(model.var_store_mut(), config.learning_rate)
            .expect("Failed to create optimizer");
        Self {
            model,
            config,
            opt,
            device,
        }
    }

    /// Runs the full training loop for `total_updates` iterations.
    ///
    /// Reports each iteration's mean group return to `sink` (sink
    /// failures are logged and ignored) and returns the learning curve
    /// as `(update_index, mean_group_return)` pairs.
    pub fn train<E: Emulator>(
        &mut self,
        pool: &mut EnvPool<E>,
        total_updates: u32,
        sink: &mut dyn MetricsSink,
    ) -> Result<Vec<(u32, f64)>, EnvError> {
        let mut learning_curve = Vec::new();

        for update in 0..total_updates {
            let (trajectories, raw_returns) = self.collect_group(pool)?;

            let returns: Vec<f64> = if self.config.score_advantage {
                raw_returns
            } else {
                trajectories.iter().map(|t| t.shaped_return()).collect()
            };
            let advantages = group_advantages(&returns, self.config.advantage_eps);
            let batch = GroupBatch::from_group(&trajectories, &advantages);

            let loss = self.update(&batch, pool.config().observation_shape());

            let mean_return = returns.iter().sum::<f64>() / returns.len() as f64;
            if let Err(err) = sink.record(update, mean_return) {
                eprintln!("[GRPO] metrics sink write failed (ignored): {err}");
            }
            learning_curve.push((update, mean_return));

            if update % self.config.log_every == 0 {
                eprintln!(
                    "[Update {}/{}] mean_return={:.3} loss={:.4}",
                    update, total_updates, mean_return, loss
                );
            }
        }

        Ok(learning_curve)
    }

    /// Collects one full episode per pooled environment.
    ///
    /// Observations are snapshot before stepping: the pool auto-resets
    /// finished slots inside `step`, so post-step slot state already
    /// belongs to the next episode. A slot's trajectory stops growing
    /// once the pool reports it done; stepping continues until every
    /// slot has finished.
    ///
    /// Returns the trajectories and the raw (unclipped) episode score of
    /// each group member.
    fn collect_group<E: Emulator>(
        &self,
        pool: &mut EnvPool<E>,
    ) -> Result<(Vec<Trajectory>, Vec<f64>), EnvError> {
        let n = pool.len();
        let mut trajectories = vec![Trajectory::new(); n];
        let mut raw_returns = vec![0.0f64; n];
        let mut finished = vec![false; n];

        while finished.iter().any(|f| !f) {
            let obs = pool.observations(self.device);
            let (actions_t, log_probs_t) = tch::no_grad(|| self.model.sample_actions(&obs));
            let actions: Vec<i64> =
                actions_t.try_into().expect("int64 action tensor converts to Vec<i64>");
            let log_probs: Vec<f64> = log_probs_t
                .to_kind(Kind::Double)
                .try_into()
                .expect("double log-prob tensor converts to Vec<f64>");

            let mut snapshots: Vec<Vec<u8>> = (0..n)
                .map(|i| {
                    if finished[i] {
                        Vec::new()
                    } else {
                        pool.slot_observation(i).to_vec()
                    }
                })
                .collect();

            let action_indices: Vec<usize> = actions.iter().map(|&a| a as usize).collect();
            let step = pool.step(&action_indices)?;

            for i in 0..n {
                if finished[i] {
                    continue;
                }
                trajectories[i].push(TrajectoryStep {
                    observation: std::mem::take(&mut snapshots[i]),
                    action: actions[i],
                    log_prob: log_probs[i] as f32,
                    reward: step.shaped_rewards[i],
                });
                if step.dones[i] {
                    finished[i] = true;
                    if let Some(score) = step.episode_returns[i] {
                        raw_returns[i] = score;
                    }
                }
            }
        }

        Ok((trajectories, raw_returns))
    }

    /// One clipped policy-gradient step over the whole group batch.
    ///
    /// Returns the scalar loss value.
    fn update(&mut self, batch: &GroupBatch, obs_shape: [i64; 3]) -> f64 {
        let (obs, actions, old_log_probs, advantages) = batch.to_tensors(obs_shape, self.device);

        let new_log_probs = self.model.log_prob(&obs, &actions);
        let loss = clipped_surrogate_loss(
            &new_log_probs,
            &old_log_probs,
            &advantages,
            self.config.clip_eps,
        );

        self.opt.zero_grad();
        loss.backward();
        self.opt.step();

        loss.double_value(&[])
    }
}

/// Negated mean clipped surrogate objective.
///
/// Per step: `min(ρ · A, clip(ρ, 1-ε, 1+ε) · A)` with
/// `ρ = exp(new_log_prob − old_log_prob)`; the loss is the negated mean
/// over the batch. With identical old and new log-probabilities (ρ ≡ 1)
/// this reduces to the negated mean advantage.
pub fn clipped_surrogate_loss(
    new_log_probs: &Tensor,
    old_log_probs: &Tensor,
    advantages: &Tensor,
    clip_eps: f64,
) -> Tensor {
    let ratio = (new_log_probs - old_log_probs).exp();
    let surr1 = &ratio * advantages;
    let surr2 = ratio.clamp(1.0 - clip_eps, 1.0 + clip_eps) * advantages;
    -surr1.min_other(&surr2).mean(Kind::Float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvConfig;
    use crate::env::ScriptedEmulator;
    use crate::metrics::NullSink;

    fn test_env_config() -> EnvConfig {
        EnvConfig {
            frame_size: 32,
            frame_stack: 4,
            frame_skip: 1,
            max_episode_steps: None,
        }
    }

    fn make_trainer(config: &EnvConfig, num_actions: usize) -> GrpoTrainer {
        let model = ActorCritic::new(config, num_actions, Device::Cpu);
        GrpoTrainer::new(model, TrainingConfig::default(), Device::Cpu)
    }

    #[test]
    fn unit_ratio_loss_is_negated_mean_advantage() {
        let log_probs = Tensor::from_slice(&[-0.5f32, -1.0, -2.0]);
        let advantages = Tensor::from_slice(&[1.0f32, -2.0, 4.0]);
        let loss = clipped_surrogate_loss(&log_probs, &log_probs, &advantages, 0.2);
        let expected = -(1.0 - 2.0 + 4.0) / 3.0;
        assert!((loss.double_value(&[]) - expected).abs() < 1e-6);
    }

    #[test]
    fn large_ratios_are_clipped() {
        // ρ = e ≈ 2.718, well above 1+ε, with a positive advantage:
        // the clipped branch wins and the surrogate is (1+ε)·A.
        let new_lp = Tensor::from_slice(&[0.0f32]);
        let old_lp = Tensor::from_slice(&[-1.0f32]);
        let adv = Tensor::from_slice(&[2.0f32]);
        let loss = clipped_surrogate_loss(&new_lp, &old_lp, &adv, 0.2);
        assert!((loss.double_value(&[]) - (-1.2 * 2.0)).abs() < 1e-6);
    }

    #[test]
    fn rollout_collects_one_episode_per_slot() {
        // Four environments with episode lengths 2..=5: the rollout must
        // stop once all have finished and each trajectory must match its
        // environment's episode length exactly.
        let config = test_env_config();
        let lengths = [2usize, 3, 4, 5];
        let mut next = 0;
        let mut pool = EnvPool::new(config.clone(), 4, || {
            let len = lengths[next];
            next += 1;
            Ok(ScriptedEmulator::new(vec![0.0; len], 3, next as u64))
        })
        .unwrap();

        let trainer = make_trainer(&config, pool.num_actions());
        let (trajectories, _) = trainer.collect_group(&mut pool).unwrap();

        assert_eq!(trajectories.len(), 4);
        for (trajectory, &len) in trajectories.iter().zip(&lengths) {
            assert_eq!(trajectory.len(), len);
        }
    }

    #[test]
    fn equal_group_returns_give_zero_loss() {
        // Two scripted 3-step episodes with raw rewards [1,0,0] and
        // [0,0,1]: shaped returns are both 1, so advantages and the
        // surrogate loss are exactly zero.
        let config = test_env_config();
        let scripts = [vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]];
        let mut next = 0;
        let mut pool = EnvPool::new(config.clone(), 2, || {
            let script = scripts[next].clone();
            next += 1;
            Ok(ScriptedEmulator::new(script, 3, next as u64))
        })
        .unwrap();

        let mut trainer = make_trainer(&config, pool.num_actions());
        let (trajectories, raw_returns) = trainer.collect_group(&mut pool).unwrap();

        let returns: Vec<f64> = trajectories.iter().map(|t| t.shaped_return()).collect();
        assert_eq!(returns, vec![1.0, 1.0]);
        assert_eq!(raw_returns, vec![1.0, 1.0]);

        let advantages = group_advantages(&returns, 1e-8);
        assert_eq!(advantages, vec![0.0, 0.0]);

        let batch = GroupBatch::from_group(&trajectories, &advantages);
        let loss = trainer.update(&batch, config.observation_shape());
        assert!(loss.abs() < 1e-12);
    }

    #[test]
    fn train_smoke_test() {
        let config = test_env_config();
        let mut seed = 0;
        let mut pool = EnvPool::new(config.clone(), 2, || {
            seed += 1;
            Ok(ScriptedEmulator::new(vec![1.0, 0.0, -1.0], 3, seed))
        })
        .unwrap();

        let mut trainer = make_trainer(&config, pool.num_actions());
        let curve = trainer.train(&mut pool, 2, &mut NullSink).unwrap();
        assert_eq!(curve.len(), 2);
        assert_eq!(curve[0].0, 0);
        assert_eq!(curve[1].0, 1);
    }
}
