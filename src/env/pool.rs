//! Vectorized environment pool with synchronized stepping and
//! automatic episode management.
//!
//! The pool keeps every slot "hot": a slot whose episode ends is reset
//! inside the same `step` call, so the returned observation batch always
//! reflects live episodes. Callers must therefore consume done flags
//! from the [`PoolStep`] return value, never from subsequent slot state,
//! and snapshot trajectory observations before stepping.

use tch::{Device, Tensor};

use crate::config::EnvConfig;
use crate::env::emulator::Emulator;
use crate::env::preprocess::PreprocessedEnv;
use crate::error::EnvError;

/// Result of advancing every slot by one pool tick.
#[derive(Debug)]
pub struct PoolStep {
    /// Sign-clipped per-slot rewards, each in {−1, 0, 1}.
    pub shaped_rewards: Vec<f32>,
    /// Per-slot episode-end flags, computed before the implicit reset.
    pub dones: Vec<bool>,
    /// Raw (unclipped) return of the episode that just ended, for slots
    /// reported done on this tick.
    pub episode_returns: Vec<Option<f64>>,
}

/// Per-slot episode bookkeeping.
struct Slot<E: Emulator> {
    env: PreprocessedEnv<E>,
    /// Cumulative raw reward of the current episode.
    episode_reward: f64,
    /// Last known life count.
    lives: u32,
    /// Ticks taken in the current episode.
    steps: u32,
    done: bool,
}

/// N independent episodic environments presented as one vectorized unit.
///
/// # Lifecycle
///
/// 1. Call [`EnvPool::new`] with a config and a fallible emulator factory.
/// 2. Repeatedly call [`EnvPool::step`] with one action per slot.
/// 3. Fetch batched observations via [`EnvPool::observations`].
///
/// Slots whose episodes end (terminal, truncation, or life loss) are
/// reset automatically inside `step`.
pub struct EnvPool<E: Emulator> {
    slots: Vec<Slot<E>>,
    config: EnvConfig,
}

impl<E: Emulator> EnvPool<E> {
    /// Builds a pool of `n` emulators and resets every slot.
    ///
    /// Emulator construction or reset failure is fatal and propagates.
    pub fn new<F>(config: EnvConfig, n: usize, mut factory: F) -> Result<Self, EnvError>
    where
        F: FnMut() -> Result<E, EnvError>,
    {
        assert!(n > 0, "pool must hold at least one environment");
        let mut slots = Vec::with_capacity(n);
        for _ in 0..n {
            let env = PreprocessedEnv::new(factory()?, config.clone());
            slots.push(Slot {
                env,
                episode_reward: 0.0,
                lives: 0,
                steps: 0,
                done: false,
            });
        }
        let mut pool = Self { slots, config };
        for i in 0..n {
            pool.reset_slot(i)?;
        }
        Ok(pool)
    }

    /// Resets slot `i` to a fresh episode.
    ///
    /// Zeroes the cumulative reward and step counters, captures the
    /// initial observation and life count, and clears the done flag.
    pub fn reset_slot(&mut self, i: usize) -> Result<(), EnvError> {
        let slot = &mut self.slots[i];
        slot.episode_reward = 0.0;
        slot.steps = 0;
        slot.lives = slot.env.reset()?;
        slot.done = false;
        Ok(())
    }

    /// Advances every slot by exactly one pool tick, sequentially.
    ///
    /// Per slot: life loss is detected by comparing the new life count to
    /// the previous one; `done` is terminal ∨ truncated ∨ life-lost ∨
    /// step-ceiling reached; the shaped reward is the sign of the raw
    /// reward. Slots reported done are reset before this method returns.
    pub fn step(&mut self, actions: &[usize]) -> Result<PoolStep, EnvError> {
        assert_eq!(
            actions.len(),
            self.slots.len(),
            "number of actions must match pool size"
        );

        let n = self.slots.len();
        let mut shaped_rewards = vec![0.0f32; n];
        let mut dones = vec![false; n];
        let mut episode_returns = vec![None; n];

        for i in 0..n {
            let slot = &mut self.slots[i];
            let step = slot.env.step(actions[i])?;

            let life_lost = step.lives < slot.lives;
            slot.lives = step.lives;
            slot.episode_reward += step.reward;
            slot.steps += 1;

            let ceiling_hit = self
                .config
                .max_episode_steps
                .is_some_and(|limit| slot.steps >= limit);

            shaped_rewards[i] = sign(step.reward);
            dones[i] = step.terminated || step.truncated || life_lost || ceiling_hit;

            if dones[i] {
                slot.done = true;
                episode_returns[i] = Some(slot.episode_reward);
                self.reset_slot(i)?;
            }
        }

        Ok(PoolStep {
            shaped_rewards,
            dones,
            episode_returns,
        })
    }

    /// Materializes the batched observation tensor `[N, stack, size, size]`,
    /// normalized to the unit range, on the given device. Built on demand.
    pub fn observations(&self, device: Device) -> Tensor {
        let obs_len = self.config.observation_len();
        let mut flat = Vec::with_capacity(self.slots.len() * obs_len);
        for slot in &self.slots {
            flat.extend(slot.env.observation().iter().map(|&b| b as f32 / 255.0));
        }
        let [c, h, w] = self.config.observation_shape();
        Tensor::from_slice(&flat)
            .reshape([self.slots.len() as i64, c, h, w])
            .to_device(device)
    }

    /// Current stacked observation bytes of slot `i`.
    pub fn slot_observation(&self, i: usize) -> &[u8] {
        self.slots[i].env.observation()
    }

    /// Cumulative raw reward of slot `i`'s current episode.
    pub fn slot_episode_reward(&self, i: usize) -> f64 {
        self.slots[i].episode_reward
    }

    /// Last known life count of slot `i`.
    pub fn slot_lives(&self, i: usize) -> u32 {
        self.slots[i].lives
    }

    /// Done flag of slot `i` (false for any live episode).
    pub fn slot_done(&self, i: usize) -> bool {
        self.slots[i].done
    }

    /// Number of pooled environments.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the pool holds no environments.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Size of the discrete action set (shared by all slots).
    pub fn num_actions(&self) -> usize {
        self.slots[0].env.num_actions()
    }

    /// Pool configuration.
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }
}

/// Sign clipping: maps any raw reward into {−1, 0, 1}.
fn sign(reward: f64) -> f32 {
    if reward > 0.0 {
        1.0
    } else if reward < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::scripted::ScriptedEmulator;

    fn small_config(skip: usize) -> EnvConfig {
        EnvConfig {
            frame_size: 16,
            frame_stack: 4,
            frame_skip: skip,
            max_episode_steps: None,
        }
    }

    fn make_pool(
        config: EnvConfig,
        n: usize,
        rewards: Vec<f64>,
    ) -> EnvPool<ScriptedEmulator> {
        let mut seed = 0;
        EnvPool::new(config, n, || {
            seed += 1;
            Ok(ScriptedEmulator::new(rewards.clone(), 3, seed))
        })
        .unwrap()
    }

    #[test]
    fn construction_resets_every_slot() {
        let config = small_config(4);
        let pool = make_pool(config.clone(), 5, vec![0.0; 20]);
        assert_eq!(pool.len(), 5);
        for i in 0..pool.len() {
            assert_eq!(pool.slot_observation(i).len(), config.observation_len());
            assert!(!pool.slot_done(i));
            assert_eq!(pool.slot_episode_reward(i), 0.0);
            assert_eq!(pool.slot_lives(i), 3);
        }
    }

    #[test]
    fn observations_have_batched_shape_and_unit_range() {
        let config = small_config(4);
        let pool = make_pool(config, 3, vec![0.0; 20]);
        let obs = pool.observations(Device::Cpu);
        assert_eq!(obs.size(), &[3, 4, 16, 16]);
        let max: f64 = obs.max().double_value(&[]);
        let min: f64 = obs.min().double_value(&[]);
        assert!(max <= 1.0);
        assert!(min >= 0.0);
    }

    #[test]
    fn shaped_reward_is_sign_of_raw_reward() {
        let config = small_config(1);
        let mut pool = make_pool(config, 1, vec![2.5, -0.3, 0.0, 1.0]);
        let s1 = pool.step(&[0]).unwrap();
        assert_eq!(s1.shaped_rewards[0], 1.0);
        let s2 = pool.step(&[0]).unwrap();
        assert_eq!(s2.shaped_rewards[0], -1.0);
        let s3 = pool.step(&[0]).unwrap();
        assert_eq!(s3.shaped_rewards[0], 0.0);
    }

    #[test]
    fn terminated_slot_is_reset_before_step_returns() {
        let config = small_config(1);
        let mut pool = make_pool(config.clone(), 2, vec![1.0, 2.0]);

        let s1 = pool.step(&[0, 0]).unwrap();
        assert_eq!(s1.dones, vec![false, false]);
        assert_eq!(pool.slot_episode_reward(0), 1.0);

        let s2 = pool.step(&[0, 0]).unwrap();
        assert_eq!(s2.dones, vec![true, true]);
        assert_eq!(s2.episode_returns[0], Some(3.0));

        // The slot already holds the next episode: zero cumulative reward,
        // fresh life count, stack filled with the initial frame.
        for i in 0..2 {
            assert_eq!(pool.slot_episode_reward(i), 0.0);
            assert_eq!(pool.slot_lives(i), 3);
            assert!(!pool.slot_done(i));
            let obs = pool.slot_observation(i);
            let area = config.frame_size * config.frame_size;
            let first = &obs[..area];
            for chunk in obs.chunks_exact(area) {
                assert_eq!(chunk, first);
            }
        }
    }

    #[test]
    fn life_loss_ends_episode_without_termination() {
        let config = small_config(1);
        let mut seed = 0;
        let mut pool = EnvPool::new(config, 1, || {
            seed += 1;
            Ok(ScriptedEmulator::new(vec![0.0; 10], 3, seed).with_life_loss_at(vec![2]))
        })
        .unwrap();

        assert!(!pool.step(&[0]).unwrap().dones[0]);
        assert!(!pool.step(&[0]).unwrap().dones[0]);
        let s = pool.step(&[0]).unwrap();
        assert!(s.dones[0]);
        // Auto-reset restores the fresh episode's lives.
        assert_eq!(pool.slot_lives(0), 3);
    }

    #[test]
    fn step_ceiling_truncates_long_episodes() {
        let config = EnvConfig {
            max_episode_steps: Some(3),
            ..small_config(1)
        };
        let mut pool = make_pool(config, 1, vec![0.0; 100]);
        assert!(!pool.step(&[0]).unwrap().dones[0]);
        assert!(!pool.step(&[0]).unwrap().dones[0]);
        assert!(pool.step(&[0]).unwrap().dones[0]);
    }

    #[test]
    #[should_panic(expected = "number of actions must match pool size")]
    fn step_rejects_wrong_action_count() {
        let mut pool = make_pool(small_config(1), 2, vec![0.0; 4]);
        let _ = pool.step(&[0]);
    }
}
