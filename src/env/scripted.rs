//! Scripted emulator for tests, baselines, and demos.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::env::emulator::{Emulator, EmulatorStep, RawFrame};
use crate::error::EnvError;

/// A deterministic emulator driven by a per-tick reward script.
///
/// The episode lasts exactly `rewards.len()` ticks and reports
/// `terminated` on the last one, regardless of the actions taken. Frames
/// are pseudo-random pixels from a seeded generator that is re-seeded on
/// every reset, so each episode replays the identical frame sequence.
///
/// Used for sanity checks and as a stand-in collaborator where no real
/// emulator binding is available.
pub struct ScriptedEmulator {
    rewards: Vec<f64>,
    initial_lives: u32,
    life_loss_at: Vec<usize>,
    num_actions: usize,
    frame_width: usize,
    frame_height: usize,
    seed: u64,
    rng: StdRng,
    t: usize,
    lives: u32,
}

impl ScriptedEmulator {
    /// Creates an emulator that replays `rewards`, one per tick.
    pub fn new(rewards: Vec<f64>, lives: u32, seed: u64) -> Self {
        assert!(!rewards.is_empty(), "episode script must have at least one tick");
        Self {
            rewards,
            initial_lives: lives,
            life_loss_at: Vec::new(),
            num_actions: 4,
            frame_width: 32,
            frame_height: 32,
            seed,
            rng: StdRng::seed_from_u64(seed),
            t: 0,
            lives,
        }
    }

    /// Schedules life losses at the given 0-based tick indices.
    pub fn with_life_loss_at(mut self, ticks: Vec<usize>) -> Self {
        self.life_loss_at = ticks;
        self
    }

    /// Overrides the raw frame dimensions (default 32×32).
    pub fn with_frame_dims(mut self, width: usize, height: usize) -> Self {
        self.frame_width = width;
        self.frame_height = height;
        self
    }

    /// Overrides the action set size (default 4).
    pub fn with_num_actions(mut self, n: usize) -> Self {
        self.num_actions = n;
        self
    }

    /// Number of ticks in one episode.
    pub fn episode_len(&self) -> usize {
        self.rewards.len()
    }

    fn next_frame(&mut self) -> RawFrame {
        let len = self.frame_width * self.frame_height * 3;
        let pixels = (0..len).map(|_| self.rng.gen::<u8>()).collect();
        RawFrame::new(self.frame_width, self.frame_height, pixels)
    }
}

impl Emulator for ScriptedEmulator {
    fn reset(&mut self) -> Result<(RawFrame, u32), EnvError> {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.t = 0;
        self.lives = self.initial_lives;
        let frame = self.next_frame();
        Ok((frame, self.lives))
    }

    fn step(&mut self, _action: usize) -> Result<EmulatorStep, EnvError> {
        assert!(
            self.t < self.rewards.len(),
            "stepped past the end of the episode script without reset"
        );
        let reward = self.rewards[self.t];
        if self.life_loss_at.contains(&self.t) {
            self.lives = self.lives.saturating_sub(1);
        }
        self.t += 1;
        let terminated = self.t == self.rewards.len();
        let frame = self.next_frame();
        Ok(EmulatorStep {
            frame,
            reward,
            terminated,
            truncated: false,
            lives: self.lives,
        })
    }

    fn num_actions(&self) -> usize {
        self.num_actions
    }
}
