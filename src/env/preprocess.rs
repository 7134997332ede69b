//! Fixed pixel pipeline wrapped around a raw emulator.
//!
//! Order per pool step: repeat the action `frame_skip` ticks (stopping
//! early on episode end), max-pool the last two raw frames, convert to
//! grayscale, area-resize to a square, and push onto the frame stack.

use crate::config::EnvConfig;
use crate::env::emulator::{Emulator, RawFrame};
use crate::error::EnvError;

/// Outcome of one preprocessed (action-repeated) step.
#[derive(Debug, Clone, Copy)]
pub struct SkipStep {
    /// Raw reward summed over the skipped ticks.
    pub reward: f64,
    /// Terminal flag from the last inner tick.
    pub terminated: bool,
    /// Truncation flag from the last inner tick.
    pub truncated: bool,
    /// Remaining lives after the last inner tick.
    pub lives: u32,
}

/// One emulator wrapped with the deterministic preprocessing pipeline.
///
/// Holds the stacked observation for the current episode. The stack is
/// stored as raw bytes; unit-range normalization is deferred to tensor
/// materialization in the pool.
pub struct PreprocessedEnv<E: Emulator> {
    inner: E,
    config: EnvConfig,
    /// Stacked frames, oldest first, `frame_stack × frame_size²` bytes.
    stack: Vec<u8>,
}

impl<E: Emulator> PreprocessedEnv<E> {
    /// Wraps an emulator with the pipeline described by `config`.
    pub fn new(inner: E, config: EnvConfig) -> Self {
        assert!(config.frame_skip >= 1, "frame skip must be at least 1");
        assert!(config.frame_stack >= 1, "frame stack must be at least 1");
        let stack = vec![0u8; config.observation_len()];
        Self {
            inner,
            config,
            stack,
        }
    }

    /// Starts a fresh episode.
    ///
    /// The stack is filled with copies of the initial processed frame, so
    /// the first observation already has the full channel depth. Returns
    /// the episode's initial life count.
    pub fn reset(&mut self) -> Result<u32, EnvError> {
        let (frame, lives) = self.inner.reset()?;
        let processed = grayscale_resize(&frame, self.config.frame_size);
        let area = self.config.frame_size * self.config.frame_size;
        for i in 0..self.config.frame_stack {
            self.stack[i * area..(i + 1) * area].copy_from_slice(&processed);
        }
        Ok(lives)
    }

    /// Advances `frame_skip` emulator ticks with the same action.
    ///
    /// Stops early if the episode ends mid-window. Raw rewards are summed
    /// over the window; the returned flags and lives are those of the
    /// final tick taken.
    pub fn step(&mut self, action: usize) -> Result<SkipStep, EnvError> {
        let mut total_reward = 0.0;
        let mut terminated = false;
        let mut truncated = false;
        let mut lives = 0;
        let mut prev: Option<RawFrame> = None;
        let mut last: Option<RawFrame> = None;

        for _ in 0..self.config.frame_skip {
            let step = self.inner.step(action)?;
            total_reward += step.reward;
            terminated = step.terminated;
            truncated = step.truncated;
            lives = step.lives;
            prev = last.take();
            last = Some(step.frame);
            if terminated || truncated {
                break;
            }
        }

        // Last frame always exists: frame_skip >= 1.
        let last = last.expect("frame_skip must be at least 1");
        let pooled = match prev {
            Some(prev) => max_pool(&prev, &last),
            None => last,
        };
        let processed = grayscale_resize(&pooled, self.config.frame_size);
        self.push_frame(&processed);

        Ok(SkipStep {
            reward: total_reward,
            terminated,
            truncated,
            lives,
        })
    }

    /// Current stacked observation, oldest frame first.
    pub fn observation(&self) -> &[u8] {
        &self.stack
    }

    /// Size of the underlying discrete action set.
    pub fn num_actions(&self) -> usize {
        self.inner.num_actions()
    }

    fn push_frame(&mut self, frame: &[u8]) {
        let area = self.config.frame_size * self.config.frame_size;
        let len = self.stack.len();
        self.stack.copy_within(area.., 0);
        self.stack[len - area..].copy_from_slice(frame);
    }
}

/// Elementwise max of two raw frames of identical dimensions.
fn max_pool(a: &RawFrame, b: &RawFrame) -> RawFrame {
    assert_eq!(a.pixels.len(), b.pixels.len(), "frame size changed mid-episode");
    let pixels = a
        .pixels
        .iter()
        .zip(b.pixels.iter())
        .map(|(&x, &y)| x.max(y))
        .collect();
    RawFrame {
        width: a.width,
        height: a.height,
        pixels,
    }
}

/// Grayscale conversion (integer luma weights) followed by area-average
/// resize to `size × size`.
fn grayscale_resize(frame: &RawFrame, size: usize) -> Vec<u8> {
    let (w, h) = (frame.width, frame.height);
    let mut gray = Vec::with_capacity(w * h);
    for px in frame.pixels.chunks_exact(3) {
        let luma = (299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32) / 1000;
        gray.push(luma as u8);
    }

    let mut out = Vec::with_capacity(size * size);
    for ty in 0..size {
        let y0 = ty * h / size;
        let y1 = ((ty + 1) * h / size).max(y0 + 1);
        for tx in 0..size {
            let x0 = tx * w / size;
            let x1 = ((tx + 1) * w / size).max(x0 + 1);
            let mut sum = 0u32;
            for y in y0..y1 {
                for x in x0..x1 {
                    sum += gray[y * w + x] as u32;
                }
            }
            let count = ((y1 - y0) * (x1 - x0)) as u32;
            out.push((sum / count) as u8);
        }
    }
    out
}
