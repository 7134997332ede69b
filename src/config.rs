//! Configuration for the preprocessing pipeline and environment pool.

/// Configuration for one preprocessed environment slot.
///
/// Controls the pixel pipeline (grayscale → resize → frame skip with
/// max-pooling → frame stack) and the optional per-episode step ceiling.
/// All values are fixed for the duration of a run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvConfig {
    /// Side length of the resized square frame (pixels).
    pub frame_size: usize,
    /// Number of consecutive processed frames stacked along the channel axis.
    pub frame_stack: usize,
    /// Number of emulator ticks advanced per pool step (action repeat).
    pub frame_skip: usize,
    /// Per-episode step ceiling. When reached, the episode is treated as
    /// truncated instead of stalling the rollout indefinitely.
    pub max_episode_steps: Option<u32>,
}

impl EnvConfig {
    /// Flattened length of one stacked observation.
    pub fn observation_len(&self) -> usize {
        self.frame_stack * self.frame_size * self.frame_size
    }

    /// Shape of one stacked observation: `[stack, size, size]`.
    pub fn observation_shape(&self) -> [i64; 3] {
        [
            self.frame_stack as i64,
            self.frame_size as i64,
            self.frame_size as i64,
        ]
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            frame_size: 84,
            frame_stack: 4,
            frame_skip: 4,
            max_episode_steps: None,
        }
    }
}
