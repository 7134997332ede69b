//! Emulator contract for episodic arcade environments.
//!
//! The emulator itself (ALE binding, NES core, ...) is an external
//! collaborator; this module only fixes the trait boundary the pool and
//! preprocessing pipeline consume.

use crate::error::EnvError;

/// One raw frame from the emulator: RGB24, row-major.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Frame width in pixels.
    pub width: usize,
    /// Frame height in pixels.
    pub height: usize,
    /// Pixel data, `height × width × 3` bytes.
    pub pixels: Vec<u8>,
}

impl RawFrame {
    /// Creates a frame, checking that the buffer matches the dimensions.
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), width * height * 3, "RGB24 buffer size");
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// Outcome of a single emulator tick.
#[derive(Debug, Clone)]
pub struct EmulatorStep {
    /// Frame after the tick.
    pub frame: RawFrame,
    /// Raw (unclipped) reward for the tick.
    pub reward: f64,
    /// Whether the episode reached a terminal state.
    pub terminated: bool,
    /// Whether the episode was cut off by the emulator (time limit etc.).
    pub truncated: bool,
    /// Remaining lives after the tick.
    pub lives: u32,
}

/// An episodic arcade environment advanced one tick at a time.
///
/// `reset` and `step` are blocking, bounded-latency calls. A failing
/// emulator is fatal for the run; implementations should not retry
/// internally.
pub trait Emulator {
    /// Starts a fresh episode; returns the initial frame and life count.
    fn reset(&mut self) -> Result<(RawFrame, u32), EnvError>;

    /// Advances one tick with the given discrete action.
    fn step(&mut self, action: usize) -> Result<EmulatorStep, EnvError>;

    /// Size of the discrete action set.
    fn num_actions(&self) -> usize;
}
