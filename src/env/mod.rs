//! Environment layer: emulator contract, pixel preprocessing, and the
//! vectorized pool.

pub mod emulator;
pub mod pool;
pub mod preprocess;
pub mod scripted;

pub use emulator::{Emulator, EmulatorStep, RawFrame};
pub use pool::{EnvPool, PoolStep};
pub use preprocess::{PreprocessedEnv, SkipStep};
pub use scripted::ScriptedEmulator;
