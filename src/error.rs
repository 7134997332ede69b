use thiserror::Error;

/// Errors raised by the environment layer.
///
/// All variants are fatal for a training run: the pool and trainer
/// propagate them without retrying. A failing emulator indicates
/// misconfiguration (missing ROM, broken binding), not a transient fault.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("emulator construction failed: {0}")]
    Construction(String),

    #[error("emulator reset failed: {0}")]
    Reset(String),

    #[error("emulator step failed: {0}")]
    Step(String),
}
