//! The transcoding engine boundary.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::error::EngineError;

/// A stateful transcoding engine with its own scratch filesystem.
///
/// Implementations are not required to support concurrent commands; callers go
/// through [`EngineAdapter`](super::EngineAdapter), which serializes access.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Returns the name of this engine implementation.
    fn name(&self) -> &str;

    /// Initializes the engine. May be slow; called at most once per success.
    async fn load(&self) -> Result<(), EngineError>;

    /// Stages bytes in the scratch filesystem under `name`.
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError>;

    /// Runs one command. Names in `args` refer to scratch filesystem entries.
    async fn exec(&self, args: &[String]) -> Result<(), EngineError>;

    /// Reads a scratch entry. Missing entries yield [`EngineError::OutputMissing`].
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError>;

    /// Deletes a scratch entry. Missing entries are not an error.
    async fn delete_file(&self, name: &str) -> Result<(), EngineError>;

    /// Subscribes to the engine's progress stream.
    ///
    /// Ticks are bare fractions of the running command (nominally 0.0 - 1.0)
    /// and carry no job identity.
    fn progress(&self) -> broadcast::Receiver<f64>;
}
