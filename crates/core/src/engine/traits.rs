//! Trait definitions for the engine module.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::EngineError;
use super::types::{EngineOutput, Invocation, OutputLine};

/// An external program the pipeline can run.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Returns the name of this engine, used in logs and errors.
    fn name(&self) -> &str;

    /// Runs the engine to completion or until the invocation's deadline.
    ///
    /// Output lines are forwarded to `lines` as they arrive. If the receiver
    /// is dropped or falls behind, lines are still captured in the returned
    /// [`EngineOutput`].
    async fn run(
        &self,
        invocation: Invocation,
        lines: Option<mpsc::Sender<OutputLine>>,
    ) -> Result<EngineOutput, EngineError>;
}
