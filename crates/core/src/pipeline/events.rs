//! Progress events emitted while a request runs.

use serde::Serialize;
use tokio::sync::mpsc;

use super::types::{PipelineState, PipelineWarning};

/// Progress update for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    StateChanged {
        state: PipelineState,
    },
    /// A decompiler stdout line, with its `current/total` counter if present.
    DecompilerProgress {
        current: Option<u64>,
        total: Option<u64>,
        line: String,
    },
    FrameRateResolved {
        fps: u32,
        detected: bool,
    },
    AssemblyProgress {
        percent: f32,
    },
    Warning {
        warning: PipelineWarning,
    },
}

/// Optional destination for [`PipelineEvent`]s.
///
/// A dropped receiver is ignored; the request keeps running.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn none() -> Self {
        Self { tx: None }
    }

    pub async fn emit(&self, event: PipelineEvent) {
        if let Some(ref tx) = self.tx {
            let _ = tx.send(event).await;
        }
    }
}

impl From<Option<mpsc::Sender<PipelineEvent>>> for EventSink {
    fn from(tx: Option<mpsc::Sender<PipelineEvent>>) -> Self {
        Self { tx }
    }
}
