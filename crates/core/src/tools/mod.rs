//! Detection of the external engines.
//!
//! Tool lookup happens once, up front, and produces explicit capability
//! values that are handed to the pipeline. A missing tool is a value
//! ([`Capability::Unavailable`]), not a flag checked later.

mod capability;
mod resolver;

pub use capability::{Capability, ToolStatus};
pub use resolver::{
    executable_name, resolve_decompiler, resolve_encoder, EncoderBinaries, ANALYZER_TOOL,
    ENCODER_TOOL,
};
