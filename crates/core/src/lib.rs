pub mod config;
pub mod encode;
pub mod engine;
pub mod extract;
pub mod manifest;
pub mod pipeline;
pub mod testing;
pub mod tools;

pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError,
};
pub use engine::{Engine, EngineError, ProcessEngine};
pub use extract::ExtractionRequest;
pub use pipeline::{
    ConversionOutcome, ConversionRequest, ExtractionOutcome, Pipeline, PipelineError,
    PipelineEvent, PipelineState, PipelineWarning,
};
pub use tools::{Capability, ToolStatus};
