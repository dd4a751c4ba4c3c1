//! Core fusion and orchestration engine
//!
//! - `fusion`: pure confidence fusion algorithm
//! - `orchestrator`: concurrent dual-branch dispatch with failure isolation
//! - `report`: human-readable report rendering

pub mod fusion;
pub mod orchestrator;
pub mod report;

pub use fusion::{fuse, FusionOutcome, FusionWeights};
pub use orchestrator::{
    AnalyzerStatus, FusionStatus, IntegratedAnalyzer, IntegratedResult, ModelInfo,
};
pub use report::render_report;
