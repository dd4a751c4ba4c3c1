//! Conflux - Confidence Fusion for Dual-Branch Analysis
//!
//! Conflux coordinates two independently-produced analyses of a single
//! request — a multi-path confidence-scored reasoning result and a
//! behavioral-trajectory analysis result — and fuses them into one decision
//! artifact carrying:
//!
//! - **Integrated confidence**: weighted combination of both branches
//! - **Analysis consistency**: agreement between the two confidence estimates
//! - **Recommendation score**: actionability of the fused insight
//!
//! # Key Guarantees
//!
//! Both branches run concurrently and fail independently: a crashed or
//! unavailable collaborator degrades its branch to "no result" instead of
//! tainting the other branch, and the fusion step is total — a caller always
//! receives a well-formed [`core::IntegratedResult`].
//!
//! # Quick Start
//!
//! ```rust
//! use conflux::core::{fuse, FusionWeights};
//!
//! // Fuse with both branches missing: each falls back to 0.5
//! let outcome = fuse(None, None, &FusionWeights::default());
//! assert!((outcome.analysis_consistency - 1.0).abs() < 1e-12);
//! ```

pub mod behavior;
pub mod benchmark;
pub mod core;
pub mod reasoning;

// Re-export commonly used items at crate root
pub use behavior::{BehaviorResult, TrajectoryAnalyzer};
pub use core::{
    fuse, AnalyzerStatus, FusionOutcome, FusionStatus, FusionWeights, IntegratedAnalyzer,
    IntegratedResult,
};
pub use reasoning::{ReasoningEngine, ReasoningPath, ReasoningResult};
